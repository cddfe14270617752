//! Property tests for medium normalization.

use nearlink_core::{
    compatible_options, AdvertisingOptions, BooleanMediumSelector, DiscoveryOptions, Medium,
    MediumOptions, Strategy as Topology,
};
use proptest::prelude::*;

fn arb_selector() -> impl Strategy<Value = BooleanMediumSelector> {
    proptest::collection::vec(any::<bool>(), Medium::ALL.len()).prop_map(|flags| {
        Medium::ALL
            .iter()
            .zip(flags)
            .filter(|(_, on)| *on)
            .map(|(medium, _)| *medium)
            .collect()
    })
}

fn arb_topology() -> impl Strategy<Value = Topology> {
    prop_oneof![
        Just(Topology::PointToPoint),
        Just(Topology::Star),
        Just(Topology::Cluster),
    ]
}

fn arb_discovery() -> impl Strategy<Value = DiscoveryOptions> {
    (
        arb_topology(),
        arb_selector(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<u32>(),
    )
        .prop_map(|(topology, allowed, oob, low_power, upgrade, keep_alive)| {
            let mut options = DiscoveryOptions::new(topology)
                .with_mediums(allowed)
                .with_out_of_band(oob);
            options.base.low_power = low_power;
            options.auto_upgrade_bandwidth = upgrade;
            options.keep_alive_interval_millis = keep_alive;
            options.fast_advertisement_service_uuid = "0000fef3-0000-1000-8000-00805f9b34fb".into();
            options
        })
}

proptest! {
    /// Without out-of-band, an empty set widens to everything and any other
    /// set is kept.
    #[test]
    fn in_band_empty_widens_otherwise_unchanged(options in arb_discovery()) {
        let options = options.with_out_of_band(false);
        let result = compatible_options(&options);
        if options.base.allowed.count() == 0 {
            prop_assert!(result.base.allowed.all());
        } else {
            prop_assert_eq!(result.base.allowed, options.base.allowed);
        }
    }

    /// Out-of-band with exactly one medium keeps it.
    #[test]
    fn out_of_band_single_medium_is_kept(
        topology in arb_topology(),
        index in 0..Medium::ALL.len(),
    ) {
        let allowed = BooleanMediumSelector::only(Medium::ALL[index]);
        let options = AdvertisingOptions::new(topology)
            .with_mediums(allowed)
            .with_out_of_band(true);
        prop_assert_eq!(options.compatible_options().base.allowed, allowed);
    }

    /// Out-of-band with zero or several mediums falls back to Bluetooth
    /// Classic alone.
    #[test]
    fn out_of_band_other_counts_fall_back(options in arb_discovery()) {
        prop_assume!(options.base.allowed.count() != 1);
        let options = options.with_out_of_band(true);
        let result = compatible_options(&options);
        prop_assert_eq!(
            result.base.allowed,
            BooleanMediumSelector::only(Medium::BluetoothClassic)
        );
    }

    /// Normalizing twice changes nothing further.
    #[test]
    fn normalization_is_idempotent(options in arb_discovery()) {
        let once = compatible_options(&options);
        let twice = compatible_options(&once);
        prop_assert_eq!(once, twice);
    }

    /// Only the medium selector is ever rewritten.
    #[test]
    fn normalization_preserves_other_fields(options in arb_discovery()) {
        let mut result = compatible_options(&options);
        prop_assert!(result.base.allowed.any());
        result.base.allowed = options.base.allowed;
        prop_assert_eq!(result, options);
    }

    /// Upgrade candidates never leave the strategy's compatible set when
    /// topology constraints are enforced.
    #[test]
    fn upgrades_respect_topology(options in arb_discovery()) {
        let upgrades = options.upgrade_mediums();
        let compatible = options.base.strategy.compatible_mediums();
        prop_assert_eq!(upgrades & compatible, upgrades);
    }
}
