//! Advertising and discovery options, and their medium normalization.
//!
//! Options are plain values that callers build up field by field. Before a
//! configuration is handed to the transport layer it goes through
//! [`MediumOptions::compatible_options`], which returns a copy whose allowed
//! medium set is legal for the requested connection:
//!
//! 1. An out-of-band connection must use exactly one medium. A request with
//!    zero or several mediums falls back to Bluetooth Classic only.
//! 2. Otherwise, an empty medium set means "no preference" and becomes the
//!    set of every medium.
//! 3. Anything else passes through untouched.
//!
//! Normalization only ever rewrites the medium selector, and it is
//! idempotent.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::medium::{BooleanMediumSelector, Medium};
use crate::strategy::Strategy;

/// Keep-alive interval used when the caller leaves it at 0.
pub const DEFAULT_KEEP_ALIVE_INTERVAL_MILLIS: u32 = 5_000;

/// Keep-alive timeout used when the caller leaves it at 0.
pub const DEFAULT_KEEP_ALIVE_TIMEOUT_MILLIS: u32 = 30_000;

/// Medium every out-of-band connection falls back to.
pub const OUT_OF_BAND_FALLBACK_MEDIUM: Medium = Medium::BluetoothClassic;

/// Fields shared by advertising and discovery options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsBase {
    /// Requested topology.
    pub strategy: Strategy,
    /// Mediums the caller allows.
    pub allowed: BooleanMediumSelector,
    /// Prefer low-power scanning/advertising.
    pub low_power: bool,
    /// Keep advertising/scanning while the app is in the background.
    pub always_on: bool,
}

impl OptionsBase {
    /// Creates options for `strategy` with no medium preference.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            allowed: BooleanMediumSelector::none(),
            low_power: false,
            always_on: false,
        }
    }
}

/// Which rule produced a normalized medium set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediumResolution {
    /// The requested set was already legal.
    Unchanged,
    /// No medium was requested, so every medium is allowed.
    AllMediums,
    /// An out-of-band request without exactly one medium was reduced to
    /// [`OUT_OF_BAND_FALLBACK_MEDIUM`].
    OutOfBandFallback,
}

/// Resolves a requested medium set, reporting which rule applied.
#[must_use]
pub fn resolve_mediums(
    allowed: &BooleanMediumSelector,
    is_out_of_band_connection: bool,
) -> (BooleanMediumSelector, MediumResolution) {
    if is_out_of_band_connection {
        return match allowed.count() {
            1 => (*allowed, MediumResolution::Unchanged),
            0 => {
                debug!("out-of-band connection without a medium, using {OUT_OF_BAND_FALLBACK_MEDIUM}");
                (
                    BooleanMediumSelector::only(OUT_OF_BAND_FALLBACK_MEDIUM),
                    MediumResolution::OutOfBandFallback,
                )
            }
            _ => {
                warn!(
                    requested = ?allowed.enabled_mediums(),
                    fallback = %OUT_OF_BAND_FALLBACK_MEDIUM,
                    "out-of-band connection allows exactly one medium, discarding requested set"
                );
                (
                    BooleanMediumSelector::only(OUT_OF_BAND_FALLBACK_MEDIUM),
                    MediumResolution::OutOfBandFallback,
                )
            }
        };
    }

    if allowed.any() {
        (*allowed, MediumResolution::Unchanged)
    } else {
        (BooleanMediumSelector::all_enabled(), MediumResolution::AllMediums)
    }
}

/// Returns the legal medium set for a request.
#[must_use]
pub fn normalize_mediums(
    allowed: &BooleanMediumSelector,
    is_out_of_band_connection: bool,
) -> BooleanMediumSelector {
    resolve_mediums(allowed, is_out_of_band_connection).0
}

/// Behaviour shared by every options type that carries a medium selector.
pub trait MediumOptions: Clone {
    /// Shared option fields.
    fn base(&self) -> &OptionsBase;

    /// Mutable shared option fields.
    fn base_mut(&mut self) -> &mut OptionsBase;

    /// Whether the connection is injected out of band.
    fn is_out_of_band_connection(&self) -> bool;

    /// Whether the connection may move to a higher-bandwidth medium.
    fn auto_upgrade_bandwidth(&self) -> bool;

    /// Whether upgrades must respect the strategy's medium rules.
    fn enforce_topology_constraints(&self) -> bool;

    /// Returns a copy with a legal allowed-medium set.
    #[must_use]
    fn compatible_options(&self) -> Self {
        self.resolve_options().0
    }

    /// Like [`compatible_options`](Self::compatible_options), also reporting
    /// which rule produced the medium set.
    #[must_use]
    fn resolve_options(&self) -> (Self, MediumResolution) {
        let (allowed, resolution) =
            resolve_mediums(&self.base().allowed, self.is_out_of_band_connection());
        let mut options = self.clone();
        options.base_mut().allowed = allowed;
        (options, resolution)
    }

    /// Mediums a bandwidth upgrade may move the connection to.
    #[must_use]
    fn upgrade_mediums(&self) -> BooleanMediumSelector {
        if !self.auto_upgrade_bandwidth() || self.is_out_of_band_connection() {
            return BooleanMediumSelector::none();
        }
        let allowed = normalize_mediums(&self.base().allowed, false);
        if self.enforce_topology_constraints() {
            allowed & self.base().strategy.compatible_mediums()
        } else {
            allowed
        }
    }
}

/// Free-function form of [`MediumOptions::compatible_options`].
#[must_use]
pub fn compatible_options<O: MediumOptions>(options: &O) -> O {
    options.compatible_options()
}

/// Resolved keep-alive timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    /// Time between keep-alive frames.
    pub interval: Duration,
    /// Time without traffic before the connection is dropped.
    pub timeout: Duration,
}

/// Options for discovering remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// Shared fields.
    pub base: OptionsBase,
    /// Allow moving the connection to a faster medium after it is set up.
    pub auto_upgrade_bandwidth: bool,
    /// Restrict upgrades to mediums compatible with the strategy.
    pub enforce_topology_constraints: bool,
    /// Keep-alive interval in milliseconds; 0 selects the default.
    pub keep_alive_interval_millis: u32,
    /// Keep-alive timeout in milliseconds; 0 selects the default.
    pub keep_alive_timeout_millis: u32,
    /// Whether the endpoint is injected out of band.
    pub is_out_of_band_connection: bool,
    /// Service UUID used for low-power BLE scanning.
    pub fast_advertisement_service_uuid: String,
}

impl DiscoveryOptions {
    /// Creates discovery options for `strategy` with defaults elsewhere.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            base: OptionsBase::new(strategy),
            auto_upgrade_bandwidth: true,
            enforce_topology_constraints: true,
            keep_alive_interval_millis: 0,
            keep_alive_timeout_millis: 0,
            is_out_of_band_connection: false,
            fast_advertisement_service_uuid: String::new(),
        }
    }

    /// Sets the allowed mediums.
    #[must_use]
    pub fn with_mediums(mut self, allowed: BooleanMediumSelector) -> Self {
        self.base.allowed = allowed;
        self
    }

    /// Marks the connection as out of band.
    #[must_use]
    pub fn with_out_of_band(mut self, is_out_of_band_connection: bool) -> Self {
        self.is_out_of_band_connection = is_out_of_band_connection;
        self
    }

    /// Keep-alive timing with zero values replaced by defaults.
    #[must_use]
    pub fn keep_alive(&self) -> KeepAlive {
        let or_default = |millis: u32, default: u32| {
            Duration::from_millis(u64::from(if millis == 0 { default } else { millis }))
        };
        KeepAlive {
            interval: or_default(
                self.keep_alive_interval_millis,
                DEFAULT_KEEP_ALIVE_INTERVAL_MILLIS,
            ),
            timeout: or_default(
                self.keep_alive_timeout_millis,
                DEFAULT_KEEP_ALIVE_TIMEOUT_MILLIS,
            ),
        }
    }
}

impl MediumOptions for DiscoveryOptions {
    fn base(&self) -> &OptionsBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptionsBase {
        &mut self.base
    }

    fn is_out_of_band_connection(&self) -> bool {
        self.is_out_of_band_connection
    }

    fn auto_upgrade_bandwidth(&self) -> bool {
        self.auto_upgrade_bandwidth
    }

    fn enforce_topology_constraints(&self) -> bool {
        self.enforce_topology_constraints
    }
}

/// Options for advertising the local endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisingOptions {
    /// Shared fields.
    pub base: OptionsBase,
    /// Allow moving the connection to a faster medium after it is set up.
    pub auto_upgrade_bandwidth: bool,
    /// Restrict upgrades to mediums compatible with the strategy.
    pub enforce_topology_constraints: bool,
    /// Whether the endpoint will be injected out of band by the peer.
    pub is_out_of_band_connection: bool,
    /// Service UUID advertised for low-power BLE scanning.
    pub fast_advertisement_service_uuid: String,
}

impl AdvertisingOptions {
    /// Creates advertising options for `strategy` with defaults elsewhere.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            base: OptionsBase::new(strategy),
            auto_upgrade_bandwidth: true,
            enforce_topology_constraints: true,
            is_out_of_band_connection: false,
            fast_advertisement_service_uuid: String::new(),
        }
    }

    /// Sets the allowed mediums.
    #[must_use]
    pub fn with_mediums(mut self, allowed: BooleanMediumSelector) -> Self {
        self.base.allowed = allowed;
        self
    }

    /// Marks the connection as out of band.
    #[must_use]
    pub fn with_out_of_band(mut self, is_out_of_band_connection: bool) -> Self {
        self.is_out_of_band_connection = is_out_of_band_connection;
        self
    }
}

impl MediumOptions for AdvertisingOptions {
    fn base(&self) -> &OptionsBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut OptionsBase {
        &mut self.base
    }

    fn is_out_of_band_connection(&self) -> bool {
        self.is_out_of_band_connection
    }

    fn auto_upgrade_bandwidth(&self) -> bool {
        self.auto_upgrade_bandwidth
    }

    fn enforce_topology_constraints(&self) -> bool {
        self.enforce_topology_constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_selector_allows_all_mediums() {
        let options = DiscoveryOptions::new(Strategy::Star).with_mediums(
            BooleanMediumSelector::none()
                .with(Medium::Ble, false)
                .with(Medium::WifiLan, false)
                .with(Medium::BluetoothClassic, false),
        );
        let compatible = options.compatible_options();
        assert!(compatible.base.allowed.all());
        assert_eq!(compatible.base.strategy, Strategy::Star);
    }

    #[test]
    fn test_out_of_band_with_two_mediums_falls_back_to_bluetooth() {
        let options = DiscoveryOptions::new(Strategy::PointToPoint)
            .with_mediums(BooleanMediumSelector::from_mediums([
                Medium::Ble,
                Medium::BluetoothClassic,
            ]))
            .with_out_of_band(true);
        let compatible = options.compatible_options();
        assert_eq!(
            compatible.base.allowed,
            BooleanMediumSelector::only(Medium::BluetoothClassic)
        );
    }

    #[test]
    fn test_out_of_band_without_medium_falls_back_to_bluetooth() {
        let options = AdvertisingOptions::new(Strategy::Cluster).with_out_of_band(true);
        let (allowed, resolution) =
            resolve_mediums(&options.base.allowed, options.is_out_of_band_connection);
        assert_eq!(allowed, BooleanMediumSelector::only(Medium::BluetoothClassic));
        assert_eq!(resolution, MediumResolution::OutOfBandFallback);
    }

    #[test]
    fn test_resolve_options_reports_rule() {
        let options = DiscoveryOptions::new(Strategy::Star);
        let (normalized, resolution) = options.resolve_options();
        assert_eq!(resolution, MediumResolution::AllMediums);
        assert_eq!(normalized, options.compatible_options());

        let (_, resolution) = normalized.resolve_options();
        assert_eq!(resolution, MediumResolution::Unchanged);
    }

    #[test]
    fn test_out_of_band_single_medium_is_kept() {
        let options = DiscoveryOptions::new(Strategy::Cluster)
            .with_mediums(BooleanMediumSelector::only(Medium::WifiLan))
            .with_out_of_band(true);
        assert_eq!(options.compatible_options(), options);
    }

    #[test]
    fn test_explicit_mediums_pass_through() {
        let allowed = BooleanMediumSelector::from_mediums([Medium::Ble, Medium::WebRtc]);
        let options = AdvertisingOptions::new(Strategy::Star).with_mediums(allowed);
        let (resolved, resolution) = resolve_mediums(&allowed, false);
        assert_eq!(resolved, allowed);
        assert_eq!(resolution, MediumResolution::Unchanged);
        assert_eq!(options.compatible_options().base.allowed, allowed);
    }

    #[test]
    fn test_normalization_preserves_other_fields() {
        let mut options = DiscoveryOptions::new(Strategy::Cluster).with_out_of_band(true);
        options.keep_alive_interval_millis = 1_000;
        options.fast_advertisement_service_uuid = "0000FEF3-0000-1000-8000-00805F9B34FB".into();
        options.base.low_power = true;
        options.auto_upgrade_bandwidth = false;

        let compatible = options.compatible_options();
        assert_eq!(compatible.keep_alive_interval_millis, 1_000);
        assert_eq!(
            compatible.fast_advertisement_service_uuid,
            options.fast_advertisement_service_uuid
        );
        assert!(compatible.base.low_power);
        assert!(!compatible.auto_upgrade_bandwidth);
        assert!(compatible.is_out_of_band_connection);
    }

    #[test]
    fn test_normalization_does_not_mutate_receiver() {
        let options = DiscoveryOptions::new(Strategy::Star);
        let _ = compatible_options(&options);
        assert_eq!(options.base.allowed, BooleanMediumSelector::none());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let options = DiscoveryOptions::new(Strategy::Star)
            .with_mediums(BooleanMediumSelector::from_mediums([Medium::Ble, Medium::Nfc]))
            .with_out_of_band(true);
        let once = options.compatible_options();
        assert_eq!(once.compatible_options(), once);
    }

    #[test]
    fn test_keep_alive_defaults() {
        let mut options = DiscoveryOptions::new(Strategy::Star);
        let keep_alive = options.keep_alive();
        assert_eq!(keep_alive.interval, Duration::from_millis(5_000));
        assert_eq!(keep_alive.timeout, Duration::from_millis(30_000));

        options.keep_alive_interval_millis = 2_000;
        assert_eq!(options.keep_alive().interval, Duration::from_millis(2_000));
        assert_eq!(options.keep_alive().timeout, Duration::from_millis(30_000));
    }

    #[test]
    fn test_upgrade_mediums_respect_topology() {
        let options = DiscoveryOptions::new(Strategy::Cluster);
        let upgrades = options.upgrade_mediums();
        assert!(!upgrades.wifi_direct);
        assert!(upgrades.wifi_lan);

        let mut relaxed = options;
        relaxed.enforce_topology_constraints = false;
        assert!(relaxed.upgrade_mediums().all());
    }

    #[test]
    fn test_no_upgrades_when_disabled_or_out_of_band() {
        let mut options = AdvertisingOptions::new(Strategy::Star);
        options.auto_upgrade_bandwidth = false;
        assert!(!options.upgrade_mediums().any());

        let oob = AdvertisingOptions::new(Strategy::Star)
            .with_mediums(BooleanMediumSelector::only(Medium::Ble))
            .with_out_of_band(true);
        assert!(!oob.upgrade_mediums().any());
    }
}
