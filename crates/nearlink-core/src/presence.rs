//! Presence device identities.
//!
//! A [`PresenceDevice`] is minted once per advertised or discovered device.
//! It pins the moment of discovery, the motion context, the caller's
//! metadata and a fresh [`EndpointId`]; none of these change afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::identity::{
    EndpointId, IdentityError, MonotonicClock, OsRandom, RandomSource, SystemClock,
};
use crate::medium::Medium;
use crate::types::MacAddress;

/// Kind of motion observed when the device was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MotionType {
    /// No motion information.
    #[default]
    Unknown,
    /// The user is pointing the device at a target and holding it.
    PointAndHold,
}

/// Device-motion snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(from = "RawDeviceMotion")]
pub struct DeviceMotion {
    /// Observed motion.
    pub motion_type: MotionType,
    /// Classifier confidence, 0.0 to 1.0.
    #[schema(minimum = 0.0, maximum = 1.0)]
    pub confidence: f32,
}

impl DeviceMotion {
    /// Creates a snapshot, clamping `confidence` into `[0, 1]`.
    #[must_use]
    pub fn new(motion_type: MotionType, confidence: f32) -> Self {
        Self {
            motion_type,
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
        }
    }
}

/// Wire shape of [`DeviceMotion`] before clamping.
#[derive(Deserialize)]
struct RawDeviceMotion {
    #[serde(default)]
    motion_type: MotionType,
    #[serde(default)]
    confidence: f32,
}

impl From<RawDeviceMotion> for DeviceMotion {
    fn from(raw: RawDeviceMotion) -> Self {
        Self::new(raw.motion_type, raw.confidence)
    }
}

/// Caller-supplied description of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceMetadata {
    /// Identifier that survives across sessions; never broadcast.
    #[serde(default)]
    pub stable_device_id: String,
    /// Account the device is signed into.
    #[serde(default)]
    pub account_name: String,
    /// Human-readable device name.
    #[serde(default)]
    pub device_name: String,
    /// Name of the device owner.
    #[serde(default)]
    pub user_name: String,
    /// Profile picture URL of the owner.
    #[serde(default)]
    pub device_profile_url: Option<String>,
    /// Bluetooth MAC address used to reach the device over BLE.
    pub bluetooth_mac_address: MacAddress,
}

impl DeviceMetadata {
    /// Metadata carrying only a Bluetooth MAC address.
    #[must_use]
    pub const fn new(bluetooth_mac_address: MacAddress) -> Self {
        Self {
            stable_device_id: String::new(),
            account_name: String::new(),
            device_name: String::new(),
            user_name: String::new(),
            device_profile_url: None,
            bluetooth_mac_address,
        }
    }

    /// Sets the device name.
    #[must_use]
    pub fn with_device_name(mut self, device_name: impl Into<String>) -> Self {
        self.device_name = device_name.into();
        self
    }

    /// Sets the account name.
    #[must_use]
    pub fn with_account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = account_name.into();
        self
    }
}

/// Transport-specific information needed to connect to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "medium", rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ConnectionInfo {
    /// Bluetooth Low Energy.
    Ble {
        /// Address to connect to.
        mac_address: MacAddress,
    },
}

impl ConnectionInfo {
    /// The medium this information applies to.
    #[must_use]
    pub const fn medium(&self) -> Medium {
        match self {
            Self::Ble { .. } => Medium::Ble,
        }
    }
}

/// An ephemeral identity for one advertised or discovered device.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceDevice {
    discovery_timestamp: Duration,
    device_motion: DeviceMotion,
    device_metadata: DeviceMetadata,
    endpoint_id: EndpointId,
}

impl PresenceDevice {
    /// Mints an identity using the OS random source and system clock.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::RandomSourceFailed`] if no endpoint id
    /// could be drawn.
    pub fn new(device_metadata: DeviceMetadata) -> Result<Self, IdentityError> {
        IdentityGenerator::new(OsRandom, SystemClock).generate(device_metadata, None)
    }

    /// Like [`new`](Self::new), with an observed motion snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::RandomSourceFailed`] if no endpoint id
    /// could be drawn.
    pub fn with_motion(
        device_motion: DeviceMotion,
        device_metadata: DeviceMetadata,
    ) -> Result<Self, IdentityError> {
        IdentityGenerator::new(OsRandom, SystemClock)
            .generate(device_metadata, Some(device_motion))
    }

    /// Monotonic clock reading taken when the identity was minted.
    #[must_use]
    pub const fn discovery_timestamp(&self) -> Duration {
        self.discovery_timestamp
    }

    /// Motion snapshot.
    #[must_use]
    pub const fn device_motion(&self) -> &DeviceMotion {
        &self.device_motion
    }

    /// Caller-supplied metadata.
    #[must_use]
    pub const fn device_metadata(&self) -> &DeviceMetadata {
        &self.device_metadata
    }

    /// Ephemeral endpoint id.
    #[must_use]
    pub const fn endpoint_id(&self) -> &EndpointId {
        &self.endpoint_id
    }

    /// One entry per transport this identity can be reached over.
    #[must_use]
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        vec![ConnectionInfo::Ble {
            mac_address: self.device_metadata.bluetooth_mac_address.clone(),
        }]
    }
}

/// Mints [`PresenceDevice`]s from injected randomness and time.
#[derive(Debug, Clone, Default)]
pub struct IdentityGenerator<R = OsRandom, C = SystemClock> {
    random: R,
    clock: C,
}

impl<R: RandomSource, C: MonotonicClock> IdentityGenerator<R, C> {
    /// Creates a generator over the given capabilities.
    pub const fn new(random: R, clock: C) -> Self {
        Self { random, clock }
    }

    /// Mints an identity for `device_metadata`.
    ///
    /// A missing motion snapshot is recorded as [`DeviceMotion::default`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::RandomSourceFailed`] if the random source
    /// fails; no partial identity is returned.
    pub fn generate(
        &self,
        device_metadata: DeviceMetadata,
        device_motion: Option<DeviceMotion>,
    ) -> Result<PresenceDevice, IdentityError> {
        let discovery_timestamp = self.clock.elapsed_realtime();
        let endpoint_id = EndpointId::generate(&self.random)?;

        debug!(
            endpoint_id = %endpoint_id,
            discovery_timestamp = ?discovery_timestamp,
            "minted presence device identity"
        );

        Ok(PresenceDevice {
            discovery_timestamp,
            device_motion: device_motion.unwrap_or_default(),
            device_metadata,
            endpoint_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

    use super::*;

    /// Leads every draw with a call counter so successive ids differ.
    #[derive(Default)]
    struct CountingRandom(AtomicU8);

    impl RandomSource for CountingRandom {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), IdentityError> {
            dest.fill(0);
            dest[0] = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Advances one second on every read.
    #[derive(Default)]
    struct TickingClock(AtomicU64);

    impl MonotonicClock for TickingClock {
        fn elapsed_realtime(&self) -> Duration {
            Duration::from_secs(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct FailingRandom;

    impl RandomSource for FailingRandom {
        fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), IdentityError> {
            Err(IdentityError::RandomSourceFailed("getrandom unavailable".into()))
        }
    }

    fn metadata() -> DeviceMetadata {
        DeviceMetadata::new(MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap())
            .with_device_name("Pixel")
            .with_account_name("user@example.com")
    }

    #[test]
    fn test_connection_infos_yield_single_ble_entry() {
        let device = PresenceDevice::new(metadata()).unwrap();
        let infos = device.connection_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].medium(), Medium::Ble);
        let ConnectionInfo::Ble { mac_address } = &infos[0];
        assert_eq!(mac_address.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_missing_motion_defaults_to_unknown() {
        let device = PresenceDevice::new(metadata()).unwrap();
        assert_eq!(device.device_motion().motion_type, MotionType::Unknown);
        assert!(device.device_motion().confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_supplied_motion_is_kept() {
        let motion = DeviceMotion::new(MotionType::PointAndHold, 0.8);
        let device = PresenceDevice::with_motion(motion, metadata()).unwrap();
        assert_eq!(*device.device_motion(), motion);
        assert_eq!(device.device_metadata().device_name, "Pixel");
    }

    #[test]
    fn test_motion_confidence_is_clamped() {
        let high = DeviceMotion::new(MotionType::PointAndHold, 3.0);
        assert!((high.confidence - 1.0).abs() < f32::EPSILON);
        let nan = DeviceMotion::new(MotionType::PointAndHold, f32::NAN);
        assert!(nan.confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_deserialized_motion_is_clamped() {
        let low: DeviceMotion =
            serde_json::from_str(r#"{"motion_type":"point_and_hold","confidence":-3.5}"#).unwrap();
        assert_eq!(low.motion_type, MotionType::PointAndHold);
        assert!(low.confidence.abs() < f32::EPSILON);

        let high: DeviceMotion =
            serde_json::from_str(r#"{"motion_type":"unknown","confidence":7.0}"#).unwrap();
        assert!((high.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_independent_devices_get_distinct_endpoint_ids() {
        let generator = IdentityGenerator::new(CountingRandom::default(), TickingClock::default());
        let ids: HashSet<String> = (0..30)
            .map(|_| generator.generate(metadata(), None).unwrap().endpoint_id().to_string())
            .collect();
        assert_eq!(ids.len(), 30);
    }

    #[test]
    fn test_os_random_device_is_well_formed() {
        let device = PresenceDevice::new(metadata()).unwrap();
        assert_eq!(device.device_metadata(), &metadata());
        assert!(EndpointId::parse(device.endpoint_id().as_str()).is_ok());
    }

    #[test]
    fn test_discovery_timestamp_is_fixed_at_construction() {
        let generator = IdentityGenerator::new(CountingRandom::default(), TickingClock::default());
        let first = generator.generate(metadata(), None).unwrap();
        let stamp = first.discovery_timestamp();

        let second = generator.generate(metadata(), None).unwrap();
        assert!(second.discovery_timestamp() > stamp);
        assert_eq!(first.discovery_timestamp(), stamp);
        assert_eq!(first.discovery_timestamp(), Duration::from_secs(1));
    }

    #[test]
    fn test_random_failure_yields_no_identity() {
        let generator = IdentityGenerator::new(FailingRandom, TickingClock::default());
        let err = generator.generate(metadata(), None).unwrap_err();
        assert!(matches!(err, IdentityError::RandomSourceFailed(_)));
    }

    #[test]
    fn test_connection_info_serializes_with_medium_tag() {
        let info = ConnectionInfo::Ble {
            mac_address: MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["medium"], "BLE");
        assert_eq!(json["mac_address"], "AA:BB:CC:DD:EE:FF");
    }
}
