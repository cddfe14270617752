//! Radio mediums and per-medium selectors.
//!
//! The set of mediums is closed: every [`MediumSelector`] carries exactly one
//! value per [`Medium`], so combinators such as [`MediumSelector::all`] can
//! be exhaustive without consulting any registry.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// A short-range radio transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Medium {
    /// Bluetooth Classic (RFCOMM).
    BluetoothClassic,
    /// Bluetooth Low Energy.
    Ble,
    /// Wi-Fi on a shared local network.
    WifiLan,
    /// Wi-Fi Direct (P2P group).
    WifiDirect,
    /// Wi-Fi Aware (NAN).
    WifiAware,
    /// Near-field communication.
    Nfc,
    /// WebRTC data channels.
    WebRtc,
}

impl Medium {
    /// Every supported medium, in selector field order.
    pub const ALL: [Self; 7] = [
        Self::BluetoothClassic,
        Self::Ble,
        Self::WifiLan,
        Self::WifiDirect,
        Self::WifiAware,
        Self::Nfc,
        Self::WebRtc,
    ];

    /// Returns the configuration token for this medium.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BluetoothClassic => "BLUETOOTH_CLASSIC",
            Self::Ble => "BLE",
            Self::WifiLan => "WIFI_LAN",
            Self::WifiDirect => "WIFI_DIRECT",
            Self::WifiAware => "WIFI_AWARE",
            Self::Nfc => "NFC",
            Self::WebRtc => "WEB_RTC",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a medium token is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown medium: '{0}'. Expected one of BLUETOOTH_CLASSIC, BLE, WIFI_LAN, WIFI_DIRECT, WIFI_AWARE, NFC, WEB_RTC.")]
pub struct ParseMediumError(pub String);

impl FromStr for Medium {
    type Err = ParseMediumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase().replace('-', "_");
        match token.as_str() {
            "BLUETOOTH_CLASSIC" | "BLUETOOTH" => Ok(Self::BluetoothClassic),
            "BLE" => Ok(Self::Ble),
            "WIFI_LAN" => Ok(Self::WifiLan),
            "WIFI_DIRECT" => Ok(Self::WifiDirect),
            "WIFI_AWARE" => Ok(Self::WifiAware),
            "NFC" => Ok(Self::Nfc),
            "WEB_RTC" | "WEBRTC" => Ok(Self::WebRtc),
            _ => Err(ParseMediumError(s.to_string())),
        }
    }
}

/// One value of type `T` per supported medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediumSelector<T> {
    /// Bluetooth Classic.
    pub bluetooth: T,
    /// Bluetooth Low Energy.
    pub ble: T,
    /// Wi-Fi LAN.
    pub wifi_lan: T,
    /// Wi-Fi Direct.
    pub wifi_direct: T,
    /// Wi-Fi Aware.
    pub wifi_aware: T,
    /// NFC.
    pub nfc: T,
    /// WebRTC.
    pub web_rtc: T,
}

/// Feature on/off switch for mediums.
pub type BooleanMediumSelector = MediumSelector<bool>;

impl<T> MediumSelector<T> {
    /// Returns the value held for `medium`.
    #[must_use]
    pub const fn get(&self, medium: Medium) -> &T {
        match medium {
            Medium::BluetoothClassic => &self.bluetooth,
            Medium::Ble => &self.ble,
            Medium::WifiLan => &self.wifi_lan,
            Medium::WifiDirect => &self.wifi_direct,
            Medium::WifiAware => &self.wifi_aware,
            Medium::Nfc => &self.nfc,
            Medium::WebRtc => &self.web_rtc,
        }
    }

    /// Returns a mutable reference to the value held for `medium`.
    pub fn get_mut(&mut self, medium: Medium) -> &mut T {
        match medium {
            Medium::BluetoothClassic => &mut self.bluetooth,
            Medium::Ble => &mut self.ble,
            Medium::WifiLan => &mut self.wifi_lan,
            Medium::WifiDirect => &mut self.wifi_direct,
            Medium::WifiAware => &mut self.wifi_aware,
            Medium::Nfc => &mut self.nfc,
            Medium::WebRtc => &mut self.web_rtc,
        }
    }

    /// Replaces the value held for `medium`.
    pub fn set(&mut self, medium: Medium, value: T) {
        *self.get_mut(medium) = value;
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, medium: Medium, value: T) -> Self {
        self.set(medium, value);
        self
    }

    /// Iterates `(medium, value)` pairs in [`Medium::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Medium, &T)> + '_ {
        Medium::ALL.into_iter().map(move |medium| (medium, self.get(medium)))
    }

    /// Applies `f` to every field, producing a new selector.
    #[must_use]
    pub fn map<U, F>(&self, mut f: F) -> MediumSelector<U>
    where
        F: FnMut(Medium, &T) -> U,
    {
        MediumSelector {
            bluetooth: f(Medium::BluetoothClassic, &self.bluetooth),
            ble: f(Medium::Ble, &self.ble),
            wifi_lan: f(Medium::WifiLan, &self.wifi_lan),
            wifi_direct: f(Medium::WifiDirect, &self.wifi_direct),
            wifi_aware: f(Medium::WifiAware, &self.wifi_aware),
            nfc: f(Medium::Nfc, &self.nfc),
            web_rtc: f(Medium::WebRtc, &self.web_rtc),
        }
    }

    /// Combines two selectors field by field.
    #[must_use]
    pub fn zip_with<U, V, F>(&self, other: &MediumSelector<U>, mut f: F) -> MediumSelector<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        self.map(|medium, value| f(value, other.get(medium)))
    }
}

impl<T: Clone> MediumSelector<T> {
    /// Builds a selector holding `value` for every medium.
    #[must_use]
    pub fn splat(value: T) -> Self {
        Self {
            bluetooth: value.clone(),
            ble: value.clone(),
            wifi_lan: value.clone(),
            wifi_direct: value.clone(),
            wifi_aware: value.clone(),
            nfc: value.clone(),
            web_rtc: value,
        }
    }

    /// Overwrites every field with `value`.
    pub fn set_all(&mut self, value: T) {
        *self = Self::splat(value);
    }
}

impl BooleanMediumSelector {
    /// A selector with every medium disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            bluetooth: false,
            ble: false,
            wifi_lan: false,
            wifi_direct: false,
            wifi_aware: false,
            nfc: false,
            web_rtc: false,
        }
    }

    /// A selector with every medium enabled.
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self {
            bluetooth: true,
            ble: true,
            wifi_lan: true,
            wifi_direct: true,
            wifi_aware: true,
            nfc: true,
            web_rtc: true,
        }
    }

    /// A selector with only `medium` enabled.
    #[must_use]
    pub fn only(medium: Medium) -> Self {
        Self::none().with(medium, true)
    }

    /// A selector enabling exactly the given mediums.
    pub fn from_mediums<I>(mediums: I) -> Self
    where
        I: IntoIterator<Item = Medium>,
    {
        mediums
            .into_iter()
            .fold(Self::none(), |selector, medium| selector.with(medium, true))
    }

    /// Intersection: enabled only where both selectors agree.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| *a && *b)
    }

    /// Union: enabled where either selector is.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| *a || *b)
    }

    /// Returns `true` if at least one medium is enabled.
    #[must_use]
    pub fn any(&self) -> bool {
        self.iter().any(|(_, enabled)| *enabled)
    }

    /// Returns `true` if every medium is enabled.
    #[must_use]
    pub fn all(&self) -> bool {
        self.iter().all(|(_, enabled)| *enabled)
    }

    /// Number of enabled mediums.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().filter(|(_, enabled)| **enabled).count()
    }

    /// The enabled mediums, in [`Medium::ALL`] order.
    #[must_use]
    pub fn enabled_mediums(&self) -> Vec<Medium> {
        self.iter()
            .filter_map(|(medium, enabled)| enabled.then_some(medium))
            .collect()
    }
}

impl BitAnd for BooleanMediumSelector {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.and(&rhs)
    }
}

impl BitOr for BooleanMediumSelector {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.or(&rhs)
    }
}

impl FromIterator<Medium> for BooleanMediumSelector {
    fn from_iter<I: IntoIterator<Item = Medium>>(iter: I) -> Self {
        Self::from_mediums(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_and_all_enabled() {
        assert_eq!(BooleanMediumSelector::none().count(), 0);
        assert!(!BooleanMediumSelector::none().any());
        assert!(BooleanMediumSelector::all_enabled().all());
        assert_eq!(BooleanMediumSelector::all_enabled().count(), Medium::ALL.len());
    }

    #[test]
    fn test_default_is_all_disabled() {
        assert_eq!(BooleanMediumSelector::default(), BooleanMediumSelector::none());
    }

    #[test]
    fn test_only_enables_single_medium() {
        let selector = BooleanMediumSelector::only(Medium::WifiLan);
        assert_eq!(selector.count(), 1);
        assert!(selector.wifi_lan);
        assert_eq!(selector.enabled_mediums(), vec![Medium::WifiLan]);
    }

    #[test]
    fn test_and_is_intersection() {
        let a = BooleanMediumSelector::from_mediums([Medium::Ble, Medium::WifiLan]);
        let b = BooleanMediumSelector::from_mediums([Medium::WifiLan, Medium::WebRtc]);
        assert_eq!(a & b, BooleanMediumSelector::only(Medium::WifiLan));
    }

    #[test]
    fn test_or_is_union() {
        let a = BooleanMediumSelector::only(Medium::Ble);
        let b = BooleanMediumSelector::only(Medium::Nfc);
        let union = a | b;
        assert_eq!(union.enabled_mediums(), vec![Medium::Ble, Medium::Nfc]);
    }

    #[test]
    fn test_all_requires_every_medium() {
        let almost = BooleanMediumSelector::all_enabled().with(Medium::Nfc, false);
        assert!(almost.any());
        assert!(!almost.all());
        assert_eq!(almost.count(), Medium::ALL.len() - 1);
    }

    #[test]
    fn test_get_set_cover_every_field() {
        for medium in Medium::ALL {
            let mut selector = BooleanMediumSelector::none();
            selector.set(medium, true);
            assert!(*selector.get(medium));
            assert_eq!(selector.enabled_mediums(), vec![medium]);
        }
    }

    #[test]
    fn test_generic_selector_map() {
        let weights = MediumSelector::splat(2_u32).with(Medium::Ble, 5);
        let doubled = weights.map(|_, w| w * 2);
        assert_eq!(doubled.ble, 10);
        assert_eq!(doubled.wifi_aware, 4);
    }

    #[test]
    fn test_set_all() {
        let mut selector = BooleanMediumSelector::only(Medium::Ble);
        selector.set_all(true);
        assert!(selector.all());
    }

    #[test]
    fn test_medium_parsing() {
        assert_eq!("ble".parse::<Medium>().unwrap(), Medium::Ble);
        assert_eq!("wifi-lan".parse::<Medium>().unwrap(), Medium::WifiLan);
        assert_eq!("BLUETOOTH".parse::<Medium>().unwrap(), Medium::BluetoothClassic);
        assert!("zigbee".parse::<Medium>().is_err());
    }

    #[test]
    fn test_medium_token_round_trips_through_display() {
        for medium in Medium::ALL {
            assert_eq!(medium.to_string().parse::<Medium>().unwrap(), medium);
        }
    }

    #[test]
    fn test_selector_serialization() {
        let json = serde_json::to_string(&BooleanMediumSelector::only(Medium::Ble)).unwrap();
        assert!(json.contains("\"ble\":true"));
        assert!(json.contains("\"bluetooth\":false"));
    }
}
