//! Connection topologies and their rule table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::medium::{BooleanMediumSelector, Medium};

/// Topology constraint governing how many simultaneous connections an
/// endpoint may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Strategy {
    /// One-to-one.
    #[serde(rename = "P2P_POINT_TO_POINT")]
    PointToPoint,
    /// One-to-many: a single hub with many spokes.
    #[serde(rename = "P2P_STAR")]
    Star,
    /// Many-to-many.
    #[serde(rename = "P2P_CLUSTER")]
    Cluster,
}

/// Error returned when a strategy token is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid strategy: '{0}'. Expected P2P_POINT_TO_POINT, P2P_STAR or P2P_CLUSTER.")]
pub struct InvalidStrategy(pub String);

impl Strategy {
    /// Every topology kind.
    pub const ALL: [Self; 3] = [Self::PointToPoint, Self::Star, Self::Cluster];

    /// Diagnostic name of the strategy.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PointToPoint => "P2P_POINT_TO_POINT",
            Self::Star => "P2P_STAR",
            Self::Cluster => "P2P_CLUSTER",
        }
    }

    /// Whether an endpoint may hold more than one connection at a time.
    #[must_use]
    pub const fn allows_multiple_connections(self) -> bool {
        match self {
            Self::PointToPoint => false,
            Self::Star | Self::Cluster => true,
        }
    }

    /// Mediums that can structurally carry this topology.
    ///
    /// A Wi-Fi Direct group has a single owner, so it cannot host the
    /// many-to-many mesh a cluster needs.
    #[must_use]
    pub fn compatible_mediums(self) -> BooleanMediumSelector {
        match self {
            Self::PointToPoint | Self::Star => BooleanMediumSelector::all_enabled(),
            Self::Cluster => BooleanMediumSelector::all_enabled().with(Medium::WifiDirect, false),
        }
    }

    /// Whether `medium` can carry this topology.
    #[must_use]
    pub fn is_medium_compatible(self, medium: Medium) -> bool {
        *self.compatible_mediums().get(medium)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = InvalidStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase().replace('-', "_");
        let token = token.strip_prefix("P2P_").unwrap_or(&token);
        match token {
            "POINT_TO_POINT" => Ok(Self::PointToPoint),
            "STAR" => Ok(Self::Star),
            "CLUSTER" => Ok(Self::Cluster),
            _ => Err(InvalidStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_connections_rule() {
        assert!(!Strategy::PointToPoint.allows_multiple_connections());
        assert!(Strategy::Star.allows_multiple_connections());
        assert!(Strategy::Cluster.allows_multiple_connections());
    }

    #[test]
    fn test_cluster_excludes_wifi_direct() {
        assert!(!Strategy::Cluster.is_medium_compatible(Medium::WifiDirect));
        assert!(Strategy::Cluster.is_medium_compatible(Medium::WifiLan));
        assert!(Strategy::Star.is_medium_compatible(Medium::WifiDirect));
        assert!(Strategy::PointToPoint.compatible_mediums().all());
    }

    #[test]
    fn test_parse_accepts_long_and_short_tokens() {
        assert_eq!("P2P_STAR".parse::<Strategy>().unwrap(), Strategy::Star);
        assert_eq!("cluster".parse::<Strategy>().unwrap(), Strategy::Cluster);
        assert_eq!(
            "point-to-point".parse::<Strategy>().unwrap(),
            Strategy::PointToPoint
        );
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let err = "P2P_MESH".parse::<Strategy>().unwrap_err();
        assert_eq!(err, InvalidStrategy("P2P_MESH".to_string()));
        assert!(err.to_string().contains("P2P_MESH"));
    }

    #[test]
    fn test_name_round_trips() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_serde_uses_wire_tokens() {
        let json = serde_json::to_string(&Strategy::Star).unwrap();
        assert_eq!(json, "\"P2P_STAR\"");
        let parsed: Strategy = serde_json::from_str("\"P2P_CLUSTER\"").unwrap();
        assert_eq!(parsed, Strategy::Cluster);
    }
}
