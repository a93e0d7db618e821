//! Typed per-group counters parsed from the statistics dump.
//!
//! Counters are numeric in memory; the state sink carries them as JSON
//! strings, so every field converts through [`counter`] at the serde
//! boundary.

use serde::{Deserialize, Serialize};

/// Counters for one VRRP group, mirroring the fixed sub-sections of the
/// statistics dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStats {
    pub advertisements: Counters,
    #[serde(rename = "became-master", with = "counter")]
    pub became_master: u64,
    #[serde(rename = "released-master", with = "counter")]
    pub released_master: u64,
    #[serde(rename = "packet-errors")]
    pub packet_errors: PacketErrors,
    #[serde(rename = "authentication-errors")]
    pub authentication_errors: AuthenticationErrors,
    #[serde(rename = "priority-zero-advertisements")]
    pub priority_zero: Counters,
}

/// A received/sent pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(with = "counter")]
    pub received: u64,
    #[serde(with = "counter")]
    pub sent: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketErrors {
    #[serde(with = "counter")]
    pub length: u64,
    #[serde(with = "counter")]
    pub ttl: u64,
    #[serde(rename = "invalid-type", with = "counter")]
    pub invalid_type: u64,
    #[serde(rename = "advertisement-interval", with = "counter")]
    pub advertisement_interval: u64,
    #[serde(rename = "address-list", with = "counter")]
    pub address_list: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationErrors {
    #[serde(rename = "invalid-type", with = "counter")]
    pub invalid_type: u64,
    #[serde(rename = "type-mismatch", with = "counter")]
    pub type_mismatch: u64,
    #[serde(with = "counter")]
    pub failure: u64,
}

/// String representation of a counter on the wire.
mod counter {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counters_serialize_as_strings() {
        let stats = InstanceStats {
            advertisements: Counters { received: 0, sent: 615 },
            became_master: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["advertisements"]["sent"], "615");
        assert_eq!(json["advertisements"]["received"], "0");
        assert_eq!(json["became-master"], "1");
        assert_eq!(json["packet-errors"]["invalid-type"], "0");

        let back: InstanceStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }
}
