//! Typed VRRP configuration tree.
//!
//! The shapes here mirror the YANG model delivered by the configuration bus
//! as JSON-7951; the serde renames match the wire field names so a bus
//! payload deserializes straight into [`ConfigTree`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default base priority when none is configured.
pub const DEFAULT_PRIORITY: u8 = 100;

/// Default advertisement interval for version 2 groups (seconds).
pub const DEFAULT_ADVERT_SECS: u32 = 1;

/// Default advertisement interval for version 3 groups (milliseconds).
pub const DEFAULT_FAST_ADVERT_MS: u32 = 1000;

/// Interface-type buckets of the interface tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InterfaceType {
    #[serde(rename = "vyatta-interfaces-dataplane-v1:dataplane")]
    Dataplane,
    #[serde(rename = "vyatta-interfaces-bonding-v1:bonding")]
    Bonding,
    #[serde(rename = "vyatta-interfaces-switch-v1:switch")]
    Switch,
    /// Virtual sub-interfaces promoted out of their parents by sanitization.
    #[serde(rename = "vif")]
    Vif,
}

impl InterfaceType {
    /// Guess the interface type from a physical interface name.
    ///
    /// The daemon's files only carry interface names, so the bucket an
    /// interface belongs to has to be recovered from its naming pattern.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.starts_with("dp") {
            Some(InterfaceType::Dataplane)
        } else if name.starts_with("sw") {
            Some(InterfaceType::Switch)
        } else if name.starts_with("bond") {
            Some(InterfaceType::Bonding)
        } else {
            None
        }
    }
}

/// The full configuration tree: interface-type buckets of interfaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigTree {
    #[serde(rename = "vyatta-interfaces-v1:interfaces", default)]
    pub interfaces: BTreeMap<InterfaceType, Vec<Interface>>,
}

impl ConfigTree {
    /// Find or create the VRRP stanza for `name` (or its vif child) under the
    /// given interface-type bucket. Used when rebuilding the tree from text.
    pub fn vrrp_entry(
        &mut self,
        intf_type: InterfaceType,
        name: &str,
        vif: Option<&str>,
    ) -> &mut VRRPConfig {
        let list = self.interfaces.entry(intf_type).or_default();
        let idx = match list.iter().position(|i| i.name == name) {
            Some(idx) => idx,
            None => {
                list.push(Interface::new(name));
                list.len() - 1
            }
        };
        let intf = &mut list[idx];
        let target = match vif {
            None => intf,
            Some(vif_number) => {
                let vif_idx = match intf.vif.iter().position(|v| v.name == vif_number) {
                    Some(idx) => idx,
                    None => {
                        intf.vif.push(Interface::new(vif_number));
                        intf.vif.len() - 1
                    }
                };
                &mut intf.vif[vif_idx]
            }
        };
        target.vrrp.get_or_insert_with(VRRPConfig::default)
    }
}

/// One interface entry: a name, optional vif children (one level deep) and an
/// optional VRRP stanza.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    #[serde(rename = "tagnode")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vif: Vec<Interface>,
    #[serde(
        rename = "vyatta-vrrp-v1:vrrp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vrrp: Option<VRRPConfig>,
}

impl Interface {
    pub fn new(name: &str) -> Self {
        Interface {
            name: name.to_string(),
            vif: Vec::new(),
            vrrp: Some(VRRPConfig::default()),
        }
    }

    /// Whether this interface carries any VRRP groups.
    pub fn has_groups(&self) -> bool {
        self.vrrp.as_ref().is_some_and(|v| !v.groups.is_empty())
    }
}

/// Per-interface VRRP stanza: the start delay shared by every group on the
/// interface, plus the groups themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VRRPConfig {
    #[serde(rename = "start-delay", default)]
    pub start_delay: u32,
    #[serde(rename = "vrrp-group", default)]
    pub groups: Vec<VRRPGroup>,
}

/// Configuration for one VRRP group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VRRPGroup {
    /// Virtual router id, unique per interface (1-255).
    #[serde(rename = "tagnode")]
    pub vrid: u8,

    /// Protocol version, 2 or 3.
    #[serde(default = "default_version")]
    pub version: u8,

    /// Accept mode (defaults to off).
    #[serde(default)]
    pub accept: bool,

    /// Preemption (defaults to on).
    #[serde(default = "default_true")]
    pub preempt: bool,

    /// Base priority; `None` means the daemon default of 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    /// Seconds to hold off preemption after a transition.
    #[serde(rename = "preempt-delay", default, skip_serializing_if = "Option::is_none")]
    pub preempt_delay: Option<u32>,

    /// Advertisement interval in seconds (version 2 only).
    #[serde(
        rename = "advertise-interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub advertise_interval: Option<u32>,

    /// Advertisement interval in milliseconds (version 3 only).
    #[serde(
        rename = "fast-advertise-interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fast_advertise_interval: Option<u32>,

    /// Virtual addresses in CIDR notation, IPv4 or IPv6. Never empty in
    /// schema-valid configuration.
    #[serde(rename = "virtual-address")]
    pub virtual_addresses: Vec<String>,

    /// RFC 3768/5798 compatibility mode: present a dedicated virtual-MAC
    /// interface instead of transmitting on the physical device.
    #[serde(rename = "rfc-compatibility", default, skip_serializing_if = "is_false")]
    pub rfc_compatibility: bool,

    /// Administratively disabled; the group is not rendered into daemon
    /// configuration.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,

    /// Source address for advertisements.
    #[serde(
        rename = "hello-source-address",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hello_source_address: Option<String>,

    /// Name of the sync group this group belongs to, if any.
    #[serde(rename = "sync-group", default, skip_serializing_if = "Option::is_none")]
    pub sync_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<Track>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<Notify>,
}

impl Default for VRRPGroup {
    fn default() -> Self {
        VRRPGroup {
            vrid: 1,
            version: 2,
            accept: false,
            preempt: true,
            priority: None,
            preempt_delay: None,
            advertise_interval: None,
            fast_advertise_interval: None,
            virtual_addresses: Vec::new(),
            rfc_compatibility: false,
            disable: false,
            authentication: None,
            hello_source_address: None,
            sync_group: None,
            track: None,
            notify: None,
        }
    }
}

impl VRRPGroup {
    /// Base priority with the daemon default substituted.
    pub fn effective_priority(&self) -> u8 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Advertisement interval as written to daemon configuration, in seconds.
    ///
    /// Version 3 groups configure milliseconds; the daemon field is always
    /// seconds, so the value is scaled down on the way out. A version 3
    /// interval that is not a whole number of seconds renders as a decimal
    /// (`advert_int 1.5`), which the daemon accepts for v3.
    pub fn advert_int(&self) -> String {
        if self.version == 3 {
            let millis = self.fast_advertise_interval.unwrap_or(DEFAULT_FAST_ADVERT_MS);
            if millis % 1000 == 0 {
                (millis / 1000).to_string()
            } else {
                format!("{}", f64::from(millis) / 1000.0)
            }
        } else {
            self.advertise_interval.unwrap_or(DEFAULT_ADVERT_SECS).to_string()
        }
    }

    /// Whether any virtual address is IPv6.
    pub fn has_ipv6(&self) -> bool {
        self.virtual_addresses.iter().any(|a| a.contains(':'))
    }
}

/// VRRP authentication settings (version 2 only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    #[serde(rename = "plaintext-password")]
    PlaintextPassword,
    #[serde(rename = "ah")]
    Ah,
}

impl AuthType {
    /// The daemon's name for this authentication type.
    pub fn daemon_name(&self) -> &'static str {
        match self {
            AuthType::PlaintextPassword => "PASS",
            AuthType::Ah => "AH",
        }
    }

    /// Map a daemon auth_type token back; anything that is not PASS falls
    /// back to AH.
    pub fn from_daemon(token: &str) -> Self {
        if token == "PASS" {
            AuthType::PlaintextPassword
        } else {
            AuthType::Ah
        }
    }
}

/// Tracked objects adjusting this group's effective priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interface: Vec<TrackedInterface>,
    #[serde(rename = "path-monitor", default, skip_serializing_if = "Option::is_none")]
    pub path_monitor: Option<PathMonitor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<TrackedRoute>,
}

impl Track {
    pub fn is_empty(&self) -> bool {
        self.interface.is_empty() && self.path_monitor.is_none() && self.route.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedInterface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<TrackWeight>,
}

/// Path-monitor tracking: monitors, each owning a set of policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMonitor {
    #[serde(default)]
    pub monitor: Vec<Monitor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,
    #[serde(default)]
    pub policy: Vec<Policy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<TrackWeight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRoute {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<TrackWeight>,
}

/// Priority adjustment carried by a tracked object: a direction and a
/// magnitude (1-254).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWeight {
    #[serde(rename = "type")]
    pub direction: WeightDirection,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightDirection {
    #[serde(rename = "increment")]
    Increment,
    #[serde(rename = "decrement")]
    Decrement,
}

impl TrackWeight {
    /// The signed integer written to daemon files.
    pub fn signed(&self) -> i32 {
        match self.direction {
            WeightDirection::Increment => i32::from(self.value),
            WeightDirection::Decrement => -i32::from(self.value),
        }
    }

    /// Split a signed daemon weight into direction and magnitude. Returns
    /// `None` if the magnitude does not fit the schema range.
    pub fn from_signed(weight: i32) -> Option<Self> {
        let value = u8::try_from(weight.unsigned_abs()).ok()?;
        let direction = if weight < 0 {
            WeightDirection::Decrement
        } else {
            WeightDirection::Increment
        };
        Some(TrackWeight { direction, value })
    }
}

/// Notification hooks to run on state transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notify {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bgp: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ipsec: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u8 {
    2
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}
