//! Typed runtime-state tree parsed from the daemon's dump files.
//!
//! Rebuilt in full on every status query; keyed the same way as the
//! configuration tree so the show-command renderers traverse both alike.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats::InstanceStats;
use crate::types::{InterfaceType, TrackWeight};

/// Operational state of a VRRP group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VRRPState {
    #[serde(rename = "MASTER")]
    Master,
    #[default]
    #[serde(rename = "BACKUP")]
    Backup,
    #[serde(rename = "FAULT")]
    Fault,
}

impl VRRPState {
    /// Map a dump token to a state; anything unrecognized reads as FAULT.
    pub fn from_dump(token: &str) -> Self {
        match token {
            "MASTER" => VRRPState::Master,
            "BACKUP" => VRRPState::Backup,
            _ => VRRPState::Fault,
        }
    }
}

impl fmt::Display for VRRPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VRRPState::Master => write!(f, "MASTER"),
            VRRPState::Backup => write!(f, "BACKUP"),
            VRRPState::Fault => write!(f, "FAULT"),
        }
    }
}

/// The full state tree: interface buckets plus any sync groups found in the
/// topology dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateTree {
    #[serde(rename = "vyatta-interfaces-v1:interfaces", default)]
    pub interfaces: BTreeMap<InterfaceType, Vec<InterfaceState>>,
    #[serde(rename = "sync-groups", default, skip_serializing_if = "Vec::is_empty")]
    pub sync_groups: Vec<SyncGroupState>,
}

impl StateTree {
    /// Find or create the entry for group `vrid` on `name` (or its vif child)
    /// under the given interface-type bucket.
    pub fn group_entry(
        &mut self,
        intf_type: InterfaceType,
        name: &str,
        vif: Option<&str>,
        vrid: u8,
    ) -> &mut GroupState {
        let list = self.interfaces.entry(intf_type).or_default();
        let idx = match list.iter().position(|i| i.name == name) {
            Some(idx) => idx,
            None => {
                list.push(InterfaceState::new(name));
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
                        intf.vif.push(InterfaceState::new(vif_number));
                        intf.vif.len() - 1
                    }
                };
                &mut intf.vif[vif_idx]
            }
        };
        let group_idx = match target.groups.iter().position(|g| g.vrid == vrid) {
            Some(idx) => idx,
            None => {
                target.groups.push(GroupState { vrid, ..Default::default() });
                target.groups.len() - 1
            }
        };
        &mut target.groups[group_idx]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceState {
    #[serde(rename = "tagnode")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vif: Vec<InterfaceState>,
    #[serde(rename = "vrrp-group", default)]
    pub groups: Vec<GroupState>,
}

impl InterfaceState {
    pub fn new(name: &str) -> Self {
        InterfaceState {
            name: name.to_string(),
            vif: Vec::new(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    #[serde(rename = "tagnode")]
    pub vrid: u8,
    #[serde(rename = "instance-state", default, skip_serializing_if = "Option::is_none")]
    pub instance_state: Option<InstanceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<InstanceStats>,
}

/// Everything the topology dump reports for one VRRP group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceState {
    pub state: VRRPState,
    #[serde(rename = "address-owner")]
    pub address_owner: bool,
    /// Seconds since epoch of the last state transition.
    #[serde(rename = "last-transition")]
    pub last_transition: u64,
    /// Virtual-MAC interface name; empty when the group is not running in
    /// RFC-compatibility mode.
    #[serde(rename = "rfc-interface")]
    pub rfc_interface: String,
    /// Sync group name, or empty.
    #[serde(rename = "sync-group")]
    pub sync_group: String,
    pub version: u8,
    #[serde(rename = "src-ip")]
    pub src_ip: String,
    #[serde(rename = "base-priority")]
    pub base_priority: u8,
    #[serde(rename = "effective-priority")]
    pub effective_priority: u8,
    /// Advertisement interval with its unit, e.g. `"2 sec"` (version 2) or
    /// `"2000 milli-sec"` (version 3).
    #[serde(rename = "advert-interval")]
    pub advert_interval: String,
    pub accept: bool,
    pub preempt: bool,
    #[serde(rename = "preempt-delay", default, skip_serializing_if = "Option::is_none")]
    pub preempt_delay: Option<String>,
    #[serde(rename = "start-delay", default, skip_serializing_if = "Option::is_none")]
    pub start_delay: Option<String>,
    #[serde(rename = "auth-type", default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    /// Only reported while this group is BACKUP.
    #[serde(rename = "master-router", default, skip_serializing_if = "Option::is_none")]
    pub master_router: Option<String>,
    #[serde(rename = "master-priority", default, skip_serializing_if = "Option::is_none")]
    pub master_priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackState>,
    #[serde(rename = "virtual-ips", default)]
    pub virtual_ips: Vec<String>,
}

impl Default for InstanceState {
    fn default() -> Self {
        InstanceState {
            state: VRRPState::Backup,
            address_owner: false,
            last_transition: 0,
            rfc_interface: String::new(),
            sync_group: String::new(),
            version: 2,
            src_ip: String::new(),
            base_priority: 0,
            effective_priority: 0,
            advert_interval: String::new(),
            accept: false,
            preempt: true,
            preempt_delay: None,
            start_delay: None,
            auth_type: None,
            master_router: None,
            master_priority: None,
            track: None,
            virtual_ips: Vec::new(),
        }
    }
}

/// States of the objects a group tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interface: Vec<TrackedObjectState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitor: Vec<MonitorState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<TrackedObjectState>,
}

impl TrackState {
    pub fn is_empty(&self) -> bool {
        self.interface.is_empty() && self.monitor.is_empty() && self.route.is_empty()
    }
}

/// One tracked interface or route as the dump reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedObjectState {
    pub name: String,
    /// Raw dump state token, e.g. `UP`, `DOWN` or `COMPLIANT`.
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<TrackWeight>,
}

/// One tracked path monitor and the states of its policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub name: String,
    #[serde(default)]
    pub policies: Vec<TrackedObjectState>,
}

/// A sync group as reported by the topology dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncGroupState {
    pub name: String,
    pub state: String,
    pub members: Vec<String>,
}
