//! keepalived.conf generation and parsing.
//!
//! The write direction is a straight walk of the sanitized configuration
//! tree: sync-group blocks first, then one `vrrp_instance` block per group.
//! The read direction reverses it, re-nesting vif instances under their
//! physical parents and re-attaching sync-group membership by instance name.

use std::str::FromStr;

use common::{Error, Result};
use tracing::{debug, warn};

use crate::group::{self, BGP_NOTIFY_HOOK, IPSEC_NOTIFY_HOOK, VMAC_NAME_MAX};
use crate::scan::{FieldValue, block_starts, find_keyword, find_line, split_blocks};
use crate::sync::SyncGroupMap;
use crate::types::{
    Authentication, AuthType, ConfigTree, InterfaceType, Monitor, Notify, PathMonitor, Policy,
    Track, TrackWeight, TrackedInterface, TrackedRoute, VRRPGroup, DEFAULT_ADVERT_SECS,
    DEFAULT_FAST_ADVERT_MS, DEFAULT_PRIORITY,
};

/// Static head of every generated file. The daemon reads its runtime
/// switches from here; nothing below global_defs depends on it.
const CONFIG_PREAMBLE: &str = "\n\
#\n\
# Autogenerated by /opt/vyatta/sbin/vyatta-vrrp\n\
#\n\
\n\
\n\
global_defs {\n\
        enable_traps\n\
        enable_dbus\n\
        snmp_socket tcp:localhost:705:1\n\
        enable_snmp_keepalived\n\
        enable_snmp_rfc\n\
}";

/// Render a sanitized configuration tree as daemon configuration text.
///
/// Disabled groups are left out. An interface still carrying nested vif
/// children means sanitization never ran; that is a structural error and no
/// output is produced.
pub fn render_config(tree: &ConfigTree) -> Result<String> {
    let mut sync_groups = SyncGroupMap::new();
    let mut instances: Vec<String> = Vec::new();
    let mut rfc_count: u32 = 0;

    for interfaces in tree.interfaces.values() {
        for intf in interfaces {
            if !intf.vif.is_empty() {
                return Err(Error::structural(format!(
                    "interface {} still carries nested vif interfaces",
                    intf.name
                )));
            }
            let Some(vrrp) = &intf.vrrp else { continue };
            for group in &vrrp.groups {
                if group.disable {
                    debug!(interface = %intf.name, vrid = group.vrid, "skipping disabled group");
                    continue;
                }
                let vmac = if group.rfc_compatibility {
                    rfc_count += 1;
                    let name = group::vmac_name(&intf.name, rfc_count);
                    if name.len() > VMAC_NAME_MAX {
                        warn!(
                            interface = %intf.name,
                            vrid = group.vrid,
                            vmac = %name,
                            "virtual MAC interface name exceeds 15 characters, omitting"
                        );
                        None
                    } else {
                        Some(name)
                    }
                } else {
                    None
                };
                if let Some(sync) = &group.sync_group {
                    sync_groups.insert(sync, group::instance_name(&intf.name, group.vrid));
                }
                instances.push(group::render_instance(
                    &intf.name,
                    vrrp.start_delay,
                    group,
                    vmac.as_deref(),
                ));
            }
        }
    }

    let mut out = String::from(CONFIG_PREAMBLE);
    for sync in sync_groups.iter() {
        out.push_str(&format!("\nvrrp_sync_group {} {{\n    group {{", sync.name));
        for member in &sync.members {
            out.push_str(&format!("\n        {member}"));
        }
        out.push_str("\n    }\n}\n");
    }
    for block in instances {
        out.push_str(&block);
    }
    Ok(out)
}

/// Parse daemon configuration text back into a configuration tree.
///
/// Text with no `vrrp_instance` blocks parses to an empty tree. A vif
/// instance (`interface dp0p1s1.10`) is re-nested as a vif child of its
/// physical parent.
pub fn parse_config(text: &str) -> Result<ConfigTree> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut tree = ConfigTree::default();

    let instance_starts = block_starts(&lines, "vrrp_instance");
    if instance_starts.is_empty() {
        return Ok(tree);
    }

    // Sync groups only ever appear above the first instance block.
    let head = &lines[..instance_starts[0]];
    let sync_groups = parse_sync_groups(head)?;

    for block in split_blocks(&lines, &instance_starts) {
        parse_instance(&block, &sync_groups, &mut tree)?;
    }
    Ok(tree)
}

fn parse_sync_groups(head: &[&str]) -> Result<SyncGroupMap> {
    let mut sync_groups = SyncGroupMap::new();
    let starts = block_starts(head, "vrrp_sync_group");
    for block in split_blocks(head, &starts) {
        let Some(FieldValue::Scalar(value)) = find_keyword(&block, "vrrp_sync_group") else {
            continue;
        };
        let Some(name) = value.split_whitespace().next() else {
            continue;
        };
        let Some(start) = find_line(&block, "group {", 0) else {
            continue;
        };
        let end = find_line(&block, "}", start)
            .ok_or_else(|| Error::parse(format!("sync group {name}: unterminated group block")))?;
        for member in &block[start + 1..end] {
            sync_groups.insert(name, (*member).to_string());
        }
    }
    Ok(sync_groups)
}

fn parse_instance(
    block: &[&str],
    sync_groups: &SyncGroupMap,
    tree: &mut ConfigTree,
) -> Result<()> {
    let interface = scalar_field(block, "interface")?;
    let vrid: u8 = numeric_field(block, "virtual_router_id")?;
    let version: u8 = numeric_field(block, "version")?;
    let start_delay: u32 = numeric_field(block, "start_delay")?;
    let instance = group::instance_name(&interface, vrid);

    let mut group = VRRPGroup {
        vrid,
        version,
        ..Default::default()
    };
    group.accept = find_keyword(block, "accept").is_some();
    group.preempt = find_keyword(block, "nopreempt").is_none();
    group.rfc_compatibility = find_keyword(block, "vmac_xmit_base").is_some();
    group.sync_group = sync_groups.membership(&instance).map(str::to_string);
    group.hello_source_address = opt_scalar(block, "mcast_src_ip");
    group.preempt_delay = opt_numeric(block, "preempt_delay")?;
    group.priority = opt_numeric::<u8>(block, "priority")?.filter(|&p| p != DEFAULT_PRIORITY);

    // The daemon default stays implicit in the tree representation. Version 3
    // intervals may be fractional seconds (advert_int 1.5 is 1500 ms).
    if let Some(advert) = opt_scalar(block, "advert_int") {
        if version == 3 {
            let secs: f64 = advert.parse().map_err(|_| {
                Error::parse(format!("advert_int: expected a number, got {advert:?}"))
            })?;
            let millis = (secs * 1000.0).round() as u32;
            if millis != DEFAULT_FAST_ADVERT_MS {
                group.fast_advertise_interval = Some(millis);
            }
        } else {
            let secs: u32 = advert.parse().map_err(|_| {
                Error::parse(format!("advert_int: expected a number, got {advert:?}"))
            })?;
            if secs != DEFAULT_ADVERT_SECS {
                group.advertise_interval = Some(secs);
            }
        }
    }

    let vips_start = find_line(block, "virtual_ipaddress {", 0)
        .ok_or_else(|| Error::parse(format!("{instance}: missing virtual_ipaddress block")))?;
    let vips_end = find_line(block, "}", vips_start)
        .ok_or_else(|| Error::parse(format!("{instance}: unterminated virtual_ipaddress block")))?;
    group.virtual_addresses = block[vips_start + 1..vips_end]
        .iter()
        .map(|line| (*line).to_string())
        .collect();

    if version == 2 {
        group.authentication = parse_authentication(block);
    }
    group.track = parse_track(block, &instance)?;
    group.notify = parse_notify(block);

    let (parent, vif) = match interface.split_once('.') {
        Some((parent, vif)) => (parent, Some(vif)),
        None => (interface.as_str(), None),
    };
    let intf_type = match InterfaceType::from_name(parent) {
        Some(intf_type) => intf_type,
        None => {
            debug!(interface = %parent, "unrecognized interface name pattern, assuming dataplane");
            InterfaceType::Dataplane
        }
    };

    let vrrp = tree.vrrp_entry(intf_type, parent, vif);
    // Groups on one interface share a delay; keep the largest seen.
    if start_delay > vrrp.start_delay {
        vrrp.start_delay = start_delay;
    }
    vrrp.groups.push(group);
    Ok(())
}

fn parse_authentication(block: &[&str]) -> Option<Authentication> {
    find_line(block, "authentication {", 0)?;
    let auth_type = opt_scalar(block, "auth_type")?;
    let password = opt_scalar(block, "auth_pass")?;
    Some(Authentication {
        auth_type: AuthType::from_daemon(&auth_type),
        password,
    })
}

fn parse_track(block: &[&str], instance: &str) -> Result<Option<Track>> {
    let Some(track_start) = find_line(block, "track {", 0) else {
        return Ok(None);
    };
    let mut track = Track::default();

    if let Some(start) = find_line(block, "interface {", track_start) {
        let end = end_of_sub_block(block, start, instance, "track interface")?;
        for line in &block[start + 1..end] {
            let (name, weight) = split_weight(line)?;
            track.interface.push(TrackedInterface { name, weight });
        }
    }

    if let Some(start) = find_line(block, "pathmon {", track_start) {
        let end = end_of_sub_block(block, start, instance, "track pathmon")?;
        let mut pathmon = PathMonitor::default();
        for line in &block[start + 1..end] {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (Some(monitor_name), Some(policy_name)) = (tokens.get(1), tokens.get(3)) else {
                return Err(Error::parse(format!(
                    "{instance}: malformed pathmon line {line:?}"
                )));
            };
            let weight = if line.contains("weight") {
                let (_, weight) = split_weight(line)?;
                weight
            } else {
                None
            };
            let policy = Policy {
                name: (*policy_name).to_string(),
                weight,
            };
            match pathmon.monitor.iter_mut().find(|m| m.name == *monitor_name) {
                Some(monitor) => monitor.policy.push(policy),
                None => pathmon.monitor.push(Monitor {
                    name: (*monitor_name).to_string(),
                    policy: vec![policy],
                }),
            }
        }
        track.path_monitor = Some(pathmon);
    }

    if let Some(start) = find_line(block, "route_to {", track_start) {
        let end = end_of_sub_block(block, start, instance, "track route_to")?;
        for line in &block[start + 1..end] {
            let (route, weight) = split_weight(line)?;
            track.route.push(TrackedRoute { route, weight });
        }
    }

    Ok((!track.is_empty()).then_some(track))
}

fn parse_notify(block: &[&str]) -> Option<Notify> {
    let start = find_line(block, "notify {", 0)?;
    let end = find_line(block, "}", start)?;
    let mut notify = Notify::default();
    for line in &block[start + 1..end] {
        if *line == IPSEC_NOTIFY_HOOK {
            notify.ipsec = true;
        } else if *line == BGP_NOTIFY_HOOK {
            notify.bgp = true;
        }
    }
    (notify.ipsec || notify.bgp).then_some(notify)
}

fn end_of_sub_block(block: &[&str], start: usize, instance: &str, what: &str) -> Result<usize> {
    find_line(block, "}", start)
        .ok_or_else(|| Error::parse(format!("{instance}: unterminated {what} block")))
}

/// Split a tracked-object line into its name and optional trailing weight.
fn split_weight(line: &str) -> Result<(String, Option<TrackWeight>)> {
    if !line.contains("weight") {
        return Ok((line.to_string(), None));
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let raw = tokens.last().copied().unwrap_or_default();
    let signed: i32 = raw
        .parse()
        .map_err(|_| Error::parse(format!("invalid track weight {raw:?}")))?;
    let weight = TrackWeight::from_signed(signed)
        .ok_or_else(|| Error::parse(format!("track weight {signed} out of range")))?;
    let name = tokens.first().copied().unwrap_or_default().to_string();
    Ok((name, Some(weight)))
}

fn opt_scalar(block: &[&str], keyword: &str) -> Option<String> {
    match find_keyword(block, keyword) {
        Some(FieldValue::Scalar(value)) => Some(value),
        _ => None,
    }
}

fn scalar_field(block: &[&str], keyword: &str) -> Result<String> {
    opt_scalar(block, keyword)
        .ok_or_else(|| Error::parse(format!("instance block is missing the {keyword} field")))
}

fn opt_numeric<T: FromStr>(block: &[&str], keyword: &str) -> Result<Option<T>> {
    match opt_scalar(block, keyword) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::parse(format!("{keyword}: expected a number, got {value:?}"))),
    }
}

fn numeric_field<T: FromStr>(block: &[&str], keyword: &str) -> Result<T> {
    opt_numeric(block, keyword)?
        .ok_or_else(|| Error::parse(format!("instance block is missing the {keyword} field")))
}
