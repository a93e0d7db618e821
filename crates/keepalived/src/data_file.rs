//! Parsing of the daemon's topology dump into the typed state tree.
//!
//! The dump is the loosest of the three text formats: field presence varies
//! by VRRP version and mastership, and the tracked-object sub-blocks have
//! irregular lengths (a weight line only for some objects, a different
//! terminator per object kind). Sync-group sections list their members on
//! lines that also contain the instance sentinel, so the instance scan is
//! restricted to the region before the first sync-group line.

use common::{Error, Result};
use tracing::debug;

use crate::scan::{FieldValue, block_starts, find_field, split_blocks};
use crate::state::{
    InstanceState, MonitorState, StateTree, SyncGroupState, TrackState, TrackedObjectState,
    VRRPState,
};
use crate::types::{InterfaceType, TrackWeight};

const NIC_SENTINEL: &str = "------< NIC >------";

/// Parse a topology dump (`keepalived.data`) into a state tree.
pub fn parse_data_file(text: &str) -> Result<StateTree> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tree = StateTree::default();

    let sync_start = block_starts(&lines, "VRRP Sync Group").first().copied();
    let instance_region = &lines[..sync_start.unwrap_or(lines.len())];

    let mut sync_groups: Vec<SyncGroupState> = Vec::new();
    if let Some(start) = sync_start {
        let tail = &lines[start..];
        let starts = block_starts(tail, "VRRP Sync Group");
        for block in split_blocks(tail, &starts) {
            if let Some(sync) = parse_sync_group(&block) {
                sync_groups.push(sync);
            }
        }
    }

    let instance_starts = block_starts(instance_region, "VRRP Instance");
    for block in split_blocks(instance_region, &instance_starts) {
        parse_instance(&block, &sync_groups, &mut tree)?;
    }

    tree.sync_groups = sync_groups;
    Ok(tree)
}

/// One sync-group section: `VRRP Sync Group = <name>, <state>` followed by
/// one member instance per line.
fn parse_sync_group(block: &[&str]) -> Option<SyncGroupState> {
    let value = match find_field(block, "VRRP Sync Group")? {
        FieldValue::Scalar(value) => value,
        FieldValue::Present => return None,
    };
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let name = tokens.get(1)?.trim_end_matches(',').to_string();
    let state = tokens.last()?.to_string();

    let mut members = Vec::new();
    for line in &block[1..] {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(member) = line.split_whitespace().last() {
            members.push(member.to_string());
        }
    }
    Some(SyncGroupState { name, state, members })
}

fn parse_instance(
    block: &[&str],
    sync_groups: &[SyncGroupState],
    tree: &mut StateTree,
) -> Result<()> {
    let instance = block
        .first()
        .and_then(|line| line.split_whitespace().last())
        .ok_or_else(|| Error::parse("empty instance block in topology dump".to_string()))?;
    let (head, vrid_str) = instance
        .rsplit_once('-')
        .ok_or_else(|| Error::parse(format!("malformed instance name {instance:?}")))?;
    let interface = head.strip_prefix("vyatta-").unwrap_or(head).to_string();
    let vrid: u8 = vrid_str
        .parse()
        .map_err(|_| Error::parse(format!("malformed vrid in instance name {instance:?}")))?;

    let version = dump_number(block, "VRRP Version")?.unwrap_or(2);
    // Transmitting on the physical device means no virtual MAC.
    let rfc_interface = dump_value(block, "Transmitting device")
        .filter(|device| *device != interface)
        .unwrap_or_default();
    let state = InstanceState {
        state: dump_value(block, "State")
            .map(|token| VRRPState::from_dump(&token))
            .unwrap_or_default(),
        address_owner: dump_flag(block, "Address owner").unwrap_or(false),
        last_transition: dump_number(block, "Last transition")?.unwrap_or(0),
        rfc_interface,
        sync_group: sync_groups
            .iter()
            .find(|sync| sync.members.iter().any(|m| m == instance))
            .map(|sync| sync.name.clone())
            .unwrap_or_default(),
        version,
        src_ip: dump_value(block, "Using src_ip").unwrap_or_default(),
        base_priority: dump_number(block, "Base priority")?.unwrap_or(0),
        effective_priority: dump_number(block, "Effective priority")?.unwrap_or(0),
        advert_interval: dump_value(block, "Advert interval")
            .map(|interval| {
                if version == 2 {
                    format!("{interval} sec")
                } else {
                    format!("{interval} milli-sec")
                }
            })
            .unwrap_or_default(),
        accept: dump_flag(block, "Accept").unwrap_or(false),
        preempt: dump_flag(block, "Preempt").unwrap_or(true),
        preempt_delay: dump_value(block, "Preempt delay").map(|v| format!("{v} secs")),
        start_delay: dump_value(block, "Start delay").map(|v| format!("{v} secs")),
        auth_type: dump_value(block, "Authentication type").filter(|v| v != "none"),
        master_router: dump_value(block, "Master router"),
        master_priority: dump_number(block, "Master priority")?,
        track: parse_tracking(block)?,
        virtual_ips: parse_virtual_ips(block)?,
    };

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
    tree.group_entry(intf_type, parent, vif, vrid).instance_state = Some(state);
    Ok(())
}

fn parse_tracking(block: &[&str]) -> Result<Option<TrackState>> {
    let mut track = TrackState::default();

    if find_field(block, "Tracked interfaces =").is_some() {
        let starts = block_starts(block, NIC_SENTINEL);
        if let Some(&last) = starts.last() {
            let end = end_of_tracking(block, last, true)?;
            for (idx, &start) in starts.iter().enumerate() {
                let stop = starts.get(idx + 1).copied().unwrap_or(end);
                track.interface.push(tracked_object(&block[start + 1..stop]));
            }
        }
    }

    if find_field(block, "Tracked path-monitors =").is_some() {
        let starts = block_starts(block, "Monitor");
        if let Some(&last) = starts.last() {
            let end = end_of_tracking(block, last, false)?;
            for (idx, &start) in starts.iter().enumerate() {
                let name = block[start].split_whitespace().last().unwrap_or_default();
                let stop = starts.get(idx + 1).copied().unwrap_or(end);
                let policy = tracked_object(&block[start + 1..stop]);
                match track.monitor.iter_mut().find(|m| m.name == name) {
                    Some(monitor) => monitor.policies.push(policy),
                    None => track.monitor.push(MonitorState {
                        name: name.to_string(),
                        policies: vec![policy],
                    }),
                }
            }
        }
    }

    if find_field(block, "Tracked routes =").is_some() {
        let starts = block_starts(block, "Network");
        if let Some(&last) = starts.last() {
            let end = end_of_tracking(block, last, false)?;
            for (idx, &start) in starts.iter().enumerate() {
                let stop = starts.get(idx + 1).copied().unwrap_or(end);
                // The Network line itself carries the route address.
                track.route.push(tracked_object(&block[start..stop]));
            }
        }
    }

    Ok((!track.is_empty()).then_some(track))
}

/// Walk forward from the start of the last tracked object of a kind to find
/// where that kind's section ends. Tracked interfaces end after an "Enabling"
/// line; path-monitor and route objects end after their "Status" line, or one
/// later when a "Weight" line follows.
fn end_of_tracking(block: &[&str], last_start: usize, interface_block: bool) -> Result<usize> {
    let mut idx = last_start + 1;
    while idx < block.len() {
        let line = block[idx];
        if interface_block {
            if line.contains("Enabling") {
                return Ok(idx + 1);
            }
        } else if line.contains("Status") {
            if block.get(idx + 1).is_some_and(|next| next.contains("Weight")) {
                return Ok(idx + 2);
            }
            return Ok(idx + 1);
        }
        idx += 1;
    }
    Err(Error::parse(
        "unterminated tracked-object block in topology dump".to_string(),
    ))
}

/// Fold one tracked object's lines into name, state and optional weight. A
/// route's Prefix line is appended to the Network address to form a CIDR.
fn tracked_object(lines: &[&str]) -> TrackedObjectState {
    let mut obj = TrackedObjectState::default();
    for line in lines {
        let Some(value) = line.split_whitespace().last() else {
            continue;
        };
        if line.contains("Name") || line.contains("Policy") || line.contains("Network") {
            obj.name = value.to_string();
        } else if line.contains("is UP") || line.contains("is DOWN") || line.contains("Status") {
            obj.state = value.to_string();
        } else if line.contains("weight") || line.contains("Weight") {
            obj.weight = value.parse::<i32>().ok().and_then(TrackWeight::from_signed);
        } else if line.contains("Prefix") && !obj.name.is_empty() {
            obj.name = format!("{}/{}", obj.name, value);
        }
    }
    obj
}

fn parse_virtual_ips(block: &[&str]) -> Result<Vec<String>> {
    let count = match find_field(block, "Virtual IP =") {
        Some(FieldValue::Scalar(value)) => value
            .parse::<usize>()
            .map_err(|_| Error::parse(format!("Virtual IP count: expected a number, got {value:?}")))?,
        _ => return Ok(Vec::new()),
    };
    let Some(&start) = block_starts(block, "Virtual IP").first() else {
        return Ok(Vec::new());
    };
    let end = (start + 1 + count).min(block.len());
    let mut vips = Vec::new();
    for line in &block[start + 1..end] {
        if let Some(address) = line.split_whitespace().next() {
            vips.push(address.to_string());
        }
    }
    Ok(vips)
}

/// Second token after a `<sentinel> = <value> ...` line, the value itself.
fn dump_value(block: &[&str], sentinel: &str) -> Option<String> {
    match find_field(block, sentinel)? {
        FieldValue::Scalar(rest) => rest.split_whitespace().nth(1).map(str::to_string),
        FieldValue::Present => None,
    }
}

fn dump_number<T: std::str::FromStr>(block: &[&str], sentinel: &str) -> Result<Option<T>> {
    match dump_value(block, sentinel) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| Error::parse(format!("{sentinel}: expected a number, got {value:?}"))),
    }
}

fn dump_flag(block: &[&str], sentinel: &str) -> Option<bool> {
    match dump_value(block, sentinel)?.as_str() {
        "yes" | "enabled" => Some(true),
        "no" | "disabled" => Some(false),
        _ => None,
    }
}
