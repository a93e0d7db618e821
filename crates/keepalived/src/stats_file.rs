//! Parsing of the daemon's statistics dump into per-group counters.
//!
//! The stats format is the most regular of the dump formats: each section
//! header is followed by a fixed number of counter lines, so the parser
//! dispatches on casefolded headers and consumes exactly that many lines.

use common::{Error, Result};
use tracing::debug;

use crate::scan::{block_starts, split_blocks};
use crate::state::StateTree;
use crate::stats::InstanceStats;
use crate::types::InterfaceType;

/// Parse a statistics dump (`keepalived.stats`) into a state tree whose
/// groups carry counters but no instance state.
pub fn parse_stats_file(text: &str) -> Result<StateTree> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tree = StateTree::default();

    let starts = block_starts(&lines, "VRRP Instance");
    for block in split_blocks(&lines, &starts) {
        parse_instance(&block, &mut tree)?;
    }
    Ok(tree)
}

fn parse_instance(block: &[&str], tree: &mut StateTree) -> Result<()> {
    let instance = block
        .first()
        .and_then(|line| line.split_whitespace().last())
        .ok_or_else(|| Error::parse("empty instance block in statistics dump".to_string()))?;
    let (head, vrid_str) = instance
        .rsplit_once('-')
        .ok_or_else(|| Error::parse(format!("malformed instance name {instance:?}")))?;
    let interface = head.strip_prefix("vyatta-").unwrap_or(head).to_string();
    let vrid: u8 = vrid_str
        .parse()
        .map_err(|_| Error::parse(format!("malformed vrid in instance name {instance:?}")))?;

    let mut stats = InstanceStats::default();
    let mut idx = 0;
    while idx < block.len() {
        let line = block[idx].to_lowercase();
        // "priority zero" must be checked before "advertisements": a header
        // naming both would otherwise be misfiled as the advertisement pair.
        if line.contains("priority zero") {
            stats.priority_zero.received = counter_line(block, &mut idx, instance)?;
            stats.priority_zero.sent = counter_line(block, &mut idx, instance)?;
        } else if line.contains("advertisements") {
            stats.advertisements.received = counter_line(block, &mut idx, instance)?;
            stats.advertisements.sent = counter_line(block, &mut idx, instance)?;
        } else if line.contains("became master") {
            stats.became_master = last_token_counter(block[idx], instance)?;
        } else if line.contains("released master") {
            stats.released_master = last_token_counter(block[idx], instance)?;
        } else if line.contains("packet errors") {
            stats.packet_errors.length = counter_line(block, &mut idx, instance)?;
            stats.packet_errors.ttl = counter_line(block, &mut idx, instance)?;
            stats.packet_errors.invalid_type = counter_line(block, &mut idx, instance)?;
            stats.packet_errors.advertisement_interval = counter_line(block, &mut idx, instance)?;
            stats.packet_errors.address_list = counter_line(block, &mut idx, instance)?;
        } else if line.contains("authentication errors") {
            stats.authentication_errors.invalid_type = counter_line(block, &mut idx, instance)?;
            stats.authentication_errors.type_mismatch = counter_line(block, &mut idx, instance)?;
            stats.authentication_errors.failure = counter_line(block, &mut idx, instance)?;
        }
        idx += 1;
    }

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
    tree.group_entry(intf_type, parent, vif, vrid).stats = Some(stats);
    Ok(())
}

/// Advance to the next line and read its trailing counter value.
fn counter_line(block: &[&str], idx: &mut usize, instance: &str) -> Result<u64> {
    *idx += 1;
    let line = block
        .get(*idx)
        .ok_or_else(|| Error::parse(format!("{instance}: truncated statistics block")))?;
    last_token_counter(line, instance)
}

fn last_token_counter(line: &str, instance: &str) -> Result<u64> {
    let token = line.split_whitespace().last().unwrap_or_default();
    token
        .parse()
        .map_err(|_| Error::parse(format!("{instance}: expected a counter, got {token:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATS: &str = "\
VRRP Instance: vyatta-dp0p1s1-1
  Advertisements:
    Received: 0
    Sent: 615
  Became master: 1
  Released master: 0
  Packet Errors:
    Length: 0
    TTL: 0
    Invalid Type: 0
    Advertisement Interval: 0
    Address List: 0
  Authentication Errors:
    Invalid Type: 0
    Type Mismatch: 0
    Failure: 0
  Priority Zero:
    Received: 0
    Sent: 2
";

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_stats_file("").unwrap(), StateTree::default());
    }

    #[test]
    fn test_parse_counters() {
        let tree = parse_stats_file(STATS).unwrap();
        let dataplane = &tree.interfaces[&InterfaceType::Dataplane];
        assert_eq!(dataplane[0].name, "dp0p1s1");
        let group = &dataplane[0].groups[0];
        assert_eq!(group.vrid, 1);
        assert_eq!(group.instance_state, None);

        let stats = group.stats.as_ref().unwrap();
        assert_eq!(stats.advertisements.received, 0);
        assert_eq!(stats.advertisements.sent, 615);
        assert_eq!(stats.became_master, 1);
        assert_eq!(stats.released_master, 0);
        assert_eq!(stats.packet_errors.length, 0);
        assert_eq!(stats.authentication_errors.failure, 0);
        assert_eq!(stats.priority_zero.received, 0);
        assert_eq!(stats.priority_zero.sent, 2);
    }

    #[test]
    fn test_parse_two_instances() {
        let text = format!("{STATS}VRRP Instance: vyatta-dp0p1s1.10-5\n  Became master: 3\n");
        let tree = parse_stats_file(&text).unwrap();
        let dataplane = &tree.interfaces[&InterfaceType::Dataplane];
        assert_eq!(dataplane.len(), 1);
        assert_eq!(dataplane[0].groups.len(), 1);
        let vif = &dataplane[0].vif[0];
        assert_eq!(vif.name, "10");
        assert_eq!(vif.groups[0].vrid, 5);
        assert_eq!(vif.groups[0].stats.as_ref().unwrap().became_master, 3);
    }

    #[test]
    fn test_truncated_block_is_error() {
        let text = "\
VRRP Instance: vyatta-dp0p1s1-1
  Advertisements:
    Received: 0
";
        let err = parse_stats_file(text).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
