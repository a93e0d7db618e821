//! Structural normalization of a raw configuration tree before translation.
//!
//! The bus delivers virtual sub-interfaces nested inside their parents; the
//! daemon treats every interface as flat, so vifs carrying VRRP groups are
//! promoted into a dedicated top-level `vif` bucket and renamed
//! `<parent>.<vif>`. Interfaces without any VRRP groups are dropped, as are
//! interface-type buckets left empty afterwards. Group contents are never
//! inspected or modified.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{ConfigTree, Interface, InterfaceType};

/// Reshape `tree` into the form the translators expect. Idempotent.
pub fn sanitize(tree: ConfigTree) -> ConfigTree {
    let mut interfaces: BTreeMap<InterfaceType, Vec<Interface>> = BTreeMap::new();
    let mut promoted: Vec<Interface> = Vec::new();

    for (intf_type, bucket) in tree.interfaces {
        let mut kept = Vec::new();
        for mut intf in bucket {
            for vif in std::mem::take(&mut intf.vif) {
                if !vif.has_groups() {
                    debug!(interface = %intf.name, vif = %vif.name, "dropping vif without VRRP groups");
                    continue;
                }
                let name = format!("{}.{}", intf.name, vif.name);
                promoted.push(Interface { name, ..vif });
            }
            if intf.has_groups() {
                kept.push(intf);
            } else {
                debug!(interface = %intf.name, "dropping interface without VRRP groups");
            }
        }
        if !kept.is_empty() {
            interfaces.insert(intf_type, kept);
        }
    }

    if !promoted.is_empty() {
        interfaces
            .entry(InterfaceType::Vif)
            .or_default()
            .extend(promoted);
    }

    ConfigTree { interfaces }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{VRRPConfig, VRRPGroup};
    use pretty_assertions::assert_eq;

    fn configured(name: &str) -> Interface {
        Interface {
            name: name.to_string(),
            vif: Vec::new(),
            vrrp: Some(VRRPConfig {
                start_delay: 0,
                groups: vec![VRRPGroup {
                    vrid: 1,
                    virtual_addresses: vec!["10.10.10.100/24".to_string()],
                    ..Default::default()
                }],
            }),
        }
    }

    fn unconfigured(name: &str) -> Interface {
        Interface {
            name: name.to_string(),
            vif: Vec::new(),
            vrrp: Some(VRRPConfig::default()),
        }
    }

    fn tree(intf_type: InterfaceType, interfaces: Vec<Interface>) -> ConfigTree {
        let mut tree = ConfigTree::default();
        tree.interfaces.insert(intf_type, interfaces);
        tree
    }

    #[test]
    fn test_keeps_configured_interface() {
        let input = tree(InterfaceType::Dataplane, vec![configured("dp0p1s1")]);
        assert_eq!(sanitize(input.clone()), input);
    }

    #[test]
    fn test_drops_unconfigured_interface_and_empty_bucket() {
        let input = tree(InterfaceType::Dataplane, vec![unconfigured("dp0p1s1")]);
        assert_eq!(sanitize(input), ConfigTree::default());
    }

    #[test]
    fn test_drops_unconfigured_but_keeps_sibling() {
        let input = tree(
            InterfaceType::Dataplane,
            vec![configured("dp0p1s1"), unconfigured("dp0p1s2")],
        );
        let expected = tree(InterfaceType::Dataplane, vec![configured("dp0p1s1")]);
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn test_removes_empty_vif_list() {
        let mut intf = configured("dp0p1s1");
        intf.vif = vec![unconfigured("10")];
        let input = tree(InterfaceType::Dataplane, vec![intf]);
        let expected = tree(InterfaceType::Dataplane, vec![configured("dp0p1s1")]);
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn test_promotes_dataplane_vif() {
        let mut intf = configured("dp0p1s1");
        intf.vif = vec![configured("10")];
        let input = tree(InterfaceType::Dataplane, vec![intf]);

        let result = sanitize(input);
        assert_eq!(
            result.interfaces[&InterfaceType::Dataplane],
            vec![configured("dp0p1s1")]
        );
        assert_eq!(
            result.interfaces[&InterfaceType::Vif],
            vec![configured("dp0p1s1.10")]
        );
    }

    #[test]
    fn test_promotes_vifs_from_two_interface_types() {
        let mut dataplane = configured("dp0p1s1");
        dataplane.vif = vec![configured("10")];
        let mut bonding = configured("bond0");
        bonding.vif = vec![configured("20")];

        let mut input = ConfigTree::default();
        input
            .interfaces
            .insert(InterfaceType::Dataplane, vec![dataplane]);
        input.interfaces.insert(InterfaceType::Bonding, vec![bonding]);

        let result = sanitize(input);
        assert_eq!(
            result.interfaces[&InterfaceType::Vif],
            vec![configured("dp0p1s1.10"), configured("bond0.20")]
        );
    }

    #[test]
    fn test_promotes_vif_of_unconfigured_parent() {
        let mut intf = unconfigured("dp0p1s1");
        intf.vif = vec![configured("10")];
        let input = tree(InterfaceType::Dataplane, vec![intf]);

        let result = sanitize(input);
        assert!(!result.interfaces.contains_key(&InterfaceType::Dataplane));
        assert_eq!(
            result.interfaces[&InterfaceType::Vif],
            vec![configured("dp0p1s1.10")]
        );
    }

    #[test]
    fn test_idempotent() {
        let mut intf = configured("dp0p1s1");
        intf.vif = vec![configured("10"), unconfigured("20")];
        let mut input = tree(InterfaceType::Dataplane, vec![intf, unconfigured("dp0p1s2")]);
        input
            .interfaces
            .insert(InterfaceType::Bonding, vec![unconfigured("bond0")]);

        let once = sanitize(input);
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }
}
