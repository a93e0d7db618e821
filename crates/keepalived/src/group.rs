//! Rendering of one VRRP group into a daemon `vrrp_instance` block.

use std::fmt::Write;
use std::net::Ipv6Addr;

use crate::types::{Track, VRRPGroup};

/// Interface names on this platform cannot exceed 15 characters.
pub const VMAC_NAME_MAX: usize = 15;

pub(crate) const IPSEC_NOTIFY_HOOK: &str = "/opt/vyatta/sbin/vyatta-ipsec-notify.sh";
pub(crate) const BGP_NOTIFY_HOOK: &str = "/opt/vyatta/sbin/notify-bgp";

/// The daemon name for the group with `vrid` on `interface`.
pub fn instance_name(interface: &str, vrid: u8) -> String {
    format!("vyatta-{interface}-{vrid}")
}

/// Derive the virtual-MAC interface name for an RFC-compatibility group.
///
/// `index` is the per-translation-pass RFC interface counter; the first
/// group gets 1. The result can exceed [`VMAC_NAME_MAX`], callers decide
/// what to do about that.
pub fn vmac_name(interface: &str, index: u32) -> String {
    let prefix: String = interface.chars().take(3).collect();
    format!("{prefix}vrrp{index}")
}

/// Virtual addresses in emission order: IPv4 first, sorted lexicographically,
/// then IPv6 sorted by full-address numeric value. IPv6 string order would
/// put `fe80::10` before `fe80::2`, which the daemon rejects as a config
/// change on every reload.
fn ordered_vips(addresses: &[String]) -> Vec<&str> {
    let mut v4: Vec<&str> = Vec::new();
    let mut v6: Vec<&str> = Vec::new();
    for addr in addresses {
        if addr.contains(':') {
            v6.push(addr);
        } else {
            v4.push(addr);
        }
    }
    v4.sort_unstable();
    v6.sort_unstable_by_key(|cidr| ipv6_key(cidr));
    v4.extend(v6);
    v4
}

/// Numeric sort key for an IPv6 CIDR string. Unparseable addresses sort last.
fn ipv6_key(cidr: &str) -> u128 {
    let host = cidr.split('/').next().unwrap_or(cidr);
    host.parse::<Ipv6Addr>().map(u128::from).unwrap_or(u128::MAX)
}

/// Render one group as a `vrrp_instance` block, starting with a blank line.
///
/// `rfc_interface` is the already-derived virtual-MAC name; `None` both when
/// the group is not in RFC-compatibility mode and when the name was too long
/// and the caller suppressed it.
pub fn render_instance(
    interface: &str,
    start_delay: u32,
    group: &VRRPGroup,
    rfc_interface: Option<&str>,
) -> String {
    let mut out = String::new();
    let name = instance_name(interface, group.vrid);

    // Infallible: Write on String never errors.
    let _ = write!(
        out,
        "\nvrrp_instance {name} {{\n    state BACKUP\n    interface {interface}\n    \
         virtual_router_id {vrid}\n    version {version}\n    start_delay {start_delay}\n    \
         priority {priority}\n    advert_int {advert}\n    virtual_ipaddress {{",
        vrid = group.vrid,
        version = group.version,
        priority = group.effective_priority(),
        advert = group.advert_int(),
    );
    for vip in ordered_vips(&group.virtual_addresses) {
        let _ = write!(out, "\n        {vip}");
    }
    out.push_str("\n    }");

    if group.has_ipv6() {
        out.push_str("\n    native_ipv6");
    }
    if group.accept {
        out.push_str("\n    accept");
    }
    if !group.preempt {
        out.push_str("\n    nopreempt");
    }
    if let Some(vmac) = rfc_interface {
        let _ = write!(out, "\n    use_vmac {vmac}\n    vmac_xmit_base");
    }
    if let Some(delay) = group.preempt_delay {
        let _ = write!(out, "\n    preempt_delay {delay}");
    }
    if let Some(src) = &group.hello_source_address {
        let _ = write!(out, "\n    mcast_src_ip {src}");
    }
    if let Some(auth) = &group.authentication {
        let _ = write!(
            out,
            "\n    authentication {{\n        auth_type {}\n        auth_pass {}\n    }}",
            auth.auth_type.daemon_name(),
            auth.password,
        );
    }
    if let Some(track) = &group.track {
        if !track.is_empty() {
            render_track(&mut out, track);
        }
    }
    if let Some(notify) = &group.notify {
        if notify.ipsec || notify.bgp {
            out.push_str("\n    notify {");
            if notify.ipsec {
                let _ = write!(out, "\n        {IPSEC_NOTIFY_HOOK}");
            }
            if notify.bgp {
                let _ = write!(out, "\n        {BGP_NOTIFY_HOOK}");
            }
            out.push_str("\n    }");
        }
    }

    out.push_str("\n}");
    out
}

fn render_track(out: &mut String, track: &Track) {
    out.push_str("\n    track {");
    if !track.interface.is_empty() {
        out.push_str("\n        interface {");
        for intf in &track.interface {
            let _ = write!(out, "\n            {}", intf.name);
            if let Some(weight) = &intf.weight {
                let _ = write!(out, "   weight  {}", weight.signed());
            }
        }
        out.push_str("\n        }");
    }
    if let Some(pathmon) = &track.path_monitor {
        out.push_str("\n        pathmon {");
        for monitor in &pathmon.monitor {
            for policy in &monitor.policy {
                let _ = write!(out, "\n            monitor {}  policy {}", monitor.name, policy.name);
                if let Some(weight) = &policy.weight {
                    let _ = write!(out, "  weight  {:+}", weight.signed());
                }
            }
        }
        out.push_str("\n        }");
    }
    out.push_str("\n    }");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Authentication, AuthType, Monitor, Notify, PathMonitor, Policy, Track, TrackWeight,
        TrackedInterface, WeightDirection,
    };
    use pretty_assertions::assert_eq;

    fn minimal_group() -> VRRPGroup {
        VRRPGroup {
            vrid: 1,
            virtual_addresses: vec!["10.10.1.100/25".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name("dp0p1s1", 1), "vyatta-dp0p1s1-1");
        assert_eq!(instance_name("dp0p1s1.10", 42), "vyatta-dp0p1s1.10-42");
    }

    #[test]
    fn test_vmac_name() {
        assert_eq!(vmac_name("dp0p1s1", 1), "dp0vrrp1");
        assert_eq!(vmac_name("bond0", 3), "bonvrrp3");
        assert!(vmac_name("dp0p1s1", 1).len() <= VMAC_NAME_MAX);
    }

    #[test]
    fn test_ordered_vips_ipv4_lexicographic() {
        let vips = vec![
            "10.10.2.100/25".to_string(),
            "10.10.1.100/25".to_string(),
        ];
        assert_eq!(ordered_vips(&vips), vec!["10.10.1.100/25", "10.10.2.100/25"]);
    }

    #[test]
    fn test_ordered_vips_ipv6_numeric() {
        // String order would put ::10 before ::2.
        let vips = vec!["fe80::10/64".to_string(), "fe80::2/64".to_string()];
        assert_eq!(ordered_vips(&vips), vec!["fe80::2/64", "fe80::10/64"]);
    }

    #[test]
    fn test_ordered_vips_ipv4_before_ipv6() {
        let vips = vec!["2001:db8::1/64".to_string(), "10.0.0.1/24".to_string()];
        assert_eq!(ordered_vips(&vips), vec!["10.0.0.1/24", "2001:db8::1/64"]);
    }

    #[test]
    fn test_render_minimal_instance() {
        let block = render_instance("dp0p1s1", 0, &minimal_group(), None);
        let expected = "\n".to_string()
            + "vrrp_instance vyatta-dp0p1s1-1 {\n"
            + "    state BACKUP\n"
            + "    interface dp0p1s1\n"
            + "    virtual_router_id 1\n"
            + "    version 2\n"
            + "    start_delay 0\n"
            + "    priority 100\n"
            + "    advert_int 1\n"
            + "    virtual_ipaddress {\n"
            + "        10.10.1.100/25\n"
            + "    }\n"
            + "}";
        assert_eq!(block, expected);
    }

    #[test]
    fn test_render_v3_fast_advertise() {
        let group = VRRPGroup {
            version: 3,
            fast_advertise_interval: Some(2000),
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains("    version 3\n"));
        assert!(block.contains("    advert_int 2\n"));
    }

    #[test]
    fn test_render_v3_fractional_advertise() {
        let group = VRRPGroup {
            version: 3,
            fast_advertise_interval: Some(1500),
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains("    advert_int 1.5\n"));
    }

    #[test]
    fn test_render_ipv6_group() {
        let group = VRRPGroup {
            virtual_addresses: vec!["fe80::1/64".to_string()],
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains("\n    native_ipv6"));
    }

    #[test]
    fn test_render_accept_and_nopreempt() {
        let group = VRRPGroup {
            accept: true,
            preempt: false,
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains("\n    accept\n"));
        assert!(block.contains("\n    nopreempt\n"));

        let defaults = render_instance("dp0p1s1", 0, &minimal_group(), None);
        assert!(!defaults.contains("accept"));
        assert!(!defaults.contains("nopreempt"));
    }

    #[test]
    fn test_render_vmac_stanza() {
        let group = VRRPGroup { rfc_compatibility: true, ..minimal_group() };
        let block = render_instance("dp0p1s1", 0, &group, Some("dp0vrrp1"));
        assert!(block.contains("\n    use_vmac dp0vrrp1\n    vmac_xmit_base\n"));

        let suppressed = render_instance("dp0p1s1", 0, &group, None);
        assert!(!suppressed.contains("use_vmac"));
    }

    #[test]
    fn test_render_authentication() {
        let group = VRRPGroup {
            authentication: Some(Authentication {
                auth_type: AuthType::PlaintextPassword,
                password: "help".to_string(),
            }),
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains(
            "\n    authentication {\n        auth_type PASS\n        auth_pass help\n    }"
        ));
    }

    #[test]
    fn test_render_track_block() {
        let group = VRRPGroup {
            track: Some(Track {
                interface: vec![
                    TrackedInterface { name: "dp0p1s2".to_string(), weight: None },
                    TrackedInterface {
                        name: "dp0s2".to_string(),
                        weight: Some(TrackWeight {
                            direction: WeightDirection::Decrement,
                            value: 10,
                        }),
                    },
                ],
                path_monitor: Some(PathMonitor {
                    monitor: vec![Monitor {
                        name: "test_monitor".to_string(),
                        policy: vec![Policy {
                            name: "test_policy".to_string(),
                            weight: Some(TrackWeight {
                                direction: WeightDirection::Increment,
                                value: 10,
                            }),
                        }],
                    }],
                }),
                route: Vec::new(),
            }),
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        assert!(block.contains("\n    track {\n"));
        assert!(block.contains("\n            dp0p1s2\n"));
        assert!(block.contains("\n            dp0s2   weight  -10\n"));
        assert!(block.contains("monitor test_monitor  policy test_policy  weight  +10"));
    }

    #[test]
    fn test_render_notify_hooks() {
        let group = VRRPGroup {
            notify: Some(Notify { bgp: true, ipsec: true }),
            ..minimal_group()
        };
        let block = render_instance("dp0p1s1", 0, &group, None);
        let notify_pos = block.find("    notify {").unwrap();
        let ipsec_pos = block.find(IPSEC_NOTIFY_HOOK).unwrap();
        let bgp_pos = block.find(BGP_NOTIFY_HOOK).unwrap();
        assert!(notify_pos < ipsec_pos && ipsec_pos < bgp_pos);
    }
}
