use std::{fmt::Display, net::Ipv4Addr};

use itertools::Itertools;
use log::{debug, trace};

use crate::nodesource::{AddressType, Node};

/// Which node addresses to publish
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct AddressPolicy {
    /// Fall back to internal addresses if no external address is available
    pub use_internal_ip: bool,
    /// Never publish external addresses
    pub skip_external_ip: bool,
}

/// A sorted, deduplicated set of IPv4 addresses.
///
/// Two sets compare equal iff they contain the same addresses, regardless of
/// the order in which the addresses were discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AddressSet(Vec<Ipv4Addr>);

impl AddressSet {
    pub fn new<I: IntoIterator<Item = Ipv4Addr>>(addresses: I) -> Self {
        AddressSet(addresses.into_iter().sorted().dedup().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, address: &Ipv4Addr) -> bool {
        self.0.binary_search(address).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.iter().join(","))
    }
}

// Collect the IPv4 addresses of a given type from all nodes
fn collect(nodes: &[&Node], kind: AddressType) -> Vec<Ipv4Addr> {
    nodes
        .iter()
        .flat_map(|n| {
            n.addresses_of(kind).filter_map(move |a| match a.parse::<Ipv4Addr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    debug!("Ignoring non-IPv4 address {} of node {}", a, n.name);
                    None
                }
            })
        })
        .collect()
}

/// Compute the addresses to publish for a snapshot of cluster nodes.
///
/// `nodes` are expected to be already narrowed down to the selected nodes by the [`NodeSource`](crate::nodesource::NodeSource).
/// Only ready nodes contribute. External addresses are used unless disabled by the policy.
/// Internal addresses are only used as a fallback if no external address was found,
/// they are never mixed with external ones.
pub fn select_addresses(nodes: &[Node], policy: &AddressPolicy) -> AddressSet {
    let eligible = nodes
        .iter()
        .filter(|n| {
            if !n.ready {
                trace!("Skipping node {}: not ready", n.name);
            }
            n.ready
        })
        .collect_vec();
    debug!(
        "{} of {} nodes are ready",
        eligible.len(),
        nodes.len()
    );

    let mut addresses = Vec::new();
    if !policy.skip_external_ip {
        addresses = collect(&eligible, AddressType::External);
    }
    if policy.use_internal_ip && addresses.is_empty() {
        debug!("No external addresses found, falling back to internal addresses");
        addresses = collect(&eligible, AddressType::Internal);
    }

    AddressSet::new(addresses)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::nodesource::NodeAddress;

    fn node(name: &str, ready: bool, external: &[&str], internal: &[&str]) -> Node {
        let addresses = external
            .iter()
            .map(|a| NodeAddress {
                kind: AddressType::External,
                address: a.to_string(),
            })
            .chain(internal.iter().map(|a| NodeAddress {
                kind: AddressType::Internal,
                address: a.to_string(),
            }))
            .collect();
        Node {
            name: name.to_string(),
            addresses,
            ready,
            labels: BTreeMap::new(),
        }
    }

    fn addrs(ips: &[&str]) -> AddressSet {
        AddressSet::new(ips.iter().map(|ip| ip.parse::<Ipv4Addr>().unwrap()))
    }

    fn external_only() -> AddressPolicy {
        AddressPolicy::default()
    }

    #[test]
    fn should_sort_and_deduplicate() {
        let nodes = vec![
            node("b", true, &["203.0.113.9", "203.0.113.10"], &[]),
            node("a", true, &["203.0.113.10"], &[]),
        ];
        let set = select_addresses(&nodes, &external_only());
        assert_eq!(
            set.iter().collect_vec(),
            vec![Ipv4Addr::new(203, 0, 113, 9), Ipv4Addr::new(203, 0, 113, 10)]
        );
    }

    #[test]
    fn should_not_depend_on_node_order() {
        let mut nodes = vec![
            node("a", true, &["203.0.113.1"], &[]),
            node("b", true, &["203.0.113.2"], &[]),
            node("c", true, &["203.0.113.3"], &[]),
        ];
        let first = select_addresses(&nodes, &external_only());
        nodes.reverse();
        let second = select_addresses(&nodes, &external_only());
        assert_eq!(first, second);
    }

    #[test]
    fn should_exclude_not_ready_nodes() {
        let nodes = vec![
            node("a", true, &["203.0.113.1"], &[]),
            node("b", false, &["203.0.113.2"], &[]),
        ];
        let set = select_addresses(&nodes, &external_only());
        assert_eq!(set, addrs(&["203.0.113.1"]));
    }

    #[test]
    fn all_not_ready_yields_empty_set() {
        let nodes = vec![
            node("a", false, &["203.0.113.1"], &["10.0.0.1"]),
            node("b", false, &["203.0.113.2"], &["10.0.0.2"]),
        ];
        let policy = AddressPolicy {
            use_internal_ip: true,
            skip_external_ip: false,
        };
        let set = select_addresses(&nodes, &policy);
        assert!(set.is_empty());
        assert_eq!(set, select_addresses(&[], &policy));
    }

    #[test]
    fn should_fall_back_to_internal_addresses() {
        let nodes = vec![node("a", true, &[], &["10.0.0.1"])];
        let with_fallback = AddressPolicy {
            use_internal_ip: true,
            skip_external_ip: false,
        };
        assert_eq!(
            select_addresses(&nodes, &with_fallback),
            addrs(&["10.0.0.1"])
        );
        assert!(select_addresses(&nodes, &external_only()).is_empty());
    }

    #[test]
    fn internal_addresses_are_never_added_to_external_ones() {
        let nodes = vec![
            node("a", true, &["203.0.113.1"], &["10.0.0.1"]),
            node("b", true, &[], &["10.0.0.2"]),
        ];
        let policy = AddressPolicy {
            use_internal_ip: true,
            skip_external_ip: false,
        };
        assert_eq!(
            select_addresses(&nodes, &policy),
            addrs(&["203.0.113.1"])
        );
    }

    #[test]
    fn should_skip_external_addresses() {
        let nodes = vec![node("a", true, &["203.0.113.1"], &["10.0.0.1"])];
        let skip_only = AddressPolicy {
            use_internal_ip: false,
            skip_external_ip: true,
        };
        assert!(select_addresses(&nodes, &skip_only).is_empty());

        let internal_only = AddressPolicy {
            use_internal_ip: true,
            skip_external_ip: true,
        };
        assert_eq!(
            select_addresses(&nodes, &internal_only),
            addrs(&["10.0.0.1"])
        );
    }

    #[test]
    fn should_ignore_non_ipv4_addresses() {
        let nodes = vec![node("a", true, &["2001:db8::1", "203.0.113.1", "bogus"], &[])];
        assert_eq!(
            select_addresses(&nodes, &external_only()),
            addrs(&["203.0.113.1"])
        );
    }

    #[test]
    fn should_look_up_addresses() {
        let set = addrs(&["10.0.0.2", "10.0.0.1", "10.0.0.2"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Ipv4Addr::new(10, 0, 0, 1)));
        assert!(!set.contains(&Ipv4Addr::new(10, 0, 0, 3)));
        assert_eq!(set.to_string(), "[10.0.0.1,10.0.0.2]");
    }
}
