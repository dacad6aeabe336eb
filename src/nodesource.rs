//! Sources of cluster nodes whose addresses end up in A records.
//! Each source implements the [`NodeSource`] trait.
//!
//! The following sources are currently available:
//! - [`KubeNodeSource`]: Reads nodes from a Kubernetes reflector cache kept up to date by [`watch_nodes()`]
//!
//! Label selection is done by the source, so a source only ever returns the selected nodes.

mod kubernetes;

pub use kubernetes::{check_selector, watch_nodes, watcher_config, KubeNodeSource};

#[cfg(test)]
use mockall::automock;

use std::{collections::BTreeMap, fmt::Display};

/// A `NodeSource` can be used to retrieve the current set of cluster nodes
#[cfg_attr(test, automock)]
pub trait NodeSource {
    fn nodes(&self) -> Result<Vec<Node>, SourceError>;
}

/// Which network a node address belongs to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressType {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    pub kind: AddressType,
    pub address: String,
}

/// A cluster node, reduced to the properties relevant for publishing its addresses
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    pub name: String,
    pub addresses: Vec<NodeAddress>,
    pub ready: bool,
    pub labels: BTreeMap<String, String>,
}

impl Node {
    /// Iterate over all addresses of the given type
    pub fn addresses_of(&self, kind: AddressType) -> impl Iterator<Item = &str> {
        self.addresses
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceError {
    msg: String,
}
impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}
impl std::error::Error for SourceError {}
impl From<String> for SourceError {
    fn from(s: String) -> Self {
        SourceError { msg: s }
    }
}
impl From<&str> for SourceError {
    fn from(s: &str) -> Self {
        SourceError { msg: s.to_owned() }
    }
}
