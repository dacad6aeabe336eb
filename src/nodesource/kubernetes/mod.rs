use futures::{pin_mut, StreamExt};
use k8s_openapi::api::core::v1 as core_v1;
use kube::{
    runtime::{
        reflector::{self, store::Writer, Store},
        watcher, WatchStreamExt,
    },
    api::ListParams,
    Api, ResourceExt,
};
use log::{debug, trace, warn};

use super::{AddressType, Node, NodeAddress, NodeSource, SourceError};
use crate::trigger::Trigger;

const NODE_READY: &str = "Ready";
const CONDITION_TRUE: &str = "True";
const NODE_EXTERNAL_IP: &str = "ExternalIP";
const NODE_INTERNAL_IP: &str = "InternalIP";

/// A [`NodeSource`] reading from the in-memory node cache maintained by [`watch_nodes()`].
///
/// Listing nodes never talks to the API server, so it is cheap enough to call on every trigger.
/// The cache only holds the nodes matched by the selector passed to [`watcher_config()`].
#[derive(Clone)]
pub struct KubeNodeSource {
    store: Store<core_v1::Node>,
}

impl KubeNodeSource {
    pub fn new(store: Store<core_v1::Node>) -> Self {
        KubeNodeSource { store }
    }
}

impl NodeSource for KubeNodeSource {
    fn nodes(&self) -> Result<Vec<Node>, SourceError> {
        let nodes = self
            .store
            .state()
            .iter()
            .map(|n| Node::from(n.as_ref()))
            .collect::<Vec<_>>();
        trace!("Read {} nodes from cache", nodes.len());
        Ok(nodes)
    }
}

/// Watch configuration for the nodes matching `selector`, or all nodes if there is none.
/// The selector is evaluated by the API server.
pub fn watcher_config(selector: Option<&str>) -> watcher::Config {
    match selector {
        Some(s) => watcher::Config::default().labels(s),
        None => watcher::Config::default(),
    }
}

/// Make sure the API server accepts `selector` by listing at most one matching node
pub async fn check_selector(api: &Api<core_v1::Node>, selector: &str) -> Result<(), SourceError> {
    match api.list(&ListParams::default().labels(selector).limit(1)).await {
        Ok(nodes) => {
            debug!("Node selector '{}' matches {} node(s) on the first page", selector, nodes.items.len());
            Ok(())
        }
        Err(kube::Error::Api(e)) if e.code == 400 => {
            Err(format!("invalid node selector '{}': {}", selector, e.message).into())
        }
        Err(e) => Err(format!("unable to list nodes: {}", e).into()),
    }
}

/// Keep `writer` in sync with the nodes selected by `config` and fire `trigger` on every change.
///
/// Nodes that stop matching the selector are reported as deleted by the API server.
/// Runs until the watch stream ends, which only happens if the API client is dropped.
/// Watch errors are retried with backoff.
pub async fn watch_nodes(
    api: Api<core_v1::Node>,
    config: watcher::Config,
    writer: Writer<core_v1::Node>,
    trigger: Trigger,
) {
    let stream = reflector::reflector(writer, watcher(api, config)).default_backoff();
    pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(watcher::Event::Apply(node)) => {
                debug!("Node {} added or updated", node.name_any());
                trigger.fire();
            }
            Ok(watcher::Event::Delete(node)) => {
                debug!("Node {} deleted", node.name_any());
                trigger.fire();
            }
            Ok(watcher::Event::InitDone) => {
                debug!("Initial node list complete");
                trigger.fire();
            }
            Ok(_) => {}
            Err(e) => warn!("Error while watching nodes: {}", e),
        }
    }
    warn!("Node watch stream ended");
}

fn is_ready(status: &core_v1::NodeStatus) -> bool {
    status.conditions.iter().flatten().any(|c| c.type_ == NODE_READY && c.status == CONDITION_TRUE)
}

impl From<&core_v1::Node> for Node {
    fn from(n: &core_v1::Node) -> Self {
        let addresses = n
            .status
            .iter()
            .flat_map(|s| s.addresses.iter().flatten())
            .filter_map(|a| {
                let kind = match a.type_.as_str() {
                    NODE_EXTERNAL_IP => AddressType::External,
                    NODE_INTERNAL_IP => AddressType::Internal,
                    _ => return None,
                };
                Some(NodeAddress {
                    kind,
                    address: a.address.to_owned(),
                })
            })
            .collect();

        Node {
            name: n.name_any(),
            addresses,
            ready: n.status.as_ref().is_some_and(is_ready),
            labels: n.labels().to_owned(),
        }
    }
}
