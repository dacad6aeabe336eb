//! Main crate for the `clouddns_node_sync` application.
//!
//! Keeps the A records of one or more DNS names in sync with the addresses of the nodes in a Kubernetes cluster.
//!
//! For more information, choose one of the modules below.
//! The following modules might be of interest if you want to add new functionality:
//! - [`nodesource`]s are used to retrieve the current list of cluster nodes
//! - [`provider`]s are DNS providers such as Cloudflare that ultimately serve DNS records to clients
//! - [`plan`] computes the record changes needed to publish a set of addresses
//! - [`executor`] ties everything together into reconciliation passes

#![allow(clippy::uninlined_format_args)]

pub mod address;
pub mod config;
pub mod executor;
pub mod gate;
pub mod nodesource;
pub mod plan;
pub mod provider;
pub mod trigger;
pub mod zone;
