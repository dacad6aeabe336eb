use std::{collections::HashSet, fmt::Display, net::Ipv4Addr};

use log::{debug, info, trace, warn};

use crate::{
    address::AddressSet,
    provider::{DnsRecord, Zone, TTL},
};

/// Settings applied to every record we manage
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RecordSettings {
    pub ttl: TTL,
    pub proxied: bool,
}

/// A single change to apply to a provider.
/// `Update` and `Delete` always carry a record with an `id`, `Create` never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Change the TTL and proxy setting of an existing record
    Update(DnsRecord),
    /// Remove a record whose address is no longer published
    Delete(DnsRecord),
    /// Add a record for a newly published address
    Create(DnsRecord),
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Update(r) => write!(
                f,
                "update record-id={} name={} ip={}",
                r.id.as_deref().unwrap_or_default(),
                r.name,
                r.content
            ),
            Action::Delete(r) => write!(
                f,
                "delete record-id={} name={} ip={}",
                r.id.as_deref().unwrap_or_default(),
                r.name,
                r.content
            ),
            Action::Create(r) => write!(f, "create record name={} ip={}", r.name, r.content),
        }
    }
}

/// The changes needed to bring the A records of one hostname in line with the published addresses.
///
/// Actions are ordered: updates and deletes of existing records in the order the records were listed,
/// followed by creates in address order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub zone_id: String,
    pub hostname: String,
    actions: Vec<Action>,
}

impl Plan {
    /// Generate a plan by diffing the existing records of `hostname` against the desired `addresses`.
    ///
    /// Records with a different name are never touched. Existing records for a desired address are kept,
    /// and only updated if their TTL or proxy setting drifted. Records for addresses no longer desired and
    /// duplicate records for the same address are deleted. Missing addresses get new records.
    pub fn generate(
        zone: &Zone,
        hostname: &str,
        addresses: &AddressSet,
        existing: &[DnsRecord],
        settings: &RecordSettings,
    ) -> Plan {
        let mut updates_and_deletes = Vec::new();
        let mut seen: HashSet<Ipv4Addr> = HashSet::new();

        for record in existing {
            if !record.name.eq_ignore_ascii_case(hostname) {
                warn!(
                    "Ignoring record {} returned for {}: name does not match",
                    record, hostname
                );
                continue;
            }
            if record.id.is_none() {
                warn!("Ignoring record {} without an id", record);
                continue;
            }
            trace!("Found existing record {}", record);

            if !addresses.contains(&record.content) {
                info!("Removing stale record name={} ip={}", record.name, record.content);
                updates_and_deletes.push(Action::Delete(record.to_owned()));
            } else if !seen.insert(record.content) {
                info!("Removing duplicate record name={} ip={}", record.name, record.content);
                updates_and_deletes.push(Action::Delete(record.to_owned()));
            } else if record.ttl != settings.ttl || record.proxied != settings.proxied {
                info!(
                    "Updating record name={} ip={} (ttl {} -> {}, proxied {} -> {})",
                    record.name, record.content, record.ttl, settings.ttl, record.proxied, settings.proxied
                );
                updates_and_deletes.push(Action::Update(DnsRecord {
                    ttl: settings.ttl,
                    proxied: settings.proxied,
                    ..record.to_owned()
                }));
            } else {
                debug!("Record name={} ip={} is up to date", record.name, record.content);
            }
        }

        let creates = addresses
            .iter()
            .filter(|ip| !seen.contains(ip))
            .map(|ip| {
                info!("Adding record name={} ip={}", hostname, ip);
                Action::Create(DnsRecord {
                    id: None,
                    name: hostname.to_owned(),
                    content: ip,
                    ttl: settings.ttl,
                    proxied: settings.proxied,
                })
            });

        let mut actions = updates_and_deletes;
        actions.extend(creates);

        Plan {
            zone_id: zone.id.to_owned(),
            hostname: hostname.to_owned(),
            actions,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
