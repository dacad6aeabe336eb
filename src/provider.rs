//! DNS providers serve the A records we manage.
//! Each provider implements the [`Provider`] trait.
//!
//! The following providers are currently available:
//! - [`CloudflareProvider`]: Manages records through the Cloudflare v4 API

mod cloudflare;

#[cfg(test)]
use mockall::automock;

// Re-exports for convenience
pub use self::cloudflare::{CloudflareProvider, CloudflareProviderConfig};

use std::{fmt::Display, net::Ipv4Addr};

pub type TTL = u32;
pub type RecordId = String;

/// A provider is any DNS service provider, such as Cloudflare, PowerDNS, etc...
/// They expose the zones they host and a few basic methods to access and modify A records within them.
#[cfg_attr(test, automock)]
pub trait Provider {
    /// Switch the provider into dry-run mode, where no changes are made to any records.
    /// Returns an error if the provider does not support dry-runs.
    fn enable_dry_run(&mut self) -> Result<(), ProviderError>;

    /// List all zones this provider can manage
    fn zones(&self) -> Result<Vec<Zone>, ProviderError>;

    /// List all A records with the given name in a zone
    fn records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>, ProviderError>;

    /// Create a new A record in a zone. Returns the ID of the new record
    fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<RecordId, ProviderError>;

    /// Overwrite an existing record with the contents of `record`
    fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), ProviderError>;

    /// Remove a record from a zone
    fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ProviderError>;
}

// Generic error returned by a provider action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderError {
    msg: String,
}
impl Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg.as_str())
    }
}
impl std::error::Error for ProviderError {}

impl From<String> for ProviderError {
    fn from(s: String) -> Self {
        ProviderError { msg: s }
    }
}
impl From<&str> for ProviderError {
    fn from(s: &str) -> Self {
        ProviderError { msg: s.to_owned() }
    }
}

/// A registered domain hosted by a provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zone {
    pub id: String,
    pub name: String,
}
impl Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// An A record as known to the provider.
/// Records that have not been created yet carry no `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsRecord {
    pub id: Option<RecordId>,
    pub name: String,
    pub content: Ipv4Addr,
    pub ttl: TTL,
    pub proxied: bool,
}
impl Display for DnsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: A {} (ttl={}, proxied={})",
            self.name, self.content, self.ttl, self.proxied
        )
    }
}
