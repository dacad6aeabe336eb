//! Runtime configuration shared between the library and the binary.
//!
//! Raw option values are validated here, so that the rest of the crate only ever sees
//! a fully populated [`SyncConfig`].

use itertools::Itertools;
use log::warn;
use thiserror::Error;

use crate::{address::AddressPolicy, plan::RecordSettings, provider::TTL};

/// TTL applied to records when none (or an invalid one) was configured
pub const DEFAULT_TTL: TTL = 120;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one dns name is required")]
    MissingHostname,
    #[error("either a cloudflare api token or an api email and key are required")]
    MissingCredentials,
}

/// How to authenticate with the DNS provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Credentials {
    Token(String),
    Key { email: String, key: String },
}

impl Credentials {
    /// Pick credentials from the supplied options.
    /// A token always takes precedence over an email/key pair.
    pub fn from_options(
        token: Option<&str>,
        email: Option<&str>,
        key: Option<&str>,
    ) -> Result<Credentials, ConfigError> {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        match (non_empty(token), non_empty(email), non_empty(key)) {
            (Some(token), _, _) => Ok(Credentials::Token(token.to_owned())),
            (None, Some(email), Some(key)) => Ok(Credentials::Key {
                email: email.to_owned(),
                key: key.to_owned(),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }
}

/// What to do with the change gate after a pass that did not fully succeed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum FailurePolicy {
    /// Forget the failed address set, so that the next trigger reconciles again even if nothing changed
    #[default]
    Retry,
    /// Keep the failed address set. Only a change in node addresses triggers another attempt
    Remember,
}

/// Complete configuration for a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// The DNS names to manage A records for
    pub hostnames: Vec<String>,
    pub records: RecordSettings,
    pub addresses: AddressPolicy,
    /// Kubernetes label selector for the nodes to publish. `None` selects all nodes
    pub node_selector: Option<String>,
    pub failure_policy: FailurePolicy,
}

/// Split a comma-separated list of dns names into normalized hostnames.
/// Empty entries and duplicates are dropped, the order is preserved otherwise.
pub fn parse_hostnames(raw: &str) -> Result<Vec<String>, ConfigError> {
    let hostnames = raw
        .split(',')
        .map(|h| h.trim().trim_end_matches('.').to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .unique()
        .collect_vec();

    if hostnames.is_empty() {
        return Err(ConfigError::MissingHostname);
    }
    Ok(hostnames)
}

/// Parse a record TTL, falling back to [`DEFAULT_TTL`] if unset or invalid
pub fn parse_ttl(raw: Option<&str>) -> TTL {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => DEFAULT_TTL,
        Some(s) => s.parse::<TTL>().unwrap_or_else(|_| {
            warn!("Invalid TTL '{}', defaulting to {}", s, DEFAULT_TTL);
            DEFAULT_TTL
        }),
    }
}

/// Parse the proxy flag, falling back to `false` if unset or invalid
pub fn parse_proxied(raw: Option<&str>) -> bool {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => false,
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => true,
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => false,
        Some(s) => {
            warn!("Invalid proxy setting '{}', defaulting to false", s);
            false
        }
    }
}

impl SyncConfig {
    /// Build a configuration from raw option values
    pub fn from_options(
        dns_names: &str,
        ttl: Option<&str>,
        proxied: Option<&str>,
        addresses: AddressPolicy,
        node_selector: &str,
        failure_policy: FailurePolicy,
    ) -> Result<SyncConfig, ConfigError> {
        Ok(SyncConfig {
            hostnames: parse_hostnames(dns_names)?,
            records: RecordSettings {
                ttl: parse_ttl(ttl),
                proxied: parse_proxied(proxied),
            },
            addresses,
            node_selector: Some(node_selector.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            failure_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use totems::assert_err;

    use super::*;

    #[test]
    fn should_split_and_normalize_hostnames() {
        assert_eq!(
            parse_hostnames(" K8s.Example.com., api.example.com,,k8s.example.com").unwrap(),
            vec!["k8s.example.com", "api.example.com"]
        );
    }

    #[test]
    fn should_require_a_hostname() {
        assert_eq!(parse_hostnames(""), Err(ConfigError::MissingHostname));
        assert_eq!(parse_hostnames(" , "), Err(ConfigError::MissingHostname));
    }

    #[test]
    fn should_default_ttl() {
        assert_eq!(parse_ttl(None), 120);
        assert_eq!(parse_ttl(Some("")), 120);
        assert_eq!(parse_ttl(Some("ten")), 120);
        assert_eq!(parse_ttl(Some("-5")), 120);
        assert_eq!(parse_ttl(Some("300")), 300);
        assert_eq!(parse_ttl(Some("1")), 1);
    }

    #[test]
    fn should_default_proxied() {
        assert!(!parse_proxied(None));
        assert!(!parse_proxied(Some("yes")));
        assert!(!parse_proxied(Some("False")));
        assert!(parse_proxied(Some("true")));
        assert!(parse_proxied(Some("1")));
        assert!(parse_proxied(Some("T")));
    }

    #[test]
    fn token_takes_precedence() {
        assert_eq!(
            Credentials::from_options(Some("TOKEN"), Some("EMAIL"), Some("KEY")),
            Ok(Credentials::Token("TOKEN".to_string()))
        );
    }

    #[test]
    fn should_use_email_and_key() {
        assert_eq!(
            Credentials::from_options(None, Some("EMAIL"), Some("KEY")),
            Ok(Credentials::Key {
                email: "EMAIL".to_string(),
                key: "KEY".to_string()
            })
        );
        assert_eq!(
            Credentials::from_options(Some(""), Some("EMAIL"), Some("KEY")),
            Ok(Credentials::Key {
                email: "EMAIL".to_string(),
                key: "KEY".to_string()
            })
        );
    }

    #[test]
    fn should_require_credentials() {
        assert_err!(Credentials::from_options(None, None, None));
        assert_err!(Credentials::from_options(None, Some("EMAIL"), None));
        assert_err!(Credentials::from_options(None, None, Some("KEY")));
    }

    #[test]
    fn blank_selector_selects_all_nodes() {
        let config = SyncConfig::from_options(
            "k8s.example.com",
            None,
            None,
            AddressPolicy::default(),
            "  ",
            FailurePolicy::Retry,
        )
        .unwrap();
        assert_eq!(config.node_selector, None);
    }

    #[test]
    fn should_trim_credentials() {
        assert_eq!(
            Credentials::from_options(Some(" TOKEN\n"), None, None),
            Ok(Credentials::Token("TOKEN".to_string()))
        );
    }

    #[test]
    fn should_build_config() {
        let config = SyncConfig::from_options(
            "k8s.example.com",
            Some("60"),
            Some("true"),
            AddressPolicy {
                use_internal_ip: true,
                skip_external_ip: false,
            },
            "node-role.kubernetes.io/edge",
            FailurePolicy::Remember,
        )
        .unwrap();
        assert_eq!(config.hostnames, vec!["k8s.example.com"]);
        assert_eq!(
            config.records,
            RecordSettings {
                ttl: 60,
                proxied: true
            }
        );
        assert!(config.addresses.use_internal_ip);
        assert_eq!(
            config.node_selector.as_deref(),
            Some("node-role.kubernetes.io/edge")
        );
        assert_eq!(config.failure_policy, FailurePolicy::Remember);
    }
}
