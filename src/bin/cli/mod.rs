use clap::{builder::FalseyValueParser, Parser, ValueEnum};
use clouddns_node_sync::{
    address::AddressPolicy,
    config::{self, ConfigError, Credentials, SyncConfig},
};
use log::LevelFilter;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The dns name for the nodes, comma-separated for multiple (same root)
    #[arg(long, value_name = "NAMES", env = "DNS_NAME")]
    pub dns_name: String,

    /// Cloudflare API token to authenticate with. Takes precedence over email and key
    #[arg(long, value_name = "API_TOKEN", env = "CF_API_TOKEN", hide_env_values = true)]
    pub cloudflare_api_token: Option<String>,

    /// The email address to use for Cloudflare, used together with the API key
    #[arg(long, value_name = "EMAIL", env = "CF_API_EMAIL")]
    pub cloudflare_api_email: Option<String>,

    /// The global API key to use for Cloudflare, used together with the API email
    #[arg(long, value_name = "API_KEY", env = "CF_API_KEY", hide_env_values = true)]
    pub cloudflare_api_key: Option<String>,

    /// Enable the Cloudflare proxy for the records [default: false]
    #[arg(long, value_name = "BOOL", env = "CF_PROXY")]
    pub cloudflare_proxy: Option<String>,

    /// TTL of the records in seconds [default: 120]
    #[arg(long, value_name = "SECONDS", env = "CF_TTL")]
    pub cloudflare_ttl: Option<String>,

    /// Use internal IPs if no external IPs are available
    #[arg(
        long,
        action,
        default_value_t = false,
        value_parser = FalseyValueParser::new(),
        env = "USE_INTERNAL_IP"
    )]
    pub use_internal_ip: bool,

    /// Don't sync external IPs (use in conjunction with --use-internal-ip)
    #[arg(
        long,
        action,
        default_value_t = false,
        value_parser = FalseyValueParser::new(),
        env = "SKIP_EXTERNAL_IP"
    )]
    pub skip_external_ip: bool,

    /// Only publish nodes matching this label selector
    #[arg(long, default_value = "", value_name = "SELECTOR", env = "NODE_SELECTOR")]
    pub node_selector: String,

    /// Set the loglevel of the application
    #[arg(
        value_enum,
        short = 'l',
        long,
        default_value_t = Loglevel::Info,
        value_name = "LEVEL",
        env = "LOG_LEVEL"
    )]
    pub loglevel: Loglevel,

    /// Only run the utility once, then exit
    #[arg(long, default_value_t = false, action)]
    pub run_once: bool,

    /// Time between periodic resyncs in seconds, in addition to resyncs triggered by node changes
    #[arg(
        short = 'i',
        long,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "RESYNC_INTERVAL"
    )]
    pub resync_interval: u64,

    /// Whether to retry a failed pass even if the node addresses did not change
    #[arg(value_enum, long, default_value_t = FailurePolicy::Retry, env = "FAILURE_POLICY")]
    pub failure_policy: FailurePolicy,

    /// Do not make any changes to the DNS records, only show what would happen
    #[arg(long, short = 'd', action, default_value_t = false, env = "DRY_RUN")]
    pub dry_run: bool,
}

impl Cli {
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        SyncConfig::from_options(
            &self.dns_name,
            self.cloudflare_ttl.as_deref(),
            self.cloudflare_proxy.as_deref(),
            AddressPolicy {
                use_internal_ip: self.use_internal_ip,
                skip_external_ip: self.skip_external_ip,
            },
            &self.node_selector,
            self.failure_policy.into(),
        )
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        Credentials::from_options(
            self.cloudflare_api_token.as_deref(),
            self.cloudflare_api_email.as_deref(),
            self.cloudflare_api_key.as_deref(),
        )
    }
}

/// Used to set the applications loglevel
// This is essentially a re-creation of log:Level. However, that enum doesn't derive ValueEnum, so we have to do it manually here
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum Loglevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
impl From<Loglevel> for LevelFilter {
    fn from(ll: Loglevel) -> Self {
        match ll {
            Loglevel::Error => LevelFilter::Error,
            Loglevel::Warn => LevelFilter::Warn,
            Loglevel::Info => LevelFilter::Info,
            Loglevel::Debug => LevelFilter::Debug,
            Loglevel::Trace => LevelFilter::Trace,
        }
    }
}

/// What to do after a pass failed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ValueEnum)]
pub enum FailurePolicy {
    /// Retry on the next trigger
    Retry,
    /// Only retry once the node addresses change
    Remember,
}
impl From<FailurePolicy> for config::FailurePolicy {
    fn from(value: FailurePolicy) -> Self {
        match value {
            FailurePolicy::Retry => config::FailurePolicy::Retry,
            FailurePolicy::Remember => config::FailurePolicy::Remember,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_minimal_arguments() {
        let cli = Cli::try_parse_from([
            "clouddns-node-sync",
            "--dns-name",
            "k8s.example.com,api.example.com",
            "--cloudflare-api-token",
            "TOKEN",
        ])
        .unwrap();
        let config = cli.sync_config().unwrap();
        assert_eq!(config.hostnames, vec!["k8s.example.com", "api.example.com"]);
        assert_eq!(config.records.ttl, 120);
        assert!(!config.records.proxied);
        assert_eq!(cli.credentials(), Ok(Credentials::Token("TOKEN".to_string())));
        assert_eq!(cli.resync_interval, 60);
    }

    #[test]
    fn should_reject_zero_interval() {
        assert!(Cli::try_parse_from([
            "clouddns-node-sync",
            "--dns-name",
            "k8s.example.com",
            "--resync-interval",
            "0",
        ])
        .is_err());
    }

    // Both variables are only touched here, other tests never set them
    #[test]
    fn address_flags_accept_any_non_empty_env_value() {
        let parse = || {
            let cli = Cli::try_parse_from(["clouddns-node-sync", "--dns-name", "k8s.example.com"]).unwrap();
            (cli.use_internal_ip, cli.skip_external_ip)
        };

        for value in ["1", "yes", "true", "on"] {
            std::env::set_var("USE_INTERNAL_IP", value);
            std::env::set_var("SKIP_EXTERNAL_IP", value);
            assert_eq!(parse(), (true, true), "value {}", value);
        }
        for value in ["0", "false", "no"] {
            std::env::set_var("USE_INTERNAL_IP", value);
            std::env::set_var("SKIP_EXTERNAL_IP", value);
            assert_eq!(parse(), (false, false), "value {}", value);
        }

        std::env::remove_var("USE_INTERNAL_IP");
        std::env::remove_var("SKIP_EXTERNAL_IP");
        assert_eq!(parse(), (false, false));
    }

    #[test]
    fn address_flags_work_without_a_value() {
        let cli = Cli::try_parse_from([
            "clouddns-node-sync",
            "--dns-name",
            "k8s.example.com",
            "--use-internal-ip",
        ])
        .unwrap();
        assert!(cli.use_internal_ip);
    }

    #[test]
    fn should_convert_failure_policy() {
        assert_eq!(
            config::FailurePolicy::from(FailurePolicy::Remember),
            config::FailurePolicy::Remember
        );
    }
}
