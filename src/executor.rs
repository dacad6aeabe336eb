//! The executor drives reconciliation passes:
//! list nodes, pick addresses, check the change gate and then, for every hostname,
//! resolve its zone and apply a [`Plan`] through the [`Provider`].

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    address::{select_addresses, AddressSet},
    config::{FailurePolicy, SyncConfig},
    gate::ChangeGate,
    nodesource::{NodeSource, SourceError},
    plan::{Action, Plan},
    provider::{Provider, ProviderError, Zone},
    zone::{find_zone, ZoneError},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("failed to list nodes: {0}")]
    Source(SourceError),
    #[error("failed to list zones: {0}")]
    Zones(ProviderError),
    #[error("{0}")]
    Zone(ZoneError),
    #[error("failed to list dns records for zone-id={zone_id} name={hostname}: {source}")]
    Records {
        zone_id: String,
        hostname: String,
        source: ProviderError,
    },
    #[error("failed to {action} in zone-id={zone_id}: {source}")]
    Apply {
        zone_id: String,
        action: Action,
        source: ProviderError,
    },
    #[error("`{0}`")]
    Provider(ProviderError),
}
impl From<SourceError> for ExecutorError {
    fn from(s: SourceError) -> Self {
        ExecutorError::Source(s)
    }
}
impl From<ZoneError> for ExecutorError {
    fn from(z: ZoneError) -> Self {
        ExecutorError::Zone(z)
    }
}
impl From<ProviderError> for ExecutorError {
    fn from(p: ProviderError) -> Self {
        ExecutorError::Provider(p)
    }
}

impl ExecutorError {
    /// Whether reconciling the same addresses again may succeed.
    /// A hostname without a zone stays broken until the configuration changes.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExecutorError::Zone(_))
    }
}

/// Outcome of a single pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// The addresses computed for this pass
    pub addresses: AddressSet,
    /// False if the change gate suppressed the pass
    pub changed: bool,
    pub successes: Vec<Action>,
    /// Hostnames whose reconciliation failed, with the reason
    pub failures: Vec<(String, ExecutorError)>,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An executor performs the complete set of actions needed to bring our records up-to-date.
///
/// It owns the change gate, so passes must run one after another on the same executor.
pub struct Executor {
    nodes: Box<dyn NodeSource + Send>,
    provider: Box<dyn Provider + Send>,
    config: SyncConfig,
    gate: ChangeGate,
}

impl Executor {
    pub fn try_new(
        nodes: Box<dyn NodeSource + Send>,
        mut provider: Box<dyn Provider + Send>,
        config: SyncConfig,
        dry_run: bool,
    ) -> Result<Executor, ExecutorError> {
        if dry_run {
            provider.enable_dry_run()?;
        }
        Ok(Executor {
            nodes,
            provider,
            config,
            gate: ChangeGate::new(),
        })
    }

    /// Perform one reconciliation pass.
    ///
    /// Returns an error if the pass could not start at all (nodes or zones could not be listed).
    /// Failures for individual hostnames are reported in the [`RunResult`] and do not stop other hostnames.
    pub fn run(&mut self) -> Result<RunResult, ExecutorError> {
        // No partial node list is ever acted upon, and the gate stays as it was
        let nodes = self.nodes.nodes()?;

        let addresses = select_addresses(&nodes, &self.config.addresses);
        info!("Node addresses: {}", addresses);

        if !self.gate.should_sync(&addresses) {
            return Ok(RunResult {
                addresses,
                changed: false,
                successes: vec![],
                failures: vec![],
            });
        }

        let zones = match self.provider.zones() {
            Ok(z) => z,
            Err(e) => {
                self.on_failure();
                return Err(ExecutorError::Zones(e));
            }
        };

        let mut successes: Vec<Action> = vec![];
        let mut failures: Vec<(String, ExecutorError)> = vec![];

        for hostname in &self.config.hostnames {
            match self.sync_hostname(&zones, hostname, &addresses, &mut successes) {
                Ok(()) => debug!("Records for {} are up to date", hostname),
                Err(e) => {
                    error!("Failed to sync {}: {}", hostname, e);
                    failures.push((hostname.to_owned(), e));
                }
            }
        }

        if failures.iter().any(|(_, e)| e.is_retryable()) {
            self.on_failure();
        }
        Ok(RunResult {
            addresses,
            changed: true,
            successes,
            failures,
        })
    }

    fn on_failure(&mut self) {
        match self.config.failure_policy {
            FailurePolicy::Retry => {
                warn!("Pass did not complete, the next trigger will retry");
                self.gate.invalidate();
            }
            FailurePolicy::Remember => {
                warn!("Pass did not complete, waiting for the node addresses to change before retrying")
            }
        }
    }

    // Reconcile a single hostname. Stops at the first failing action
    fn sync_hostname(
        &self,
        zones: &[Zone],
        hostname: &str,
        addresses: &AddressSet,
        successes: &mut Vec<Action>,
    ) -> Result<(), ExecutorError> {
        let zone = find_zone(zones, hostname)?;
        debug!("Using zone {} for {}", zone, hostname);

        let existing =
            self.provider
                .records(&zone.id, hostname)
                .map_err(|source| ExecutorError::Records {
                    zone_id: zone.id.to_owned(),
                    hostname: hostname.to_owned(),
                    source,
                })?;

        let plan = Plan::generate(zone, hostname, addresses, &existing, &self.config.records);
        if plan.is_empty() {
            info!("No action needed for {}", hostname);
            return Ok(());
        }

        for action in plan.actions() {
            self.apply(&plan.zone_id, action)
                .map_err(|source| ExecutorError::Apply {
                    zone_id: plan.zone_id.to_owned(),
                    action: action.to_owned(),
                    source,
                })?;
            successes.push(action.to_owned());
        }
        Ok(())
    }

    fn apply(&self, zone_id: &str, action: &Action) -> Result<(), ProviderError> {
        match action {
            Action::Update(r) => {
                let id = r.id.as_deref().ok_or("record has no id")?;
                self.provider.update_record(zone_id, id, r)
            }
            Action::Delete(r) => {
                let id = r.id.as_deref().ok_or("record has no id")?;
                self.provider.delete_record(zone_id, id)
            }
            Action::Create(r) => self.provider.create_record(zone_id, r).map(|_| ()),
        }
    }
}
