mod cli;

use std::process::ExitCode;

use clap::Parser;

use env_logger::Builder;
use k8s_openapi::api::core::v1::Node;
use kube::{runtime::reflector, Api, Client};
use log::{debug, error, info, warn};
use tokio::{
    task::{self, JoinError},
    time::{interval, Duration, MissedTickBehavior},
};

use clouddns_node_sync::{
    config::{Credentials, SyncConfig},
    executor::{Executor, ExecutorError, RunResult},
    nodesource::{self, KubeNodeSource},
    provider,
    trigger::Trigger,
};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    Builder::new().filter_level(cli.loglevel.into()).init();

    let (config, credentials) = match cli
        .sync_config()
        .and_then(|config| Ok((config, cli.credentials()?)))
    {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Managing A records for {}", config.hostnames.join(", "));
    if cli.dry_run {
        info!("Running in dry-run mode, no changes to the DNS provider will be made");
    }

    let client = match Client::try_default().await {
        Ok(c) => c,
        Err(e) => {
            error!("Unable to connect to the Kubernetes API: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let api: Api<Node> = Api::all(client);
    if let Some(selector) = &config.node_selector {
        if let Err(e) = nodesource::check_selector(&api, selector).await {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
        info!("Only publishing nodes matching '{}'", selector);
    }

    let (store, writer) = reflector::store::<Node>();
    let trigger = Trigger::new();
    tokio::spawn(nodesource::watch_nodes(
        api,
        nodesource::watcher_config(config.node_selector.as_deref()),
        writer,
        trigger.clone(),
    ));

    info!("Waiting for the node cache to sync");
    if let Err(e) = store.wait_until_ready().await {
        error!("Node cache never became ready: {}", e);
        return ExitCode::FAILURE;
    }

    let source = KubeNodeSource::new(store);
    let dry_run = cli.dry_run;
    // The Cloudflare client is blocking. It must be created, used and dropped outside of the async runtime
    let executor =
        match task::spawn_blocking(move || build_executor(source, &credentials, config, dry_run))
            .await
        {
            Ok(Ok(e)) => e,
            Ok(Err(e)) => {
                error!("Unable to create executor: {}", e);
                return ExitCode::FAILURE;
            }
            Err(_) => {
                error!("Task panicked, aborting...");
                return ExitCode::FAILURE;
            }
        };

    if cli.run_once {
        return match run_pass(executor).await {
            Ok((executor, ok)) => {
                dispose(executor).await;
                if ok {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(_) => {
                error!("Task panicked, aborting...");
                ExitCode::FAILURE
            }
        };
    }

    let shutdown = Trigger::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.fire();
        }
    });

    let mut resync = interval(Duration::from_secs(cli.resync_interval));
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut executor = executor;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.fired() => {
                info!("Shutting down");
                break;
            }
            _ = trigger.fired() => debug!("Node change detected, resyncing"),
            _ = resync.tick() => debug!("Periodic resync"),
        }

        executor = match run_pass(executor).await {
            Ok((executor, _)) => executor,
            Err(_) => {
                error!("Task panicked, aborting...");
                return ExitCode::FAILURE;
            }
        };
    }

    dispose(executor).await;
    ExitCode::SUCCESS
}

fn build_executor(
    source: KubeNodeSource,
    credentials: &Credentials,
    config: SyncConfig,
    dry_run: bool,
) -> Result<Executor, ExecutorError> {
    let provider =
        provider::CloudflareProvider::from_config(&provider::CloudflareProviderConfig {
            credentials,
        })?;
    info!("Connected to provider");
    Executor::try_new(Box::new(source), provider, config, dry_run)
}

// Run a single pass on a worker thread. Returns the executor and whether the pass succeeded
async fn run_pass(mut executor: Executor) -> Result<(Executor, bool), JoinError> {
    task::spawn_blocking(move || {
        let ok = match executor.run() {
            Ok(r) => report(&r),
            Err(e) => {
                error!("Pass failed: {}", e);
                false
            }
        };
        (executor, ok)
    })
    .await
}

fn report(result: &RunResult) -> bool {
    if !result.changed {
        return true;
    }
    for action in &result.successes {
        debug!("Applied: {}", action);
    }
    if result.is_ok() {
        info!(
            "Pass completed, {} change(s) applied. No errors were encountered",
            result.successes.len()
        );
    } else {
        error!(
            "Pass completed with errors, {} change(s) applied, {} name(s) failed",
            result.successes.len(),
            result.failures.len()
        );
    }
    result.is_ok()
}

async fn dispose(executor: Executor) {
    if task::spawn_blocking(move || drop(executor)).await.is_err() {
        warn!("Failed to clean up executor");
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
