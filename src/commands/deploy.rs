// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use {
    clap::Args,
    log::{info, warn},
};

use crate::{
    cluster::Cluster,
    cm_api::{ApiSettings, CmClient},
    commands::{
        handled_error, load_api_settings, load_cluster, load_config, Cli, Handle, HandledResult,
    },
    gateway::DryRun,
    reconcile::{Reconciler, RunReport},
};

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Only reconcile the named service. May be given more than once.
    #[arg(long = "service")]
    services: Vec<String>,

    /// Query the management server, but only log the changes that would be made.
    #[arg(long)]
    dry_run: bool,
}

pub fn deploy(cli: &Cli, args: &DeployArgs) -> HandledResult<()> {
    let config = load_config(cli)?;
    let mut cluster = load_cluster(&config)?;
    let settings = load_api_settings(&config)?;

    if !args.services.is_empty() {
        cluster
            .retain_services(&args.services)
            .handle_err(|name| eprintln!("Service '{name}' is not declared in the config file."))?;
    }

    let cancel = Arc::new(AtomicBool::new(false));

    let rt = tokio::runtime::Runtime::new()
        .handle_err(|e| eprintln!("Error launching tokio runtime: {e}"))?;

    // The reconciliation itself is blocking; it runs on its own thread so that an interrupt can
    // be noticed while a request is in flight.
    let report = rt.block_on(async {
        let watcher = {
            let cancel = Arc::clone(&cancel);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted; stopping after the current service");
                    cancel.store(true, Ordering::SeqCst);
                }
            })
        };

        let dry_run = args.dry_run;
        let cancel = Arc::clone(&cancel);
        let result =
            tokio::task::spawn_blocking(move || run(settings, &cluster, dry_run, cancel)).await;
        watcher.abort();
        result
    });

    let report = report.handle_err(|e| eprintln!("Deployment task failed: {e}"))??;

    report.print_summary();

    if !report.succeeded() {
        return handled_error();
    }
    info!("Deployment complete");
    Ok(())
}

fn run(
    settings: ApiSettings,
    cluster: &Cluster,
    dry_run: bool,
    cancel: Arc<AtomicBool>,
) -> HandledResult<RunReport> {
    let client = CmClient::new(settings)
        .handle_err(|e| eprintln!("Could not set up management API client: {e}"))?;

    info!(
        "Reconciling {} services of cluster '{}'",
        cluster.services.len(),
        cluster.name
    );

    let report = if dry_run {
        Reconciler::new(DryRun::new(client))
            .with_cancel(cancel)
            .run(cluster)
    } else {
        Reconciler::new(client).with_cancel(cancel).run(cluster)
    };

    Ok(report)
}
