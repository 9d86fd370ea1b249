// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{debug, error, info, warn};

use crate::{
    cluster::{Cluster, RoleConfigs},
    gateway::{ClusterGateway, GatewayError},
    service::{ServiceKind, ServiceSpec},
};

/// A failure that ends reconciliation of one service, or of one of its role config groups. It
/// never stops other services from being reconciled.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("could not create service '{service}': {source}")]
    Provisioning {
        service: String,
        #[source]
        source: GatewayError,
    },

    /// `group` is None when the role config groups could not be listed at all.
    #[error("could not update role config {} of '{service}': {source}", group_label(.group))]
    ConfigUpdate {
        service: String,
        group: Option<String>,
        #[source]
        source: GatewayError,
    },

    #[error("role type '{role_type}' is not valid for {kind} service '{service}'")]
    InvalidRoleType {
        service: String,
        kind: ServiceKind,
        role_type: String,
    },
}

fn group_label(group: &Option<String>) -> String {
    match group {
        Some(g) => format!("group '{g}'"),
        None => "groups".to_string(),
    }
}

/// What the existence check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Present,
    Absent,
    /// The check itself failed. Treated the same as Absent.
    QueryFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    AlreadyPresent,
    Created,
    Failed,
    /// The run was cancelled before this service was reached.
    Cancelled,
}

#[derive(Debug)]
pub struct ServiceOutcome {
    pub service: String,
    pub kind: ServiceKind,
    pub existence: Option<Existence>,
    pub provisioning: Provisioning,
    /// Names of the role config groups whose configuration was pushed.
    pub groups_updated: Vec<String>,
    pub errors: Vec<ReconcileError>,
}

impl ServiceOutcome {
    fn new(spec: &ServiceSpec) -> Self {
        ServiceOutcome {
            service: spec.name.clone(),
            kind: spec.kind.clone(),
            existence: None,
            provisioning: Provisioning::Cancelled,
            groups_updated: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty() && self.provisioning != Provisioning::Cancelled
    }
}

impl fmt::Display for ServiceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.provisioning {
            Provisioning::AlreadyPresent => "already present",
            Provisioning::Created => "created",
            Provisioning::Failed => "creation FAILED",
            Provisioning::Cancelled => "cancelled",
        };
        write!(
            f,
            "{} ({}): {}, {} role config groups updated",
            self.service,
            self.kind,
            state,
            self.groups_updated.len()
        )?;
        if !self.errors.is_empty() {
            write!(f, ", {} errors", self.errors.len())?;
        }
        Ok(())
    }
}

/// The outcome of reconciling every declared service, in declaration order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ServiceOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(ServiceOutcome::succeeded)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ReconcileError> {
        self.outcomes.iter().flat_map(|o| o.errors.iter())
    }

    pub fn get(&self, service: &str) -> Option<&ServiceOutcome> {
        self.outcomes.iter().find(|o| o.service == service)
    }

    pub fn print_summary(&self) {
        for outcome in self.outcomes.iter() {
            println!("{outcome}");
            for e in outcome.errors.iter() {
                println!("    {e}");
            }
        }
    }
}

/// Converges the remote cluster towards the declared desired state.
///
/// Services are reconciled one at a time, in declaration order. Each service is checked for
/// existence, created if absent, and then has the configuration of every one of its remote role
/// config groups replaced by the declared configuration for that group's role type.
pub struct Reconciler<G> {
    gateway: G,
    cancel: Option<Arc<AtomicBool>>,
}

impl<G: ClusterGateway> Reconciler<G> {
    pub fn new(gateway: G) -> Self {
        Reconciler {
            gateway,
            cancel: None,
        }
    }

    /// Stop before the next service once `cancel` is set. The service in progress when the flag
    /// is set runs to completion.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::SeqCst))
    }

    pub fn run(&self, cluster: &Cluster) -> RunReport {
        let mut report = RunReport::default();

        for spec in cluster.services.iter() {
            if self.is_cancelled() {
                warn!("Reconciliation cancelled; skipping service '{}'", spec.name);
                report.outcomes.push(ServiceOutcome::new(spec));
                continue;
            }
            let outcome = self.reconcile_service(spec, &cluster.role_configs);
            for e in outcome.errors.iter() {
                error!("{e}");
            }
            report.outcomes.push(outcome);
        }

        report
    }

    pub fn reconcile_service(
        &self,
        spec: &ServiceSpec,
        role_configs: &RoleConfigs,
    ) -> ServiceOutcome {
        let mut outcome = ServiceOutcome::new(spec);

        for role_type in spec.invalid_role_types.iter() {
            outcome.errors.push(ReconcileError::InvalidRoleType {
                service: spec.name.clone(),
                kind: spec.kind.clone(),
                role_type: role_type.clone(),
            });
        }

        let existence = self.check_existence(spec);
        outcome.existence = Some(existence);

        match existence {
            Existence::Present => {
                info!("{} service '{}' already deployed", spec.kind, spec.name);
                outcome.provisioning = Provisioning::AlreadyPresent;
            }
            Existence::Absent | Existence::QueryFailed => match self.provision(spec) {
                Ok(()) => outcome.provisioning = Provisioning::Created,
                Err(e) => {
                    outcome.provisioning = Provisioning::Failed;
                    outcome.errors.push(e);
                    return outcome;
                }
            },
        }

        self.reconcile_role_configs(spec, role_configs, &mut outcome);

        outcome
    }

    /// A failed existence check is treated as "absent". Creating a service that actually exists
    /// is expected to be rejected by the server, which is then reported as a provisioning error.
    fn check_existence(&self, spec: &ServiceSpec) -> Existence {
        match self.gateway.service_exists(&spec.kind, &spec.name) {
            Ok(true) => Existence::Present,
            Ok(false) => Existence::Absent,
            Err(e) => {
                warn!(
                    "Could not determine whether service '{}' exists, assuming it does not: {e}",
                    spec.name
                );
                Existence::QueryFailed
            }
        }
    }

    fn provision(&self, spec: &ServiceSpec) -> Result<(), ReconcileError> {
        info!("Deploying {} service '{}'...", spec.kind, spec.name);

        let roles = spec.role_instances();
        for role in roles.iter() {
            debug!("'{}': adding role {role}", spec.name);
        }
        for (key, value) in spec.service_config.iter() {
            debug!("'{}': service config {key}={value}", spec.name);
        }

        self.gateway
            .create_service(&spec.kind, &spec.name, &spec.service_config, &roles)
            .map_err(|source| ReconcileError::Provisioning {
                service: spec.name.clone(),
                source,
            })?;

        info!(
            "{} service '{}' created with {} roles",
            spec.kind,
            spec.name,
            roles.len()
        );
        Ok(())
    }

    /// Push the declared configuration to every role config group of the service.
    ///
    /// The declared configuration replaces whatever the group had, so a group whose role type
    /// has no declared configuration is still updated, with an empty list.
    fn reconcile_role_configs(
        &self,
        spec: &ServiceSpec,
        role_configs: &RoleConfigs,
        outcome: &mut ServiceOutcome,
    ) {
        let groups = match self.gateway.list_role_config_groups(&spec.kind, &spec.name) {
            Ok(groups) => groups,
            Err(source) => {
                outcome.errors.push(ReconcileError::ConfigUpdate {
                    service: spec.name.clone(),
                    group: None,
                    source,
                });
                return;
            }
        };

        for group in groups {
            let config = role_configs.resolve(&spec.kind, &group.role_type);
            info!(
                "Setting {} config entries on role config group '{}' (role type {})",
                config.len(),
                group.name,
                group.role_type
            );
            match self
                .gateway
                .update_role_config_group(&spec.kind, &spec.name, &group.name, &config)
            {
                Ok(()) => outcome.groups_updated.push(group.name),
                Err(source) => outcome.errors.push(ReconcileError::ConfigUpdate {
                    service: spec.name.clone(),
                    group: Some(group.name),
                    source,
                }),
            }
        }
    }
}
