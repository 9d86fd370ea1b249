// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::sync::Mutex;

use log::info;

use crate::{
    config::Settings,
    service::{RoleInstance, ServiceKind},
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be completed: connection refused, timed out, bad TLS, etc.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The management API answered, but refused the request.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("could not read CA certificate \"{path}\": {source}")]
    CaCert {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A role config group as observed on the management server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleConfigGroup {
    pub name: String,
    pub role_type: String,
}

/// The operations the reconciler needs from a cluster management server.
///
/// Every call is synchronous. Services are identified by kind as well as by name so that an
/// implementation can route services that live outside the cluster (the management service) to
/// the right place.
pub trait ClusterGateway {
    fn service_exists(&self, kind: &ServiceKind, name: &str) -> Result<bool, GatewayError>;

    fn create_service(
        &self,
        kind: &ServiceKind,
        name: &str,
        config: &Settings,
        roles: &[RoleInstance],
    ) -> Result<(), GatewayError>;

    fn list_role_config_groups(
        &self,
        kind: &ServiceKind,
        name: &str,
    ) -> Result<Vec<RoleConfigGroup>, GatewayError>;

    /// Replace the configuration of a role config group with `config`.
    fn update_role_config_group(
        &self,
        kind: &ServiceKind,
        name: &str,
        group: &str,
        config: &Settings,
    ) -> Result<(), GatewayError>;
}

impl<G: ClusterGateway + ?Sized> ClusterGateway for &G {
    fn service_exists(&self, kind: &ServiceKind, name: &str) -> Result<bool, GatewayError> {
        (**self).service_exists(kind, name)
    }

    fn create_service(
        &self,
        kind: &ServiceKind,
        name: &str,
        config: &Settings,
        roles: &[RoleInstance],
    ) -> Result<(), GatewayError> {
        (**self).create_service(kind, name, config, roles)
    }

    fn list_role_config_groups(
        &self,
        kind: &ServiceKind,
        name: &str,
    ) -> Result<Vec<RoleConfigGroup>, GatewayError> {
        (**self).list_role_config_groups(kind, name)
    }

    fn update_role_config_group(
        &self,
        kind: &ServiceKind,
        name: &str,
        group: &str,
        config: &Settings,
    ) -> Result<(), GatewayError> {
        (**self).update_role_config_group(kind, name, group, config)
    }
}

/// A gateway wrapper that performs reads against the inner gateway but only logs writes.
///
/// Useful to preview what a deployment would do. A service that would have been created has no
/// role config groups on the server yet, so none are reported for it.
pub struct DryRun<G> {
    inner: G,
    /// Services that would have been created, by kind and name.
    created: Mutex<Vec<(ServiceKind, String)>>,
}

impl<G: ClusterGateway> DryRun<G> {
    pub fn new(inner: G) -> Self {
        DryRun {
            inner,
            created: Mutex::new(Vec::new()),
        }
    }
}

impl<G: ClusterGateway> ClusterGateway for DryRun<G> {
    fn service_exists(&self, kind: &ServiceKind, name: &str) -> Result<bool, GatewayError> {
        self.inner.service_exists(kind, name)
    }

    fn create_service(
        &self,
        kind: &ServiceKind,
        name: &str,
        config: &Settings,
        roles: &[RoleInstance],
    ) -> Result<(), GatewayError> {
        info!(
            "[dry run] would create {kind} service '{name}' with {} config entries",
            config.len()
        );
        for role in roles {
            info!("[dry run]     role {role}");
        }
        self.created
            .lock()
            .unwrap()
            .push((kind.clone(), name.to_string()));
        Ok(())
    }

    fn list_role_config_groups(
        &self,
        kind: &ServiceKind,
        name: &str,
    ) -> Result<Vec<RoleConfigGroup>, GatewayError> {
        let created = self
            .created
            .lock()
            .unwrap()
            .iter()
            .any(|(k, n)| k == kind && n == name);
        if created {
            return Ok(Vec::new());
        }
        self.inner.list_role_config_groups(kind, name)
    }

    fn update_role_config_group(
        &self,
        _kind: &ServiceKind,
        name: &str,
        group: &str,
        config: &Settings,
    ) -> Result<(), GatewayError> {
        info!("[dry run] would set role config group '{group}' of '{name}':");
        for (key, value) in config {
            info!("[dry run]     {key}={value}");
        }
        Ok(())
    }
}
