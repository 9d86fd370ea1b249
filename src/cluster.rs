// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::collections::HashMap;

use log::debug;

use crate::{
    config::{Config, ConfigError, Settings},
    service::{role_config_key, ServiceKind, ServiceSpec},
};

pub const CLUSTER_SECTION: &str = "CLUSTER";
pub const CLUSTER_NAME_KEY: &str = "cluster_name";
pub const CLUSTER_SERVICES_KEY: &str = "services";

/// Role-level configuration for every section of the config file, looked up by role type.
///
/// This is a snapshot taken when the Cluster is built, so that reconciliation never goes back to
/// the config document.
#[derive(Debug, Clone, Default)]
pub struct RoleConfigs {
    sections: HashMap<String, Settings>,
}

impl RoleConfigs {
    pub fn from_config(config: &Config) -> Self {
        RoleConfigs {
            sections: config
                .section_names()
                .map(|name| (name.to_string(), config.section_values(name)))
                .collect(),
        }
    }

    /// The declared configuration for `role_type` in a service of `kind`. A role type with no
    /// section, or an empty section, resolves to an empty list.
    pub fn resolve(&self, kind: &ServiceKind, role_type: &str) -> Settings {
        self.sections
            .get(&role_config_key(kind, role_type))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a non-empty config section exists for `role_type` in a service of `kind`.
    pub fn is_declared(&self, kind: &ServiceKind, role_type: &str) -> bool {
        self.sections
            .get(&role_config_key(kind, role_type))
            .is_some_and(|s| !s.is_empty())
    }
}

/// Cluster is the in-memory model of the desired state of a cluster.
///
/// The config file is organized by section; the Cluster is organized by service, in the order
/// the services are listed in the `[CLUSTER]` section. It is built once and never mutated.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub services: Vec<ServiceSpec>,
    pub role_configs: RoleConfigs,
}

impl Cluster {
    /// Load the config file at `path` and build a Cluster from it.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let name = config.scalar(CLUSTER_SECTION, CLUSTER_NAME_KEY)?;

        let mut services: Vec<ServiceSpec> = Vec::new();
        for entry in config.list(CLUSTER_SECTION, CLUSTER_SERVICES_KEY)? {
            let kind = ServiceKind::from_entry(config, &entry)?;
            let spec = kind.to_spec(config)?;
            if services.iter().any(|s| s.name == spec.name) {
                return Err(ConfigError::DuplicateService(spec.name));
            }
            debug!("Declared {} service '{}'", spec.kind, spec.name);
            services.push(spec);
        }

        Ok(Cluster {
            name,
            services,
            role_configs: RoleConfigs::from_config(config),
        })
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Restrict the cluster to the named services, keeping declaration order.
    ///
    /// Returns the first name that does not match any declared service as an error.
    pub fn retain_services(&mut self, names: &[String]) -> Result<(), String> {
        if let Some(unknown) = names.iter().find(|n| self.get_service(n).is_none()) {
            return Err(unknown.clone());
        }
        self.services.retain(|s| names.contains(&s.name));
        Ok(())
    }

    pub fn num_role_instances(&self) -> usize {
        self.services
            .iter()
            .map(|s| s.role_instances().len())
            .sum()
    }

    pub fn print_summary(&self) {
        println!(
            "Cluster '{}': {} services, {} role instances",
            self.name,
            self.services.len(),
            self.num_role_instances()
        );
        for service in self.services.iter() {
            println!(
                "  {} ({}): {} service config entries",
                service.name,
                service.kind,
                service.service_config.len()
            );
            for role in service.roles.iter() {
                let config_note = if self.role_configs.is_declared(&service.kind, &role.role_type) {
                    format!(
                        "config from [{}]",
                        role_config_key(&service.kind, &role.role_type)
                    )
                } else {
                    "no role config".to_string()
                };
                println!(
                    "    {:<28} {:<40} {}",
                    role.role_type,
                    role.hosts.join(","),
                    config_note
                );
            }
            for role_type in service.invalid_role_types.iter() {
                println!("    {role_type:<28} INVALID role type for {}", service.kind);
            }
        }
    }
}
