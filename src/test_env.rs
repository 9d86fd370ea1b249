// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use crate::{
    cluster::Cluster,
    config::Settings,
    gateway::{ClusterGateway, GatewayError, RoleConfigGroup},
    service::{RoleInstance, ServiceKind},
};

/// Given a relative `path` in the test directory, prepend the full path to the test directory.
pub fn test_path(path: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").unwrap() + "/tests/" + path
}

/// Build a Cluster from a config file in the test directory.
pub fn test_cluster(path: &str) -> Cluster {
    Cluster::new(&test_path(path)).unwrap()
}

/// A call made to the MockGateway, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Exists {
        service: String,
    },
    Create {
        service: String,
        kind: String,
        config: Settings,
        roles: Vec<RoleInstance>,
    },
    ListGroups {
        service: String,
    },
    Update {
        service: String,
        group: String,
        config: Settings,
    },
}

/// The state of one service on the simulated management server.
#[derive(Debug, Default, Clone)]
pub struct MockService {
    pub kind: String,
    pub roles: Vec<RoleInstance>,
    pub groups: Vec<RoleConfigGroup>,
    /// Current configuration of each role config group, by group name.
    pub group_configs: HashMap<String, Settings>,
}

#[derive(Debug, Default)]
struct MockState {
    services: HashMap<String, MockService>,
    calls: Vec<Call>,
    fail_exists: HashSet<String>,
    fail_create: HashSet<String>,
    fail_list: HashSet<String>,
    fail_update: HashSet<(String, String)>,
}

/// An in-memory ClusterGateway that behaves like a management server and records every call.
///
/// Creating a service gives it one role config group per distinct role type, named
/// `{service}-{ROLETYPE}-BASE` the way the real server names base groups. Failures can be
/// injected per service (or per group) for each operation.
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

fn rejected(message: &str) -> GatewayError {
    GatewayError::Rejected {
        status: 400,
        message: message.to_string(),
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service that already exists on the server with the given role config groups.
    pub fn with_service(self, name: &str, kind: &str, groups: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.services.insert(
                name.to_string(),
                MockService {
                    kind: kind.to_string(),
                    roles: Vec::new(),
                    groups: groups
                        .iter()
                        .map(|(group, role_type)| RoleConfigGroup {
                            name: group.to_string(),
                            role_type: role_type.to_string(),
                        })
                        .collect(),
                    group_configs: HashMap::new(),
                },
            );
        }
        self
    }

    /// Make the existence check for `service` fail as if the server could not be reached.
    pub fn fail_exists(self, service: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_exists
            .insert(service.to_string());
        self
    }

    pub fn fail_create(self, service: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_create
            .insert(service.to_string());
        self
    }

    pub fn fail_list(self, service: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_list
            .insert(service.to_string());
        self
    }

    pub fn fail_update(self, service: &str, group: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_update
            .insert((service.to_string(), group.to_string()));
        self
    }

    /// Set a group's configuration directly, as if an administrator had changed it by hand.
    pub fn set_group_config(&self, service: &str, group: &str, config: Settings) {
        let mut state = self.state.lock().unwrap();
        let service = state.services.get_mut(service).unwrap();
        service.group_configs.insert(group.to_string(), config);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn creates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .collect()
    }

    pub fn updates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .collect()
    }

    pub fn service(&self, name: &str) -> Option<MockService> {
        self.state.lock().unwrap().services.get(name).cloned()
    }

    pub fn group_config(&self, service: &str, group: &str) -> Option<Settings> {
        self.state
            .lock()
            .unwrap()
            .services
            .get(service)?
            .group_configs
            .get(group)
            .cloned()
    }
}

impl ClusterGateway for MockGateway {
    fn service_exists(&self, _kind: &ServiceKind, name: &str) -> Result<bool, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Exists {
            service: name.to_string(),
        });
        if state.fail_exists.contains(name) {
            return Err(GatewayError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(state.services.contains_key(name))
    }

    fn create_service(
        &self,
        kind: &ServiceKind,
        name: &str,
        config: &Settings,
        roles: &[RoleInstance],
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            service: name.to_string(),
            kind: kind.tag().to_string(),
            config: config.clone(),
            roles: roles.to_vec(),
        });
        if state.fail_create.contains(name) {
            return Err(rejected("invalid role assignment"));
        }
        if state.services.contains_key(name) {
            return Err(rejected("service already exists"));
        }

        let mut groups: Vec<RoleConfigGroup> = Vec::new();
        for role in roles {
            if !groups.iter().any(|g| g.role_type == role.role_type) {
                groups.push(RoleConfigGroup {
                    name: format!("{name}-{}-BASE", role.role_type),
                    role_type: role.role_type.clone(),
                });
            }
        }
        state.services.insert(
            name.to_string(),
            MockService {
                kind: kind.tag().to_string(),
                roles: roles.to_vec(),
                groups,
                group_configs: HashMap::new(),
            },
        );
        Ok(())
    }

    fn list_role_config_groups(
        &self,
        _kind: &ServiceKind,
        name: &str,
    ) -> Result<Vec<RoleConfigGroup>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListGroups {
            service: name.to_string(),
        });
        if state.fail_list.contains(name) {
            return Err(rejected("cannot list role config groups"));
        }
        match state.services.get(name) {
            Some(service) => Ok(service.groups.clone()),
            None => Err(GatewayError::Rejected {
                status: 404,
                message: format!("service '{name}' not found"),
            }),
        }
    }

    fn update_role_config_group(
        &self,
        _kind: &ServiceKind,
        name: &str,
        group: &str,
        config: &Settings,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            service: name.to_string(),
            group: group.to_string(),
            config: config.clone(),
        });
        if state
            .fail_update
            .contains(&(name.to_string(), group.to_string()))
        {
            return Err(rejected("invalid configuration"));
        }
        let Some(service) = state.services.get_mut(name) else {
            return Err(GatewayError::Rejected {
                status: 404,
                message: format!("service '{name}' not found"),
            });
        };
        service
            .group_configs
            .insert(group.to_string(), config.clone());
        Ok(())
    }
}
