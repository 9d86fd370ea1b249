// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod cluster;
pub mod cm_api;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod reconcile;
pub mod service;
pub mod test_env;

pub fn default_config_path() -> String {
    match std::env::var("CMDEPLOY_CONFIG") {
        Ok(conf) => conf,
        Err(_) => "/etc/cmdeploy/cluster.toml".to_string(),
    }
}
