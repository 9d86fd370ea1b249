// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::commands::{load_api_settings, load_cluster, load_config, Cli, HandledResult};

pub fn validate(cli: &Cli) -> HandledResult<()> {
    let config = load_config(cli)?;
    let cluster = load_cluster(&config)?;
    let settings = load_api_settings(&config)?;

    println!("Management server: {}", settings.base_url());
    cluster.print_summary();

    let invalid: usize = cluster
        .services
        .iter()
        .map(|s| s.invalid_role_types.len())
        .sum();
    if invalid > 0 {
        eprintln!("{invalid} invalid role types would not be deployed.");
        return crate::commands::handled_error();
    }

    Ok(())
}
