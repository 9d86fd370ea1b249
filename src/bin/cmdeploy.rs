// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Parser;

use cmdeploy_lib::{
    self,
    commands::{self, Cli},
};

/// The cmdeploy binary reconciles a cluster against its description file.
fn main() {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("CMDEPLOY_LOG", default_level),
    )
    .init();

    if commands::main(&args).is_err() {
        std::process::exit(1);
    }
}
