// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod deploy;
pub mod status;
pub mod validate;

use deploy::DeployArgs;

use clap::{Parser, Subcommand};

use crate::{cluster::Cluster, cm_api::ApiSettings, config::Config};

/// A `HandledError` represents an error that has already been handled. When you call a function
/// that returns a `HandledError` or `HandledResult`, you don't need to do anything with that error,
/// other than just be aware that it happened, and return it on to your caller.
///
/// `main()` has a special responsibility: since its "caller" is, in a certain sense, the operating
/// system, `main()` must return a nonzero exit status when it gets a `HandledError`.
///
/// The primary way to construct a `HandledError` is with the `handle_err()` function, which turns a
/// generic error into a `HandledError`, and also runs some caller-provided code to handle the
/// error. That provided code would normally do something like report the error to stderr.
#[derive(Debug, PartialEq)]
pub struct HandledError {}

pub type HandledResult<T> = std::result::Result<T, HandledError>;

pub fn handled_error() -> HandledResult<()> {
    HandledResult::Err(HandledError {})
}

pub trait Handle<T, F> {
    fn handle_err(self, handler: F) -> HandledResult<T>;
}

impl<T, E, F: FnOnce(E)> Handle<T, F> for std::result::Result<T, E> {
    /// Handle an error by running the provided `handler` code, giving it the error.
    ///
    /// Then, return a `HandledResult`, so that transitive callers of this function know that they
    /// do not need to do anything further to handle the error.
    fn handle_err(self, handler: F) -> HandledResult<T> {
        self.map_err(|e| {
            handler(e);
            HandledError {}
        })
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cluster description file. Defaults to $CMDEPLOY_CONFIG, then /etc/cmdeploy/cluster.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision missing services and push role configuration.
    Deploy(DeployArgs),
    /// Check the config file and print the desired cluster layout.
    Validate,
    /// Show which declared services exist on the management server.
    Status,
}

impl Cli {
    pub fn config_path(&self) -> String {
        match &self.config {
            Some(path) => path.clone(),
            None => crate::default_config_path(),
        }
    }
}

/// Load the config document named on the command line, reporting any failure.
fn load_config(cli: &Cli) -> HandledResult<Config> {
    let path = cli.config_path();
    Config::from_file(&path).handle_err(|e| eprintln!("{e}"))
}

fn load_cluster(config: &Config) -> HandledResult<Cluster> {
    Cluster::from_config(config).handle_err(|e| eprintln!("Invalid cluster description: {e}"))
}

fn load_api_settings(config: &Config) -> HandledResult<ApiSettings> {
    ApiSettings::from_config(config)
        .handle_err(|e| eprintln!("Invalid management server settings: {e}"))
}

pub fn main(cli: &Cli) -> HandledResult<()> {
    match &cli.command {
        Commands::Deploy(args) => deploy::deploy(cli, args),
        Commands::Validate => validate::validate(cli),
        Commands::Status => status::status(cli),
    }
}
