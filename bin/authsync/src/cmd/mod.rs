//! Built-in `authsync` commands.
use clap::Args;
use clap::Parser;
use clap::Subcommand;

pub mod create_model;
pub mod server;

/// Keep a relationship-based authorization store in sync with managed resources.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the authsync configuration to use.
    #[arg(short = 'c', long = "config", default_value_t = String::from("authsync.yaml"))]
    pub config: String,

    /// Select the authsync command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Select the authsync command to run.
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Publish the embedded authorization model to the store, creating the store if needed.
    CreateModel(CreateModelArgs),

    /// Validate the authorization store and process entitlement changes until shutdown.
    #[command(alias = "run")]
    Server,
}

/// Arguments to the `create-model` command.
#[derive(Args, Clone, Debug)]
pub struct CreateModelArgs {
    /// Name of the store to create when no store ID is configured.
    #[arg(long, default_value_t = String::from("authsync"))]
    pub store_name: String,
}
