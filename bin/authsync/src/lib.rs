//! Combine individual logical units to initialise and run an authsync process.
use anyhow::Result;
use clap::Parser;

use authsync_conf::Conf;

mod cmd;
mod init;

pub use self::cmd::Cli;
pub use self::init::Process;

/// Initialise the authsync process and invoke a command implementation.
pub async fn execute(cli: Cli, conf: Conf) -> Result<()> {
    match cli.command {
        cmd::Command::CreateModel(args) => cmd::create_model::run(args, conf).await,
        cmd::Command::Server => cmd::server::run(conf).await,
    }
}

/// Initialise the async runtime for the process and invoke [`execute`].
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let conf = authsync_conf::load(&cli.config)?;
    conf.runtime
        .tokio
        .clone()
        .into_runtime()?
        .block_on(execute(cli, conf))
}
