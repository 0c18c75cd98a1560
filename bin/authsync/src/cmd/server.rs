//! Run the authsync server.
use anyhow::Result;

use authsync_conf::Conf;

use crate::init::Process;

/// Validate the authorization store and process entitlement changes until shutdown.
pub async fn run(conf: Conf) -> Result<()> {
    let process = Process::configure(conf).await?;
    if let Err(error) = process.validate().await {
        // Release the pool workers before the process exits.
        process.authorizer.shutdown(&process.context).await?;
        return Err(error);
    }
    process.wait().await
}
