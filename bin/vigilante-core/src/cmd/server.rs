//! Run the Vigilante server.
use anyhow::Result;

use vigilante_conf::Conf;

use super::Cli;
use crate::init::Server;

/// Run the Vigilante control plane server.
pub async fn run(_cli: Cli, conf: Conf) -> Result<()> {
    Server::configure(conf).await?.run().await
}
