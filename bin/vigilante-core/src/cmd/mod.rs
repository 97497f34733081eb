//! Built-in `vigilante-core` commands.
use clap::Parser;
use clap::Subcommand;

pub mod probe;
pub mod server;

/// Vigilante: a Control Plane guardian for clustered Qdrant deployments.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the Vigilante configuration to use.
    #[arg(short = 'c', long = "config", default_value_t = String::from("vigilante.yaml"))]
    pub config: String,

    /// Select the vigilante-core command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Select the vigilante-core command to run.
#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Run the Vigilante control plane server.
    #[command(alias = "run")]
    Server,

    /// Run one Node Registry refresh and Node Prober fan-out, print the resulting
    /// ClusterModel and exit. Useful for diagnosing connectivity without starting the
    /// Monitor Loop or the HTTP API.
    Probe,
}
