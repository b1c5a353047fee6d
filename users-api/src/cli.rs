use std::net::{IpAddr, SocketAddr};

use clap::{Args, Parser, Subcommand};

use crate::message::WorkerId;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the users API from a single process.
    Serve(ServeArgs),
    /// Start one worker process per CPU, all sharing the same port.
    Cluster(ClusterArgs),
    /// Run a single worker; started by `cluster`, not meant to be run by hand.
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Address to bind.
    #[arg(long, env = "USERS_API_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind. Use 0 for an ephemeral port (serve only).
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,
}

impl ListenArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub listen: ListenArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ClusterArgs {
    #[command(flatten)]
    pub listen: ListenArgs,

    /// Number of worker processes. Defaults to the number of CPUs.
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct WorkerArgs {
    /// Identifier assigned by the primary.
    #[arg(long)]
    pub id: WorkerId,

    #[command(flatten)]
    pub listen: ListenArgs,
}
