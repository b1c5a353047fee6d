use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use users_api::{
    cli::{Cli, Command},
    cluster::{ClusterConfig, Coordinator, cpu_count},
    server::{Server, bind},
    service::UserService,
    store::UserStore,
    worker,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Workers use stdout to talk to the primary, so logs always go to stderr.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let listener = bind(args.listen.addr(), false)?;
            let server = Server::new(listener, Arc::new(UserService::new(UserStore::new())));
            let addr = server.local_addr()?;
            info!("server listening on {}", addr);
            if let Err(err) = server.run_until_ctrl_c().await {
                warn!("server exited with error: {err:?}");
                return Err(err);
            }
        }
        Command::Cluster(args) => {
            let program = std::env::current_exe().context("failed to locate own executable")?;
            let coordinator = Coordinator::new(ClusterConfig {
                addr: args.listen.addr(),
                workers: args.workers.unwrap_or_else(cpu_count),
                program,
            })?;
            coordinator.run_until_ctrl_c().await?;
        }
        Command::Worker(args) => worker::run(args.id, args.listen.addr()).await?,
    }

    Ok(())
}
