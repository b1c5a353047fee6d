//! Primary side of cluster mode.
//!
//! The primary starts one worker process per CPU (or `--workers`), all
//! bound to the same port, and listens to what they report on their stdout.
//! Snapshots are kept per worker for observability only. Workers never see
//! each other's records, so clients may get different answers depending on
//! which worker the kernel hands their connection to.

use std::{
    collections::HashMap,
    future::Future,
    net::SocketAddr,
    path::PathBuf,
    process::Stdio,
    sync::Arc,
};

use anyhow::{Context, Result, ensure};
use futures_util::future::join_all;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use tokio::{
    io::{AsyncBufRead, BufReader},
    process::{Child, Command},
    select,
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    message::{WorkerId, WorkerMessage, read_message},
    model::User,
};

/// Number of logical CPUs, never less than one.
pub fn cpu_count() -> usize {
    let system =
        System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::everything()));
    system.cpus().len().max(1)
}

pub struct ClusterConfig {
    pub addr: SocketAddr,
    pub workers: usize,
    /// Executable started for each worker, normally the current binary.
    pub program: PathBuf,
}

pub struct Coordinator {
    config: ClusterConfig,
    state: Arc<CoordinatorState>,
}

impl Coordinator {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        ensure!(config.workers > 0, "cluster needs at least one worker");
        ensure!(
            config.addr.port() != 0,
            "cluster workers must share a fixed port; pick one with --port"
        );
        Ok(Self {
            config,
            state: Arc::new(CoordinatorState::default()),
        })
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Coordinator { config, state } = self;
        info!(
            workers = config.workers,
            addr = %config.addr,
            pid = std::process::id(),
            "starting cluster"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut supervisors = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let id = WorkerId::try_from(index + 1).context("too many workers")?;
            let child = spawn_worker(&config, id)?;
            supervisors.push(supervise_worker(id, child, Arc::clone(&state), stop_rx.clone()));
        }

        shutdown.await;
        info!("cluster shutting down");
        if stop_tx.send(true).is_err() {
            debug!("every worker had already exited");
        }
        join_all(supervisors).await;

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn spawn_worker(config: &ClusterConfig, id: WorkerId) -> Result<Child> {
    Command::new(&config.program)
        .arg("worker")
        .arg("--id")
        .arg(id.to_string())
        .arg("--host")
        .arg(config.addr.ip().to_string())
        .arg("--port")
        .arg(config.addr.port().to_string())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn worker {id}"))
}

/// Drains a worker's messages and reaps it, killing it when told to stop.
fn supervise_worker(
    id: WorkerId,
    mut child: Child,
    state: Arc<CoordinatorState>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let stdout = child.stdout.take();
    tokio::spawn(async move {
        let pump = tokio::spawn(async move {
            let Some(stdout) = stdout else {
                warn!(worker = id, "worker stdout was not captured");
                return;
            };
            let mut reader = BufReader::new(stdout);
            if let Err(err) = pump_worker_messages(id, &mut reader, &state).await {
                warn!(worker = id, error = ?err, "worker channel failed");
            }
        });

        select! {
            status = child.wait() => match status {
                Ok(status) => warn!(worker = id, %status, "worker exited"),
                Err(err) => warn!(worker = id, error = ?err, "failed to wait for worker"),
            },
            _ = stop.changed() => {
                if let Err(err) = child.kill().await {
                    warn!(worker = id, error = ?err, "failed to stop worker");
                }
            }
        }

        if let Err(err) = pump.await {
            warn!(worker = id, error = ?err, "worker channel task panicked");
        }
    })
}

/// Reads messages from one worker until its pipe closes.
pub async fn pump_worker_messages<R>(
    worker: WorkerId,
    reader: &mut R,
    state: &CoordinatorState,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(message) = read_message::<_, WorkerMessage>(reader).await? {
        state.record(worker, message).await;
    }
    debug!(worker, "worker channel closed");
    Ok(())
}

/// What the primary knows about its workers.
#[derive(Default)]
pub struct CoordinatorState {
    pids: Mutex<HashMap<WorkerId, u32>>,
    snapshots: Mutex<HashMap<WorkerId, Vec<User>>>,
}

impl CoordinatorState {
    async fn record(&self, channel: WorkerId, message: WorkerMessage) {
        match message {
            WorkerMessage::Ready { worker, pid, addr } => {
                if worker != channel {
                    warn!(channel, worker, "worker reported a different id");
                }
                info!(worker = channel, pid, %addr, "worker ready");
                self.pids.lock().await.insert(channel, pid);
            }
            WorkerMessage::Snapshot { worker, users } => {
                if worker != channel {
                    warn!(channel, worker, "worker reported a different id");
                }
                info!(worker = channel, records = users.len(), "worker snapshot");
                self.snapshots.lock().await.insert(channel, users);
            }
        }
    }

    /// Latest snapshot reported by `worker`.
    pub async fn snapshot(&self, worker: WorkerId) -> Option<Vec<User>> {
        self.snapshots.lock().await.get(&worker).cloned()
    }

    pub async fn pid(&self, worker: WorkerId) -> Option<u32> {
        self.pids.lock().await.get(&worker).copied()
    }
}
