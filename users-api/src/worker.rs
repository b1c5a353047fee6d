//! Worker side of cluster mode.
//!
//! A worker is a full copy of the service bound to the shared port. It talks
//! to the primary through its stdio pipes:
//!
//! - stdout carries [`WorkerMessage`] lines (ready, then one snapshot per mutation)
//! - stdin is never written by the primary; EOF on it means the primary is gone

use std::{io, net::SocketAddr, sync::Arc, thread};

use anyhow::Result;
use tokio::{
    io::AsyncWrite,
    select,
    sync::{mpsc, oneshot},
};
use tracing::{info, warn};

use crate::{
    message::{WorkerId, WorkerMessage, write_message},
    model::User,
    server::{Server, bind},
    service::UserService,
    store::UserStore,
};

pub async fn run(id: WorkerId, addr: SocketAddr) -> Result<()> {
    let listener = bind(addr, true)?;
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
    let service = Arc::new(UserService::new(UserStore::new()).with_snapshot_sink(snapshot_tx));
    let server = Server::new(listener, service);
    let local_addr = server.local_addr()?;

    let mut stdout = tokio::io::stdout();
    write_message(
        &mut stdout,
        &WorkerMessage::Ready {
            worker: id,
            pid: std::process::id(),
            addr: local_addr,
        },
    )
    .await?;
    info!(worker = id, addr = %local_addr, "worker listening");

    tokio::spawn(forward_snapshots(id, snapshot_rx, stdout));

    let primary_gone = watch_primary();
    server
        .run_until(async move {
            select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!(error = ?err, "failed to install ctrl-c handler");
                    }
                }
                _ = primary_gone => {
                    info!(worker = id, "primary closed the channel; shutting down");
                }
            }
        })
        .await
}

/// Writes each snapshot to the primary until the service or the pipe goes away.
pub async fn forward_snapshots<W>(
    worker: WorkerId,
    mut snapshots: mpsc::UnboundedReceiver<Vec<User>>,
    mut writer: W,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(users) = snapshots.recv().await {
        let message = WorkerMessage::Snapshot { worker, users };
        if let Err(err) = write_message(&mut writer, &message).await {
            warn!(worker, error = ?err, "failed to send snapshot to primary");
            break;
        }
    }
}

/// Resolves once stdin reaches EOF.
///
/// Reading happens on a plain thread: tokio's stdin would keep the runtime
/// from shutting down while a read is pending.
fn watch_primary() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        if let Err(err) = io::copy(&mut stdin, &mut io::sink()) {
            warn!(error = ?err, "failed to read from primary");
        }
        let _ = tx.send(());
    });
    rx
}
