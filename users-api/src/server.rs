use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpSocket};
use tracing::{info, warn};

use crate::{router, service::UserService};

/// HTTP front end for one [`UserService`].
pub struct Server {
    listener: TcpListener,
    service: Arc<UserService>,
}

impl Server {
    pub fn new(listener: TcpListener, service: Arc<UserService>) -> Self {
        Self { listener, service }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server { listener, service } = self;
        axum::serve(listener, router::app(service))
            .with_graceful_shutdown(shutdown)
            .await
            .context("http server failed")?;
        info!("server stopped");
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

/// Binds a listener on `addr`.
///
/// With `reuse_port` several processes can bind the same address and the
/// kernel spreads incoming connections across them.
pub fn bind(addr: SocketAddr, reuse_port: bool) -> Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("failed to create socket")?;

    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    if reuse_port {
        set_reuseport(&socket)?;
    }

    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    socket
        .listen(1024)
        .with_context(|| format!("failed to listen on {addr}"))
}

#[cfg(unix)]
fn set_reuseport(socket: &TcpSocket) -> Result<()> {
    socket
        .set_reuseport(true)
        .context("failed to set SO_REUSEPORT")
}

#[cfg(not(unix))]
fn set_reuseport(_socket: &TcpSocket) -> Result<()> {
    anyhow::bail!("sharing a port between workers needs SO_REUSEPORT, which this platform lacks")
}
