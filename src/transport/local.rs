//! Local server bootstrap utilities
//!
//! The listener is bound before anything else touches the filesystem so a
//! busy port fails fast.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use tokio::task::JoinHandle;

/// Address exposure policy for the listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindScope {
    Loopback,
    #[default]
    #[serde(rename = "all")]
    AllInterfaces,
}

fn bind_addr(scope: BindScope, port: u16) -> SocketAddr {
    match scope {
        BindScope::Loopback => SocketAddr::from(([127, 0, 0, 1], port)),
        BindScope::AllInterfaces => SocketAddr::from(([0, 0, 0, 0], port)),
    }
}

/// Binds the share listener. Port 0 picks an ephemeral port.
pub fn bind_listener(scope: BindScope, port: u16) -> Result<TcpListener> {
    let addr = bind_addr(scope, port);
    let listener = TcpListener::bind(addr).with_context(|| {
        format!(
            "Failed to bind to {addr} - port already in use or requires elevated privileges.\n\n\
             Is another httpshare instance running?\n\
             Or is another service using this port?"
        )
    })?;

    listener
        .set_nonblocking(true)
        .context("Failed to set listener to non-blocking mode")?;

    Ok(listener)
}

/// A running axum-server instance.
pub struct LocalServer {
    pub port: u16,
    pub handle: axum_server::Handle,
    /// Resolves once the server stopped and every connection closed.
    pub task: JoinHandle<()>,
}

/// Starts serving `app` on `listener` in the background.
pub fn start_local_server(app: axum::Router, listener: TcpListener) -> Result<LocalServer> {
    let port = listener.local_addr()?.port();

    let handle = axum_server::Handle::new();
    let server_handle = handle.clone();

    let task = tokio::spawn(async move {
        if let Err(e) = axum_server::from_tcp(listener)
            .handle(server_handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(LocalServer { port, handle, task })
}

/// Best-effort local non-loopback IP discovery for the share URL.
pub fn get_local_ip() -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind socket for IP detection")?;

    socket
        .connect("8.8.8.8:53")
        .context("Failed to connect socket for IP detection")?;

    let local_addr = socket.local_addr().context("Failed to get local address")?;

    Ok(local_addr.ip())
}

/// Host to advertise in the download link for a given bind scope.
pub fn advertised_ip(scope: BindScope) -> IpAddr {
    let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    match scope {
        BindScope::Loopback => loopback,
        BindScope::AllInterfaces => match get_local_ip() {
            Ok(ip) if !ip.is_loopback() && !ip.is_unspecified() => ip,
            Ok(_) => loopback,
            Err(err) => {
                tracing::debug!("Falling back to loopback address: {:#}", err);
                loopback
            }
        },
    }
}
