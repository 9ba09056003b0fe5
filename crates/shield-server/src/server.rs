//! Server configuration and lifecycle.

use crate::api;
use crate::error::{Error, Result};
use crate::store::{ClaimStore, DEFAULT_BROADCAST_CAPACITY};
use axum::Router;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Configuration for a shield server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address
    pub addr: SocketAddr,

    /// Events buffered per push subscriber before it is resynced
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            addr: env_or("SHIELD_ADDR", defaults.addr)?,
            broadcast_capacity: env_or("SHIELD_BROADCAST_CAPACITY", defaults.broadcast_capacity)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

/// A shield server instance. Owns the single [`ClaimStore`].
pub struct ShieldServer {
    store: Arc<ClaimStore>,
    config: ServerConfig,
}

impl ShieldServer {
    /// Create a server with an empty claim.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: Arc::new(ClaimStore::new(config.broadcast_capacity)),
            config,
        }
    }

    /// Shared claim store.
    pub fn store(&self) -> Arc<ClaimStore> {
        Arc::clone(&self.store)
    }

    /// HTTP router bound to this server's store.
    pub fn router(&self) -> Router {
        api::build_router(self.store())
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        tracing::info!("Shield server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}
