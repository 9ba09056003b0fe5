//! Shield Server
//!
//! Source of truth for the single shield claim. Exposes the claim over HTTP
//! and pushes every change to connected clients.
//!
//! # Architecture
//!
//! - **Store**: the claim slot with compare-and-set claim semantics
//! - **API**: `GET /status`, `POST /claim`, `POST /reset`
//! - **WebSocket**: `/ws/display` pushes `status`, `claimed` and `reset` events
//!
//! # Example
//!
//! ```no_run
//! use shield_server::{ServerConfig, ShieldServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ShieldServer::new(ServerConfig::from_env()?);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod server;
pub mod store;
pub mod ws;

pub use error::{Error, Result};
pub use server::{ServerConfig, ShieldServer};
pub use store::ClaimStore;
