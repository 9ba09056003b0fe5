//! Client transports.
//!
//! [`ClaimApi`] is the request/response side (`/status`, `/claim`, `/reset`)
//! and [`PushConnector`] opens the push stream. The sync and flow layers only
//! see these traits; [`HttpApi`] and [`WsConnector`] are the network
//! implementations.

use crate::error::{Error, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{header::CACHE_CONTROL, StatusCode};
use shield_protocol::{ClaimRequest, ClaimState, ErrorBody, CLAIM_PATH, RESET_PATH, STATUS_PATH};
use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// Raw text frames from one push connection. The stream ends (or yields an
/// error) when the connection is lost.
pub type PushStream = BoxStream<'static, Result<String>>;

/// Request/response access to the claim.
pub trait ClaimApi: Send + Sync + 'static {
    /// Fetch a snapshot.
    fn status(&self) -> impl Future<Output = Result<ClaimState>> + Send;

    /// Try to take the shield.
    fn claim(&self, name: &str) -> impl Future<Output = Result<ClaimState>> + Send;

    /// Clear the claim.
    fn reset(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens push connections.
pub trait PushConnector: Send + Sync + 'static {
    fn connect(&self) -> impl Future<Output = Result<PushStream>> + Send;
}

/// Install ring as the process-wide rustls provider, for `https` and `wss`.
fn init_tls() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // Err means a provider is already installed, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// [`ClaimApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        init_tls();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ClaimApi for HttpApi {
    async fn status(&self) -> Result<ClaimState> {
        let res = self
            .client
            .get(self.url(STATUS_PATH))
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        Ok(res.error_for_status()?.json().await?)
    }

    async fn claim(&self, name: &str) -> Result<ClaimState> {
        let res = self
            .client
            .post(self.url(CLAIM_PATH))
            .json(&ClaimRequest {
                name: name.to_string(),
            })
            .send()
            .await?;
        if res.status().is_success() {
            return Ok(res.json().await?);
        }
        Err(rejection(res).await)
    }

    async fn reset(&self) -> Result<()> {
        let res = self.client.post(self.url(RESET_PATH)).send().await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(rejection(res).await)
    }
}

async fn rejection(res: reqwest::Response) -> Error {
    let status = res.status();
    let detail = match res.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) if status == StatusCode::CONFLICT => "Shield already claimed.".to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request rejected")
            .to_string(),
    };
    if status == StatusCode::CONFLICT {
        Error::AlreadyClaimed { detail }
    } else {
        Error::Rejected {
            status: status.as_u16(),
            detail,
        }
    }
}

/// [`PushConnector`] over WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        init_tls();
        Self { url: url.into() }
    }
}

impl PushConnector for WsConnector {
    async fn connect(&self) -> Result<PushStream> {
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let frames = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Close(_)) => Some(Err(Error::Transport("closed by server".into()))),
                Ok(_) => None,
                Err(e) => Some(Err(e.into())),
            }
        });
        Ok(frames.boxed())
    }
}
