//! Shield Protocol
//!
//! Wire types exchanged between the shield server and its clients.
//!
//! - **HTTP**: [`ClaimState`] from `GET /status`, [`ClaimRequest`] into
//!   `POST /claim`, [`ErrorBody`] on rejection.
//! - **Push**: [`PushMessage`] frames over the `/ws/display` WebSocket.

use serde::{Deserialize, Serialize};

/// HTTP path for the snapshot endpoint.
pub const STATUS_PATH: &str = "/status";
/// HTTP path for claim attempts.
pub const CLAIM_PATH: &str = "/claim";
/// HTTP path for the operator reset.
pub const RESET_PATH: &str = "/reset";
/// WebSocket path for pushed state changes.
pub const PUSH_PATH: &str = "/ws/display";

/// Authoritative claim state.
///
/// `claimed` is true iff `name` holds a non-blank name. Construct through
/// [`ClaimState::empty`] or [`ClaimState::held`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimState {
    pub claimed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ClaimState {
    /// Nobody holds the shield.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shield is held by `name`.
    pub fn held(name: impl Into<String>) -> Self {
        Self {
            claimed: true,
            name: Some(name.into()),
        }
    }

    /// Current holder, treating a blank name as absent.
    pub fn holder(&self) -> Option<&str> {
        non_blank(self.name.as_deref())
    }
}

/// Body of `POST /claim`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub name: String,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Messages pushed to display clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Snapshot sent on connect (and after a lagging subscriber resyncs)
    Status {
        #[serde(default)]
        name: Option<String>,
    },
    /// Someone just claimed the shield
    Claimed { name: String },
    /// The operator cleared the claim
    Reset,
}

impl PushMessage {
    /// Snapshot message for the given state.
    pub fn status(state: &ClaimState) -> Self {
        PushMessage::Status {
            name: state.holder().map(str::to_owned),
        }
    }

    /// The holder this message reports, if any.
    ///
    /// Clients reconcile on this value rather than on the message type, so a
    /// `status` and a `claimed` carrying the same name are indistinguishable.
    pub fn observed_name(&self) -> Option<&str> {
        match self {
            PushMessage::Status { name } => non_blank(name.as_deref()),
            PushMessage::Claimed { name } => non_blank(Some(name)),
            PushMessage::Reset => None,
        }
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.trim().is_empty())
}
