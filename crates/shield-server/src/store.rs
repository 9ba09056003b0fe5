//! The authoritative claim slot.
//!
//! One [`ClaimStore`] exists per server process. The slot is guarded by a
//! mutex so `claim` behaves as compare-and-set: it succeeds only while the
//! slot is empty. Every successful mutation is broadcast while the lock is
//! still held, which keeps broadcast order identical to mutation order.

use crate::error::{Error, Result};
use shield_protocol::{ClaimState, PushMessage};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

/// Default capacity of the push broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Holds the single claim and fans out changes to subscribers.
pub struct ClaimStore {
    slot: Mutex<Option<String>>,
    events: broadcast::Sender<PushMessage>,
}

impl Default for ClaimStore {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl ClaimStore {
    /// Create an empty store whose broadcast channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            slot: Mutex::new(None),
            events,
        }
    }

    /// Current state.
    pub async fn state(&self) -> ClaimState {
        snapshot(&*self.slot.lock().await)
    }

    /// Try to take the shield for `name`.
    ///
    /// Fails with [`Error::AlreadyClaimed`] if anyone holds it, otherwise with
    /// [`Error::InvalidName`] if the trimmed name is empty.
    pub async fn claim(&self, name: &str) -> Result<ClaimState> {
        let mut slot = self.slot.lock().await;
        if let Some(holder) = slot.as_ref() {
            debug!("Claim by {:?} rejected, held by {}", name, holder);
            return Err(Error::AlreadyClaimed {
                holder: holder.clone(),
            });
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidName);
        }

        *slot = Some(name.to_string());
        info!("Shield claimed by {}", name);
        self.broadcast(PushMessage::Claimed {
            name: name.to_string(),
        });
        Ok(snapshot(&slot))
    }

    /// Clear the claim. Always broadcasts, even if nothing was held.
    pub async fn reset(&self) -> ClaimState {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            info!("Shield reset (was held by {})", previous);
        } else {
            info!("Shield reset (was empty)");
        }
        self.broadcast(PushMessage::Reset);
        snapshot(&slot)
    }

    /// Snapshot the state and register for every later change.
    ///
    /// Both happen under the slot lock, so no event can fall between the
    /// snapshot and the first received broadcast.
    pub async fn subscribe(&self) -> (ClaimState, broadcast::Receiver<PushMessage>) {
        let slot = self.slot.lock().await;
        (snapshot(&slot), self.events.subscribe())
    }

    fn broadcast(&self, message: PushMessage) {
        match self.events.send(message) {
            Ok(receivers) => debug!("Broadcast to {} subscribers", receivers),
            Err(_) => debug!("Broadcast with no subscribers"),
        }
    }
}

fn snapshot(slot: &Option<String>) -> ClaimState {
    match slot {
        Some(name) => ClaimState::held(name.clone()),
        None => ClaimState::empty(),
    }
}
