//! Public display client.
//!
//! One [`DisplayFlow`] per screen. Its [`run`](DisplayFlow::run) loop is the
//! only place presentation state changes: it waits on the sync channel, the
//! operator's commands, an in-flight reset request and the sequencer's next
//! deadline, and handles whichever comes first.

use crate::error::{Error, Result};
use crate::sequencer::{DisplaySurface, PresentationSequencer};
use crate::stage::GlitchScript;
use crate::sync::{reconcile, Observation, SyncChannel, Transition};
use crate::transport::ClaimApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// How long the reset control stays disabled after a reset request completes.
pub const RESET_COOLDOWN: Duration = Duration::from_millis(500);

/// Operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Clear the claim for everyone
    Reset,
}

/// Display-side orchestration.
pub struct DisplayFlow<A, S> {
    api: Arc<A>,
    sequencer: PresentationSequencer<S>,
    /// The reset control is disabled while a request is in flight
    reset_in_flight: bool,
    reset_ready_at: Option<Instant>,
    /// Observations older than the last completed reset describe the
    /// state it replaced
    stale_before: Option<Instant>,
}

impl<A: ClaimApi, S: DisplaySurface> DisplayFlow<A, S> {
    pub fn new(api: Arc<A>, surface: S, script: GlitchScript) -> Self {
        Self {
            api,
            sequencer: PresentationSequencer::new(surface, script),
            reset_in_flight: false,
            reset_ready_at: None,
            stale_before: None,
        }
    }

    /// Reconcile an observation against what is on screen and apply it.
    pub fn observe(&mut self, observation: &Observation, now: Instant) -> Transition {
        if self.stale_before.is_some_and(|reset_at| observation.at < reset_at) {
            debug!(
                "Dropping {:?} observation from before the last reset",
                observation.source
            );
            return Transition::Unchanged;
        }

        let transition = reconcile(observation.name.as_deref(), self.sequencer.last_name());
        if transition != Transition::Unchanged {
            debug!("{:?} observation -> {:?}", observation.source, transition);
            self.sequencer.apply(&transition, now);
        }
        transition
    }

    /// Operator reset: clear the server, then update the screen without
    /// waiting for the broadcast.
    ///
    /// Returns whether the screen changed.
    pub async fn request_reset(&mut self) -> bool {
        if !self.begin_reset(Instant::now()) {
            return false;
        }
        let result = self.api.reset().await;
        self.finish_reset(result, Instant::now())
    }

    /// Whether the reset control is usable at `now`.
    pub fn reset_ready(&self, now: Instant) -> bool {
        !self.reset_in_flight && self.reset_ready_at.map_or(true, |ready| now >= ready)
    }

    fn begin_reset(&mut self, now: Instant) -> bool {
        if !self.reset_ready(now) {
            debug!("Reset ignored, control disabled");
            return false;
        }
        self.reset_in_flight = true;
        true
    }

    fn finish_reset(&mut self, result: Result<()>, now: Instant) -> bool {
        self.reset_in_flight = false;
        self.reset_ready_at = Some(now + RESET_COOLDOWN);
        match result {
            Ok(()) => {
                self.stale_before = Some(now);
                self.sequencer.on_reset(now)
            }
            Err(e) => {
                warn!("Reset request failed: {}", e);
                false
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.sequencer.tick(now);
    }

    pub fn sequencer(&self) -> &PresentationSequencer<S> {
        &self.sequencer
    }

    /// Drive the display until the command channel closes.
    pub async fn run(
        mut self,
        mut channel: SyncChannel,
        mut commands: mpsc::Receiver<DisplayCommand>,
    ) -> Self {
        info!("Display running");
        let mut pending_reset: Option<JoinHandle<Result<()>>> = None;
        loop {
            let deadline = self.sequencer.next_deadline();

            tokio::select! {
                biased;

                _ = sleep_until_deadline(deadline) => {
                    self.tick(Instant::now());
                }
                result = reset_outcome(&mut pending_reset) => {
                    pending_reset = None;
                    self.finish_reset(result, Instant::now());
                }
                observation = channel.recv() => match observation {
                    Some(observation) => {
                        self.observe(&observation, Instant::now());
                    }
                    None => {
                        warn!("Sync channel closed");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(DisplayCommand::Reset) => {
                        if self.begin_reset(Instant::now()) {
                            let api = Arc::clone(&self.api);
                            pending_reset = Some(tokio::spawn(async move { api.reset().await }));
                        }
                    }
                    None => break,
                },
            }
        }
        if let Some(handle) = pending_reset {
            handle.abort();
        }
        info!("Display stopped");
        self
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn reset_outcome(pending: &mut Option<JoinHandle<Result<()>>>) -> Result<()> {
    match pending {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Transport(format!("reset task failed: {}", e))),
        },
        None => std::future::pending().await,
    }
}
