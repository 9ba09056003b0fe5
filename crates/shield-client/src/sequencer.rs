//! Presentation sequencer for the display client.
//!
//! A state machine that turns transitions into glitch runs:
//!
//! ```text
//!   Settled(None) ──on_claimed(n)──→ Running(n) ──last stage cleared──→ Settled(Some(n))
//!        ↑                              │  on_claimed / on_reset ignored      │
//!        └──────────────────────── on_reset ─────────────────────────────────┘
//! ```
//!
//! The sequencer never sleeps. Callers feed it `now`, read
//! [`next_deadline`](PresentationSequencer::next_deadline) and call
//! [`tick`](PresentationSequencer::tick) when it passes.

use crate::stage::{GlitchScript, Run, Stage, StageSurface};
use crate::sync::Transition;
use tokio::time::Instant;
use tracing::{debug, info};

/// Display-side rendering.
pub trait DisplaySurface: StageSurface {
    /// Waiting UI: nobody holds the shield.
    fn show_waiting(&mut self);

    /// Terminal UI naming the holder.
    fn reveal(&mut self, name: &str);
}

/// Observable sequencer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    /// A claim run is playing for `name`
    Running { name: String },
    /// At rest; `None` is the idle waiting UI
    Settled(Option<String>),
}

struct ActiveRun {
    name: String,
    run: Run,
}

struct Acknowledgement {
    stage: Stage,
    deadline: Instant,
}

/// Plays claim runs and commits their outcome.
pub struct PresentationSequencer<S> {
    surface: S,
    script: GlitchScript,
    /// Last name revealed on screen; this is the client's `lastName`
    committed: Option<String>,
    running: Option<ActiveRun>,
    ack: Option<Acknowledgement>,
    runs_started: u64,
}

impl<S: DisplaySurface> PresentationSequencer<S> {
    /// Create a sequencer and show the waiting UI.
    pub fn new(mut surface: S, script: GlitchScript) -> Self {
        surface.show_waiting();
        Self {
            surface,
            script,
            committed: None,
            running: None,
            ack: None,
            runs_started: 0,
        }
    }

    /// Start a claim run for `name`.
    ///
    /// Ignored while a run is playing or when `name` is already on screen.
    /// Returns whether a run started.
    pub fn on_claimed(&mut self, name: &str, now: Instant) -> bool {
        if let Some(active) = &self.running {
            debug!("Claim for {} ignored, run for {} in progress", name, active.name);
            return false;
        }
        if self.committed.as_deref() == Some(name) {
            debug!("Claim for {} already shown", name);
            return false;
        }

        self.clear_ack();
        self.runs_started += 1;
        info!("Playing claim sequence for {}", name);
        match Run::start(self.script.claim_stages(), self.script.gap, now, &mut self.surface) {
            Some(run) => {
                self.running = Some(ActiveRun {
                    name: name.to_string(),
                    run,
                })
            }
            None => self.commit(name.to_string()),
        }
        true
    }

    /// Return to the waiting UI and flash the reset acknowledgement.
    ///
    /// Ignored while a run is playing; the next observation re-delivers the
    /// reset once the run has committed. Returns whether the reset applied.
    pub fn on_reset(&mut self, now: Instant) -> bool {
        if self.running.is_some() {
            debug!("Reset deferred, run in progress");
            return false;
        }

        info!("Shield reset");
        self.committed = None;
        self.surface.show_waiting();

        self.clear_ack();
        let stage = self.script.reset_ack.clone();
        self.surface.stage_started(&stage);
        self.ack = Some(Acknowledgement {
            deadline: now + stage.duration,
            stage,
        });
        true
    }

    /// Route a transition. Returns whether it changed anything.
    pub fn apply(&mut self, transition: &Transition, now: Instant) -> bool {
        match transition {
            Transition::Claimed(name) => self.on_claimed(name, now),
            Transition::Reset => self.on_reset(now),
            Transition::Unchanged => false,
        }
    }

    /// Advance timers that have expired by `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.ack.as_ref().is_some_and(|ack| now >= ack.deadline) {
            self.clear_ack();
        }

        let finished = match self.running.as_mut() {
            Some(active) => active.run.advance(now, &mut self.surface),
            None => false,
        };
        if finished {
            if let Some(active) = self.running.take() {
                self.commit(active.name);
            }
        }
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let run = self.running.as_ref().map(|active| active.run.deadline());
        let ack = self.ack.as_ref().map(|ack| ack.deadline);
        match (run, ack) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Name currently committed to the screen.
    pub fn last_name(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn state(&self) -> SequencerState {
        match &self.running {
            Some(active) => SequencerState::Running {
                name: active.name.clone(),
            },
            None => SequencerState::Settled(self.committed.clone()),
        }
    }

    /// Number of claim runs started so far.
    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn commit(&mut self, name: String) {
        info!("Revealing {}", name);
        self.surface.reveal(&name);
        self.committed = Some(name);
    }

    fn clear_ack(&mut self) {
        if let Some(ack) = self.ack.take() {
            self.surface.stage_cleared(&ack.stage);
        }
    }
}
