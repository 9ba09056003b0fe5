//! Participant join client.
//!
//! A one-shot flow: check whether the shield is still free, accept a name,
//! claim it, and on success play the glitch sequence locally before showing
//! the participant's outcome card. The local run does not wait for the
//! broadcast and is not gated on any previously seen name.

use crate::stage::{play, GlitchScript, StageSurface};
use crate::transport::ClaimApi;
use std::sync::Arc;
use tracing::{debug, info};

const MSG_TAKEN: &str = "The shield has already been taken.";
const MSG_STATUS_FAILED: &str = "Unable to check status. Try again.";
const MSG_EMPTY_NAME: &str = "Please enter a name.";
const MSG_CONFIRMING: &str = "Confirming your shield...";
const MSG_CLAIM_FAILED: &str = "Unable to claim the shield.";

/// Message styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warn,
}

/// The card shown to the participant who claimed the shield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeCard {
    pub name: String,
    pub lines: Vec<String>,
}

impl OutcomeCard {
    pub fn for_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lines: vec![
                format!("Dear {}", name),
                "By order of the Traitors you have been murdered".to_string(),
                "Your eagerness to claim a shield has been your ultimate downfall".to_string(),
            ],
        }
    }
}

/// Join-side rendering.
pub trait JoinSurface: StageSurface {
    fn set_message(&mut self, text: &str, tone: Tone);

    fn set_input_enabled(&mut self, enabled: bool);

    /// Terminal state for a viewer who arrived after the claim.
    fn show_too_late(&mut self, holder: &str);

    /// Terminal state for the viewer who made the claim.
    fn show_outcome(&mut self, card: &OutcomeCard);
}

/// Where the flow is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinPhase {
    /// Accepting a name
    Open,
    /// Waiting on the server or playing the local run
    Submitting,
    /// Someone else already held the shield on load
    TooLate(String),
    /// This viewer holds the shield
    Claimed(String),
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form is not accepting input
    Closed,
    EmptyName,
    /// Server refused; carries the message shown
    Rejected(String),
    Claimed(String),
}

/// Join-side orchestration.
pub struct JoinFlow<A, S> {
    api: Arc<A>,
    surface: S,
    script: GlitchScript,
    phase: JoinPhase,
}

impl<A: ClaimApi, S: JoinSurface> JoinFlow<A, S> {
    pub fn new(api: Arc<A>, surface: S, script: GlitchScript) -> Self {
        Self {
            api,
            surface,
            script,
            phase: JoinPhase::Open,
        }
    }

    /// Check the current claim. If it is already held, close the form
    /// without any animation.
    pub async fn load(&mut self) -> &JoinPhase {
        if self.phase != JoinPhase::Open {
            return &self.phase;
        }
        match self.api.status().await {
            Ok(state) => {
                if let Some(holder) = state.holder() {
                    info!("Shield already held by {}", holder);
                    self.surface.show_too_late(holder);
                    self.surface.set_message(MSG_TAKEN, Tone::Info);
                    self.surface.set_input_enabled(false);
                    self.phase = JoinPhase::TooLate(holder.to_string());
                }
            }
            Err(e) => {
                debug!("Status check failed: {}", e);
                self.surface.set_message(MSG_STATUS_FAILED, Tone::Warn);
            }
        }
        &self.phase
    }

    /// Submit a name.
    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        if self.phase != JoinPhase::Open {
            return SubmitOutcome::Closed;
        }

        let name = input.trim();
        if name.is_empty() {
            self.surface.set_message(MSG_EMPTY_NAME, Tone::Info);
            return SubmitOutcome::EmptyName;
        }

        self.surface.set_message(MSG_CONFIRMING, Tone::Info);
        self.surface.set_input_enabled(false);
        self.phase = JoinPhase::Submitting;

        if let Err(e) = self.api.claim(name).await {
            let detail = e.detail().unwrap_or(MSG_CLAIM_FAILED).to_string();
            info!("Claim by {} rejected: {}", name, e);
            self.surface.set_message(&detail, Tone::Warn);
            self.surface.set_input_enabled(true);
            self.phase = JoinPhase::Open;
            return SubmitOutcome::Rejected(detail);
        }

        info!("Claimed shield as {}", name);
        play(self.script.claim_stages(), self.script.gap, &mut self.surface).await;
        self.surface.show_outcome(&OutcomeCard::for_name(name));
        self.surface.set_message("", Tone::Info);
        self.phase = JoinPhase::Claimed(name.to_string());
        SubmitOutcome::Claimed(name.to_string())
    }

    pub fn phase(&self) -> &JoinPhase {
        &self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == JoinPhase::Open
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
