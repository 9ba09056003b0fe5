//! Shield clients.
//!
//! Two roles share this crate:
//!
//! - the **display** ([`DisplayFlow`]): a public screen that keeps in sync
//!   with the server over push and poll, plays the glitch sequence once per
//!   new claim and reveals the holder;
//! - the **join** client ([`JoinFlow`]): a participant's one-shot form that
//!   claims the shield and plays the sequence locally on success.
//!
//! Rendering goes through the [`DisplaySurface`] and [`JoinSurface`] traits;
//! [`console`] has terminal implementations.

pub mod config;
pub mod console;
pub mod display;
pub mod error;
pub mod join;
pub mod sequencer;
pub mod stage;
pub mod sync;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, SyncConfig};
pub use display::{DisplayCommand, DisplayFlow};
pub use error::{Error, Result};
pub use join::{JoinFlow, JoinPhase, JoinSurface, OutcomeCard, SubmitOutcome, Tone};
pub use sequencer::{DisplaySurface, PresentationSequencer, SequencerState};
pub use stage::{GlitchScript, Stage, StageSurface};
pub use sync::{reconcile, Observation, Source, SyncChannel, Transition};
pub use transport::{ClaimApi, HttpApi, PushConnector, WsConnector};
