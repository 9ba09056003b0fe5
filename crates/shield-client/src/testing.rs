//! In-memory fakes for flow and sync tests.

use crate::error::{Error, Result};
use crate::join::{JoinSurface, OutcomeCard, Tone};
use crate::sequencer::DisplaySurface;
use crate::stage::{Stage, StageSurface};
use crate::transport::{ClaimApi, PushConnector, PushStream};
use futures::StreamExt;
use shield_protocol::ClaimState;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything a surface was asked to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    StageOn { message: String, alert: bool },
    StageOff { message: String },
    Waiting,
    Reveal(String),
    Message(String, Tone),
    InputEnabled(bool),
    TooLate(String),
    Outcome(OutcomeCard),
}

impl Shown {
    pub fn stage_on(message: &str, alert: bool) -> Self {
        Shown::StageOn {
            message: message.to_string(),
            alert,
        }
    }

    pub fn stage_off(message: &str) -> Self {
        Shown::StageOff {
            message: message.to_string(),
        }
    }
}

/// Surface that records calls. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Shown>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Shown> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Shown) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, shown: Shown) {
        self.log.lock().unwrap().push(shown);
    }
}

impl StageSurface for Recorder {
    fn stage_started(&mut self, stage: &Stage) {
        self.push(Shown::stage_on(&stage.message, stage.alert));
    }

    fn stage_cleared(&mut self, stage: &Stage) {
        self.push(Shown::stage_off(&stage.message));
    }
}

impl DisplaySurface for Recorder {
    fn show_waiting(&mut self) {
        self.push(Shown::Waiting);
    }

    fn reveal(&mut self, name: &str) {
        self.push(Shown::Reveal(name.to_string()));
    }
}

impl JoinSurface for Recorder {
    fn set_message(&mut self, text: &str, tone: Tone) {
        self.push(Shown::Message(text.to_string(), tone));
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.push(Shown::InputEnabled(enabled));
    }

    fn show_too_late(&mut self, holder: &str) {
        self.push(Shown::TooLate(holder.to_string()));
    }

    fn show_outcome(&mut self, card: &OutcomeCard) {
        self.push(Shown::Outcome(card.clone()));
    }
}

/// Panics if two stages' markers are ever applied at once.
pub fn assert_no_overlap(events: &[Shown]) {
    let mut active: Option<&str> = None;
    for event in events {
        match event {
            Shown::StageOn { message, .. } => {
                assert!(
                    active.is_none(),
                    "{:?} started while {:?} active",
                    message,
                    active
                );
                active = Some(message);
            }
            Shown::StageOff { message } => {
                assert_eq!(active, Some(message.as_str()), "cleared a stage that was not active");
                active = None;
            }
            _ => {}
        }
    }
}

/// Claim API backed by a local slot.
#[derive(Debug, Default)]
pub struct FakeApi {
    holder: Mutex<Option<String>>,
    fail_status: AtomicBool,
    fail_claim: AtomicBool,
    fail_reset: AtomicBool,
    reset_delay: Mutex<Duration>,
    status_calls: AtomicUsize,
    claim_calls: AtomicUsize,
    reset_calls: AtomicUsize,
}

impl FakeApi {
    pub fn set_holder(&self, holder: Option<&str>) {
        *self.holder.lock().unwrap() = holder.map(str::to_owned);
    }

    pub fn holder(&self) -> Option<String> {
        self.holder.lock().unwrap().clone()
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub fn fail_claim(&self, fail: bool) {
        self.fail_claim.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reset(&self, fail: bool) {
        self.fail_reset.store(fail, Ordering::SeqCst);
    }

    /// Make every reset take `delay` before the slot clears.
    pub fn delay_reset(&self, delay: Duration) {
        *self.reset_delay.lock().unwrap() = delay;
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }
}

fn unreachable_server() -> Error {
    Error::Transport("connection refused".into())
}

impl ClaimApi for FakeApi {
    async fn status(&self) -> Result<ClaimState> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        Ok(match self.holder() {
            Some(name) => ClaimState::held(name),
            None => ClaimState::empty(),
        })
    }

    async fn claim(&self, name: &str) -> Result<ClaimState> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        let mut holder = self.holder.lock().unwrap();
        if let Some(current) = holder.as_ref() {
            return Err(Error::AlreadyClaimed {
                detail: format!("Shield already triggered by {}.", current),
            });
        }
        *holder = Some(name.trim().to_string());
        Ok(ClaimState::held(name.trim()))
    }

    async fn reset(&self) -> Result<()> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.reset_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reset.load(Ordering::SeqCst) {
            return Err(unreachable_server());
        }
        self.set_holder(None);
        Ok(())
    }
}

/// Push connector fed by test-controlled sessions.
///
/// Each [`session`](FakeConnector::session) queues one connection; dropping
/// its sender closes that connection. With no queued session, connecting
/// fails.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    inner: Arc<ConnectorInner>,
}

#[derive(Debug, Default)]
struct ConnectorInner {
    sessions: Mutex<VecDeque<mpsc::UnboundedReceiver<String>>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn session(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.sessions.lock().unwrap().push_back(rx);
        tx
    }

    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }
}

impl PushConnector for FakeConnector {
    async fn connect(&self) -> Result<PushStream> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let session = self.inner.sessions.lock().unwrap().pop_front();
        let rx = session.ok_or_else(unreachable_server)?;
        let frames = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|text| (Ok(text), rx))
        });
        Ok(frames.boxed())
    }
}
