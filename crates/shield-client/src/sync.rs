//! Push + poll synchronization.
//!
//! Two sources watch the server:
//!
//! - **push**: a long-lived connection, reconnected after a fixed delay for
//!   as long as the channel lives;
//! - **poll**: a snapshot fetch on a fixed interval, running whether or not
//!   push is healthy.
//!
//! Both reduce what they see to an [`Observation`] and funnel it into one
//! queue. [`reconcile`] is the single place that decides whether an
//! observation is new, and it compares against the name the presentation
//! layer has committed, never against anything the channel remembers.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::transport::{ClaimApi, PushConnector};
use futures::StreamExt;
use shield_protocol::{ClaimState, PushMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const OBSERVATION_QUEUE: usize = 32;

/// Which source produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Push,
    Poll,
}

/// The holder a source saw, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub source: Source,
    pub name: Option<String>,
    /// Receipt time for push, request time for poll. The server state
    /// described is no older than this.
    pub at: Instant,
}

impl Observation {
    /// A push message received now.
    pub fn from_push(message: &PushMessage) -> Self {
        Self {
            source: Source::Push,
            name: message.observed_name().map(str::to_owned),
            at: Instant::now(),
        }
    }

    /// A snapshot whose request was sent at `requested_at`.
    pub fn from_snapshot(state: &ClaimState, requested_at: Instant) -> Self {
        Self {
            source: Source::Poll,
            name: state.holder().map(str::to_owned),
            at: requested_at,
        }
    }
}

/// What an observation means for a client that last showed `last_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Claimed(String),
    Reset,
    Unchanged,
}

/// Decide whether `incoming` is news relative to `last_name`.
pub fn reconcile(incoming: Option<&str>, last_name: Option<&str>) -> Transition {
    match (incoming, last_name) {
        (Some(name), last) if last != Some(name) => Transition::Claimed(name.to_string()),
        (None, Some(_)) => Transition::Reset,
        _ => Transition::Unchanged,
    }
}

/// Merged push/poll observations for one client.
///
/// Dropping the channel stops both sources.
pub struct SyncChannel {
    observations: mpsc::Receiver<Observation>,
    push_task: JoinHandle<()>,
    poll_task: JoinHandle<()>,
}

impl SyncChannel {
    /// Start both sources.
    pub fn spawn<A, P>(api: Arc<A>, connector: P, config: &SyncConfig) -> Self
    where
        A: ClaimApi,
        P: PushConnector,
    {
        let (tx, observations) = mpsc::channel(OBSERVATION_QUEUE);
        let push_task = tokio::spawn(push_loop(connector, tx.clone(), config.reconnect_delay));
        let poll_task = tokio::spawn(poll_loop(api, tx, config.poll_interval));
        Self {
            observations,
            push_task,
            poll_task,
        }
    }

    /// Next raw observation from either source.
    pub async fn recv(&mut self) -> Option<Observation> {
        self.observations.recv().await
    }

    /// Next observation that is news relative to `last_name`.
    ///
    /// Cancel-safe: an observation is only consumed once it has been judged.
    pub async fn next_transition(&mut self, last_name: Option<&str>) -> Option<Transition> {
        loop {
            let observation = self.observations.recv().await?;
            match reconcile(observation.name.as_deref(), last_name) {
                Transition::Unchanged => continue,
                transition => {
                    debug!("{:?} observation -> {:?}", observation.source, transition);
                    return Some(transition);
                }
            }
        }
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.push_task.abort();
        self.poll_task.abort();
    }
}

fn decode(text: &str) -> Result<PushMessage> {
    Ok(serde_json::from_str(text)?)
}

async fn push_loop<P: PushConnector>(
    connector: P,
    tx: mpsc::Sender<Observation>,
    reconnect_delay: Duration,
) {
    loop {
        match connector.connect().await {
            Ok(mut frames) => {
                info!("Push transport connected");
                while let Some(frame) = frames.next().await {
                    let text = match frame {
                        Ok(text) => text,
                        Err(e) => {
                            debug!("Push transport error: {}", e);
                            break;
                        }
                    };
                    match decode(&text) {
                        Ok(message) => {
                            if tx.send(Observation::from_push(&message)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!("Dropping push message {:?}: {}", text, e),
                    }
                }
                info!("Push transport closed, reconnecting in {:?}", reconnect_delay);
            }
            Err(e) => debug!("Push connect failed: {}, retrying in {:?}", e, reconnect_delay),
        }

        if tx.is_closed() {
            return;
        }
        sleep(reconnect_delay).await;
    }
}

async fn poll_loop<A: ClaimApi>(api: Arc<A>, tx: mpsc::Sender<Observation>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let requested_at = Instant::now();
        match api.status().await {
            Ok(state) => {
                let observation = Observation::from_snapshot(&state, requested_at);
                if tx.send(observation).await.is_err() {
                    return;
                }
            }
            Err(e) => debug!("Status poll failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeConnector};
    use proptest::prelude::*;

    fn config() -> SyncConfig {
        SyncConfig::default()
    }

    #[test]
    fn reconcile_rules() {
        assert_eq!(
            reconcile(Some("Eve"), None),
            Transition::Claimed("Eve".into())
        );
        assert_eq!(
            reconcile(Some("Mallory"), Some("Eve")),
            Transition::Claimed("Mallory".into())
        );
        assert_eq!(reconcile(Some("Eve"), Some("Eve")), Transition::Unchanged);
        assert_eq!(reconcile(None, Some("Eve")), Transition::Reset);
        assert_eq!(reconcile(None, None), Transition::Unchanged);
    }

    proptest! {
        #[test]
        fn reconcile_never_repeats_last_name(
            incoming in prop::option::of("[a-c]{1,2}"),
            last in prop::option::of("[a-c]{1,2}"),
        ) {
            match reconcile(incoming.as_deref(), last.as_deref()) {
                Transition::Claimed(name) => {
                    prop_assert_eq!(Some(name.as_str()), incoming.as_deref());
                    prop_assert_ne!(Some(name.as_str()), last.as_deref());
                }
                Transition::Reset => {
                    prop_assert!(incoming.is_none() && last.is_some());
                }
                Transition::Unchanged => {
                    prop_assert!(incoming == last || (incoming.is_none() && last.is_none()));
                }
            }
        }
    }

    #[test]
    fn observations_normalize_both_sources() {
        let push = Observation::from_push(&PushMessage::Claimed { name: "Eve".into() });
        let poll = Observation::from_snapshot(&ClaimState::held("Eve"), Instant::now());
        assert_eq!(push.name, poll.name);
        assert_eq!(push.source, Source::Push);
        assert_eq!(poll.source, Source::Poll);

        let reset = Observation::from_push(&PushMessage::Reset);
        assert_eq!(reset.name, None);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_delivers_snapshots_on_interval() {
        let api = Arc::new(FakeApi::default());
        api.set_holder(Some("Eve"));
        let mut channel = SyncChannel::spawn(Arc::clone(&api), FakeConnector::default(), &config());

        let started = Instant::now();
        let first = channel.recv().await.unwrap();
        assert_eq!(first.source, Source::Poll);
        assert_eq!(first.name.as_deref(), Some("Eve"));
        assert!(first.at < started + Duration::from_millis(10));

        channel.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2000));
        assert_eq!(api.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_are_skipped() {
        let api = Arc::new(FakeApi::default());
        api.fail_status(true);
        let mut channel = SyncChannel::spawn(Arc::clone(&api), FakeConnector::default(), &config());

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(api.status_calls(), 3);

        api.fail_status(false);
        api.set_holder(Some("Bob"));
        let seen = channel.recv().await.unwrap();
        assert_eq!(seen.name.as_deref(), Some("Bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_push_is_dropped_and_connection_kept() {
        let api = Arc::new(FakeApi::default());
        api.fail_status(true);
        let connector = FakeConnector::default();
        let session = connector.session();
        let mut channel = SyncChannel::spawn(api, connector.clone(), &config());

        session.send("{not json".into()).unwrap();
        session.send(r#"{"type":"claimed","name":"Eve"}"#.into()).unwrap();

        let seen = channel.recv().await.unwrap();
        assert_eq!(seen.source, Source::Push);
        assert_eq!(seen.name.as_deref(), Some("Eve"));
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn push_reconnects_after_fixed_delay() {
        let api = Arc::new(FakeApi::default());
        api.fail_status(true);
        let connector = FakeConnector::default();
        let first = connector.session();
        let second = connector.session();
        let _channel = SyncChannel::spawn(api, connector.clone(), &config());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.connects(), 1);

        drop(first);
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(connector.connects(), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.connects(), 2);
        drop(second);
    }

    #[tokio::test(start_paused = true)]
    async fn refused_connections_retry_indefinitely() {
        let api = Arc::new(FakeApi::default());
        api.fail_status(true);
        let connector = FakeConnector::default();
        let _channel = SyncChannel::spawn(api, connector.clone(), &config());

        tokio::time::sleep(Duration::from_millis(1500 * 10 + 100)).await;
        assert_eq!(connector.connects(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn next_transition_skips_unchanged() {
        let api = Arc::new(FakeApi::default());
        api.set_holder(Some("Eve"));
        let connector = FakeConnector::default();
        let session = connector.session();
        let mut channel = SyncChannel::spawn(Arc::clone(&api), connector, &config());

        session
            .send(r#"{"type":"status","name":"Eve"}"#.into())
            .unwrap();
        session.send(r#"{"type":"reset"}"#.into()).unwrap();

        // Poll and push both report Eve first; only the pushed reset is news.
        let transition = channel.next_transition(Some("Eve")).await.unwrap();
        assert_eq!(transition, Transition::Reset);
    }
}
