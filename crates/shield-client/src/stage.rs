//! Timed glitch stages and the run that plays them.
//!
//! A [`Run`] is an ordered list of [`Stage`]s consumed one at a time. Each
//! stage switches its markers on, holds them for its full duration, switches
//! them off, and a short gap passes before the next stage starts. Time is
//! passed in explicitly so the same run can be driven by an event loop
//! (display) or by [`play`] (join).

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Default location named by the trap stage.
pub const DEFAULT_TRAP_LOCATION: &str = "BROWNEDGE MAIN HALL";

/// One timed phase of a presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub message: String,
    pub duration: Duration,
    /// Renders with the high-intensity alert markers
    pub alert: bool,
}

impl Stage {
    pub fn new(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            message: message.into(),
            duration,
            alert: false,
        }
    }

    /// Mark this stage as an alert.
    pub fn alert(mut self) -> Self {
        self.alert = true;
        self
    }
}

/// Where stage markers are rendered.
pub trait StageSurface {
    /// Apply the stage's message and active (and, if flagged, alert) markers.
    fn stage_started(&mut self, stage: &Stage);

    /// Remove every marker the stage applied.
    fn stage_cleared(&mut self, stage: &Stage);
}

/// The stage catalogue a client plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlitchScript {
    pub interruption: Stage,
    pub trap: Stage,
    /// Pause between one stage clearing and the next starting
    pub gap: Duration,
    /// Non-blocking effect played after a reset
    pub reset_ack: Stage,
}

impl Default for GlitchScript {
    fn default() -> Self {
        Self::with_location(DEFAULT_TRAP_LOCATION)
    }
}

impl GlitchScript {
    /// Default timings with the trap pointing at `location`.
    pub fn with_location(location: &str) -> Self {
        Self {
            interruption: Stage::new("COMMUNICATION INTERRUPTED", Duration::from_millis(2200)),
            trap: Stage::new(
                format!("TRAITORS TRAP ACTIVATED - LOCATION {}", location),
                Duration::from_millis(3200),
            )
            .alert(),
            gap: Duration::from_millis(200),
            reset_ack: Stage::new("SYSTEM RESET", Duration::from_millis(2000)),
        }
    }

    /// Stages played when a claim is observed or made.
    pub fn claim_stages(&self) -> Vec<Stage> {
        vec![self.interruption.clone(), self.trap.clone()]
    }

    /// Total wall time of a claim run.
    pub fn claim_duration(&self) -> Duration {
        self.interruption.duration + self.gap + self.trap.duration
    }
}

/// An in-flight presentation.
#[derive(Debug)]
pub struct Run {
    stages: Vec<Stage>,
    gap: Duration,
    cursor: usize,
    /// A stage's markers are applied (false during the gap)
    active: bool,
    deadline: Instant,
}

impl Run {
    /// Start the first stage. Returns `None` for an empty stage list.
    pub fn start<S: StageSurface>(
        stages: Vec<Stage>,
        gap: Duration,
        now: Instant,
        surface: &mut S,
    ) -> Option<Self> {
        let first = stages.first()?;
        surface.stage_started(first);
        let deadline = now + first.duration;
        Some(Self {
            stages,
            gap,
            cursor: 0,
            active: true,
            deadline,
        })
    }

    /// When the run next needs attention.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Stage whose markers are currently applied.
    pub fn current(&self) -> Option<&Stage> {
        if self.active {
            self.stages.get(self.cursor)
        } else {
            None
        }
    }

    /// Take at most one step if the deadline has passed.
    ///
    /// Returns `true` once the last stage has been cleared. Every step is
    /// scheduled from `now`, so a late call never shortens the next stage.
    pub fn advance<S: StageSurface>(&mut self, now: Instant, surface: &mut S) -> bool {
        if self.is_finished() {
            return true;
        }
        if now < self.deadline {
            return false;
        }

        if self.active {
            surface.stage_cleared(&self.stages[self.cursor]);
            self.active = false;
            self.cursor += 1;
            if self.cursor >= self.stages.len() {
                return true;
            }
            self.deadline = now + self.gap;
        } else {
            let stage = &self.stages[self.cursor];
            surface.stage_started(stage);
            self.active = true;
            self.deadline = now + stage.duration;
        }
        false
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.stages.len()
    }
}

/// Play `stages` to completion, sleeping between steps.
pub async fn play<S: StageSurface>(stages: Vec<Stage>, gap: Duration, surface: &mut S) {
    let Some(mut run) = Run::start(stages, gap, Instant::now(), surface) else {
        return;
    };
    loop {
        sleep_until(run.deadline()).await;
        if run.advance(Instant::now(), surface) {
            break;
        }
    }
}
