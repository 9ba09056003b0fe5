//! Line-oriented terminal surfaces used by the client binaries.

use crate::join::{JoinSurface, OutcomeCard, Tone};
use crate::sequencer::DisplaySurface;
use crate::stage::{Stage, StageSurface};
use std::io::{self, Write};

const WAITING_HEADLINE: &str = "Scan the code to seek protection.";
const WAITING_BODY: &str = "Only one shield exists.";
const REVEAL_HEADLINE: &str = "Communication interrupted by the Traitors.";
const TOO_LATE_HEADLINE: &str = "Too late. The Traitors are watching.";

fn stage_line(stage: &Stage) -> String {
    if stage.alert {
        format!("!!! {} !!!", stage.message)
    } else {
        format!(">>> {}", stage.message)
    }
}

/// Display screen rendered as terminal lines.
pub struct ConsoleDisplay<W = io::Stdout> {
    out: W,
    join_url: String,
}

impl ConsoleDisplay {
    pub fn new(join_url: impl Into<String>) -> Self {
        Self::with_writer(io::stdout(), join_url)
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn with_writer(out: W, join_url: impl Into<String>) -> Self {
        Self {
            out,
            join_url: join_url.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Terminal write failures are not actionable for a display.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> StageSurface for ConsoleDisplay<W> {
    fn stage_started(&mut self, stage: &Stage) {
        let line = stage_line(stage);
        self.line(&line);
    }

    fn stage_cleared(&mut self, _stage: &Stage) {}
}

impl<W: Write> DisplaySurface for ConsoleDisplay<W> {
    fn show_waiting(&mut self) {
        let join = format!("Join: {}", self.join_url);
        self.line("");
        self.line(WAITING_HEADLINE);
        self.line(WAITING_BODY);
        self.line(&join);
    }

    fn reveal(&mut self, name: &str) {
        self.line("");
        self.line(REVEAL_HEADLINE);
        self.line(name);
    }
}

/// Join form rendered as terminal lines.
pub struct ConsoleJoin<W = io::Stdout> {
    out: W,
}

impl ConsoleJoin {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ConsoleJoin {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleJoin<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> StageSurface for ConsoleJoin<W> {
    fn stage_started(&mut self, stage: &Stage) {
        let line = stage_line(stage);
        self.line(&line);
    }

    fn stage_cleared(&mut self, _stage: &Stage) {}
}

impl<W: Write> JoinSurface for ConsoleJoin<W> {
    fn set_message(&mut self, text: &str, tone: Tone) {
        match (text.is_empty(), tone) {
            (true, _) => {}
            (false, Tone::Info) => self.line(text),
            (false, Tone::Warn) => self.line(&format!("! {}", text)),
        }
    }

    fn set_input_enabled(&mut self, _enabled: bool) {}

    fn show_too_late(&mut self, holder: &str) {
        self.line(TOO_LATE_HEADLINE);
        self.line(&format!("{} has already been claimed.", holder));
    }

    fn show_outcome(&mut self, card: &OutcomeCard) {
        self.line("");
        for line in &card.lines {
            self.line(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::GlitchScript;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn display_shows_join_url_and_reveal() {
        let mut display = ConsoleDisplay::with_writer(Vec::new(), "http://host/join");
        display.show_waiting();
        display.reveal("Eve");

        let out = text(display.into_inner());
        assert!(out.contains(WAITING_HEADLINE));
        assert!(out.contains("Join: http://host/join"));
        assert!(out.ends_with(&format!("{}\nEve\n", REVEAL_HEADLINE)));
    }

    #[test]
    fn alert_stages_are_marked() {
        let script = GlitchScript::default();
        let mut display = ConsoleDisplay::with_writer(Vec::new(), "");
        display.stage_started(&script.interruption);
        display.stage_started(&script.trap);

        let out = text(display.into_inner());
        assert!(out.contains(">>> COMMUNICATION INTERRUPTED\n"));
        assert!(out.contains("!!! TRAITORS TRAP ACTIVATED - LOCATION BROWNEDGE MAIN HALL !!!\n"));
    }

    #[test]
    fn join_too_late_names_holder() {
        let mut join = ConsoleJoin::with_writer(Vec::new());
        join.show_too_late("Eve");
        join.set_message("", Tone::Info);
        join.set_message("Shield already triggered by Eve.", Tone::Warn);

        assert_eq!(
            text(join.into_inner()),
            format!(
                "{}\nEve has already been claimed.\n! Shield already triggered by Eve.\n",
                TOO_LATE_HEADLINE
            )
        );
    }
}
