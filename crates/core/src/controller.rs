use std::time::Instant;

use crate::debounce::Debouncer;
use crate::detect::{classify, is_present, vertical_span};
use crate::logger;
use crate::settings::Settings;
use crate::tracker::{ClickGate, OverlapTracker};
use crate::types::{ClickKind, Frame};

/// Coarse mode of the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    WaitingForBar,
    Fishing,
    RecoveryWait,
}

/// Tick-driven phase machine. Owns every piece of per-run state; the loop
/// thread is its only writer.
pub struct RunController {
    settings: Settings,
    phase: RunPhase,
    appear: Debouncer,
    disappear: Debouncer,
    tracker: OverlapTracker,
    gate: ClickGate,
    cast_due: Option<Instant>,
}

impl RunController {
    pub fn new(settings: Settings) -> Self {
        Self {
            appear: Debouncer::new(settings.appear_confirm_frames),
            disappear: Debouncer::new(settings.disappear_confirm_frames),
            tracker: OverlapTracker::new(),
            gate: ClickGate::new(settings.min_click_interval()),
            cast_due: None,
            phase: RunPhase::Idle,
            settings,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != RunPhase::Idle
    }

    /// True while the recovery delay is counting down and frames are not looked at.
    pub fn awaiting_cast(&self) -> bool {
        self.cast_due.is_some()
    }

    /// Toggle-on: start waiting for the bar with fresh counters.
    pub fn start(&mut self) {
        self.reset();
        self.enter(RunPhase::WaitingForBar);
    }

    /// Toggle-off from any phase.
    pub fn stop(&mut self) {
        self.reset();
        self.enter(RunPhase::Idle);
    }

    /// Flip between idle and running. Returns the new running state.
    pub fn toggle(&mut self) -> bool {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.is_running()
    }

    /// Time-driven step. Emits the recast click once the recovery delay is over.
    pub fn poll(&mut self, now: Instant) -> Option<ClickKind> {
        match self.cast_due {
            Some(due) if now >= due => {
                self.cast_due = None;
                self.appear.reset();
                logger::info_p("ctl", "recovery delay over, recasting");
                Some(ClickKind::Cast)
            }
            _ => None,
        }
    }

    /// Frame-driven step. Call only with a successfully captured frame.
    pub fn observe(&mut self, frame: &Frame, now: Instant) -> Option<ClickKind> {
        match self.phase {
            RunPhase::Idle => None,
            RunPhase::RecoveryWait if self.cast_due.is_some() => None,
            RunPhase::WaitingForBar | RunPhase::RecoveryWait => {
                let red = classify(frame, &self.settings.indicator);
                let present = is_present(&red, self.settings.min_indicator_pixels);
                self.await_bar(present, RunPhase::Fishing);
                None
            }
            RunPhase::Fishing => self.fish(frame, now),
        }
    }

    fn await_bar(&mut self, present: bool, next: RunPhase) {
        if self.appear.observe(present) {
            self.appear.reset();
            self.disappear.reset();
            self.tracker.reset();
            self.enter(next);
        }
    }

    fn fish(&mut self, frame: &Frame, now: Instant) -> Option<ClickKind> {
        let red = classify(frame, &self.settings.indicator);
        let green = classify(frame, &self.settings.target);

        let mut click = None;
        if self.tracker.observe(vertical_span(&red), vertical_span(&green)) {
            if self.gate.try_pass(now) {
                click = Some(ClickKind::Strike);
            } else {
                logger::warn_p("ctl", "overlap edge dropped by click gate");
            }
        }

        let gone = !is_present(&red, self.settings.min_indicator_pixels);
        if self.disappear.observe(gone) {
            self.disappear.reset();
            self.appear.reset();
            self.cast_due = Some(now + self.settings.recovery_delay());
            self.enter(RunPhase::RecoveryWait);
        }

        click
    }

    fn reset(&mut self) {
        self.appear.reset();
        self.disappear.reset();
        self.tracker.reset();
        self.gate.reset();
        self.cast_due = None;
    }

    fn enter(&mut self, phase: RunPhase) {
        if self.phase != phase {
            logger::info_p("ctl", &format!("{:?} -> {:?}", self.phase, phase));
        }
        self.phase = phase;
    }
}
