use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Instant;

use crate::controller::RunController;
use crate::platform::Platform;
use crate::settings::Settings;
use crate::types::*;
use crate::logger;

/// Consecutive capture failures between repeated warnings.
const CAPTURE_WARN_EVERY: u32 = 100;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub strikes: u64,
    pub casts: u64,
    pub capture_errors: u64,
    pub click_errors: u64,
}

/// Drain pending commands. Returns false on Quit or when every sender is gone.
fn process_commands(cmd_rx: &mpsc::Receiver<Command>, ctl: &mut RunController) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(Command::Toggle) => {
                let running = ctl.toggle();
                logger::info(&format!("[toggle] running = {}", running));
            }
            Ok(Command::Quit) => {
                logger::info("shutting down");
                ctl.stop();
                return false;
            }
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => {
                logger::warn("command channel closed, stopping");
                ctl.stop();
                return false;
            }
        }
    }
}

fn perform(platform: &mut dyn Platform, kind: ClickKind, stats: &mut RunStats) {
    if let Err(e) = platform.click() {
        stats.click_errors += 1;
        logger::error_p("ctl", &format!("{:?} click failed: {:#}", kind, e));
        return;
    }
    match kind {
        ClickKind::Strike => {
            stats.strikes += 1;
            logger::info_p("ctl", &format!("strike #{}", stats.strikes));
        }
        ClickKind::Cast => {
            stats.casts += 1;
            logger::info_p("ctl", &format!("cast #{}", stats.casts));
        }
    }
}

/// Main polling loop. Runs on a background thread until `Quit`.
///
/// With `always_on` the run starts immediately; otherwise it waits for a toggle.
pub fn orchestrate(
    settings: &Settings,
    platform: &mut dyn Platform,
    cmd_rx: mpsc::Receiver<Command>,
    always_on: bool,
) -> RunStats {
    let mut ctl = RunController::new(settings.clone());
    if always_on {
        ctl.start();
    }
    let stats = drive(&mut ctl, settings, platform, &cmd_rx);
    logger::info(&format!(
        "loop finished: {} ticks, {} strikes, {} casts, {} capture errors, {} click errors",
        stats.ticks, stats.strikes, stats.casts, stats.capture_errors, stats.click_errors
    ));
    stats
}

fn drive(
    ctl: &mut RunController,
    settings: &Settings,
    platform: &mut dyn Platform,
    cmd_rx: &mpsc::Receiver<Command>,
) -> RunStats {
    let poll = settings.poll_delay();
    let mut stats = RunStats::default();
    let mut failing: u32 = 0;

    loop {
        // Checked every iteration, recovery wait included
        if !process_commands(cmd_rx, ctl) {
            return stats;
        }

        if !ctl.is_running() {
            thread::sleep(poll);
            continue;
        }

        stats.ticks += 1;
        let now = Instant::now();

        if let Some(kind) = ctl.poll(now) {
            perform(platform, kind, &mut stats);
        }

        if !ctl.awaiting_cast() {
            match platform.grab(&settings.region) {
                Ok(frame) => {
                    if failing > 0 {
                        logger::info(&format!("capture recovered after {} failed tick(s)", failing));
                        failing = 0;
                    }
                    if let Some(kind) = ctl.observe(&frame, now) {
                        perform(platform, kind, &mut stats);
                    }
                }
                // Skip the tick; controller state is left exactly as it was
                Err(e) => {
                    failing += 1;
                    stats.capture_errors += 1;
                    if failing == 1 || failing % CAPTURE_WARN_EVERY == 0 {
                        logger::warn(&format!("capture failed ({} in a row): {}", failing, e));
                    }
                }
            }
        }

        thread::sleep(poll);
    }
}
