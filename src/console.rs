use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, SetTitle};

use autofish_core::logger;
use autofish_core::types::Command;

pub fn set_title(title: &str) {
    execute!(io::stdout(), SetTitle(title)).ok();
}

/// Block until the user asks to exit (q, Esc, Ctrl+C) or the loop thread ends.
/// Always leaves a `Quit` on the channel before returning.
pub fn run<T>(cmd_tx: &mpsc::Sender<Command>, worker: &JoinHandle<T>) -> Result<()> {
    let result = if enable_raw_mode().is_ok() {
        logger::info("press q or Ctrl+C to exit");
        let polled = poll_keys(worker);
        disable_raw_mode().ok();
        polled
    } else {
        logger::warn("console is not interactive; send a line with q to exit");
        spawn_line_reader(cmd_tx.clone());
        while !worker.is_finished() {
            thread::sleep(Duration::from_millis(200));
        }
        Ok(())
    };

    cmd_tx.send(Command::Quit).ok();
    result
}

/// Exit words accepted on a piped stdin.
fn is_quit_line(line: &str) -> bool {
    matches!(line.trim(), "q" | "Q" | "quit" | "exit")
}

/// Forward a `Quit` when stdin delivers an exit word. EOF leaves the loop running.
fn spawn_line_reader(cmd_tx: mpsc::Sender<Command>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if is_quit_line(&line) {
                logger::info("exit requested");
                cmd_tx.send(Command::Quit).ok();
                break;
            }
        }
    });
}

fn poll_keys<T>(worker: &JoinHandle<T>) -> Result<()> {
    loop {
        if worker.is_finished() {
            return Ok(());
        }

        // Poll with 100ms timeout so a finished loop is noticed
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            logger::info("exit requested");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_lines() {
        assert!(is_quit_line("q"));
        assert!(is_quit_line("  quit\r"));
        assert!(is_quit_line("exit"));
        assert!(!is_quit_line(""));
        assert!(!is_quit_line("qq"));
        assert!(!is_quit_line("toggle"));
    }

    #[test]
    fn test_quit_from_line_reaches_loop() {
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || rx.recv().ok());
        if is_quit_line("q\n") {
            tx.send(Command::Quit).unwrap();
        }
        assert_eq!(worker.join().unwrap(), Some(Command::Quit));
    }
}
