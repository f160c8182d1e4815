use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    console: bool,
    prefixes: HashMap<String, Color>,
}

// Prefix colors for console rendering
pub const COLOR_GRAY: Color = Color::DarkGrey;
pub const COLOR_BLUE: Color = Color::Blue;
pub const COLOR_GREEN: Color = Color::Green;

/// Initialize the global logger. Clears the log file. With `console` off,
/// lines only go to `app.log`.
pub fn init(log_dir: &Path, console: bool) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    LOGGER
        .set(Mutex::new(Logger { file, console, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

/// Register a prefix with a color. All subsequent `*_p` calls with this
/// prefix render it in that color.
pub fn register_prefix(prefix: &str, color: Color) {
    if let Some(mut l) = LOGGER.get().and_then(|l| l.lock().ok()) {
        l.prefixes.insert(prefix.to_string(), color);
    }
}

fn write_log(level: &str, prefix: &str, msg: &str) {
    let Some(mut l) = LOGGER.get().and_then(|l| l.lock().ok()) else {
        return;
    };
    let ts = Local::now().format("%H:%M:%S%.3f").to_string();

    // File always gets plain text
    let file_line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };
    writeln!(l.file, "{}", file_line).ok();

    if l.console {
        let color = l.prefixes.get(prefix).copied().unwrap_or(Color::White);
        write_console(&ts, level, prefix, color, msg).ok();
    }
}

// Explicit \r\n: the console may be in raw mode.
fn write_console(ts: &str, level: &str, prefix: &str, color: Color, msg: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    queue!(out, SetForegroundColor(Color::DarkGrey), Print(ts), Print(" "))?;
    match level {
        "ERROR" => queue!(out, SetForegroundColor(Color::Red), Print("error "))?,
        "WARN" => queue!(out, SetForegroundColor(Color::Yellow), Print("warn "))?,
        _ => {}
    }
    if !prefix.is_empty() {
        queue!(out, SetForegroundColor(color), Print(prefix), Print(" "))?;
    }
    queue!(out, SetForegroundColor(color), Print(msg), ResetColor, Print("\r\n"))?;
    out.flush()
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}
