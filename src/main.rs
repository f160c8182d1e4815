mod console;

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, Context, Result};

use autofish_core::{logger, orchestrator, settings::Settings};
use autofish_core::platform::{create_platform, hotkey};
use autofish_core::types::Command;

fn main() -> Result<()> {
    let force_stub = std::env::args().any(|a| a == "--stub");

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logger::init(&cwd.join("logs"), true)?;

    let settings_path = cwd.join("settings.json");
    let settings = Settings::load(&settings_path).context("failed to load settings")?;

    // Without capture and click there is nothing to do
    let mut platform = create_platform(force_stub)
        .context("failed to acquire screen capture and pointer control")?;

    console::set_title("AutoFish M1-after-bar-disappears");
    logger::info(&format!("platform: {}", platform.name()));
    logger::info(&format!("region: {:?}", settings.region));

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    // No hotkey means no way to toggle: run continuously instead
    let hotkey = match hotkey::start_hotkey_listener(cmd_tx.clone()) {
        Ok(guard) => {
            logger::info(&format!("hotkey: press {} to toggle ON/OFF", hotkey::HOTKEY_LABEL));
            Some(guard)
        }
        Err(e) => {
            logger::warn(&format!("{:#}", e));
            logger::warn("hotkey disabled; running continuously");
            None
        }
    };
    let always_on = hotkey.is_none();

    logger::info("starting loop...");
    let loop_settings = settings.clone();
    let worker = thread::spawn(move || {
        orchestrator::orchestrate(&loop_settings, platform.as_mut(), cmd_rx, always_on)
    });

    let result = console::run(&cmd_tx, &worker);
    worker.join().map_err(|_| anyhow!("run loop panicked"))?;

    // Unregisters the hotkey and joins its thread
    drop(hotkey);
    logger::info("exiting");
    result
}
