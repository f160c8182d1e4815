pub mod stub;
pub mod hotkey;

#[cfg(target_os = "macos")]
pub mod darwin;

#[cfg(target_os = "windows")]
pub mod win32;

use anyhow::Result;

use crate::error::CaptureError;
use crate::types::*;
use crate::logger;

/// Screen capture + pointer synthesis for one desktop session.
pub trait Platform: Send {
    fn name(&self) -> &'static str;
    /// Grab `region` (absolute screen coordinates) as an RGB frame.
    fn grab(&mut self, region: &Region) -> Result<Frame, CaptureError>;
    /// Primary-button click at the current pointer position.
    fn click(&mut self) -> Result<()>;
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Result<Box<dyn Platform>> {
    logger::register_prefix("ctl", logger::COLOR_BLUE);
    logger::register_prefix("hotkey", logger::COLOR_GRAY);
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GREEN);
        return Ok(Box::new(stub::StubPlatform::new()));
    }
    #[cfg(target_os = "macos")]
    {
        logger::register_prefix("darwin", logger::COLOR_GRAY);
        return Ok(Box::new(darwin::DarwinPlatform::new()?));
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("win32", logger::COLOR_GRAY);
        return Ok(Box::new(win32::Win32Platform::new()?));
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        anyhow::bail!("no screen capture backend for this OS; run with --stub for a simulated screen")
    }
}
