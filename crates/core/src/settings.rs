use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::ColorBand;
use crate::types::Region;

/// Detection and timing parameters. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: Region,
    pub indicator: ColorBand,
    pub target: ColorBand,
    pub min_click_interval_ms: u64,
    pub poll_delay_ms: u64,
    pub appear_confirm_frames: u32,
    pub disappear_confirm_frames: u32,
    pub min_indicator_pixels: usize,
    pub recovery_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: Region::default(),
            indicator: ColorBand::INDICATOR,
            target: ColorBand::TARGET,
            min_click_interval_ms: 150,
            poll_delay_ms: 10,
            appear_confirm_frames: 4,
            disappear_confirm_frames: 4,
            min_indicator_pixels: 60,
            recovery_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file means defaults; anything unreadable is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = match std::fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("invalid settings in {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.region.width == 0 || self.region.height == 0 {
            bail!("capture region must have a non-zero size, got {:?}", self.region);
        }
        if self.appear_confirm_frames == 0 || self.disappear_confirm_frames == 0 {
            bail!("confirmation frame counts must be at least 1");
        }
        if self.min_indicator_pixels == 0 {
            bail!("min_indicator_pixels must be at least 1");
        }
        Ok(())
    }

    pub fn min_click_interval(&self) -> Duration {
        Duration::from_millis(self.min_click_interval_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}
