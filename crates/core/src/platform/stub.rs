use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::CaptureError;
use crate::types::*;
use crate::logger;
use super::Platform;

/// Frames between a cast and the next bar showing up.
const CAST_FRAMES: u32 = 30;

const BACKGROUND: Rgb = Rgb::new(18, 24, 36);
const INDICATOR: Rgb = Rgb::new(214, 48, 41);
const TARGET: Rgb = Rgb::new(52, 201, 74);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubState {
    /// Minigame on screen, target bar sweeping.
    Reeling,
    /// Round over, waiting for a cast click.
    Landed,
    Casting { frames_left: u32 },
}

/// Simulated minigame: a static indicator bar, a target bar bouncing
/// vertically, sparse stray indicator-colored pixels and the occasional
/// frame where the indicator flickers out.
pub struct StubPlatform {
    rng: StdRng,
    state: StubState,
    red_top: usize,
    red_len: usize,
    green_top: f64,
    green_len: usize,
    green_speed: f64,
    /// Stray pixels per frame
    noise: usize,
    /// Chance per frame that the indicator is not drawn
    flicker: f64,
    catches: u32,
    misses: u32,
    casts: u32,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            state: StubState::Casting { frames_left: CAST_FRAMES },
            red_top: 0,
            red_len: 0,
            green_top: 0.0,
            green_len: 0,
            green_speed: 0.0,
            noise: 12,
            flicker: 0.02,
            catches: 0,
            misses: 0,
            casts: 0,
        }
    }

    /// Disable noise and flicker.
    pub fn clean(mut self) -> Self {
        self.noise = 0;
        self.flicker = 0.0;
        self
    }

    pub fn state(&self) -> StubState {
        self.state
    }

    pub fn catches(&self) -> u32 {
        self.catches
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn casts(&self) -> u32 {
        self.casts
    }

    fn green_rows(&self) -> (usize, usize) {
        let top = self.green_top.round() as usize;
        (top, top + self.green_len - 1)
    }

    fn red_rows(&self) -> (usize, usize) {
        (self.red_top, self.red_top + self.red_len - 1)
    }

    fn new_round(&mut self, height: usize) {
        self.red_len = self.rng.gen_range(40..=80).min(height / 3).max(4);
        self.red_top = self.rng.gen_range(0..=height - self.red_len);
        self.green_len = (height / 12).max(3);
        self.green_top = self.rng.gen_range(0..=height - self.green_len) as f64;
        self.green_speed = self.rng.gen_range(2.0..5.0);
        self.state = StubState::Reeling;
        logger::info_p("stub", &format!("new round: bar rows {:?}", self.red_rows()));
    }

    fn advance(&mut self, height: usize) {
        match self.state {
            StubState::Reeling => {
                let max = (height - self.green_len) as f64;
                self.green_top += self.green_speed;
                if self.green_top < 0.0 {
                    self.green_top = -self.green_top;
                    self.green_speed = -self.green_speed;
                } else if self.green_top > max {
                    self.green_top = 2.0 * max - self.green_top;
                    self.green_speed = -self.green_speed;
                }
                self.green_top = self.green_top.clamp(0.0, max);
            }
            StubState::Casting { frames_left: 0 } => self.new_round(height),
            StubState::Casting { frames_left } => {
                self.state = StubState::Casting { frames_left: frames_left - 1 };
            }
            StubState::Landed => {}
        }
    }

    fn render(&mut self, width: usize, height: usize) -> Frame {
        let mut frame = Frame::filled(width, height, BACKGROUND);
        if self.state == StubState::Reeling {
            if !self.rng.gen_bool(self.flicker) {
                let (top, bottom) = self.red_rows();
                frame.fill_rect(width / 4, width / 2, top, bottom, INDICATOR);
            }
            let (top, bottom) = self.green_rows();
            frame.fill_rect(width / 2, width * 3 / 4, top, bottom, TARGET);
        }
        for _ in 0..self.noise {
            let x = self.rng.gen_range(0..width);
            let y = self.rng.gen_range(0..height);
            frame.set(x, y, INDICATOR);
        }
        frame
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for StubPlatform {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn grab(&mut self, region: &Region) -> Result<Frame, CaptureError> {
        let (width, height) = (region.width as usize, region.height as usize);
        // bars need some room to move
        if width < 4 || height < 16 {
            return Err(CaptureError::EmptyRegion);
        }
        self.advance(height);
        Ok(self.render(width, height))
    }

    fn click(&mut self) -> Result<()> {
        match self.state {
            StubState::Reeling => {
                let (rt, rb) = self.red_rows();
                let (gt, gb) = self.green_rows();
                if rb < gt || rt > gb {
                    self.misses += 1;
                    logger::info_p("stub", "click missed the bar");
                } else {
                    self.catches += 1;
                    self.state = StubState::Landed;
                    logger::info_p("stub", &format!("fish landed ({} total)", self.catches));
                }
            }
            StubState::Landed => {
                self.casts += 1;
                self.state = StubState::Casting { frames_left: CAST_FRAMES };
                logger::info_p("stub", "line cast");
            }
            StubState::Casting { .. } => {
                logger::info_p("stub", "click while casting ignored");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{classify, is_present, vertical_span, ColorBand};

    const REGION: Region = Region { left: 0, top: 0, width: 64, height: 240 };

    fn red_present(frame: &Frame) -> bool {
        is_present(&classify(frame, &ColorBand::INDICATOR), 60)
    }

    #[test]
    fn test_bar_shows_up_after_cast_delay() {
        let mut stub = StubPlatform::with_seed(7).clean();
        for _ in 0..CAST_FRAMES {
            let frame = stub.grab(&REGION).unwrap();
            assert_eq!((frame.width(), frame.height()), (64, 240));
            assert!(!red_present(&frame));
        }
        let frame = stub.grab(&REGION).unwrap();
        assert_eq!(stub.state(), StubState::Reeling);
        assert!(red_present(&frame));
        assert!(vertical_span(&classify(&frame, &ColorBand::TARGET)).is_some());
    }

    #[test]
    fn test_noise_is_filtered_out() {
        let mut stub = StubPlatform::with_seed(3);
        let frame = stub.grab(&REGION).unwrap();
        // casting: only stray pixels on screen
        let mask = classify(&frame, &ColorBand::INDICATOR);
        assert!(!is_present(&mask, 60));
    }

    #[test]
    fn test_click_on_overlap_lands_then_cast_restarts() {
        let mut stub = StubPlatform::with_seed(11).clean();
        let mut landed = false;
        for _ in 0..2000 {
            let frame = stub.grab(&REGION).unwrap();
            let red = vertical_span(&classify(&frame, &ColorBand::INDICATOR));
            let green = vertical_span(&classify(&frame, &ColorBand::TARGET));
            if let (Some(r), Some(g)) = (red, green) {
                if r.overlaps(&g) {
                    stub.click().unwrap();
                    landed = true;
                    break;
                }
            }
        }
        assert!(landed);
        assert_eq!(stub.state(), StubState::Landed);
        assert_eq!(stub.catches(), 1);

        stub.click().unwrap();
        assert_eq!(stub.casts(), 1);
        assert!(matches!(stub.state(), StubState::Casting { .. }));
    }

    #[test]
    fn test_tiny_region_is_a_capture_error() {
        let mut stub = StubPlatform::with_seed(1);
        let region = Region { left: 0, top: 0, width: 2, height: 2 };
        assert!(matches!(stub.grab(&region), Err(CaptureError::EmptyRegion)));
    }
}
