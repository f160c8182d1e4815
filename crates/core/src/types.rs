use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Absolute screen rectangle that gets captured every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Region {
    fn default() -> Self {
        Self { left: 1786, top: 499, width: 163, height: 432 }
    }
}

impl Region {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One RGB sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Raw screenshot pixel data (BGRA) as handed back by a capture backend
#[derive(Debug)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

/// A captured region, row-major, channels normalized to RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Frame {
    /// Frame of `width` x `height` filled with `fill`.
    pub fn filled(width: usize, height: usize, fill: Rgb) -> Self {
        Self { width, height, pixels: vec![fill; width * height] }
    }

    /// Normalize a BGRA capture into RGB, honoring the row stride.
    pub fn from_bgra(capture: &Capture) -> Result<Self, CaptureError> {
        let width = capture.width as usize;
        let height = capture.height as usize;
        let stride = capture.bytes_per_row as usize;

        if width == 0 || height == 0 {
            return Err(CaptureError::EmptyRegion);
        }
        if stride < width * 4 || capture.data.len() < stride * (height - 1) + width * 4 {
            return Err(CaptureError::Truncated {
                expected: stride * height,
                actual: capture.data.len(),
            });
        }

        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &capture.data[y * stride..y * stride + width * 4];
            pixels.extend(row.chunks_exact(4).map(|px| Rgb::new(px[2], px[1], px[0])));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, px: Rgb) {
        self.pixels[y * self.width + x] = px;
    }

    /// Paint the inclusive row range `top..=bottom` over columns `left..right`.
    /// Out-of-bounds parts are clipped.
    pub fn fill_rect(&mut self, left: usize, right: usize, top: usize, bottom: usize, px: Rgb) {
        let right = right.min(self.width);
        let bottom = bottom.min(self.height.saturating_sub(1));
        for y in top..=bottom {
            for x in left..right {
                self.set(x, y, px);
            }
        }
    }

    /// Iterate rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.pixels.chunks_exact(self.width.max(1))
    }
}

#[cfg(feature = "debug-capture")]
impl Frame {
    pub fn from_rgb_image(img: &image::RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let pixels = img.pixels().map(|p| Rgb::new(p[0], p[1], p[2])).collect();
        Self { width: w as usize, height: h as usize, pixels }
    }

    pub fn save_png(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let raw: Vec<u8> = self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect();
        let img = image::RgbImage::from_raw(self.width as u32, self.height as u32, raw)
            .ok_or_else(|| anyhow::anyhow!("frame buffer does not match its dimensions"))?;
        img.save(path)?;
        Ok(())
    }
}

/// Which kind of synthesized click the controller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Rising edge of bar overlap
    Strike,
    /// Unconditional recast after the bar went away
    Cast,
}

/// Command from the hotkey listener / console to the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bgra_swaps_channels_and_skips_padding() {
        // 2x2, stride 12 (4 bytes of padding per row)
        let data = vec![
            1, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0,
            7, 8, 9, 255, 10, 11, 12, 255, 0, 0, 0, 0,
        ];
        let capture = Capture { data, width: 2, height: 2, bytes_per_row: 12 };
        let frame = Frame::from_bgra(&capture).unwrap();
        assert_eq!(frame.get(0, 0), Rgb::new(3, 2, 1));
        assert_eq!(frame.get(1, 0), Rgb::new(6, 5, 4));
        assert_eq!(frame.get(0, 1), Rgb::new(9, 8, 7));
        assert_eq!(frame.get(1, 1), Rgb::new(12, 11, 10));
    }

    #[test]
    fn test_from_bgra_rejects_short_buffer() {
        let capture = Capture { data: vec![0; 7], width: 2, height: 1, bytes_per_row: 8 };
        assert!(matches!(Frame::from_bgra(&capture), Err(CaptureError::Truncated { .. })));
    }

    #[test]
    fn test_from_bgra_rejects_empty() {
        let capture = Capture { data: Vec::new(), width: 0, height: 0, bytes_per_row: 0 };
        assert!(matches!(Frame::from_bgra(&capture), Err(CaptureError::EmptyRegion)));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut frame = Frame::filled(4, 4, Rgb::BLACK);
        frame.fill_rect(2, 10, 3, 10, Rgb::new(1, 1, 1));
        assert_eq!(frame.get(3, 3), Rgb::new(1, 1, 1));
        assert_eq!(frame.get(1, 3), Rgb::BLACK);
        assert_eq!(frame.get(3, 2), Rgb::BLACK);
    }
}
