use serde::{Deserialize, Serialize};

use crate::types::{Frame, Rgb};

/// Threshold on a single channel, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    AtLeast(u8),
    AtMost(u8),
}

impl Bound {
    fn admits(self, v: u8) -> bool {
        match self {
            Bound::AtLeast(min) => v >= min,
            Bound::AtMost(max) => v <= max,
        }
    }
}

/// A color class: one bound per channel, plus an optional row noise filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBand {
    pub r: Bound,
    pub g: Bound,
    pub b: Bound,
    /// Rows with fewer hits than this are cleared. 0 disables the filter.
    #[serde(default)]
    pub min_row_pixels: usize,
}

impl ColorBand {
    /// Red-dominant indicator bar.
    pub const INDICATOR: ColorBand = ColorBand {
        r: Bound::AtLeast(170),
        g: Bound::AtMost(90),
        b: Bound::AtMost(90),
        min_row_pixels: 3,
    };

    /// Green-dominant target bar.
    pub const TARGET: ColorBand = ColorBand {
        r: Bound::AtMost(90),
        g: Bound::AtLeast(170),
        b: Bound::AtMost(90),
        min_row_pixels: 0,
    };

    pub fn matches(&self, px: Rgb) -> bool {
        self.r.admits(px.r) && self.g.admits(px.g) && self.b.admits(px.b)
    }
}

/// Per-pixel membership of a frame in a band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Mask {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn row(&self, y: usize) -> &[bool] {
        &self.bits[y * self.width..(y + 1) * self.width]
    }

    pub fn row_count(&self, y: usize) -> usize {
        self.row(y).iter().filter(|&&b| b).count()
    }

    /// Total number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Classify every pixel of `frame` against `band`, then drop sparse rows.
pub fn classify(frame: &Frame, band: &ColorBand) -> Mask {
    let width = frame.width();
    let mut bits = Vec::with_capacity(width * frame.height());

    for row in frame.rows() {
        let start = bits.len();
        bits.extend(row.iter().map(|&px| band.matches(px)));
        let hits = bits[start..].iter().filter(|&&b| b).count();
        if hits < band.min_row_pixels {
            bits[start..].fill(false);
        }
    }

    Mask { width, height: frame.height(), bits }
}

/// Closed row interval `[top, bottom]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub top: usize,
    pub bottom: usize,
}

impl Span {
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.bottom < other.top || self.top > other.bottom)
    }
}

/// Both spans present and intersecting.
pub fn spans_overlap(a: Option<Span>, b: Option<Span>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.overlaps(&b),
        _ => false,
    }
}

/// Topmost and bottommost rows holding any set pixel, or `None` for an empty mask.
/// Horizontal position is ignored.
pub fn vertical_span(mask: &Mask) -> Option<Span> {
    let mut rows = (0..mask.height()).filter(|&y| mask.row(y).contains(&true));
    let top = rows.next()?;
    let bottom = rows.last().unwrap_or(top);
    Some(Span { top, bottom })
}

/// Coarse existence test: enough set pixels overall.
pub fn is_present(mask: &Mask, min_pixels: usize) -> bool {
    mask.count() >= min_pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(220, 40, 40);
    const GREEN: Rgb = Rgb::new(40, 220, 40);

    fn bar(frame: &mut Frame, left: usize, right: usize, top: usize, bottom: usize, px: Rgb) {
        frame.fill_rect(left, right, top, bottom, px);
    }

    #[test]
    fn test_bands_never_claim_same_pixel() {
        for r in (0..=255u16).step_by(5) {
            for g in (0..=255u16).step_by(5) {
                for b in (0..=255u16).step_by(5) {
                    let px = Rgb::new(r as u8, g as u8, b as u8);
                    assert!(
                        !(ColorBand::INDICATOR.matches(px) && ColorBand::TARGET.matches(px)),
                        "{:?} matched both bands",
                        px
                    );
                }
            }
        }
    }

    #[test]
    fn test_threshold_edges_are_inclusive() {
        assert!(ColorBand::INDICATOR.matches(Rgb::new(170, 90, 90)));
        assert!(!ColorBand::INDICATOR.matches(Rgb::new(169, 90, 90)));
        assert!(!ColorBand::INDICATOR.matches(Rgb::new(170, 91, 90)));
        assert!(ColorBand::TARGET.matches(Rgb::new(90, 170, 90)));
        assert!(!ColorBand::TARGET.matches(Rgb::new(90, 170, 91)));
    }

    #[test]
    fn test_blank_frame_gives_blank_mask() {
        let frame = Frame::filled(10, 10, Rgb::BLACK);
        let mask = classify(&frame, &ColorBand::INDICATOR);
        assert_eq!(mask.count(), 0);
        assert_eq!(vertical_span(&mask), None);
        assert!(!is_present(&mask, 1));
    }

    #[test]
    fn test_row_filter_drops_sparse_indicator_rows() {
        let mut frame = Frame::filled(10, 10, Rgb::BLACK);
        bar(&mut frame, 0, 5, 4, 6, RED);
        // stray pixels: two in row 0, one in row 9
        frame.set(1, 0, RED);
        frame.set(7, 0, RED);
        frame.set(3, 9, RED);

        let mask = classify(&frame, &ColorBand::INDICATOR);
        assert_eq!(mask.row_count(0), 0);
        assert_eq!(mask.row_count(9), 0);
        assert_eq!(mask.row_count(5), 5);
        assert_eq!(vertical_span(&mask), Some(Span { top: 4, bottom: 6 }));
    }

    #[test]
    fn test_target_band_is_not_row_filtered() {
        let mut frame = Frame::filled(10, 10, Rgb::BLACK);
        frame.set(2, 7, GREEN);
        let mask = classify(&frame, &ColorBand::TARGET);
        assert_eq!(vertical_span(&mask), Some(Span { top: 7, bottom: 7 }));
    }

    #[test]
    fn test_span_bounds_are_set_rows_and_cover_all_hits() {
        let mut frame = Frame::filled(6, 40, Rgb::BLACK);
        bar(&mut frame, 0, 6, 3, 3, GREEN);
        bar(&mut frame, 2, 3, 17, 22, GREEN);
        bar(&mut frame, 5, 6, 31, 31, GREEN);

        let mask = classify(&frame, &ColorBand::TARGET);
        let span = vertical_span(&mask).unwrap();
        assert_eq!(span, Span { top: 3, bottom: 31 });
        assert!(mask.row_count(span.top) > 0);
        assert!(mask.row_count(span.bottom) > 0);
        for y in 0..mask.height() {
            if mask.row_count(y) > 0 {
                assert!(y >= span.top && y <= span.bottom);
            }
        }
    }

    #[test]
    fn test_presence_needs_min_pixels() {
        let mut frame = Frame::filled(10, 20, Rgb::BLACK);
        bar(&mut frame, 0, 5, 0, 10, RED); // 55 pixels
        let mask = classify(&frame, &ColorBand::INDICATOR);
        assert!(vertical_span(&mask).is_some());
        assert!(!is_present(&mask, 60));

        bar(&mut frame, 0, 5, 11, 11, RED); // 60 pixels
        let mask = classify(&frame, &ColorBand::INDICATOR);
        assert!(is_present(&mask, 60));
    }

    #[test]
    fn test_span_overlap_is_closed_interval() {
        let a = Span { top: 10, bottom: 20 };
        assert!(a.overlaps(&Span { top: 20, bottom: 25 }));
        assert!(a.overlaps(&Span { top: 0, bottom: 10 }));
        assert!(a.overlaps(&Span { top: 12, bottom: 14 }));
        assert!(!a.overlaps(&Span { top: 21, bottom: 30 }));
        assert!(!a.overlaps(&Span { top: 0, bottom: 9 }));
        assert!(!spans_overlap(Some(a), None));
        assert!(!spans_overlap(None, None));
    }

    #[test]
    fn test_band_deserializes_from_json() {
        let json = r#"{"r":{"at_least":200},"g":{"at_most":60},"b":{"at_most":60}}"#;
        let band: ColorBand = serde_json::from_str(json).unwrap();
        assert_eq!(band.r, Bound::AtLeast(200));
        assert_eq!(band.min_row_pixels, 0);
    }
}
