//! Run the bar classifier over a saved screenshot of the capture region.
//!
//! Usage: classify-img <image.png> [settings.json]

use std::path::Path;

use anyhow::{bail, Context, Result};
use autofish_core::detect::{classify, is_present, spans_overlap, vertical_span, ColorBand};
use autofish_core::settings::Settings;
use autofish_core::types::Frame;

fn report(label: &str, frame: &Frame, band: &ColorBand, min_pixels: usize) {
    let mask = classify(frame, band);
    let span = vertical_span(&mask);
    let rows = (0..mask.height()).filter(|&y| mask.row_count(y) > 0).count();
    println!(
        "{:<9} pixels={:<6} rows={:<4} span={:<12} present={}",
        label,
        mask.count(),
        rows,
        span.map(|s| format!("{}..={}", s.top, s.bottom)).unwrap_or_else(|| "-".into()),
        is_present(&mask, min_pixels),
    );
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <image.png> [settings.json]", args[0]);
    }
    let settings = match args.get(2) {
        Some(path) => Settings::load(Path::new(path))?,
        None => Settings::default(),
    };

    let img = image::open(&args[1])
        .with_context(|| format!("failed to open {}", args[1]))?
        .to_rgb8();
    let frame = Frame::from_rgb_image(&img);
    println!("{}: {}x{}", args[1], frame.width(), frame.height());

    report("indicator", &frame, &settings.indicator, settings.min_indicator_pixels);
    report("target", &frame, &settings.target, 1);

    let red = vertical_span(&classify(&frame, &settings.indicator));
    let green = vertical_span(&classify(&frame, &settings.target));
    println!("overlap   {}", spans_overlap(red, green));
    Ok(())
}
