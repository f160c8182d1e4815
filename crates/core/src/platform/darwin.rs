use std::time::Duration;

use anyhow::{anyhow, Result};
use core_graphics::event::*;
use core_graphics::event_source::*;
use core_graphics::geometry::*;
use core_graphics::window::*;

use crate::error::CaptureError;
use crate::logger;
use crate::types::*;
use super::Platform;

pub struct DarwinPlatform {
    source: CGEventSource,
}

// CGEventSource wraps a CF object that is only touched from the loop thread.
unsafe impl Send for DarwinPlatform {}

impl DarwinPlatform {
    pub fn new() -> Result<Self> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow!("failed to create HID event source; grant Accessibility permission"))?;
        logger::info_p("darwin", "CoreGraphics capture and HID event source ready");
        Ok(DarwinPlatform { source })
    }

    fn pointer_location(&self) -> Option<CGPoint> {
        CGEvent::new(self.source.clone()).ok().map(|e| e.location())
    }
}

/// Only 32-bit BGRA images can be normalized.
fn check_pixel_format(bits_per_pixel: usize) -> Result<(), CaptureError> {
    if bits_per_pixel != 32 {
        return Err(CaptureError::Backend(format!(
            "unexpected pixel format: {} bits per pixel",
            bits_per_pixel
        )));
    }
    Ok(())
}

impl Platform for DarwinPlatform {
    fn name(&self) -> &'static str {
        "darwin"
    }

    fn grab(&mut self, region: &Region) -> Result<Frame, CaptureError> {
        if region.width == 0 || region.height == 0 {
            return Err(CaptureError::EmptyRegion);
        }
        let cg_rect = CGRect::new(
            &CGPoint::new(region.left as f64, region.top as f64),
            &CGSize::new(region.width as f64, region.height as f64),
        );

        // Nominal resolution keeps one pixel per point on Retina displays
        let image_option = kCGWindowImageNominalResolution;
        let image = create_image(
            cg_rect,
            kCGWindowListOptionOnScreenOnly,
            kCGNullWindowID,
            image_option,
        )
        .ok_or(CaptureError::Unavailable)?;

        check_pixel_format(image.bits_per_pixel())?;
        let cf_data = image.data();
        let capture = Capture {
            data: cf_data.bytes().to_vec(),
            width: image.width() as u32,
            height: image.height() as u32,
            bytes_per_row: image.bytes_per_row() as u32,
        };
        Frame::from_bgra(&capture)
    }

    fn click(&mut self) -> Result<()> {
        let point = self
            .pointer_location()
            .ok_or_else(|| anyhow!("failed to read pointer location"))?;

        let down = CGEvent::new_mouse_event(
            self.source.clone(),
            CGEventType::LeftMouseDown,
            point,
            CGMouseButton::Left,
        )
        .map_err(|_| anyhow!("failed to create mouse down event"))?;
        down.post(CGEventTapLocation::HID);

        std::thread::sleep(Duration::from_millis(15));

        let up = CGEvent::new_mouse_event(
            self.source.clone(),
            CGEventType::LeftMouseUp,
            point,
            CGMouseButton::Left,
        )
        .map_err(|_| anyhow!("failed to create mouse up event"))?;
        up.post(CGEventTapLocation::HID);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_rejected_before_copy() {
        assert!(check_pixel_format(32).is_ok());
        assert!(matches!(check_pixel_format(24), Err(CaptureError::Backend(_))));
        assert!(matches!(check_pixel_format(64), Err(CaptureError::Backend(_))));
    }
}
