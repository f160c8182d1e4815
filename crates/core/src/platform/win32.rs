use std::mem::size_of;

use anyhow::{anyhow, Result};
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    SRCCOPY,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEINPUT,
    MOUSE_EVENT_FLAGS,
};

use crate::error::CaptureError;
use crate::logger;
use crate::types::*;
use super::Platform;

pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Result<Self> {
        // Probe the desktop DC once so a locked-down session fails at startup
        unsafe {
            let screen = GetDC(HWND(std::ptr::null_mut()));
            if screen.is_invalid() {
                return Err(anyhow!("failed to open the desktop device context"));
            }
            ReleaseDC(HWND(std::ptr::null_mut()), screen);
        }
        logger::info_p("win32", "GDI capture and SendInput ready");
        Ok(Win32Platform)
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

impl Platform for Win32Platform {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn grab(&mut self, region: &Region) -> Result<Frame, CaptureError> {
        if region.width == 0 || region.height == 0 {
            return Err(CaptureError::EmptyRegion);
        }
        let (w, h) = (region.width as i32, region.height as i32);

        unsafe {
            let desktop = HWND(std::ptr::null_mut());
            let screen = GetDC(desktop);
            if screen.is_invalid() {
                return Err(CaptureError::Unavailable);
            }
            let mem = CreateCompatibleDC(screen);
            let bitmap = CreateCompatibleBitmap(screen, w, h);
            let previous = SelectObject(mem, HGDIOBJ(bitmap.0));

            let blit = BitBlt(mem, 0, 0, w, h, screen, region.left, region.top, SRCCOPY);

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: w,
                    // negative height: top-down rows
                    biHeight: -h,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut data = vec![0u8; region.pixel_count() * 4];
            let lines = if blit.is_ok() {
                GetDIBits(
                    mem,
                    bitmap,
                    0,
                    h as u32,
                    Some(data.as_mut_ptr().cast()),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(mem, previous);
            let _ = DeleteObject(HGDIOBJ(bitmap.0));
            let _ = DeleteDC(mem);
            ReleaseDC(desktop, screen);

            if let Err(e) = blit {
                return Err(CaptureError::Backend(format!("BitBlt failed: {}", e)));
            }
            if lines != h {
                return Err(CaptureError::Backend(format!("GetDIBits copied {} of {} rows", lines, h)));
            }

            Frame::from_bgra(&Capture {
                data,
                width: region.width,
                height: region.height,
                bytes_per_row: region.width * 4,
            })
        }
    }

    fn click(&mut self) -> Result<()> {
        let inputs = [mouse_input(MOUSEEVENTF_LEFTDOWN), mouse_input(MOUSEEVENTF_LEFTUP)];
        let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(anyhow!("SendInput injected {} of {} events", sent, inputs.len()));
        }
        Ok(())
    }
}
