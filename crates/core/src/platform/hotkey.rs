use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use anyhow::Result;

use crate::logger;
use crate::types::Command;

#[cfg(target_os = "macos")]
pub const HOTKEY_LABEL: &str = "Option+V";
#[cfg(not(target_os = "macos"))]
pub const HOTKEY_LABEL: &str = "Alt+V";

/// A registered global toggle hotkey. Dropping it unregisters the hotkey
/// and joins the listener thread.
pub struct HotkeyGuard {
    thread: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    handle: usize,
}

impl Drop for HotkeyGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        imp::wake(self.handle);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
        logger::info_p("hotkey", &format!("{} released", HOTKEY_LABEL));
    }
}

/// Start a background thread listening for the global toggle hotkey.
/// Every press sends `Command::Toggle` on `tx`.
pub fn start_hotkey_listener(tx: mpsc::Sender<Command>) -> Result<HotkeyGuard> {
    let stop = Arc::new(AtomicBool::new(false));
    let (thread, handle) = imp::start(tx, Arc::clone(&stop))?;
    logger::info_p("hotkey", &format!("global hotkey {} registered", HOTKEY_LABEL));
    Ok(HotkeyGuard { thread: Some(thread), stop, handle })
}

#[cfg(target_os = "macos")]
mod imp {
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread::{self, JoinHandle};

    use anyhow::{anyhow, Result};

    use crate::types::Command;

    // CGEventTap FFI types and functions
    type CGEventTapProxy = *mut c_void;
    type CGEventRef = *mut c_void;
    type CFMachPortRef = *mut c_void;
    type CFRunLoopSourceRef = *mut c_void;
    type CFRunLoopRef = *mut c_void;
    type CFStringRef = *const c_void;
    type CGEventMask = u64;
    type CGEventType = u32;
    type CGEventFlags = u64;

    type CGEventTapCallBack = unsafe extern "C" fn(
        CGEventTapProxy,
        CGEventType,
        CGEventRef,
        *mut c_void,
    ) -> CGEventRef;

    const K_CG_HID_EVENT_TAP: u32 = 0;
    const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
    const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;
    const CG_EVENT_KEY_DOWN: u32 = 10;
    const CG_EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFFFFFE;

    const K_CG_EVENT_FLAG_MASK_ALTERNATE: u64 = 0x00080000;
    const K_CG_EVENT_FLAG_MASK_COMMAND: u64 = 0x00100000;
    const K_CG_EVENT_FLAG_MASK_CONTROL: u64 = 0x00040000;

    const K_CG_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
    const K_CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;
    const KEYCODE_V: i64 = 9;

    extern "C" {
        fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: CGEventMask,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;

        fn CFMachPortCreateRunLoopSource(
            allocator: *const c_void,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        fn CFMachPortInvalidate(port: CFMachPortRef);

        fn CFRunLoopGetCurrent() -> CFRunLoopRef;
        fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
        fn CFRunLoopRunInMode(mode: CFStringRef, seconds: f64, return_after_source_handled: u8) -> i32;
        fn CFRunLoopStop(rl: CFRunLoopRef);
        fn CFRelease(cf: *const c_void);

        fn CGEventGetFlags(event: CGEventRef) -> CGEventFlags;
        fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
        fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

        static kCFRunLoopCommonModes: CFStringRef;
        static kCFRunLoopDefaultMode: CFStringRef;
    }

    struct TapContext {
        tx: mpsc::Sender<Command>,
        tap: AtomicPtr<c_void>,
    }

    unsafe extern "C" fn hotkey_callback(
        _proxy: CGEventTapProxy,
        event_type: CGEventType,
        event: CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventRef {
        unsafe {
            let ctx = &*(user_info as *const TapContext);

            // The system disables slow taps; turn it back on
            if event_type == CG_EVENT_TAP_DISABLED_BY_TIMEOUT {
                let tap = ctx.tap.load(Ordering::Acquire);
                if !tap.is_null() {
                    CGEventTapEnable(tap, true);
                }
                return event;
            }

            if event_type != CG_EVENT_KEY_DOWN {
                return event;
            }

            let flags = CGEventGetFlags(event);
            let keycode = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE);
            let repeat = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_AUTOREPEAT) != 0;

            let has_alt = (flags & K_CG_EVENT_FLAG_MASK_ALTERNATE) != 0;
            let no_cmd = (flags & K_CG_EVENT_FLAG_MASK_COMMAND) == 0;
            let no_ctrl = (flags & K_CG_EVENT_FLAG_MASK_CONTROL) == 0;

            if keycode == KEYCODE_V && has_alt && no_cmd && no_ctrl && !repeat {
                ctx.tx.send(Command::Toggle).ok();
            }

            event
        }
    }

    pub fn start(tx: mpsc::Sender<Command>, stop: Arc<AtomicBool>) -> Result<(JoinHandle<()>, usize)> {
        let (ready_tx, ready_rx) = mpsc::channel::<Option<usize>>();

        let thread = thread::spawn(move || unsafe {
            let ctx = Box::into_raw(Box::new(TapContext {
                tx,
                tap: AtomicPtr::new(std::ptr::null_mut()),
            }));

            let tap = CGEventTapCreate(
                K_CG_HID_EVENT_TAP,
                K_CG_HEAD_INSERT_EVENT_TAP,
                K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
                1 << CG_EVENT_KEY_DOWN,
                hotkey_callback,
                ctx as *mut c_void,
            );

            if tap.is_null() {
                drop(Box::from_raw(ctx));
                ready_tx.send(None).ok();
                return;
            }
            (*ctx).tap.store(tap, Ordering::Release);

            let source = CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);
            let run_loop = CFRunLoopGetCurrent();
            CFRunLoopAddSource(run_loop, source, kCFRunLoopCommonModes);
            CGEventTapEnable(tap, true);
            ready_tx.send(Some(run_loop as usize)).ok();

            // Bounded slices so a stop that lands before the loop starts is still seen
            while !stop.load(Ordering::Acquire) {
                CFRunLoopRunInMode(kCFRunLoopDefaultMode, 0.25, 0);
            }

            CGEventTapEnable(tap, false);
            CFMachPortInvalidate(tap);
            CFRelease(source as *const c_void);
            CFRelease(tap as *const c_void);
            drop(Box::from_raw(ctx));
        });

        match ready_rx.recv() {
            Ok(Some(run_loop)) => Ok((thread, run_loop)),
            _ => {
                thread.join().ok();
                Err(anyhow!(
                    "failed to create event tap for global hotkey; \
                     grant Accessibility permission to your terminal"
                ))
            }
        }
    }

    pub fn wake(run_loop: usize) {
        unsafe { CFRunLoopStop(run_loop as CFRunLoopRef) }
    }
}

#[cfg(target_os = "windows")]
mod imp {
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread::{self, JoinHandle};

    use anyhow::{anyhow, Result};

    use crate::types::Command;

    type HWND = *mut c_void;
    type BOOL = i32;
    type UINT = u32;
    type WPARAM = usize;
    type LPARAM = isize;
    type DWORD = u32;
    type LONG = i32;

    #[repr(C)]
    struct POINT {
        x: LONG,
        y: LONG,
    }

    #[repr(C)]
    struct MSG {
        hwnd: HWND,
        message: UINT,
        w_param: WPARAM,
        l_param: LPARAM,
        time: DWORD,
        pt: POINT,
    }

    const MOD_ALT: u32 = 0x0001;
    const MOD_NOREPEAT: u32 = 0x4000;
    const VK_V: u32 = 0x56;
    const WM_QUIT: u32 = 0x0012;
    const WM_HOTKEY: u32 = 0x0312;
    const WM_USER: u32 = 0x0400;
    const PM_NOREMOVE: u32 = 0x0000;
    const HOTKEY_ID: i32 = 1;

    #[link(name = "user32")]
    extern "system" {
        fn RegisterHotKey(hwnd: HWND, id: i32, fs_modifiers: UINT, vk: UINT) -> BOOL;
        fn UnregisterHotKey(hwnd: HWND, id: i32) -> BOOL;
        fn GetMessageW(msg: *mut MSG, hwnd: HWND, msg_filter_min: UINT, msg_filter_max: UINT) -> BOOL;
        fn PeekMessageW(
            msg: *mut MSG,
            hwnd: HWND,
            msg_filter_min: UINT,
            msg_filter_max: UINT,
            remove: UINT,
        ) -> BOOL;
        fn PostThreadMessageW(thread_id: DWORD, msg: UINT, w_param: WPARAM, l_param: LPARAM) -> BOOL;
    }

    #[link(name = "kernel32")]
    extern "system" {
        fn GetCurrentThreadId() -> DWORD;
    }

    pub fn start(tx: mpsc::Sender<Command>, stop: Arc<AtomicBool>) -> Result<(JoinHandle<()>, usize)> {
        let (ready_tx, ready_rx) = mpsc::channel::<Option<usize>>();

        let thread = thread::spawn(move || unsafe {
            let mut msg: MSG = std::mem::zeroed();
            // Force creation of this thread's message queue before anyone posts to it
            PeekMessageW(&mut msg, std::ptr::null_mut(), WM_USER, WM_USER, PM_NOREMOVE);

            let ok = RegisterHotKey(std::ptr::null_mut(), HOTKEY_ID, MOD_ALT | MOD_NOREPEAT, VK_V);
            if ok == 0 {
                ready_tx.send(None).ok();
                return;
            }
            ready_tx.send(Some(GetCurrentThreadId() as usize)).ok();

            // GetMessageW blocks until a message arrives; returns 0 on WM_QUIT
            while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                if msg.message == WM_HOTKEY && msg.w_param == HOTKEY_ID as usize {
                    tx.send(Command::Toggle).ok();
                }
            }

            UnregisterHotKey(std::ptr::null_mut(), HOTKEY_ID);
        });

        match ready_rx.recv() {
            Ok(Some(thread_id)) => Ok((thread, thread_id)),
            _ => {
                thread.join().ok();
                Err(anyhow!(
                    "failed to register global hotkey Alt+V; \
                     another application may have claimed it"
                ))
            }
        }
    }

    pub fn wake(thread_id: usize) {
        unsafe {
            PostThreadMessageW(thread_id as DWORD, WM_QUIT, 0, 0);
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod imp {
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Arc};
    use std::thread::JoinHandle;

    use anyhow::{bail, Result};

    use crate::types::Command;

    pub fn start(_tx: mpsc::Sender<Command>, _stop: Arc<AtomicBool>) -> Result<(JoinHandle<()>, usize)> {
        bail!("global hotkeys are not supported on this platform")
    }

    pub fn wake(_handle: usize) {}
}
