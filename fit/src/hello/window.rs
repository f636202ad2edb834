//! Invisible owner window for WebAuthn dialogs

use crate::error::{Error, Result};

use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, RegisterClassW, UnregisterClassW,
    WINDOW_EX_STYLE, WNDCLASSW, WS_OVERLAPPED,
};
use windows::core::{PCWSTR, w};

use tracing::{debug, warn};

const CLASS_NAME: PCWSTR = w!("fit-hello");

extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

/// Hidden top-level window; destroyed on drop
pub struct HiddenWindow {
    hwnd: HWND,
}

impl HiddenWindow {
    pub fn new() -> Result<Self> {
        unsafe {
            let instance: HINSTANCE = GetModuleHandleW(None)
                .map_err(|e| Error::Platform(format!("hidden window: {e}")))?
                .into();
            let class = WNDCLASSW {
                lpfnWndProc: Some(window_proc),
                hInstance: instance,
                lpszClassName: CLASS_NAME,
                ..Default::default()
            };
            // Zero means the class already exists, which is fine
            RegisterClassW(&class);

            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                CLASS_NAME,
                w!("fit-hello"),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                None,
                None,
                instance,
                None,
            )
            .map_err(|e| Error::Platform(format!("hidden window: {e}")))?;

            debug!("created hidden window");
            Ok(Self { hwnd })
        }
    }

    pub fn handle(&self) -> HWND {
        self.hwnd
    }
}

impl Drop for HiddenWindow {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = DestroyWindow(self.hwnd) {
                warn!("DestroyWindow failed: {e}");
            }
            if let Ok(instance) = GetModuleHandleW(None) {
                let _ = UnregisterClassW(CLASS_NAME, HINSTANCE::from(instance));
            }
        }
    }
}
