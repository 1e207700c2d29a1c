#![cfg(target_os = "windows")]

//! `GWLP_WNDPROC` subclassing.
//!
//! The installed procedure is a single `extern "system"` function, [`route_message`]. It
//! looks the window up in a thread-local table (window procedures always run on the
//! thread that created the window) and either hands the message to the bound sink or,
//! after an unhook that could not restore the chain, forwards to the procedure the hook
//! replaced. Unknown windows fall through to `DefWindowProcW`.

use super::Win32;
use crate::api::{MessageSink, WindowMessage, WindowProcApi};
use crate::device::{WindowHandle, WndProcPtr};
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use windows_sys::Win32::Foundation::{GetLastError, SetLastError, HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::UI::WindowsAndMessaging::{CallWindowProcW, DefWindowProcW, WNDPROC};

#[cfg(target_pointer_width = "64")]
use windows_sys::Win32::UI::WindowsAndMessaging::{GetWindowLongPtrW, SetWindowLongPtrW};
#[cfg(target_pointer_width = "32")]
use windows_sys::Win32::UI::WindowsAndMessaging::{GetWindowLongW, SetWindowLongW};

const GWLP_WNDPROC: i32 = -4;

#[derive(Clone)]
enum Entry {
    Sink(Rc<dyn MessageSink>),
    Forward(WndProcPtr),
}

thread_local! {
    static ENTRIES: RefCell<HashMap<isize, Entry>> = RefCell::new(HashMap::new());
}

#[cfg(target_pointer_width = "64")]
unsafe fn get_proc(hwnd: HWND) -> isize {
    GetWindowLongPtrW(hwnd, GWLP_WNDPROC)
}

#[cfg(target_pointer_width = "32")]
unsafe fn get_proc(hwnd: HWND) -> isize {
    GetWindowLongW(hwnd, GWLP_WNDPROC) as isize
}

#[cfg(target_pointer_width = "64")]
unsafe fn set_proc(hwnd: HWND, proc: isize) -> isize {
    SetWindowLongPtrW(hwnd, GWLP_WNDPROC, proc)
}

#[cfg(target_pointer_width = "32")]
unsafe fn set_proc(hwnd: HWND, proc: isize) -> isize {
    SetWindowLongW(hwnd, GWLP_WNDPROC, proc as i32) as isize
}

fn as_wndproc(ptr: WndProcPtr) -> WNDPROC {
    // WNDPROC is a nullable function pointer; a null address maps to `None`.
    unsafe { core::mem::transmute::<usize, WNDPROC>(ptr.0) }
}

unsafe extern "system" fn route_message(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    // Clone out of the table so the borrow is released before the sink runs.
    let entry = ENTRIES.with(|e| e.borrow().get(&(hwnd as isize)).cloned());
    match entry {
        Some(Entry::Sink(sink)) => sink.dispatch(&WindowMessage {
            window: WindowHandle(hwnd as isize),
            msg,
            wparam,
            lparam,
        }),
        Some(Entry::Forward(previous)) => CallWindowProcW(as_wndproc(previous), hwnd, msg, wparam, lparam),
        None => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn hook_error(window: WindowHandle, call: &str) -> Error {
    let code = unsafe { GetLastError() };
    Error::HookInstallFailed {
        window,
        reason: format!("{call} failed (os error {code})"),
    }
}

impl WindowProcApi for Win32 {
    fn window_proc(&self, window: WindowHandle) -> Result<WndProcPtr> {
        let hwnd = window.0 as HWND;
        let proc = unsafe {
            SetLastError(0);
            get_proc(hwnd)
        };
        if proc == 0 && unsafe { GetLastError() } != 0 {
            return Err(hook_error(window, "GetWindowLongPtrW"));
        }
        Ok(WndProcPtr(proc as usize))
    }

    fn replace_window_proc(&self, window: WindowHandle, proc: WndProcPtr) -> Result<WndProcPtr> {
        let hwnd = window.0 as HWND;
        let previous = unsafe {
            SetLastError(0);
            set_proc(hwnd, proc.0 as isize)
        };
        if previous == 0 && unsafe { GetLastError() } != 0 {
            return Err(hook_error(window, "SetWindowLongPtrW"));
        }
        Ok(WndProcPtr(previous as usize))
    }

    fn call_window_proc(&self, previous: WndProcPtr, msg: &WindowMessage) -> isize {
        let hwnd = msg.window.0 as HWND;
        unsafe {
            if previous.is_null() {
                return DefWindowProcW(hwnd, msg.msg, msg.wparam, msg.lparam);
            }
            CallWindowProcW(as_wndproc(previous), hwnd, msg.msg, msg.wparam, msg.lparam)
        }
    }

    fn hook_entry_point(&self) -> WndProcPtr {
        WndProcPtr(route_message as usize)
    }

    fn bind_sink(&self, window: WindowHandle, sink: Rc<dyn MessageSink>) {
        ENTRIES.with(|e| e.borrow_mut().insert(window.0, Entry::Sink(sink)));
    }

    fn is_bound(&self, window: WindowHandle) -> bool {
        ENTRIES.with(|e| e.borrow().contains_key(&window.0))
    }

    fn release_sink(&self, window: WindowHandle, forward_to: Option<WndProcPtr>) {
        ENTRIES.with(|e| {
            let mut entries = e.borrow_mut();
            match forward_to {
                Some(previous) => entries.insert(window.0, Entry::Forward(previous)),
                None => entries.remove(&window.0),
            };
        });
    }
}
