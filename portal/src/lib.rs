//! Paper-Portal plugin entry points.
//!
//! The host calls `pp_init` once, `pp_tick` periodically and
//! `pp_on_gesture` on input; `pp_alloc`/`pp_free` let it place byte
//! buffers in linear memory. The runtime is single-threaded and
//! cooperative, so one process-wide cell holds the application.

// The `pp` import module only exists inside the Portal runtime.
#![cfg(target_arch = "wasm32")]

mod display;
mod fs;
mod host;
mod logger;
mod nvs;

use std::alloc::Layout;
use std::cell::RefCell;

use xtc_core::application::App;
use xtc_core::input::Tap;

use crate::display::HostDisplay;
use crate::fs::HostFilesystem;
use crate::nvs::HostNvs;

pub const CONTRACT_VERSION: i32 = 1;

const GESTURE_TAP: i32 = 1;

struct Runtime {
    app: App<HostFilesystem, HostNvs>,
    display: HostDisplay,
}

struct RuntimeCell(RefCell<Option<Runtime>>);

// The Portal runtime never re-enters the plugin from another thread.
unsafe impl Sync for RuntimeCell {}

static RUNTIME: RuntimeCell = RuntimeCell(RefCell::new(None));

#[no_mangle]
pub extern "C" fn pp_contract_version() -> i32 {
    CONTRACT_VERSION
}

#[no_mangle]
pub extern "C" fn pp_init(
    api_version: i32,
    _api_features: i64,
    screen_w: i32,
    screen_h: i32,
) -> i32 {
    logger::init();
    if api_version < CONTRACT_VERSION || screen_w <= 0 || screen_h <= 0 {
        return -1;
    }

    let mut app = App::new(HostFilesystem, HostNvs);
    app.init();
    let runtime = Runtime {
        app,
        display: HostDisplay::new(screen_w as u32, screen_h as u32),
    };
    *RUNTIME.0.borrow_mut() = Some(runtime);
    log::info!("xtc reader up, {screen_w}x{screen_h}");
    0
}

#[no_mangle]
pub extern "C" fn pp_tick(_now_ms: i32) -> i32 {
    let mut slot = RUNTIME.0.borrow_mut();
    let Some(runtime) = slot.as_mut() else {
        return -1;
    };
    runtime.app.tick(&mut runtime.display);
    0
}

#[no_mangle]
pub extern "C" fn pp_on_gesture(
    kind: i32,
    x: i32,
    y: i32,
    _dx: i32,
    _dy: i32,
    _duration_ms: i32,
    _now_ms: i32,
    _flags: i32,
) -> i32 {
    if kind != GESTURE_TAP {
        return 0;
    }
    let mut slot = RUNTIME.0.borrow_mut();
    let Some(runtime) = slot.as_mut() else {
        return -1;
    };
    runtime.app.on_tap(Tap { x, y });
    0
}

#[no_mangle]
pub extern "C" fn pp_alloc(len: i32) -> i32 {
    if len <= 0 {
        return 0;
    }
    let Ok(layout) = Layout::from_size_align(len as usize, 1) else {
        return 0;
    };
    let ptr = unsafe { std::alloc::alloc(layout) };
    if ptr.is_null() {
        0
    } else {
        ptr as i32
    }
}

#[no_mangle]
pub extern "C" fn pp_free(ptr: i32, len: i32) {
    if ptr == 0 || len <= 0 {
        return;
    }
    let Ok(layout) = Layout::from_size_align(len as usize, 1) else {
        return;
    };
    unsafe { std::alloc::dealloc(ptr as *mut u8, layout) }
}
