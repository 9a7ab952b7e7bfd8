// ── Win32 embedded surface ────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined to this module):
//   • Register a uniquely named window class per surface.
//   • Create the child window inside the foreign parent.
//   • Arm the periodic timer that stands in for a frame signal, and route
//     its expiries back to the owning instance through the registry.
//   • Tear everything down symmetrically, tolerating the foreign toolkit
//     destroying the native window first.
//
// The foreign toolkit owns the message loop.  This code never pumps it; the
// owner drains pending messages inside each `FrameTick` callback, on the
// thread that created the surface.

use std::rc::Rc;

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{
            GetLastError, ERROR_INVALID_WINDOW_HANDLE, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM,
        },
        Graphics::Gdi::HBRUSH,
        System::LibraryLoader::GetModuleHandleW,
        UI::Input::KeyboardAndMouse::SetFocus,
        UI::WindowsAndMessaging::{
            AllowSetForegroundWindow, CreateWindowExW, DefWindowProcW, DestroyWindow, IsWindow,
            KillTimer, RegisterClassW, SetForegroundWindow, SetTimer, UnregisterClassW, ASFW_ANY,
            CS_DBLCLKS, CS_GLOBALCLASS, HCURSOR, HICON, HMENU, USER_TIMER_MINIMUM, WNDCLASSW,
            WS_CHILD, WS_CLIPCHILDREN, WS_CLIPSIBLINGS, WS_EX_NOINHERITLAYOUT, WS_VISIBLE,
        },
    },
};

use super::{metrics, name};
use crate::error::{InlayError, Result};
use crate::lifecycle::{self, SurfaceCore};
use crate::registry::{self, TickOutcome};
use crate::surface::{
    EmbeddedSurface, EventHandler, NativeHandle, Point, Size, SurfaceEvent, POLL_RATE_UNKNOWN,
};

/// Window name of every embedded child; identity comes from the class name.
const WINDOW_NAME: PCWSTR = w!("inlay-surface");

// ── Handle conversions ────────────────────────────────────────────────────────

fn to_hwnd(handle: NativeHandle) -> HWND {
    HWND(handle.raw() as *mut core::ffi::c_void)
}

fn from_hwnd(hwnd: HWND) -> NativeHandle {
    NativeHandle::from_raw(hwnd.0 as isize)
}

// ── Win32Surface ──────────────────────────────────────────────────────────────

/// Win32 implementation of the embedding contract.
///
/// Owns the child `HWND`, its window class, and the armed timer; the foreign
/// parent is borrowed and never mutated or destroyed. Construction failure is
/// reported through a single `SurfaceEvent::Error` and leaves the object
/// allocated but permanently non-functional.
pub(crate) struct Win32Surface {
    core: Rc<SurfaceCore>,
    /// Class registered for this surface; empty if registration never ran.
    class_name: String,
}

impl Win32Surface {
    /// Build the child window inside `parent` and start the frame timer.
    ///
    /// Runs the whole creation sequence; on any fatal step the owner receives
    /// exactly one `SurfaceEvent::Error` and the surface stays inert.
    pub(crate) fn new(parent: NativeHandle, on_event: EventHandler) -> Self {
        let core = Rc::new(SurfaceCore::new(parent, on_event));
        let mut surface = Self {
            core,
            class_name: String::new(),
        };

        if let Err(e) = surface.build() {
            log::error!("failed to create embedded child window: {e}");
            surface.core.emit(SurfaceEvent::Error);
        }

        surface
    }

    fn build(&mut self) -> Result<()> {
        let parent = to_hwnd(self.core.parent());
        // SAFETY: IsWindow tolerates arbitrary handle values, including null
        // and stale ones.
        if self.core.parent().is_null() || !unsafe { IsWindow(parent) }.as_bool() {
            return Err(InlayError::Win32 {
                function: "IsWindow",
                code: ERROR_INVALID_WINDOW_HANDLE.0,
            });
        }

        let hinstance = module_instance()?;

        let class_name = name::unique_class_name();
        if class_name.is_empty() {
            log::warn!("no unique class name available; attempting to create the window anyway");
        }
        register_class(&class_name, hinstance)?;
        self.class_name = class_name;

        let child = self.create_child(parent, hinstance)?;
        self.core.set_child(from_hwnd(child));
        registry::insert(from_hwnd(child), &self.core);
        request_focus(child);

        self.core.emit(SurfaceEvent::Created);

        // Arming can fail even though the window exists; the handle stays
        // registered but no ticks will ever fire, so the construction counts
        // as failed overall and `new` reports it.
        self.arm_timer(child)?;

        log::debug!(
            "embedded surface {:?} running inside parent {:?}",
            self.core.child(),
            self.core.parent(),
        );
        Ok(())
    }

    fn create_child(&self, parent: HWND, hinstance: HINSTANCE) -> Result<HWND> {
        // CW_USEDEFAULT degenerates to zero for child windows, which breaks
        // the owner's initial scaling — size to the parent up front instead.
        // A zero-area parent usually means the foreign toolkit has not laid
        // the window out yet; creation proceeds regardless.
        let parent_size = metrics::window_size(parent);
        if parent_size.is_empty() {
            log::warn!("parent window reports a 0x0 rect; scaling issues may occur");
        }

        let class_wide: Vec<u16> = self
            .class_name
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: class_wide is a valid null-terminated UTF-16 string for the
        // class registered just above; parent is a live window on this thread
        // and hinstance is this process's module.
        unsafe {
            CreateWindowExW(
                WS_EX_NOINHERITLAYOUT,
                PCWSTR(class_wide.as_ptr()),
                WINDOW_NAME,
                WS_CHILD | WS_CLIPCHILDREN | WS_CLIPSIBLINGS | WS_VISIBLE,
                0,
                0,
                parent_size.width as i32,
                parent_size.height as i32,
                parent,
                HMENU::default(),
                hinstance,
                None,
            )
        }
        .map_err(|e| InlayError::Win32 {
            function: "CreateWindowExW",
            code: e.code().0 as u32,
        })
    }

    fn arm_timer(&self, child: HWND) -> Result<()> {
        let token = lifecycle::next_timer_token();

        // SAFETY: child is a live window created on this thread; timer_proc
        // is a valid TIMERPROC for the lifetime of the process.
        let armed = unsafe { SetTimer(child, token, USER_TIMER_MINIMUM, Some(timer_proc)) };
        if armed == 0 {
            return Err(last_error("SetTimer"));
        }

        self.core.set_timer(token);
        Ok(())
    }

    /// Stop the timer, unregister the instance, and release the child window.
    ///
    /// Idempotent: `begin_teardown` claims the surface exactly once, so a
    /// second invocation (or a `Drop` after the foreign toolkit already tore
    /// the window down) is a no-op.
    fn teardown(&self) {
        let Some(plan) = self.core.begin_teardown() else {
            return;
        };
        let child = to_hwnd(plan.child);

        if let Some(token) = plan.timer {
            // SAFETY: token was returned by SetTimer for this window and has
            // not been disarmed since. Disarming precedes handle invalidation
            // so no expiry can race a half-destroyed surface.
            if let Err(e) = unsafe { KillTimer(child, token) } {
                log::warn!("failed to stop the frame timer: {e}");
            }
        }

        if !registry::remove(plan.child) {
            // A live surface must always be mapped; reaching here means the
            // registry invariant was broken somewhere else.
            log::error!("embedded surface {:?} was not registered at teardown", plan.child);
        }

        // The foreign toolkit's destruction path may have released the native
        // window already; only destroy it if it still exists.
        // SAFETY: IsWindow tolerates stale handles, and DestroyWindow is only
        // invoked on a window owned by this thread.
        unsafe {
            if IsWindow(child).as_bool() {
                if let Err(e) = DestroyWindow(child) {
                    log::warn!("failed to destroy the embedded child window: {e}");
                }
            }
        }
    }

    fn unregister_class(&mut self) {
        if self.class_name.is_empty() {
            return;
        }
        let Ok(hinstance) = module_instance() else {
            return;
        };

        let class_wide: Vec<u16> = self
            .class_name
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: the class was registered by this instance with this module
        // handle, and its only window has already been destroyed; class_wide
        // is a valid null-terminated UTF-16 string for the call's duration.
        if let Err(e) = unsafe { UnregisterClassW(PCWSTR(class_wide.as_ptr()), hinstance) } {
            log::warn!("failed to unregister window class {}: {e}", self.class_name);
        }
        self.class_name.clear();
    }
}

impl Drop for Win32Surface {
    fn drop(&mut self) {
        self.teardown();
        self.unregister_class();
    }
}

// ── Query surface ─────────────────────────────────────────────────────────────

impl EmbeddedSurface for Win32Surface {
    fn native_handle(&self) -> NativeHandle {
        self.core.child()
    }

    fn parent_handle(&self) -> NativeHandle {
        if self.core.is_live() {
            self.core.parent()
        } else {
            NativeHandle::NULL
        }
    }

    fn parent_size(&self) -> Size {
        if !self.core.is_live() {
            return Size::ZERO;
        }
        metrics::window_size(to_hwnd(self.core.parent()))
    }

    fn titlebar_height(&self) -> i32 {
        if !self.core.is_live() {
            return 0;
        }
        metrics::titlebar_height()
    }

    fn poll_rate_ms(&self) -> u32 {
        // The timer, not the window, defines the tick cadence: a surface
        // whose timer failed to arm reports the sentinel.
        if self.core.timer().is_some() {
            USER_TIMER_MINIMUM
        } else {
            POLL_RATE_UNKNOWN
        }
    }

    fn relative_position(&self) -> Point {
        if !self.core.is_live() {
            return Point::OFFSCREEN;
        }
        metrics::relative_position(to_hwnd(self.core.child()), to_hwnd(self.core.parent()))
    }

    fn cursor_position(&self) -> Point {
        if !self.core.is_live() {
            return Point::ORIGIN;
        }
        metrics::cursor_position(to_hwnd(self.core.child()))
    }
}

// ── Native setup helpers ──────────────────────────────────────────────────────

fn module_instance() -> Result<HINSTANCE> {
    // SAFETY: GetModuleHandleW(None) returns the process's own HMODULE, which
    // is valid for the process lifetime and never fails in practice.
    let hmodule = unsafe { GetModuleHandleW(None) }.map_err(InlayError::from)?;

    // HINSTANCE and HMODULE represent the same underlying value on Windows
    // (guaranteed by the Win32 ABI).
    Ok(HINSTANCE(hmodule.0))
}

fn register_class(class_name: &str, hinstance: HINSTANCE) -> Result<()> {
    let class_wide: Vec<u16> = class_name.encode_utf16().chain(std::iter::once(0)).collect();

    let wndclass = WNDCLASSW {
        // CS_GLOBALCLASS: the class is visible process-wide, so the foreign
        // toolkit can resolve it regardless of which module hosts it.
        style: CS_GLOBALCLASS | CS_DBLCLKS,
        lpfnWndProc: Some(wnd_proc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        hInstance: hinstance,
        hIcon: HICON::default(),
        hCursor: HCURSOR::default(),
        hbrBackground: HBRUSH::default(),
        lpszMenuName: PCWSTR::null(),
        lpszClassName: PCWSTR(class_wide.as_ptr()),
    };

    // SAFETY: wndclass is fully initialised; class_wide is a valid
    // null-terminated UTF-16 string that outlives the call (the system copies
    // the name during registration).
    let atom = unsafe { RegisterClassW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassW"));
    }

    Ok(())
}

/// Best-effort foreground/focus request on the fresh child.
///
/// A denied request is routine (another process holds foreground rights) and
/// only logged; embedding continues either way.
fn request_focus(child: HWND) {
    // SAFETY: child is a live window created on this thread. All three calls
    // merely request input state changes and have no memory preconditions.
    unsafe {
        match AllowSetForegroundWindow(ASFW_ANY) {
            Ok(()) => {
                if !SetForegroundWindow(child).as_bool() {
                    log::warn!("embedded surface was not brought to the foreground");
                }
            }
            Err(e) => log::warn!("unable to allow foreground activation: {e}"),
        }

        let _ = SetFocus(child);
    }
}

// ── Native callbacks ──────────────────────────────────────────────────────────

// SAFETY: registered as lpfnWndProc in WNDCLASSW. Windows guarantees valid
// parameters for the duration of the call.
unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // The child never handles messages itself; the owner drains the queue
    // inside each FrameTick callback.
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

// SAFETY: registered as the TIMERPROC for every surface timer; Windows
// invokes it on the thread that armed the timer, with the hwnd the timer was
// attached to.
unsafe extern "system" fn timer_proc(hwnd: HWND, _msg: u32, timer_id: usize, _sys_time: u32) {
    if registry::deliver_tick(from_hwnd(hwnd)) == TickOutcome::Stale {
        // No owner can be notified; stop the orphan timer so it cannot keep
        // firing for a window nobody tracks.
        let _ = KillTimer(hwnd, timer_id);
    }
}

// ── Error helpers ─────────────────────────────────────────────────────────────

/// Capture the current Win32 last-error code and wrap it in an `InlayError`.
///
/// Call immediately after a Win32 function that signals failure —
/// `GetLastError` reads thread-local state that can be overwritten by any
/// subsequent API call.
fn last_error(function: &'static str) -> InlayError {
    // SAFETY: GetLastError reads thread-local state set by the last Win32
    // call. It is always safe to call and never fails.
    let code = unsafe { GetLastError() };
    InlayError::Win32 {
        function,
        code: code.0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// These exercise real HWNDs and timers, so they only run on a Windows host.
// Each test creates its own top-level parent on its own thread; the registry
// is thread-local, so tests do not interfere with one another.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WINDOW_EX_STYLE,
        WS_OVERLAPPEDWINDOW, WS_POPUP,
    };

    use super::*;
    use crate::surface::create;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// A top-level window standing in for the foreign parent.
    struct TestParent {
        hwnd: HWND,
        class_name: String,
    }

    impl TestParent {
        fn new(width: i32, height: i32, popup: bool) -> Self {
            let hinstance = module_instance().expect("own module handle");
            let class_name = name::unique_class_name();
            register_class(&class_name, hinstance).expect("register parent class");

            let class_wide: Vec<u16> =
                class_name.encode_utf16().chain(std::iter::once(0)).collect();
            let style = if popup { WS_POPUP } else { WS_OVERLAPPEDWINDOW };

            // SAFETY: the class was registered above; the window is created
            // hidden and destroyed by Drop on the same thread.
            let hwnd = unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE(0),
                    PCWSTR(class_wide.as_ptr()),
                    w!("inlay-test-parent"),
                    style,
                    0,
                    0,
                    width,
                    height,
                    HWND::default(),
                    HMENU::default(),
                    hinstance,
                    None,
                )
            }
            .expect("create test parent window");

            Self { hwnd, class_name }
        }

        fn handle(&self) -> NativeHandle {
            from_hwnd(self.hwnd)
        }
    }

    impl Drop for TestParent {
        fn drop(&mut self) {
            // SAFETY: hwnd was created by this struct on this thread; the
            // class is unregistered only after its window is gone.
            unsafe {
                let _ = DestroyWindow(self.hwnd);
                let class_wide: Vec<u16> = self
                    .class_name
                    .encode_utf16()
                    .chain(std::iter::once(0))
                    .collect();
                let _ = UnregisterClassW(
                    PCWSTR(class_wide.as_ptr()),
                    module_instance().unwrap_or_default(),
                );
            }
        }
    }

    /// Drain this thread's message queue until `done` or the deadline.
    fn pump_until(deadline: Duration, mut done: impl FnMut() -> bool) {
        let start = Instant::now();
        while start.elapsed() < deadline && !done() {
            let mut msg = MSG::default();
            // SAFETY: &mut msg is a valid MSG pointer; a null filter window
            // retrieves messages for every window on this thread.
            while unsafe { PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE) }.as_bool() {
                // SAFETY: msg was populated by a successful PeekMessageW.
                unsafe {
                    let _ = TranslateMessage(&msg);
                    let _ = DispatchMessageW(&msg);
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn recording_handler() -> (EventHandler, Rc<RefCell<Vec<SurfaceEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        (Box::new(move |e| sink.borrow_mut().push(e)), events)
    }

    #[test]
    fn created_ticks_then_destroyed() {
        init_logging();
        let parent = TestParent::new(640, 480, false);
        let (handler, events) = recording_handler();

        let surface = create(parent.handle(), handler);
        assert!(!surface.native_handle().is_null());
        assert_eq!(surface.parent_handle(), parent.handle());
        assert!(!surface.parent_size().is_empty());
        assert_eq!(surface.poll_rate_ms(), USER_TIMER_MINIMUM);

        // At least one tick must arrive within five poll intervals; allow a
        // generous margin for a loaded CI host.
        let deadline = Duration::from_millis(u64::from(surface.poll_rate_ms()) * 5).max(
            Duration::from_millis(500),
        );
        pump_until(deadline, || {
            events.borrow().contains(&SurfaceEvent::FrameTick)
        });

        drop(surface);

        let events = events.borrow();
        assert_eq!(events.first(), Some(&SurfaceEvent::Created));
        assert!(
            events.contains(&SurfaceEvent::FrameTick),
            "no FrameTick within {deadline:?}: {events:?}"
        );
        assert_eq!(events.last(), Some(&SurfaceEvent::Destroyed));
        assert!(!events.contains(&SurfaceEvent::Error));
    }

    #[test]
    fn invalid_parent_fails_construction() {
        init_logging();
        let (handler, events) = recording_handler();

        let surface = create(NativeHandle::from_raw(0x0bad_f00d), handler);

        assert_eq!(*events.borrow(), vec![SurfaceEvent::Error]);
        assert!(surface.native_handle().is_null());
        assert!(surface.parent_handle().is_null());
        assert_eq!(surface.parent_size(), Size::ZERO);
        assert_eq!(surface.titlebar_height(), 0);
        assert_eq!(surface.poll_rate_ms(), POLL_RATE_UNKNOWN);
        assert_eq!(surface.relative_position(), Point::OFFSCREEN);
        assert_eq!(surface.cursor_position(), Point::ORIGIN);

        drop(surface);
        // A failed construction must not emit Destroyed on drop.
        assert_eq!(*events.borrow(), vec![SurfaceEvent::Error]);
    }

    #[test]
    fn zero_size_parent_still_creates() {
        init_logging();
        // A popup created 0x0 really reports a 0x0 rect (an overlapped window
        // gets a non-client minimum).
        let parent = TestParent::new(0, 0, true);
        let (handler, events) = recording_handler();

        let surface = create(parent.handle(), handler);

        assert_eq!(events.borrow().first(), Some(&SurfaceEvent::Created));
        assert!(!surface.native_handle().is_null());
        assert_eq!(surface.parent_size(), Size::ZERO);

        drop(surface);
        assert_eq!(events.borrow().last(), Some(&SurfaceEvent::Destroyed));
    }

    #[test]
    fn sibling_surfaces_do_not_share_ticks() {
        init_logging();
        let parent = TestParent::new(640, 480, false);

        let (handler_a, events_a) = recording_handler();
        let (handler_b, events_b) = recording_handler();
        let surface_a = create(parent.handle(), handler_a);
        let surface_b = create(parent.handle(), handler_b);
        assert_ne!(surface_a.native_handle(), surface_b.native_handle());

        pump_until(Duration::from_millis(500), || {
            events_a.borrow().contains(&SurfaceEvent::FrameTick)
                && events_b.borrow().contains(&SurfaceEvent::FrameTick)
        });

        drop(surface_b);
        // Only B is gone; A must keep ticking.
        let ticks_a = events_a
            .borrow()
            .iter()
            .filter(|e| **e == SurfaceEvent::FrameTick)
            .count();
        pump_until(Duration::from_millis(500), || {
            events_a
                .borrow()
                .iter()
                .filter(|e| **e == SurfaceEvent::FrameTick)
                .count()
                > ticks_a
        });

        assert!(events_a.borrow().iter().filter(|e| **e == SurfaceEvent::FrameTick).count() > ticks_a);
        assert_eq!(events_b.borrow().last(), Some(&SurfaceEvent::Destroyed));
        assert!(!events_a.borrow().contains(&SurfaceEvent::Destroyed));

        drop(surface_a);
        assert_eq!(events_a.borrow().last(), Some(&SurfaceEvent::Destroyed));
    }
}
