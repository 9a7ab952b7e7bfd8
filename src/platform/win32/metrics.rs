// ── Geometry and cursor queries ───────────────────────────────────────────────
//
// Best-effort, read-only lookups against live window handles.  Every function
// returns a documented sentinel on failure instead of propagating an error;
// callers continue in a degraded state.
//
// `ScreenToClient` is treated as advisory: its failure indicator is
// unreliable for cross-window mappings, so its result is used as-is.

use windows::Win32::{
    Foundation::{HWND, POINT, RECT},
    Graphics::Gdi::ScreenToClient,
    UI::WindowsAndMessaging::{
        GetCursorPos, GetSystemMetrics, GetWindowRect, SM_CXPADDEDBORDER, SM_CYCAPTION,
        SM_CYFRAME,
    },
};

use crate::surface::{Point, Size};

/// Bounding size of `hwnd`, or [`Size::ZERO`] if the rect cannot be read.
pub(crate) fn window_size(hwnd: HWND) -> Size {
    let mut frame = RECT::default();
    // SAFETY: hwnd is a live window handle supplied by the caller; &mut frame
    // is a valid RECT for the duration of the call.
    if let Err(e) = unsafe { GetWindowRect(hwnd, &mut frame) } {
        log::error!("failed to obtain window size: {e}");
        return Size::ZERO;
    }

    Size::new(
        (frame.right - frame.left) as u32,
        (frame.bottom - frame.top) as u32,
    )
}

/// Top-left corner of `child` expressed in `parent`'s coordinate space, or
/// [`Point::OFFSCREEN`] if the child rect cannot be read.
pub(crate) fn relative_position(child: HWND, parent: HWND) -> Point {
    let mut rect = RECT::default();
    // SAFETY: child is a live window handle; &mut rect is a valid RECT.
    if let Err(e) = unsafe { GetWindowRect(child, &mut rect) } {
        log::error!("failed to get child window rect: {e}");
        return Point::OFFSCREEN;
    }

    let mut corner = POINT { x: rect.left, y: rect.top };
    // SAFETY: parent is a live window handle; &mut corner is a valid POINT.
    // The return value is advisory only and intentionally unused.
    let _ = unsafe { ScreenToClient(parent, &mut corner) };

    Point::new(corner.x, corner.y)
}

/// Global cursor position converted into `child`'s local coordinate space,
/// or [`Point::ORIGIN`] if the cursor cannot be read.
pub(crate) fn cursor_position(child: HWND) -> Point {
    let mut pos = POINT::default();
    // SAFETY: &mut pos is a valid POINT for the duration of the call.
    if let Err(e) = unsafe { GetCursorPos(&mut pos) } {
        log::warn!("failed to read the cursor position: {e}");
        return Point::ORIGIN;
    }

    // SAFETY: child is a live window handle; &mut pos is a valid POINT.
    // Advisory return value, intentionally unused.
    let _ = unsafe { ScreenToClient(child, &mut pos) };

    Point::new(pos.x, pos.y)
}

/// Estimated titlebar height: frame + caption + padded border.
///
/// `GetSystemMetrics` reports `0` for metrics it cannot resolve, so an
/// unavailable metric simply contributes nothing; this never fails.
pub(crate) fn titlebar_height() -> i32 {
    // SAFETY: GetSystemMetrics is a pure read of system configuration and
    // has no preconditions.
    unsafe {
        GetSystemMetrics(SM_CYFRAME)
            + GetSystemMetrics(SM_CYCAPTION)
            + GetSystemMetrics(SM_CXPADDEDBORDER)
    }
}
