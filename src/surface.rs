// ── Embedding contract ────────────────────────────────────────────────────────
//
// The platform-neutral face of the crate: opaque handle/geometry types, the
// event enum pushed to the embedding owner, the query trait every platform
// implements, and the factory that selects the concrete implementation.
//
// Query methods never fail loudly.  Each one has a documented sentinel it
// returns when the underlying platform call fails or the surface is not live,
// so callers (and tests) can assert on values instead of platform quirks.

/// Opaque native identifier of a window-like resource.
///
/// Never dereferenced by this crate's platform-neutral code; only the
/// platform module converts it to and from the OS handle type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NativeHandle(isize);

impl NativeHandle {
    /// The null handle. Returned by queries on a surface that was never
    /// created or has been torn down.
    pub const NULL: Self = Self(0);

    /// Wrap a raw OS handle value (e.g. an `HWND` cast to `isize`).
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    /// The raw OS handle value.
    pub const fn raw(self) -> isize {
        self.0
    }

    /// Whether this is [`NativeHandle::NULL`].
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A window size in device pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Sentinel for an unavailable size.
    pub const ZERO: Self = Self { width: 0, height: 0 };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero. A zero-area parent is legal but
    /// usually indicates the foreign toolkit has not laid the window out yet.
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A position in window coordinates, in device pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Sentinel for an unavailable cursor position.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Sentinel for an unavailable relative window position.
    pub const OFFSCREEN: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sentinel poll rate reported by a surface whose timer is not running.
pub const POLL_RATE_UNKNOWN: u32 = u32::MAX;

// ── Events ────────────────────────────────────────────────────────────────────

/// Lifecycle and tick events pushed to the embedding owner.
///
/// Emission contract, per surface:
/// - exactly one `Created` (success) **or** one `Error` (failure) during
///   construction; if the timer cannot be armed after the native window
///   already exists, `Created` is followed by `Error` and the construction
///   counts as failed overall
/// - zero or more `FrameTick` while running
/// - exactly one `Destroyed` during teardown, if the native window was ever
///   created
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SurfaceEvent {
    /// The native child window exists; the owner may attach its render
    /// surface to [`EmbeddedSurface::native_handle`].
    Created,
    /// A frame opportunity. The owner should drain all pending foreign
    /// messages and perform a full render pass before returning.
    FrameTick,
    /// The surface is about to be torn down; native resources are still
    /// valid for the duration of the callback.
    Destroyed,
    /// Construction failed. The surface is permanently non-functional and
    /// should be discarded; every query returns its sentinel.
    Error,
}

/// Callback used to push [`SurfaceEvent`]s out to the embedding owner.
///
/// Invoked synchronously on the thread that created the surface, from within
/// the foreign toolkit's own message dispatch.
pub type EventHandler = Box<dyn FnMut(SurfaceEvent)>;

// ── Query surface ─────────────────────────────────────────────────────────────

/// Capability set of an embedded surface.
///
/// All methods are read-only with respect to embedding state and report
/// failure through sentinels, never through panics or `Result`.
pub trait EmbeddedSurface {
    /// Native handle of the embedded child window, or [`NativeHandle::NULL`]
    /// if construction failed or the surface has been torn down.
    fn native_handle(&self) -> NativeHandle;

    /// Native handle of the foreign parent, or [`NativeHandle::NULL`] when
    /// the surface is not live.
    fn parent_handle(&self) -> NativeHandle;

    /// Current bounding size of the foreign parent; [`Size::ZERO`] on failure.
    fn parent_size(&self) -> Size;

    /// Best-effort estimate of the platform titlebar height in pixels.
    /// Unavailable metrics contribute `0`; this query never fails.
    fn titlebar_height(&self) -> i32;

    /// Interval between [`SurfaceEvent::FrameTick`]s in milliseconds, or
    /// [`POLL_RATE_UNKNOWN`] when no timer is running.
    fn poll_rate_ms(&self) -> u32;

    /// The child's top-left corner expressed in the parent's coordinate
    /// space; [`Point::OFFSCREEN`] on failure.
    fn relative_position(&self) -> Point;

    /// The global cursor position converted into the child's local
    /// coordinate space; [`Point::ORIGIN`] if unavailable.
    fn cursor_position(&self) -> Point;
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Create an embedded surface inside the foreign window `parent`.
///
/// Selects the platform implementation for the current build (only Win32 is
/// provided; other platforms are separate implementations of
/// [`EmbeddedSurface`]). Construction failure is reported by a single
/// `on_event(SurfaceEvent::Error)` call — the returned object stays allocated
/// but permanently non-functional and must be discarded by the owner.
///
/// Must be called on the thread that owns `parent`'s message queue; all
/// subsequent events fire on that same thread.
#[cfg(windows)]
pub fn create(parent: NativeHandle, on_event: EventHandler) -> Box<dyn EmbeddedSurface> {
    Box::new(crate::platform::win32::surface::Win32Surface::new(parent, on_event))
}
