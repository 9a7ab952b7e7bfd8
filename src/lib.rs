//! Host a self-managed render surface inside a window this process does not
//! own.
//!
//! A foreign UI toolkit (Qt, WinForms, a plugin host, …) owns the message
//! loop, so an embedded surface cannot rely on being pumped by its own code.
//! This crate creates a native child window inside the foreign parent, arms a
//! periodic timer that stands in for a frame signal, and pushes lifecycle and
//! tick events out to the embedding owner through a callback:
//!
//! ```ignore
//! let surface = inlay::create(parent_handle, Box::new(|event| match event {
//!     SurfaceEvent::Created   => { /* attach the render surface */ }
//!     SurfaceEvent::FrameTick => { /* drain events, render one frame */ }
//!     SurfaceEvent::Destroyed => { /* release the render surface */ }
//!     SurfaceEvent::Error     => { /* construction failed; discard */ }
//! }));
//! ```
//!
//! The owner attaches its own graphics context to [`EmbeddedSurface::native_handle`]
//! after `Created`; rendering itself is out of scope here.
//!
//! Everything runs on the thread that created the surface. The tick callback
//! executes synchronously inside the foreign toolkit's own dispatch, so
//! "concurrency" is strictly same-thread re-entrancy.

// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except `platform::win32` (Win32 FFI).
// Each unsafe block in that module MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

#[cfg(windows)]
mod error;
// The lifecycle and registry modules are platform-neutral so their invariants
// can be unit-tested on any host; outside of tests only the platform layer
// drives them.
#[cfg(any(windows, test))]
mod lifecycle;
mod platform;
#[cfg(any(windows, test))]
mod registry;
mod surface;

pub use surface::{
    EmbeddedSurface, EventHandler, NativeHandle, Point, Size, SurfaceEvent, POLL_RATE_UNKNOWN,
};

#[cfg(windows)]
pub use surface::create;
