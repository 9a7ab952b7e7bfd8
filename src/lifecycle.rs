// ── Lifecycle state & event notifier ──────────────────────────────────────────
//
// Platform-neutral half of the surface state machine.  `SurfaceCore` holds
// everything the platform layer and the tick dispatcher share: the handles,
// the armed timer token, and the owner's event callback.  The platform module
// owns the native calls; this module owns the bookkeeping invariants:
//
//   • `Destroyed` is emitted at most once, while the handle is still valid
//   • teardown is claimed atomically, so running it twice is a no-op
//   • timer tokens come from a process-wide monotonic counter
//
// No `unsafe` here — the platform layer converts `NativeHandle` to OS types.

use std::cell::{Cell, RefCell};

use crate::surface::{EventHandler, NativeHandle, SurfaceEvent};

// ── Timer tokens ──────────────────────────────────────────────────────────────

/// First token handed out. Low ids are commonly claimed by host toolkits for
/// their own window timers, so start above them (the counter is never reused
/// or reclaimed).
const FIRST_TIMER_TOKEN: usize = 5;

static NEXT_TIMER_TOKEN: std::sync::atomic::AtomicUsize =
    std::sync::atomic::AtomicUsize::new(FIRST_TIMER_TOKEN);

/// Draw the next process-wide timer token. Monotonic; unique while active.
pub(crate) fn next_timer_token() -> usize {
    NEXT_TIMER_TOKEN.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

// ── Shared surface state ──────────────────────────────────────────────────────

/// State shared between a platform surface, the instance registry, and the
/// tick dispatcher. The platform surface holds the owning `Rc`; the registry
/// holds only a `Weak` back-reference.
pub(crate) struct SurfaceCore {
    /// Foreign parent handle. Supplied externally; never owned or mutated.
    parent: NativeHandle,
    /// Embedded child handle. `NULL` until native creation succeeds and again
    /// after teardown has been claimed.
    child: Cell<NativeHandle>,
    /// Armed timer token, if any.
    timer: Cell<Option<usize>>,
    /// The embedding owner's callback.
    observer: RefCell<EventHandler>,
}

/// Native cleanup work handed back by [`SurfaceCore::begin_teardown`].
pub(crate) struct TeardownPlan {
    /// The child handle that was live when teardown was claimed.
    pub(crate) child: NativeHandle,
    /// The timer token to disarm, if one was armed.
    pub(crate) timer: Option<usize>,
}

impl SurfaceCore {
    pub(crate) fn new(parent: NativeHandle, observer: EventHandler) -> Self {
        Self {
            parent,
            child: Cell::new(NativeHandle::NULL),
            timer: Cell::new(None),
            observer: RefCell::new(observer),
        }
    }

    pub(crate) fn parent(&self) -> NativeHandle {
        self.parent
    }

    pub(crate) fn child(&self) -> NativeHandle {
        self.child.get()
    }

    /// Record the freshly created native child handle.
    pub(crate) fn set_child(&self, child: NativeHandle) {
        self.child.set(child);
    }

    /// Record the armed timer token.
    pub(crate) fn set_timer(&self, token: usize) {
        self.timer.set(Some(token));
    }

    /// The armed timer token, if any.
    pub(crate) fn timer(&self) -> Option<usize> {
        self.timer.get()
    }

    /// Whether the native child currently exists.
    pub(crate) fn is_live(&self) -> bool {
        !self.child.get().is_null()
    }

    /// Push an event to the embedding owner, synchronously.
    ///
    /// The owner drains foreign messages inside `FrameTick`, and that drain
    /// can dispatch the next timer expiry before the previous callback has
    /// returned. A re-entrant notification is dropped rather than delivered
    /// into the still-running callback.
    pub(crate) fn emit(&self, event: SurfaceEvent) {
        match self.observer.try_borrow_mut() {
            Ok(mut observer) => observer(event),
            Err(_) => {
                log::warn!("dropping re-entrant {event:?} notification; owner callback is still running");
            }
        }
    }

    /// Claim teardown and emit `Destroyed`, exactly once.
    ///
    /// Returns the native cleanup still to be performed by the platform
    /// layer (disarm the timer, remove the registry entry, release the
    /// window), or `None` if the surface was never created or teardown has
    /// already run. `Destroyed` is emitted before the handle is invalidated,
    /// so the owner's callback can still query the surface.
    pub(crate) fn begin_teardown(&self) -> Option<TeardownPlan> {
        let child = self.child.get();
        if child.is_null() {
            // Never created, construction failed before the native window
            // existed, or teardown already ran.
            return None;
        }

        self.emit(SurfaceEvent::Destroyed);

        self.child.set(NativeHandle::NULL);
        Some(TeardownPlan {
            child,
            timer: self.timer.take(),
        })
    }
}

impl std::fmt::Debug for SurfaceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceCore")
            .field("parent", &self.parent)
            .field("child", &self.child.get())
            .field("timer", &self.timer.get())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
