// ── Instance registry & tick dispatch ─────────────────────────────────────────
//
// The platform's periodic callback is a free function that receives only the
// native handle of the window whose timer fired.  This registry maps that
// handle back to the owning `SurfaceCore` so the tick can be forwarded.
//
// The map is thread-local.  Native windowing requires every operation on a
// window to happen on its creating thread, so surfaces created on different
// threads land in disjoint registries and there is no cross-thread state to
// guard.  Entries hold `Weak` back-references only: the registry never keeps
// a surface alive, and entries are purged synchronously during teardown.
//
// Invariants:
//   • at most one live entry per handle (insert once per creation)
//   • removal happens exactly once, during teardown
//   • a lookup miss while a timer is still firing is a serious bug; the
//     dispatcher reports `Stale` so the caller can disarm the orphan timer

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::lifecycle::SurfaceCore;
use crate::surface::{NativeHandle, SurfaceEvent};

thread_local! {
    static REGISTRY: RefCell<HashMap<NativeHandle, Weak<SurfaceCore>>> =
        RefCell::new(HashMap::new());
}

/// Outcome of routing one timer expiry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum TickOutcome {
    /// The owning surface was found and notified.
    Delivered,
    /// No live surface is registered for the handle. The timer that fired is
    /// an orphan and must be disarmed by the caller.
    Stale,
}

/// Register `core` as the owner of `handle`.
///
/// Called exactly once per surface, immediately after native creation.
/// Replacing a live entry would mean two surfaces share one native handle,
/// which the unique class name makes impossible; it is still logged loudly.
pub(crate) fn insert(handle: NativeHandle, core: &Rc<SurfaceCore>) {
    REGISTRY.with(|map| {
        if map.borrow_mut().insert(handle, Rc::downgrade(core)).is_some() {
            log::error!("registry entry for {handle:?} already existed and was replaced");
        }
    });
}

/// Remove the entry for `handle`. Returns whether an entry was present.
///
/// Called exactly once per surface, during teardown, after the timer has
/// been disarmed. The caller treats a miss as an invariant violation.
pub(crate) fn remove(handle: NativeHandle) -> bool {
    REGISTRY.with(|map| map.borrow_mut().remove(&handle).is_some())
}

/// Resolve `handle` and forward a `FrameTick` to its owner.
///
/// Called by the platform timer callback on every expiry. A miss — no entry,
/// or an entry whose surface has already been dropped — means a timer is
/// firing for a window nobody owns: the stale entry (if any) is purged, the
/// error is logged, and the caller must disarm the timer since no owner can
/// be reached.
pub(crate) fn deliver_tick(handle: NativeHandle) -> TickOutcome {
    let core = REGISTRY.with(|map| {
        let mut map = map.borrow_mut();
        match map.get(&handle) {
            Some(weak) => match weak.upgrade() {
                Some(core) => Some(core),
                None => {
                    // Teardown purges entries before the surface drops, so a
                    // dead Weak should be unreachable.
                    map.remove(&handle);
                    None
                }
            },
            None => None,
        }
    });

    match core {
        Some(core) => {
            core.emit(SurfaceEvent::FrameTick);
            TickOutcome::Delivered
        }
        None => {
            log::error!("timer fired for {handle:?} but no surface is registered; stopping it");
            TickOutcome::Stale
        }
    }
}

/// Number of live entries in this thread's registry.
#[cfg(test)]
pub(crate) fn live_entries() -> usize {
    REGISTRY.with(|map| map.borrow().len())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::surface::EventHandler;

    fn recording_core(parent: isize) -> (Rc<SurfaceCore>, Rc<RefCell<Vec<SurfaceEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let observer: EventHandler = Box::new(move |e| sink.borrow_mut().push(e));
        (
            Rc::new(SurfaceCore::new(NativeHandle::from_raw(parent), observer)),
            events,
        )
    }

    // Each test uses its own handle range; the registry is thread-local and
    // cargo runs tests on separate threads, but keep them disjoint anyway so
    // single-threaded runners see no interference.

    #[test]
    fn tick_reaches_the_registered_surface() {
        let handle = NativeHandle::from_raw(0x11);
        let (core, events) = recording_core(0x10);

        insert(handle, &core);
        assert_eq!(deliver_tick(handle), TickOutcome::Delivered);
        assert_eq!(*events.borrow(), vec![SurfaceEvent::FrameTick]);

        assert!(remove(handle));
    }

    #[test]
    fn ticks_are_not_cross_delivered_between_instances() {
        // N live surfaces on one thread: each expiry must reach exactly the
        // surface whose handle fired, never a sibling.
        let mut surfaces = Vec::new();
        for i in 0..4 {
            let handle = NativeHandle::from_raw(0x20 + i);
            let (core, events) = recording_core(0x2000 + i);
            insert(handle, &core);
            surfaces.push((handle, core, events));
        }

        // Fire each timer a distinct number of times.
        for (n, (handle, _, _)) in surfaces.iter().enumerate() {
            for _ in 0..=n {
                assert_eq!(deliver_tick(*handle), TickOutcome::Delivered);
            }
        }

        for (n, (handle, _, events)) in surfaces.iter().enumerate() {
            let ticks = events
                .borrow()
                .iter()
                .filter(|e| **e == SurfaceEvent::FrameTick)
                .count();
            assert_eq!(ticks, n + 1, "surface {handle:?} saw a sibling's tick");
            assert!(remove(*handle));
        }
    }

    #[test]
    fn unregistered_handle_is_stale() {
        assert_eq!(deliver_tick(NativeHandle::from_raw(0x31)), TickOutcome::Stale);
    }

    #[test]
    fn removal_is_observed_by_the_dispatcher() {
        let handle = NativeHandle::from_raw(0x41);
        let (core, events) = recording_core(0x40);

        insert(handle, &core);
        assert!(remove(handle));
        assert!(!remove(handle), "second removal must report a miss");

        // No entry: a tick for this handle can no longer be delivered.
        assert_eq!(deliver_tick(handle), TickOutcome::Stale);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn dead_surface_is_stale_and_purged() {
        let handle = NativeHandle::from_raw(0x51);
        let baseline = live_entries();
        {
            let (core, _events) = recording_core(0x50);
            insert(handle, &core);
            assert_eq!(live_entries(), baseline + 1);
            // `core` drops here without removing its entry — an invariant
            // violation the dispatcher has to survive.
        }

        assert_eq!(deliver_tick(handle), TickOutcome::Stale);
        assert_eq!(live_entries(), baseline, "stale entry must be purged");
    }

    #[test]
    fn entry_count_matches_registered_surfaces() {
        let baseline = live_entries();
        let (a, _) = recording_core(0x60);
        let (b, _) = recording_core(0x62);

        insert(NativeHandle::from_raw(0x61), &a);
        insert(NativeHandle::from_raw(0x63), &b);
        assert_eq!(live_entries(), baseline + 2);

        assert!(remove(NativeHandle::from_raw(0x61)));
        assert_eq!(live_entries(), baseline + 1);
        assert!(remove(NativeHandle::from_raw(0x63)));
        assert_eq!(live_entries(), baseline);
    }
}
