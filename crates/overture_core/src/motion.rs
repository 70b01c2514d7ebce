//! Reduced-motion preference monitor
//!
//! Wraps the platform [`MotionSignal`] and keeps the single authoritative copy
//! of the current [`MotionPreference`]. Only the platform watch callback
//! writes it; animators and revealers read it and subscribe to transitions.
//!
//! If the platform signal cannot be queried or watched, the monitor falls back
//! to [`MotionPreference::Full`] so animations stay enabled.

use overture_platform::{ListenerId, MotionSignal};
use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifier of a monitor subscription
    pub struct SubscriptionId;
}

/// The user's motion preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionPreference {
    /// Animations enabled
    #[default]
    Full,
    /// Non-essential motion must resolve to its end state instantly
    Reduced,
}

impl MotionPreference {
    pub fn from_reduced(reduced: bool) -> Self {
        if reduced {
            MotionPreference::Reduced
        } else {
            MotionPreference::Full
        }
    }

    pub fn is_reduced(self) -> bool {
        self == MotionPreference::Reduced
    }
}

type MotionListener = Rc<dyn Fn(MotionPreference)>;

struct MonitorInner {
    current: Cell<MotionPreference>,
    listeners: RefCell<SlotMap<SubscriptionId, MotionListener>>,
    signal: Rc<dyn MotionSignal>,
    watch: Cell<Option<ListenerId>>,
}

impl MonitorInner {
    fn update(&self, preference: MotionPreference) {
        if self.current.replace(preference) == preference {
            return;
        }
        tracing::debug!("MotionPreferenceMonitor: preference -> {:?}", preference);

        // Snapshot so listeners may unsubscribe while being notified
        let listeners: Vec<MotionListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(preference);
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.signal.unwatch(id);
        }
    }
}

/// Live view of the reduced-motion preference
///
/// Cheap to clone; all clones share one platform watch, which is removed when
/// the last clone is dropped.
#[derive(Clone)]
pub struct MotionPreferenceMonitor {
    inner: Rc<MonitorInner>,
}

impl MotionPreferenceMonitor {
    pub fn new(signal: Rc<dyn MotionSignal>) -> Self {
        let current = match signal.prefers_reduced_motion() {
            Ok(reduced) => MotionPreference::from_reduced(reduced),
            Err(err) => {
                tracing::warn!("Reduced-motion signal unavailable, assuming full motion: {err}");
                MotionPreference::Full
            }
        };

        let inner = Rc::new(MonitorInner {
            current: Cell::new(current),
            listeners: RefCell::new(SlotMap::with_key()),
            signal: Rc::clone(&signal),
            watch: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let watched = signal.watch(Box::new(move |reduced| {
            if let Some(inner) = weak.upgrade() {
                inner.update(MotionPreference::from_reduced(reduced));
            }
        }));
        match watched {
            Ok(id) => inner.watch.set(Some(id)),
            Err(err) => tracing::warn!("Cannot watch reduced-motion signal: {err}"),
        }

        Self { inner }
    }

    /// The preference right now
    pub fn current(&self) -> MotionPreference {
        self.inner.current.get()
    }

    pub fn is_reduced(&self) -> bool {
        self.current().is_reduced()
    }

    /// Call `on_change` every time the preference flips
    ///
    /// The callback runs synchronously from the platform event. It is not
    /// called for the current value, only for transitions. The returned
    /// subscription unsubscribes when dropped.
    pub fn subscribe<F>(&self, on_change: F) -> MotionSubscription
    where
        F: Fn(MotionPreference) + 'static,
    {
        let id = self.inner.listeners.borrow_mut().insert(Rc::new(on_change));
        MotionSubscription {
            id,
            monitor: Rc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// Handle returned by [`MotionPreferenceMonitor::subscribe`]
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct MotionSubscription {
    id: SubscriptionId,
    monitor: Weak<MonitorInner>,
}

impl MotionSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for MotionSubscription {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.listeners.borrow_mut().remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_platform::headless::HeadlessMotion;

    #[test]
    fn test_reflects_signal_at_creation() {
        let reduced = MotionPreferenceMonitor::new(Rc::new(HeadlessMotion::new(true)));
        assert_eq!(reduced.current(), MotionPreference::Reduced);

        let full = MotionPreferenceMonitor::new(Rc::new(HeadlessMotion::new(false)));
        assert_eq!(full.current(), MotionPreference::Full);
    }

    #[test]
    fn test_unavailable_signal_defaults_to_full() {
        let monitor = MotionPreferenceMonitor::new(Rc::new(HeadlessMotion::unavailable()));
        assert_eq!(monitor.current(), MotionPreference::Full);
    }

    #[test]
    fn test_live_transitions_reach_subscribers() {
        let signal = Rc::new(HeadlessMotion::new(false));
        let monitor = MotionPreferenceMonitor::new(signal.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let _sub = monitor.subscribe(move |pref| sink.borrow_mut().push(pref));

        signal.set_reduced(true);
        assert_eq!(monitor.current(), MotionPreference::Reduced);
        signal.set_reduced(false);

        assert_eq!(
            *seen.borrow(),
            vec![MotionPreference::Reduced, MotionPreference::Full]
        );
    }

    #[test]
    fn test_dropped_subscription_stops_notifications() {
        let signal = Rc::new(HeadlessMotion::new(false));
        let monitor = MotionPreferenceMonitor::new(signal.clone());
        let count = Rc::new(Cell::new(0));

        let counter = Rc::clone(&count);
        let sub = monitor.subscribe(move |_| counter.set(counter.get() + 1));
        signal.set_reduced(true);
        sub.unsubscribe();
        signal.set_reduced(false);

        assert_eq!(count.get(), 1);
        assert_eq!(monitor.subscriber_count(), 0);
    }

    #[test]
    fn test_last_clone_removes_platform_watch() {
        let signal = Rc::new(HeadlessMotion::new(false));
        let monitor = MotionPreferenceMonitor::new(signal.clone());
        let clone = monitor.clone();
        assert_eq!(signal.watcher_count(), 1);

        drop(monitor);
        assert_eq!(signal.watcher_count(), 1);
        drop(clone);
        assert_eq!(signal.watcher_count(), 0);
    }
}
