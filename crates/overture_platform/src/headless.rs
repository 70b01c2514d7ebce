//! In-memory platform
//!
//! Implementations of every capability trait that keep their state in memory
//! and record what was written to them. Tests drive them directly (toggle the
//! motion preference, inject storage failures, move the pointer) and assert on
//! the recorded output. The CLI simulator uses the same types.

use crate::error::{PlatformError, Result};
use crate::input::{
    EventTarget, InputEvent, InputSource, Key, KeyboardEvent, ListenerId, PointerEvent, Viewport,
};
use crate::motion::MotionSignal;
use crate::storage::SessionStorage;
use crate::surface::{
    BackgroundFrame, BackgroundLayer, HeadingFrame, HeadingSurface, OverlayStyle, OverlaySurface,
};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// =============================================================================
// Motion signal
// =============================================================================

/// Reduced-motion signal that can be flipped from test code
pub struct HeadlessMotion {
    reduced: Cell<bool>,
    available: bool,
    watchers: RefCell<SlotMap<ListenerId, Rc<dyn Fn(bool)>>>,
}

impl HeadlessMotion {
    pub fn new(reduced: bool) -> Self {
        Self {
            reduced: Cell::new(reduced),
            available: true,
            watchers: RefCell::new(SlotMap::with_key()),
        }
    }

    /// A signal whose query and watch both fail
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(true)
        }
    }

    /// Flip the preference, notifying watchers if it changed
    pub fn set_reduced(&self, reduced: bool) {
        if self.reduced.replace(reduced) == reduced {
            return;
        }
        tracing::debug!("HeadlessMotion: reduced motion -> {}", reduced);

        // Snapshot so watchers may unwatch from inside the callback
        let watchers: Vec<_> = self.watchers.borrow().values().cloned().collect();
        for watcher in watchers {
            watcher(reduced);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

impl MotionSignal for HeadlessMotion {
    fn prefers_reduced_motion(&self) -> Result<bool> {
        if !self.available {
            return Err(PlatformError::SignalUnavailable(
                "matchMedia not supported".into(),
            ));
        }
        Ok(self.reduced.get())
    }

    fn watch(&self, callback: Box<dyn Fn(bool)>) -> Result<ListenerId> {
        if !self.available {
            return Err(PlatformError::SignalUnavailable(
                "matchMedia not supported".into(),
            ));
        }
        Ok(self.watchers.borrow_mut().insert(Rc::from(callback)))
    }

    fn unwatch(&self, id: ListenerId) {
        self.watchers.borrow_mut().remove(id);
    }
}

// =============================================================================
// Session storage
// =============================================================================

/// Session storage backed by a hash map, with failure injection
#[derive(Default)]
pub struct MemoryStorage {
    items: RefCell<FxHashMap<String, String>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage where every read and write fails
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.set_failing(true);
        storage
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_reads.set(failing);
        self.fail_writes.set(failing);
    }

    pub fn set_fail_writes(&self, failing: bool) {
        self.fail_writes.set(failing);
    }

    /// Inspect a value without going through the failure injection
    pub fn peek(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    /// End the session: every stored value is dropped
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.get() {
            return Err(PlatformError::StorageUnavailable(
                "sessionStorage is disabled".into(),
            ));
        }
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.get() {
            return Err(PlatformError::QuotaExceeded);
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Input
// =============================================================================

/// Input source fed by explicit calls
pub struct HeadlessInput {
    viewport: Viewport,
    scroll_offset: Cell<f32>,
    listeners: RefCell<SlotMap<ListenerId, Rc<dyn Fn(&InputEvent)>>>,
}

impl HeadlessInput {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scroll_offset: Cell::new(0.0),
            listeners: RefCell::new(SlotMap::with_key()),
        }
    }

    pub fn move_pointer(&self, x: f32, y: f32) {
        self.dispatch(&InputEvent::Pointer(PointerEvent::Moved { x, y }));
    }

    pub fn scroll_to(&self, offset_y: f32) {
        self.scroll_offset.set(offset_y);
        self.dispatch(&InputEvent::Scroll { offset_y });
    }

    pub fn press_key(&self, key: Key, target: EventTarget) {
        self.dispatch(&InputEvent::Keyboard(KeyboardEvent::pressed(key, target)));
    }

    pub fn activate(&self, target: EventTarget) {
        self.dispatch(&InputEvent::Pointer(PointerEvent::Activated { target }));
    }

    pub fn dispatch(&self, event: &InputEvent) {
        let listeners: Vec<_> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Default for HeadlessInput {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl InputSource for HeadlessInput {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn scroll_offset(&self) -> f32 {
        self.scroll_offset.get()
    }

    fn add_listener(&self, listener: Box<dyn Fn(&InputEvent)>) -> ListenerId {
        self.listeners.borrow_mut().insert(Rc::from(listener))
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(id);
    }
}

// =============================================================================
// Recording surfaces
// =============================================================================

/// Overlay surface that records every applied style
#[derive(Default)]
pub struct RecordingOverlay {
    styles: RefCell<Vec<OverlayStyle>>,
    detached: Cell<bool>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the overlay element being removed from the page
    pub fn detach(&self) {
        self.detached.set(true);
    }

    pub fn styles(&self) -> Vec<OverlayStyle> {
        self.styles.borrow().clone()
    }

    pub fn last(&self) -> Option<OverlayStyle> {
        self.styles.borrow().last().cloned()
    }
}

impl OverlaySurface for RecordingOverlay {
    fn apply(&self, style: &OverlayStyle) -> Result<()> {
        if self.detached.get() {
            return Err(PlatformError::TargetDetached("overlay"));
        }
        self.styles.borrow_mut().push(style.clone());
        Ok(())
    }
}

/// Heading surface that records every rendered frame
#[derive(Default)]
pub struct RecordingHeading {
    frames: RefCell<Vec<HeadingFrame>>,
    detached: Cell<bool>,
}

impl RecordingHeading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detach(&self) {
        self.detached.set(true);
    }

    pub fn frames(&self) -> Vec<HeadingFrame> {
        self.frames.borrow().clone()
    }

    pub fn last(&self) -> Option<HeadingFrame> {
        self.frames.borrow().last().cloned()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl HeadingSurface for RecordingHeading {
    fn render(&self, frame: &HeadingFrame) -> Result<()> {
        if self.detached.get() {
            return Err(PlatformError::TargetDetached("heading"));
        }
        self.frames.borrow_mut().push(frame.clone());
        Ok(())
    }
}

/// Background layer that counts presented frames and keeps the latest one
///
/// Full frames carry displaced contour geometry, so only the most recent one
/// is retained.
#[derive(Default)]
pub struct RecordingLayer {
    presented: Cell<usize>,
    last: RefCell<Option<BackgroundFrame>>,
    detached: Cell<bool>,
}

impl RecordingLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detach(&self) {
        self.detached.set(true);
    }

    /// Number of frames successfully presented
    pub fn presented(&self) -> usize {
        self.presented.get()
    }

    pub fn last(&self) -> Option<BackgroundFrame> {
        self.last.borrow().clone()
    }
}

impl BackgroundLayer for RecordingLayer {
    fn present(&self, frame: &BackgroundFrame) -> Result<()> {
        if self.detached.get() {
            return Err(PlatformError::TargetDetached("background"));
        }
        self.presented.set(self.presented.get() + 1);
        *self.last.borrow_mut() = Some(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_notifies_only_on_change() {
        let motion = HeadlessMotion::new(false);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        motion
            .watch(Box::new(move |reduced| sink.borrow_mut().push(reduced)))
            .unwrap();

        motion.set_reduced(false);
        motion.set_reduced(true);
        motion.set_reduced(true);
        motion.set_reduced(false);

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn test_motion_unwatch() {
        let motion = HeadlessMotion::new(false);
        let id = motion.watch(Box::new(|_| {})).unwrap();
        assert_eq!(motion.watcher_count(), 1);
        motion.unwatch(id);
        assert_eq!(motion.watcher_count(), 0);
    }

    #[test]
    fn test_unavailable_motion_errors() {
        let motion = HeadlessMotion::unavailable();
        assert!(motion.prefers_reduced_motion().is_err());
        assert!(motion.watch(Box::new(|_| {})).is_err());
    }

    #[test]
    fn test_memory_storage_failure_injection() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "true").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("true"));

        storage.set_failing(true);
        assert!(storage.get_item("k").is_err());
        assert_eq!(storage.set_item("k", "x"), Err(PlatformError::QuotaExceeded));
        assert_eq!(storage.peek("k").as_deref(), Some("true"));
    }

    #[test]
    fn test_input_dispatch_and_removal() {
        let input = HeadlessInput::default();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let id = input.add_listener(Box::new(move |_| counter.set(counter.get() + 1)));

        input.move_pointer(1.0, 2.0);
        input.scroll_to(40.0);
        assert_eq!(count.get(), 2);
        assert_eq!(input.scroll_offset(), 40.0);

        input.remove_listener(id);
        input.move_pointer(3.0, 4.0);
        assert_eq!(count.get(), 2);
        assert_eq!(input.listener_count(), 0);
    }

    #[test]
    fn test_detached_surfaces_reject_writes() {
        let overlay = RecordingOverlay::new();
        overlay.apply(&OverlayStyle::opaque()).unwrap();
        overlay.detach();
        assert!(overlay.apply(&OverlayStyle::hidden()).is_err());
        assert_eq!(overlay.styles().len(), 1);
    }
}
