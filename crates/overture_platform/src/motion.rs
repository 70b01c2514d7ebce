//! Reduced-motion accessibility signal

use crate::error::Result;
use crate::input::ListenerId;

/// The platform's `prefers-reduced-motion` signal
///
/// Implementations report the current preference and notify watchers when the
/// user flips the OS setting while the page is open. Callbacks are invoked
/// synchronously on the event, with `true` meaning motion should be reduced.
pub trait MotionSignal {
    /// Query the current preference
    fn prefers_reduced_motion(&self) -> Result<bool>;

    /// Register a change callback
    fn watch(&self, callback: Box<dyn Fn(bool)>) -> Result<ListenerId>;

    /// Remove a callback registered with [`watch`](Self::watch)
    ///
    /// Unknown ids are ignored.
    fn unwatch(&self, id: ListenerId);
}
