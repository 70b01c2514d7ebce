//! Input event types for pointer, scroll and keyboard

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a registered platform listener
    pub struct ListenerId;
}

/// Viewport dimensions in CSS pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Normalize a client position to `[-1, 1]` on each axis
    ///
    /// The viewport centre maps to `(0, 0)`. A degenerate viewport (zero or
    /// non-finite size) maps everything to the centre.
    pub fn normalize(&self, x: f32, y: f32) -> (f32, f32) {
        let axis = |v: f32, extent: f32| {
            if extent > 0.0 && extent.is_finite() {
                ((v / extent - 0.5) * 2.0).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        };
        (axis(x, self.width), axis(y, self.height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Input events
#[derive(Clone, Debug)]
pub enum InputEvent {
    /// Pointer event
    Pointer(PointerEvent),
    /// Document scroll position changed
    Scroll {
        /// Vertical scroll offset in CSS pixels
        offset_y: f32,
    },
    /// Keyboard event
    Keyboard(KeyboardEvent),
}

// ============================================================================
// Pointer Events
// ============================================================================

/// Pointer events (mouse or touch)
#[derive(Clone, Debug)]
pub enum PointerEvent {
    /// Pointer moved to a client position
    Moved {
        /// X position in viewport coordinates
        x: f32,
        /// Y position in viewport coordinates
        y: f32,
    },
    /// Click or tap on a target
    Activated {
        /// Element that received the activation
        target: EventTarget,
    },
}

// ============================================================================
// Keyboard Events
// ============================================================================

/// Element that had focus when an event was delivered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The document itself, or any element other than the reveal surface
    #[default]
    Document,
    /// The focusable heading that hosts the text reveal
    RevealSurface,
}

/// Keyboard event
#[derive(Clone, Debug)]
pub struct KeyboardEvent {
    /// The key that was pressed or released
    pub key: Key,
    /// Whether the key was pressed or released
    pub state: KeyState,
    /// Focused element when the key event fired
    pub target: EventTarget,
}

impl KeyboardEvent {
    /// A key press delivered to `target`
    pub fn pressed(key: Key, target: EventTarget) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
            target,
        }
    }
}

/// Key press/release state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key was pressed
    Pressed,
    /// Key was released
    Released,
}

/// Key codes
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Enter,
    Escape,
    Tab,

    // Character input
    Char(char),

    // Unknown key
    Unknown,
}

/// Source of pointer, scroll and keyboard input
///
/// Listeners are passive: they are called synchronously for each event and
/// must not block.
pub trait InputSource {
    /// Current viewport size
    fn viewport(&self) -> Viewport;

    /// Current vertical scroll offset
    fn scroll_offset(&self) -> f32;

    fn add_listener(&self, listener: Box<dyn Fn(&InputEvent)>) -> ListenerId;

    /// Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_centre_and_edges() {
        let viewport = Viewport::new(1000.0, 500.0);
        assert_eq!(viewport.normalize(500.0, 250.0), (0.0, 0.0));
        assert_eq!(viewport.normalize(0.0, 0.0), (-1.0, -1.0));
        assert_eq!(viewport.normalize(1000.0, 500.0), (1.0, 1.0));
    }

    #[test]
    fn test_normalize_clamps_outside_viewport() {
        let viewport = Viewport::new(100.0, 100.0);
        assert_eq!(viewport.normalize(-50.0, 400.0), (-1.0, 1.0));
    }

    #[test]
    fn test_normalize_degenerate_viewport() {
        let viewport = Viewport::new(0.0, f32::NAN);
        assert_eq!(viewport.normalize(10.0, 10.0), (0.0, 0.0));
    }
}
