//! Overture Platform Abstraction Layer
//!
//! This crate provides the capability traits through which the intro
//! choreography reads ambient platform state and pushes visual output.
//! Nothing in the animation crates touches a real display, storage area or
//! accessibility API directly; they are handed implementations of these traits.
//!
//! # Capabilities
//!
//! - [`MotionSignal`] - the reduced-motion accessibility preference
//! - [`SessionStorage`] - a key/value area scoped to the browsing session
//! - [`InputSource`] - pointer, scroll and keyboard input
//! - [`OverlaySurface`], [`HeadingSurface`], [`BackgroundLayer`] - render targets
//!
//! # Headless platform
//!
//! With the `headless` feature (enabled by default) the [`headless`] module
//! provides in-memory implementations of every capability. They are used by
//! the test suites and the `overture` CLI simulator.
//!
//! ```
//! use overture_platform::headless::HeadlessMotion;
//! use overture_platform::MotionSignal;
//!
//! let motion = HeadlessMotion::new(false);
//! assert_eq!(motion.prefers_reduced_motion().ok(), Some(false));
//! motion.set_reduced(true);
//! assert_eq!(motion.prefers_reduced_motion().ok(), Some(true));
//! ```

mod error;
mod input;
mod motion;
mod storage;
mod surface;

#[cfg(feature = "headless")]
pub mod headless;

// Re-export all public types
pub use error::{PlatformError, Result};
pub use input::{
    EventTarget, InputEvent, InputSource, Key, KeyState, KeyboardEvent, ListenerId, PointerEvent,
    Viewport,
};
pub use motion::MotionSignal;
pub use storage::SessionStorage;
pub use surface::{
    BackgroundFrame, BackgroundLayer, Caret, HeadingFrame, HeadingSurface, LayerTransform,
    OverlayStyle, OverlaySurface, Polyline, StrokeStyle, Turbulence,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PlatformError, Result};
    pub use crate::input::{
        EventTarget, InputEvent, InputSource, Key, KeyState, KeyboardEvent, ListenerId,
        PointerEvent, Viewport,
    };
    pub use crate::motion::MotionSignal;
    pub use crate::storage::SessionStorage;
    pub use crate::surface::{
        BackgroundFrame, BackgroundLayer, Caret, HeadingFrame, HeadingSurface, OverlayStyle,
        OverlaySurface,
    };
}
