//! Overture Core Runtime
//!
//! This crate provides the foundational primitives for the intro choreography:
//!
//! - **Scheduler**: Single-threaded cooperative scheduler with a virtual clock,
//!   one-shot timers and per-frame callbacks behind cancellable handles
//! - **Motion Preference**: Live view of the reduced-motion accessibility signal
//! - **Session Playback**: Failure-tolerant "already played" flag
//! - **Completion Signal**: Payload-free one-to-many notification
//!
//! # Example
//!
//! ```rust
//! use overture_core::Scheduler;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//! let fired = Rc::new(Cell::new(false));
//!
//! let flag = Rc::clone(&fired);
//! let task = scheduler
//!     .handle()
//!     .set_timeout(Duration::from_millis(600), move || flag.set(true));
//!
//! scheduler.advance_by(Duration::from_millis(599));
//! assert!(task.is_pending());
//! scheduler.advance_by(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

pub mod motion;
pub mod random;
pub mod scheduler;
pub mod session;
pub mod signal;

pub use motion::{MotionPreference, MotionPreferenceMonitor, MotionSubscription};
pub use random::{RandomSource, SeededRandom};
pub use scheduler::{Scheduler, SchedulerHandle, TaskHandle, TaskId, FRAME_INTERVAL};
pub use session::{SessionPlaybackStore, PLAYED_MARKER};
pub use signal::{CompletionSignal, ConnectionId};
