//! Overture Intro Choreography
//!
//! The sequence that plays when a visitor first loads a page.
//!
//! # Features
//!
//! - **Loading Overlay**: Hold, fade and hide, with a once-per-cycle completion signal
//! - **Text Reveal**: Character-by-character typing with natural jitter, skippable
//!   by click, Enter/Space or Escape, played once per browsing session
//! - **Procedural Background**: Parallax plus noise-displaced contour lines driven
//!   by a phase accumulator
//! - **Choreographer**: Mediator wiring the three together and handling navigation
//! - **Reduced Motion**: Every component resolves to its end state instantly, and
//!   reacts to live preference changes
//!
//! # Example
//!
//! ```
//! use overture_animation::{HeadlessPlatform, IntroChoreographer, IntroConfig, RevealState};
//! use overture_core::Scheduler;
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new();
//! let headless = HeadlessPlatform::new(false);
//! let intro = IntroChoreographer::builder(headless.platform())
//!     .config(IntroConfig::default())
//!     .seed(7)
//!     .mount(scheduler.handle(), "Hello");
//!
//! scheduler.run_for(Duration::from_secs(2), Duration::from_millis(16));
//! assert_eq!(intro.revealer().state(), RevealState::Done);
//! assert_eq!(intro.revealer().displayed(), "Hello");
//! ```

pub mod background;
pub mod choreography;
pub mod config;
pub mod contour;
pub mod noise;
pub mod overlay;
pub mod reveal;

pub use background::{oscillate, BackgroundAnimator};
pub use choreography::{ChoreographerBuilder, IntroChoreographer, IntroPlatform};
#[cfg(feature = "headless")]
pub use choreography::HeadlessPlatform;
pub use config::{BackgroundConfig, ConfigError, IntroConfig, OverlayConfig, RevealConfig};
pub use contour::{ContourField, ContourGroup};
pub use noise::FractalNoise;
pub use overlay::{OverlayController, OverlayState};
pub use reveal::{
    RevealContext, RevealListenerId, RevealSnapshot, RevealState, RevealTrigger, TextRevealer,
    TriggerSource,
};
