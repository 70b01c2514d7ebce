//! Render targets for the intro choreography
//!
//! Each surface receives a complete description of what it should show. A
//! surface whose element has been removed returns
//! [`PlatformError::TargetDetached`](crate::PlatformError::TargetDetached);
//! callers treat that as "stop writing", never as a user-visible failure.

use crate::error::Result;
use std::time::Duration;

// ============================================================================
// Loading overlay
// ============================================================================

/// Presentation of the full-screen loading overlay
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Whether the overlay is mounted at all
    pub visible: bool,
    /// Target opacity
    pub opacity: f32,
    /// Duration of the opacity transition towards `opacity`
    pub transition: Duration,
}

impl OverlayStyle {
    pub fn opaque() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            transition: Duration::ZERO,
        }
    }

    pub fn fading(duration: Duration) -> Self {
        Self {
            visible: true,
            opacity: 0.0,
            transition: duration,
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            opacity: 0.0,
            transition: Duration::ZERO,
        }
    }
}

pub trait OverlaySurface {
    fn apply(&self, style: &OverlayStyle) -> Result<()>;
}

// ============================================================================
// Reveal heading
// ============================================================================

/// Typing caret shown after the partial text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Caret {
    /// No caret element at all (reduced motion)
    #[default]
    Absent,
    /// Caret visible and blinking while text is being typed
    Blinking,
    /// Caret element present but hidden once typing is done
    Hidden,
}

/// Everything the heading element needs to render one state of the reveal
///
/// `accessible_label` always carries the complete text so assistive
/// technology never sees a partial string. `visible_text` is decorative and
/// must be hidden from the accessibility tree. `layout_text` is rendered
/// invisibly to reserve the final size and prevent layout shift.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadingFrame {
    pub accessible_label: String,
    pub layout_text: String,
    pub visible_text: String,
    pub caret: Caret,
    /// Exposed as an activatable button (click, Enter, Space) when set
    pub focusable: bool,
}

pub trait HeadingSurface {
    fn render(&self, frame: &HeadingFrame) -> Result<()>;
}

// ============================================================================
// Procedural background
// ============================================================================

/// Translation applied to the background layer, in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayerTransform {
    pub translate_x: f32,
    pub translate_y: f32,
}

/// Parameters of the fractal-noise displacement filter
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Turbulence {
    /// Noise base frequency per axis
    pub base_frequency: (f32, f32),
    pub octaves: u32,
    /// Displacement scale in view-box units
    pub scale: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    /// CSS color, e.g. `#00e5ff`
    pub color: String,
    pub opacity: f32,
    pub width: f32,
}

/// A polyline in view-box coordinates
pub type Polyline = Vec<[f32; 2]>;

/// One rendered frame of the background
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundFrame {
    pub transform: LayerTransform,
    pub turbulence: Turbulence,
    pub stroke: StrokeStyle,
    /// Contour lines after displacement
    pub contours: Vec<Polyline>,
}

pub trait BackgroundLayer {
    fn present(&self, frame: &BackgroundFrame) -> Result<()>;
}
