//! Procedural background animation
//!
//! A per-frame loop that advances a phase accumulator, oscillates the noise
//! base frequency from it, displaces the contour rings through the noise and
//! applies pointer/scroll parallax. Pointer and scroll are sampled by input
//! listeners between frames; the tick only reads them.
//!
//! While motion is reduced a tick changes nothing and does not reschedule.
//! The loop picks up again on the first frame after motion returns to full.

use crate::config::BackgroundConfig;
use crate::contour::ContourField;
use crate::noise::FractalNoise;
use overture_core::{MotionPreferenceMonitor, MotionSubscription, SchedulerHandle, TaskHandle};
use overture_platform::{
    BackgroundFrame, BackgroundLayer, InputEvent, InputSource, LayerTransform, ListenerId,
    PlatformError, PointerEvent, StrokeStyle, Turbulence,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Noise base frequency `(x, y)` for a phase value
///
/// Both axes oscillate around the base frequency; the vertical axis runs at
/// `secondary_rate` times the horizontal one so the pattern never repeats in
/// lockstep.
pub fn oscillate(phase: f32, config: &BackgroundConfig) -> (f32, f32) {
    (
        config.base_frequency + config.oscillation_amplitude * phase.sin(),
        config.base_frequency + config.oscillation_amplitude * (phase * config.secondary_rate).sin(),
    )
}

struct BackgroundInner {
    phase: f32,
    ticks: u64,
    /// Normalized pointer position in `[-1, 1]`
    pointer: (f32, f32),
    scroll: f32,
    frame: Option<TaskHandle>,
    mounted: bool,
}

struct BackgroundCore {
    inner: RefCell<BackgroundInner>,
    scheduler: SchedulerHandle,
    motion: MotionPreferenceMonitor,
    input: Rc<dyn InputSource>,
    layer: Rc<dyn BackgroundLayer>,
    config: BackgroundConfig,
    field: ContourField,
    noise: FractalNoise,
    input_listener: Cell<Option<ListenerId>>,
    motion_sub: RefCell<Option<MotionSubscription>>,
}

impl BackgroundCore {
    fn request_frame(core: &Rc<Self>) {
        let mut inner = core.inner.borrow_mut();
        if !inner.mounted || inner.frame.as_ref().is_some_and(TaskHandle::is_pending) {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(core);
        inner.frame = Some(core.scheduler.request_frame(move |timestamp| {
            if let Some(core) = weak.upgrade() {
                BackgroundCore::tick(&core, timestamp);
            }
        }));
    }

    fn tick(core: &Rc<Self>, timestamp: Duration) {
        let phase = {
            let mut inner = core.inner.borrow_mut();
            inner.frame = None;
            if !inner.mounted {
                return;
            }
            if core.motion.is_reduced() {
                tracing::trace!("BackgroundAnimator: reduced motion, loop paused");
                return;
            }
            inner.phase += core.config.phase_increment;
            inner.ticks += 1;
            inner.phase
        };
        tracing::trace!("BackgroundAnimator: tick at {:?}, phase {}", timestamp, phase);

        match core.present() {
            Err(PlatformError::TargetDetached(target)) => {
                tracing::debug!("BackgroundAnimator: {target} detached, stopping loop");
            }
            Err(err) => {
                tracing::debug!("BackgroundAnimator: frame dropped: {err}");
                Self::request_frame(core);
            }
            Ok(()) => Self::request_frame(core),
        }
    }

    /// Build and present a frame for the current phase, pointer and scroll
    fn present(&self) -> Result<(), PlatformError> {
        let (phase, pointer, scroll) = {
            let inner = self.inner.borrow();
            (inner.phase, inner.pointer, inner.scroll)
        };
        let config = &self.config;
        let frequency = oscillate(phase, config);

        let frame = BackgroundFrame {
            transform: LayerTransform {
                translate_x: pointer.0 * config.pointer_parallax,
                translate_y: scroll * config.scroll_parallax + pointer.1 * config.pointer_parallax,
            },
            turbulence: Turbulence {
                base_frequency: frequency,
                octaves: self.noise.octaves,
                scale: config.displacement_scale,
            },
            stroke: StrokeStyle {
                color: config.stroke_color.clone(),
                opacity: config.stroke_opacity,
                width: config.stroke_width,
            },
            contours: self
                .field
                .displace(&self.noise, frequency, config.displacement_scale),
        };
        self.layer.present(&frame)
    }

    fn handle_input(&self, event: &InputEvent) {
        let mut inner = self.inner.borrow_mut();
        match event {
            InputEvent::Pointer(PointerEvent::Moved { x, y }) => {
                inner.pointer = self.input.viewport().normalize(*x, *y);
            }
            InputEvent::Scroll { offset_y } => inner.scroll = *offset_y,
            _ => {}
        }
    }
}

/// Continuously animated contour background
///
/// Tears down on drop.
pub struct BackgroundAnimator {
    core: Rc<BackgroundCore>,
}

impl BackgroundAnimator {
    /// Present the initial still frame and start the loop
    ///
    /// The phase starts at zero on every mount.
    pub fn mount(
        scheduler: SchedulerHandle,
        motion: MotionPreferenceMonitor,
        input: Rc<dyn InputSource>,
        layer: Rc<dyn BackgroundLayer>,
        config: BackgroundConfig,
    ) -> Self {
        let field = ContourField::new(&config.contours, config.ring_segments);
        let noise = FractalNoise::new(config.noise_seed, config.noise_octaves);
        let scroll = input.scroll_offset();

        let core = Rc::new(BackgroundCore {
            inner: RefCell::new(BackgroundInner {
                phase: 0.0,
                ticks: 0,
                pointer: (0.0, 0.0),
                scroll,
                frame: None,
                mounted: true,
            }),
            scheduler,
            motion,
            input,
            layer,
            config,
            field,
            noise,
            input_listener: Cell::new(None),
            motion_sub: RefCell::new(None),
        });

        let weak = Rc::downgrade(&core);
        let id = core.input.add_listener(Box::new(move |event: &InputEvent| {
            if let Some(core) = weak.upgrade() {
                core.handle_input(event);
            }
        }));
        core.input_listener.set(Some(id));

        let weak = Rc::downgrade(&core);
        let sub = core.motion.subscribe(move |preference| {
            if let (false, Some(core)) = (preference.is_reduced(), weak.upgrade()) {
                tracing::debug!("BackgroundAnimator: full motion, resuming");
                BackgroundCore::request_frame(&core);
            }
        });
        *core.motion_sub.borrow_mut() = Some(sub);

        tracing::debug!(
            "BackgroundAnimator: mounted with {} contour ring(s)",
            core.field.len()
        );
        match core.present() {
            Err(PlatformError::TargetDetached(target)) => {
                tracing::debug!("BackgroundAnimator: {target} detached at mount");
            }
            Err(err) => {
                tracing::debug!("BackgroundAnimator: initial frame dropped: {err}");
                BackgroundCore::request_frame(&core);
            }
            Ok(()) => BackgroundCore::request_frame(&core),
        }

        Self { core }
    }

    /// Current value of the phase accumulator
    pub fn phase(&self) -> f32 {
        self.core.inner.borrow().phase
    }

    /// Animated frames since mount
    pub fn ticks(&self) -> u64 {
        self.core.inner.borrow().ticks
    }

    /// Whether a frame is requested
    pub fn is_running(&self) -> bool {
        self.core
            .inner
            .borrow()
            .frame
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }

    /// Cancel the frame request and remove every listener
    pub fn teardown(&self) {
        {
            let mut inner = self.core.inner.borrow_mut();
            if !inner.mounted {
                return;
            }
            inner.mounted = false;
            if let Some(frame) = inner.frame.take() {
                frame.cancel();
            }
        }
        if let Some(id) = self.core.input_listener.take() {
            self.core.input.remove_listener(id);
        }
        self.core.motion_sub.borrow_mut().take();
        tracing::debug!("BackgroundAnimator: torn down");
    }
}

impl Drop for BackgroundAnimator {
    fn drop(&mut self) {
        self.teardown();
    }
}
