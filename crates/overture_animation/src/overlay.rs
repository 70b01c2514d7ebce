//! Loading overlay state machine
//!
//! ```text
//! Visible --(hold elapses)--> FadingOut --(fade elapses)--> Hidden
//!    ^                                                        |
//!    +------------------- show() (navigation) ----------------+
//! ```
//!
//! The completion signal fires on the Visible -> FadingOut edge, so the text
//! reveal can start while the fade is still animating. It fires at most once
//! per show/hide cycle. Under reduced motion the overlay starts and stays
//! Hidden with nothing scheduled.

use crate::config::OverlayConfig;
use overture_core::{CompletionSignal, MotionPreferenceMonitor, MotionSubscription, SchedulerHandle, TaskHandle};
use overture_platform::{OverlayStyle, OverlaySurface};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Overlay lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayState {
    Visible,
    FadingOut,
    Hidden,
}

struct OverlayInner {
    state: OverlayState,
    /// Incremented on every show
    cycle: u64,
    /// Last cycle whose completion signal has fired
    signalled_cycle: Option<u64>,
    /// Hold, buffer or fade timer currently armed
    pending: Option<TaskHandle>,
    mounted: bool,
}

struct OverlayCore {
    inner: RefCell<OverlayInner>,
    scheduler: SchedulerHandle,
    motion: MotionPreferenceMonitor,
    surface: Rc<dyn OverlaySurface>,
    config: OverlayConfig,
    completion: CompletionSignal,
    motion_sub: RefCell<Option<MotionSubscription>>,
}

impl OverlayCore {
    fn render(&self, style: OverlayStyle) {
        if let Err(err) = self.surface.apply(&style) {
            tracing::debug!("Overlay surface not updated: {err}");
        }
    }

    fn schedule(core: &Rc<Self>, delay: std::time::Duration, step: fn(&Rc<Self>)) -> TaskHandle {
        let weak: Weak<Self> = Rc::downgrade(core);
        core.scheduler.set_timeout(delay, move || {
            if let Some(core) = weak.upgrade() {
                step(&core);
            }
        })
    }

    /// Visible -> FadingOut, emitting the completion signal
    fn begin_fade(core: &Rc<Self>) {
        let emit = {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state != OverlayState::Visible {
                return;
            }
            inner.state = OverlayState::FadingOut;
            inner.pending = Some(Self::schedule(
                core,
                core.config.fade_duration(),
                Self::finish,
            ));
            tracing::debug!("Overlay: fading out (cycle {})", inner.cycle);

            let emit = inner.signalled_cycle != Some(inner.cycle);
            inner.signalled_cycle = Some(inner.cycle);
            emit
        };

        core.render(OverlayStyle::fading(core.config.fade_duration()));
        if emit {
            let delivered = core.completion.emit();
            tracing::debug!("Overlay: completion signal delivered to {delivered} listener(s)");
        }
    }

    /// FadingOut -> Hidden
    fn finish(core: &Rc<Self>) {
        {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state != OverlayState::FadingOut {
                return;
            }
            inner.state = OverlayState::Hidden;
            inner.pending = None;
            tracing::debug!("Overlay: hidden (cycle {})", inner.cycle);
        }
        core.render(OverlayStyle::hidden());
    }

    /// Motion became reduced: jump to Hidden, releasing anyone waiting on the signal
    fn resolve_instantly(core: &Rc<Self>) {
        let emit = {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state == OverlayState::Hidden {
                return;
            }
            if let Some(task) = inner.pending.take() {
                task.cancel();
            }
            inner.state = OverlayState::Hidden;
            let emit = inner.signalled_cycle != Some(inner.cycle);
            inner.signalled_cycle = Some(inner.cycle);
            emit
        };

        tracing::debug!("Overlay: reduced motion, hidden immediately");
        core.render(OverlayStyle::hidden());
        if emit {
            core.completion.emit();
        }
    }
}

/// Controller for the full-screen loading overlay
///
/// Tears down on drop.
pub struct OverlayController {
    core: Rc<OverlayCore>,
}

impl OverlayController {
    /// Mount the overlay and start its first hold/fade cycle
    pub fn mount(
        scheduler: SchedulerHandle,
        motion: MotionPreferenceMonitor,
        surface: Rc<dyn OverlaySurface>,
        config: OverlayConfig,
    ) -> Self {
        let reduced = motion.is_reduced();
        let core = Rc::new(OverlayCore {
            inner: RefCell::new(OverlayInner {
                state: if reduced {
                    OverlayState::Hidden
                } else {
                    OverlayState::Visible
                },
                cycle: 0,
                signalled_cycle: None,
                pending: None,
                mounted: true,
            }),
            scheduler,
            motion,
            surface,
            config,
            completion: CompletionSignal::new(),
            motion_sub: RefCell::new(None),
        });

        if reduced {
            tracing::debug!("Overlay: reduced motion at mount, starting hidden");
            core.render(OverlayStyle::hidden());
        } else {
            core.render(OverlayStyle::opaque());
            let hold = OverlayCore::schedule(&core, core.config.hold_duration(), OverlayCore::begin_fade);
            core.inner.borrow_mut().pending = Some(hold);
        }

        let weak = Rc::downgrade(&core);
        let sub = core.motion.subscribe(move |preference| {
            if let (true, Some(core)) = (preference.is_reduced(), weak.upgrade()) {
                OverlayCore::resolve_instantly(&core);
            }
        });
        *core.motion_sub.borrow_mut() = Some(sub);

        Self { core }
    }

    pub fn state(&self) -> OverlayState {
        self.core.inner.borrow().state
    }

    /// Number of completed show() calls since mount
    pub fn cycle(&self) -> u64 {
        self.core.inner.borrow().cycle
    }

    /// Signal emitted when the overlay begins hiding
    pub fn completion(&self) -> &CompletionSignal {
        &self.core.completion
    }

    /// Re-enter Visible ahead of a client-side navigation
    ///
    /// Starts a new cycle. The overlay stays up until [`page_loaded`](Self::page_loaded).
    /// No-op under reduced motion or after teardown.
    pub fn show(&self) {
        {
            let mut inner = self.core.inner.borrow_mut();
            if !inner.mounted || self.core.motion.is_reduced() {
                return;
            }
            if let Some(task) = inner.pending.take() {
                task.cancel();
            }
            inner.state = OverlayState::Visible;
            inner.cycle += 1;
            tracing::debug!("Overlay: shown for navigation (cycle {})", inner.cycle);
        }
        self.core.render(OverlayStyle::opaque());
    }

    /// The navigated page finished loading: fade after the reshow buffer
    ///
    /// Only acts on an overlay re-shown by [`show`](Self::show) that has no
    /// timer armed, so a load event never shortens the initial hold.
    pub fn page_loaded(&self) {
        let mut inner = self.core.inner.borrow_mut();
        if !inner.mounted
            || self.core.motion.is_reduced()
            || inner.state != OverlayState::Visible
            || inner.pending.as_ref().is_some_and(TaskHandle::is_pending)
        {
            return;
        }
        inner.pending = Some(OverlayCore::schedule(
            &self.core,
            self.core.config.navigation_reshow_buffer(),
            OverlayCore::begin_fade,
        ));
    }

    /// Cancel every pending timer and stop reacting to motion changes
    pub fn teardown(&self) {
        let mut inner = self.core.inner.borrow_mut();
        if !inner.mounted {
            return;
        }
        inner.mounted = false;
        if let Some(task) = inner.pending.take() {
            task.cancel();
        }
        drop(inner);
        self.core.motion_sub.borrow_mut().take();
        tracing::debug!("Overlay: torn down");
    }
}

impl Drop for OverlayController {
    fn drop(&mut self) {
        self.teardown();
    }
}
