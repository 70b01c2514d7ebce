//! Intro choreographer
//!
//! Owns the overlay, the text reveal and the background, and is the only
//! place they are wired together. The overlay's completion signal is routed
//! to the revealer's trigger; the connection is dropped as soon as the
//! revealer leaves `Pending`, whichever trigger won.
//!
//! Mount order matters: the motion monitor is created first so every
//! component sees the same preference, then the overlay, the revealer and
//! the background.

use crate::background::BackgroundAnimator;
use crate::config::IntroConfig;
use crate::overlay::OverlayController;
use crate::reveal::{RevealContext, RevealState, TextRevealer, TriggerSource};
use overture_core::{
    ConnectionId, MotionPreferenceMonitor, RandomSource, SchedulerHandle, SeededRandom,
    SessionPlaybackStore,
};
use overture_platform::{
    BackgroundLayer, HeadingSurface, InputEvent, InputSource, MotionSignal, OverlaySurface,
    SessionStorage,
};
use std::cell::Cell;
use std::rc::Rc;

#[cfg(feature = "headless")]
use overture_platform::headless::{
    HeadlessInput, HeadlessMotion, MemoryStorage, RecordingHeading, RecordingLayer,
    RecordingOverlay,
};

/// Every platform capability the intro needs
#[derive(Clone)]
pub struct IntroPlatform {
    pub motion: Rc<dyn MotionSignal>,
    pub storage: Rc<dyn SessionStorage>,
    pub input: Rc<dyn InputSource>,
    pub overlay: Rc<dyn OverlaySurface>,
    pub heading: Rc<dyn HeadingSurface>,
    pub background: Rc<dyn BackgroundLayer>,
}

/// In-memory platform with typed handles for driving and inspecting it
#[cfg(feature = "headless")]
#[derive(Clone)]
pub struct HeadlessPlatform {
    pub motion: Rc<HeadlessMotion>,
    pub storage: Rc<MemoryStorage>,
    pub input: Rc<HeadlessInput>,
    pub overlay: Rc<RecordingOverlay>,
    pub heading: Rc<RecordingHeading>,
    pub background: Rc<RecordingLayer>,
}

#[cfg(feature = "headless")]
impl HeadlessPlatform {
    pub fn new(reduced_motion: bool) -> Self {
        Self {
            motion: Rc::new(HeadlessMotion::new(reduced_motion)),
            storage: Rc::new(MemoryStorage::new()),
            input: Rc::new(HeadlessInput::default()),
            overlay: Rc::new(RecordingOverlay::new()),
            heading: Rc::new(RecordingHeading::new()),
            background: Rc::new(RecordingLayer::new()),
        }
    }

    /// Type-erased view for mounting
    pub fn platform(&self) -> IntroPlatform {
        IntroPlatform {
            motion: self.motion.clone(),
            storage: self.storage.clone(),
            input: self.input.clone(),
            overlay: self.overlay.clone(),
            heading: self.heading.clone(),
            background: self.background.clone(),
        }
    }
}

type RandomFactory = Box<dyn FnMut() -> Box<dyn RandomSource>>;

/// Builder for [`IntroChoreographer`]
pub struct ChoreographerBuilder {
    platform: IntroPlatform,
    config: IntroConfig,
    random: RandomFactory,
}

impl ChoreographerBuilder {
    /// Use `config` if it validates; otherwise keep the current one
    pub fn config(mut self, config: IntroConfig) -> Self {
        match config.validate() {
            Ok(()) => self.config = config,
            Err(err) => tracing::warn!("IntroChoreographer: ignoring config: {err}"),
        }
        self
    }

    /// Seed the reveal jitter for reproducible timelines
    ///
    /// Each revealer mount draws from its own generator, seeded `seed`,
    /// `seed + 1` and so on.
    pub fn seed(self, seed: u64) -> Self {
        let mut mounts = 0u64;
        self.random(move || {
            let random = SeededRandom::new(seed.wrapping_add(mounts));
            mounts += 1;
            Box::new(random) as Box<dyn RandomSource>
        })
    }

    /// Supply the jitter source for every revealer mount
    pub fn random<F>(mut self, factory: F) -> Self
    where
        F: FnMut() -> Box<dyn RandomSource> + 'static,
    {
        self.random = Box::new(factory);
        self
    }

    /// Mount every component and start the intro
    pub fn mount(self, scheduler: SchedulerHandle, text: impl Into<String>) -> IntroChoreographer {
        let Self {
            platform,
            config,
            mut random,
        } = self;

        let motion = MotionPreferenceMonitor::new(Rc::clone(&platform.motion));
        let store = SessionPlaybackStore::new(Rc::clone(&platform.storage));
        tracing::debug!(
            "IntroChoreographer: mounting (motion: {:?})",
            motion.current()
        );

        let overlay = OverlayController::mount(
            scheduler.clone(),
            motion.clone(),
            Rc::clone(&platform.overlay),
            config.overlay.clone(),
        );

        let revealer = TextRevealer::mount(
            text,
            RevealContext {
                scheduler: scheduler.clone(),
                motion: motion.clone(),
                store: store.clone(),
                surface: Rc::clone(&platform.heading),
                input: Rc::clone(&platform.input),
                random: random(),
                config: config.reveal.clone(),
            },
        );
        let connection = Rc::new(Cell::new(None));
        link(&overlay, &revealer, &connection);

        let background = BackgroundAnimator::mount(
            scheduler.clone(),
            motion.clone(),
            Rc::clone(&platform.input),
            Rc::clone(&platform.background),
            config.background.clone(),
        );

        IntroChoreographer {
            platform,
            config,
            scheduler,
            motion,
            store,
            random,
            overlay,
            revealer,
            background,
            connection,
            mounted: Cell::new(true),
        }
    }
}

/// Route the overlay completion signal into `revealer` until it starts
fn link(
    overlay: &OverlayController,
    revealer: &TextRevealer,
    connection: &Rc<Cell<Option<ConnectionId>>>,
) {
    if let Some(previous) = connection.take() {
        overlay.completion().disconnect(previous);
    }
    if revealer.state() != RevealState::Pending {
        return;
    }

    let trigger = revealer.trigger_handle();
    let id = overlay.completion().connect(move || {
        trigger.fire(TriggerSource::Overlay);
    });
    connection.set(Some(id));

    let completion = overlay.completion().clone();
    let slot = Rc::clone(connection);
    revealer.subscribe(move |snapshot| {
        if snapshot.state == RevealState::Pending {
            return;
        }
        if let Some(id) = slot.take() {
            completion.disconnect(id);
            tracing::trace!("IntroChoreographer: overlay signal disconnected");
        }
    });
}

/// Mediator owning the three intro components
///
/// Tears everything down on drop.
pub struct IntroChoreographer {
    platform: IntroPlatform,
    config: IntroConfig,
    scheduler: SchedulerHandle,
    motion: MotionPreferenceMonitor,
    store: SessionPlaybackStore,
    random: RandomFactory,
    overlay: OverlayController,
    revealer: TextRevealer,
    background: BackgroundAnimator,
    connection: Rc<Cell<Option<ConnectionId>>>,
    mounted: Cell<bool>,
}

impl IntroChoreographer {
    pub fn builder(platform: IntroPlatform) -> ChoreographerBuilder {
        ChoreographerBuilder {
            platform,
            config: IntroConfig::default(),
            random: Box::new(|| Box::new(SeededRandom::from_entropy()) as Box<dyn RandomSource>),
        }
    }

    /// Client-side navigation to a page revealing `text`
    ///
    /// Re-shows the overlay and remounts the revealer. A reveal that already
    /// played this session resolves straight to `Done`; call
    /// [`page_loaded`](Self::page_loaded) once the new page is ready to fade
    /// the overlay out.
    pub fn navigate(&mut self, text: impl Into<String>) {
        if !self.mounted.get() {
            return;
        }
        tracing::debug!("IntroChoreographer: navigation");
        self.overlay.show();
        self.revealer.teardown();

        let revealer = TextRevealer::mount(
            text,
            RevealContext {
                scheduler: self.scheduler.clone(),
                motion: self.motion.clone(),
                store: self.store.clone(),
                surface: Rc::clone(&self.platform.heading),
                input: Rc::clone(&self.platform.input),
                random: (self.random)(),
                config: self.config.reveal.clone(),
            },
        );
        link(&self.overlay, &revealer, &self.connection);
        self.revealer = revealer;
    }

    /// The navigated page finished loading
    pub fn page_loaded(&self) {
        if self.mounted.get() {
            self.overlay.page_loaded();
        }
    }

    /// Forward a keyboard or pointer event to the reveal bindings
    ///
    /// For hosts that deliver input directly instead of through the
    /// platform's [`InputSource`]. Returns `true` if the event skipped the
    /// reveal.
    pub fn handle_input(&self, event: &InputEvent) -> bool {
        self.mounted.get() && self.revealer.handle_input(event)
    }

    /// Tear down every component, cancelling all timers and listeners
    pub fn teardown(&self) {
        if !self.mounted.replace(false) {
            return;
        }
        if let Some(id) = self.connection.take() {
            self.overlay.completion().disconnect(id);
        }
        self.overlay.teardown();
        self.revealer.teardown();
        self.background.teardown();
        tracing::debug!("IntroChoreographer: torn down");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn revealer(&self) -> &TextRevealer {
        &self.revealer
    }

    pub fn background(&self) -> &BackgroundAnimator {
        &self.background
    }

    pub fn motion(&self) -> &MotionPreferenceMonitor {
        &self.motion
    }

    pub fn config(&self) -> &IntroConfig {
        &self.config
    }
}

impl Drop for IntroChoreographer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::overlay::OverlayState;
    use overture_core::Scheduler;
    use std::time::Duration;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn mount(headless: &HeadlessPlatform, scheduler: &Scheduler) -> IntroChoreographer {
        IntroChoreographer::builder(headless.platform())
            .seed(3)
            .mount(scheduler.handle(), "Hello")
    }

    #[test]
    fn test_overlay_signal_starts_reveal() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let intro = mount(&headless, &scheduler);
        assert_eq!(intro.overlay().completion().connection_count(), 1);

        scheduler.advance_by(ms(599));
        assert_eq!(intro.revealer().state(), RevealState::Pending);
        scheduler.advance_by(ms(1));
        assert_eq!(intro.revealer().state(), RevealState::Revealing);
        assert_eq!(intro.overlay().completion().connection_count(), 0);
    }

    #[test]
    fn test_fallback_wins_when_overlay_holds_longer() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let mut config = IntroConfig::default();
        config.overlay.hold_duration_ms = 3000;

        let intro = IntroChoreographer::builder(headless.platform())
            .config(config)
            .seed(3)
            .mount(scheduler.handle(), "Hello");

        scheduler.advance_by(ms(1500));
        assert_eq!(intro.revealer().state(), RevealState::Revealing);
        assert_eq!(intro.overlay().state(), OverlayState::Visible);
        assert_eq!(intro.overlay().completion().connection_count(), 0);
    }

    #[test]
    fn test_invalid_config_keeps_defaults() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let mut config = IntroConfig::default();
        config.reveal.jitter_ms = 0.0;
        config.overlay.hold_duration_ms = 100;

        let intro = IntroChoreographer::builder(headless.platform())
            .config(config)
            .seed(3)
            .mount(scheduler.handle(), "Hello");
        assert_eq!(intro.config(), &IntroConfig::default());

        scheduler.advance_by(ms(599));
        assert_eq!(intro.revealer().state(), RevealState::Pending);
    }

    #[test]
    fn test_navigation_after_played_intro() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let mut intro = mount(&headless, &scheduler);
        scheduler.advance_by(ms(2000));
        assert_eq!(intro.revealer().state(), RevealState::Done);

        intro.navigate("Projects");
        assert_eq!(intro.overlay().state(), OverlayState::Visible);
        assert_eq!(intro.revealer().state(), RevealState::Done);
        assert_eq!(intro.revealer().displayed(), "Projects");
        assert_eq!(intro.overlay().completion().connection_count(), 0);

        intro.page_loaded();
        scheduler.advance_by(ms(800));
        assert_eq!(intro.overlay().state(), OverlayState::Hidden);
    }

    #[test]
    fn test_navigation_replays_when_flag_was_not_kept() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        headless.storage.set_fail_writes(true);
        let mut intro = mount(&headless, &scheduler);
        scheduler.advance_by(ms(2000));

        intro.navigate("Again");
        assert_eq!(intro.revealer().state(), RevealState::Pending);
        assert_eq!(intro.overlay().completion().connection_count(), 1);

        intro.page_loaded();
        scheduler.advance_by(ms(300));
        assert_eq!(intro.revealer().state(), RevealState::Revealing);
    }

    #[test]
    fn test_handle_input_skips() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let intro = mount(&headless, &scheduler);

        let escape = InputEvent::Keyboard(overture_platform::KeyboardEvent::pressed(
            overture_platform::Key::Escape,
            overture_platform::EventTarget::Document,
        ));
        assert!(intro.handle_input(&escape));
        assert_eq!(intro.revealer().displayed(), "Hello");
    }

    #[test]
    fn test_teardown_leaves_nothing_pending() {
        let scheduler = Scheduler::new();
        let headless = HeadlessPlatform::new(false);
        let intro = mount(&headless, &scheduler);
        scheduler.dispatch_frame();

        intro.teardown();
        assert!(!intro.is_mounted());
        assert_eq!(scheduler.pending_timers(), 0);
        assert_eq!(scheduler.pending_frames(), 0);
        assert_eq!(headless.input.listener_count(), 0);
        assert_eq!(intro.overlay().completion().connection_count(), 0);
    }
}
