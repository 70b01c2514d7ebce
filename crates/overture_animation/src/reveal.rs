//! Character-by-character text reveal
//!
//! The reveal waits in `Pending` until either the overlay completion signal
//! (routed in through [`TextRevealer::trigger`]) or a fallback timer starts
//! it, then appends one character per step with a jittered delay. It plays
//! once per browsing session: the session flag is written on completion or
//! skip, and any later mount with the flag set resolves straight to `Done`.
//!
//! Under reduced motion the full text is shown immediately and nothing is
//! scheduled.

use crate::config::RevealConfig;
use overture_core::{
    MotionPreferenceMonitor, MotionSubscription, RandomSource, SchedulerHandle,
    SessionPlaybackStore, TaskHandle,
};
use overture_platform::{
    Caret, EventTarget, HeadingFrame, HeadingSurface, InputEvent, InputSource, Key, KeyState,
    ListenerId, PointerEvent,
};
use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

new_key_type! {
    /// Handle to a reveal state listener
    pub struct RevealListenerId;
}

/// Reveal lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RevealState {
    /// Waiting for the overlay signal or the fallback timer
    Pending,
    /// Characters are being appended
    Revealing,
    /// Full text shown; terminal for this mount
    Done,
}

/// What started the reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    Overlay,
    Fallback,
}

/// Observable state of a reveal
#[derive(Clone, Debug, PartialEq)]
pub struct RevealSnapshot {
    pub state: RevealState,
    /// Currently visible prefix
    pub displayed: String,
    /// Visible prefix length in characters
    pub prefix_len: usize,
    pub caret: Caret,
}

/// Collaborators a [`TextRevealer`] is mounted with
pub struct RevealContext {
    pub scheduler: SchedulerHandle,
    pub motion: MotionPreferenceMonitor,
    pub store: SessionPlaybackStore,
    pub surface: Rc<dyn HeadingSurface>,
    pub input: Rc<dyn InputSource>,
    pub random: Box<dyn RandomSource>,
    pub config: RevealConfig,
}

type RevealListener = Rc<dyn Fn(&RevealSnapshot)>;

struct RevealInner {
    state: RevealState,
    /// Byte offset of the end of the visible prefix
    cursor: usize,
    /// Visible prefix length in characters
    revealed: usize,
    caret: Caret,
    fallback: Option<TaskHandle>,
    step: Option<TaskHandle>,
    random: Box<dyn RandomSource>,
    mounted: bool,
}

struct RevealCore {
    text: String,
    inner: RefCell<RevealInner>,
    listeners: RefCell<SlotMap<RevealListenerId, RevealListener>>,
    scheduler: SchedulerHandle,
    motion: MotionPreferenceMonitor,
    store: SessionPlaybackStore,
    surface: Rc<dyn HeadingSurface>,
    input: Rc<dyn InputSource>,
    config: RevealConfig,
    input_listener: Cell<Option<ListenerId>>,
    motion_sub: RefCell<Option<MotionSubscription>>,
}

impl RevealCore {
    fn snapshot(&self) -> RevealSnapshot {
        let inner = self.inner.borrow();
        RevealSnapshot {
            state: inner.state,
            displayed: self.text[..inner.cursor].to_string(),
            prefix_len: inner.revealed,
            caret: inner.caret,
        }
    }

    fn render(&self) {
        let frame = {
            let inner = self.inner.borrow();
            HeadingFrame {
                accessible_label: self.text.clone(),
                layout_text: self.text.clone(),
                visible_text: self.text[..inner.cursor].to_string(),
                caret: inner.caret,
                focusable: true,
            }
        };
        if let Err(err) = self.surface.render(&frame) {
            tracing::debug!("Reveal heading not updated: {err}");
        }
    }

    /// Call every listener with the current snapshot, outside any borrow
    fn notify(&self) {
        let snapshot = self.snapshot();
        let listeners: Vec<RevealListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Pending -> Revealing
    fn trigger(core: &Rc<Self>, source: TriggerSource) -> bool {
        {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state != RevealState::Pending {
                return false;
            }
            if let Some(fallback) = inner.fallback.take() {
                fallback.cancel();
            }
            inner.state = RevealState::Revealing;
        }
        tracing::debug!("TextRevealer: started by {:?}", source);

        if core.text.is_empty() {
            core.complete(true, Caret::Hidden);
            return true;
        }

        core.notify();
        Self::schedule_step(core);
        true
    }

    fn schedule_step(core: &Rc<Self>) {
        let delay = {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state != RevealState::Revealing {
                return;
            }
            let unit = inner.random.next_unit();
            core.config.step_delay(unit)
        };

        let weak: Weak<Self> = Rc::downgrade(core);
        let task = core.scheduler.set_timeout(delay, move || {
            if let Some(core) = weak.upgrade() {
                RevealCore::advance(&core);
            }
        });
        core.inner.borrow_mut().step = Some(task);
    }

    /// Append one character
    fn advance(core: &Rc<Self>) {
        let finished = {
            let mut inner = core.inner.borrow_mut();
            if !inner.mounted || inner.state != RevealState::Revealing {
                return;
            }
            inner.step = None;
            if let Some(ch) = core.text[inner.cursor..].chars().next() {
                inner.cursor += ch.len_utf8();
                inner.revealed += 1;
            }
            tracing::trace!("TextRevealer: {} character(s) shown", inner.revealed);
            inner.cursor >= core.text.len()
        };

        if finished {
            core.complete(true, Caret::Hidden);
        } else {
            core.render();
            Self::schedule_step(core);
        }
    }

    /// Jump to the end state
    ///
    /// Returns `false` when already done or torn down.
    fn complete(&self, persist: bool, caret: Caret) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.mounted || inner.state == RevealState::Done {
                return false;
            }
            for task in [inner.fallback.take(), inner.step.take()].into_iter().flatten() {
                task.cancel();
            }
            inner.state = RevealState::Done;
            inner.cursor = self.text.len();
            inner.revealed = self.text.chars().count();
            inner.caret = caret;
        }
        tracing::debug!("TextRevealer: done (persist: {persist})");

        if persist {
            self.store.set(&self.config.session_key);
        }
        self.render();
        self.notify();
        true
    }

    fn handle_input(&self, event: &InputEvent) -> bool {
        let skip = match event {
            InputEvent::Keyboard(key) if key.state == KeyState::Pressed => match key.key {
                Key::Escape => true,
                Key::Enter | Key::Space => key.target == EventTarget::RevealSurface,
                _ => false,
            },
            InputEvent::Pointer(PointerEvent::Activated {
                target: EventTarget::RevealSurface,
            }) => true,
            _ => false,
        };
        skip && self.complete(true, Caret::Hidden)
    }
}

/// Timed typewriter reveal of a single line of text
///
/// Tears down on drop.
pub struct TextRevealer {
    core: Rc<RevealCore>,
}

impl TextRevealer {
    /// Mount a reveal of `text`
    ///
    /// Resolves to `Done` on the spot when motion is reduced or the session
    /// flag is already set. Otherwise waits in `Pending` with the fallback
    /// timer armed.
    pub fn mount(text: impl Into<String>, context: RevealContext) -> Self {
        let RevealContext {
            scheduler,
            motion,
            store,
            surface,
            input,
            random,
            config,
        } = context;
        let text = text.into();

        let reduced = motion.is_reduced();
        let played = store.get(&config.session_key);
        let resolved = reduced || played;
        let caret = if reduced {
            Caret::Absent
        } else if played {
            Caret::Hidden
        } else {
            Caret::Blinking
        };

        let core = Rc::new(RevealCore {
            inner: RefCell::new(RevealInner {
                state: if resolved {
                    RevealState::Done
                } else {
                    RevealState::Pending
                },
                cursor: if resolved { text.len() } else { 0 },
                revealed: if resolved { text.chars().count() } else { 0 },
                caret,
                fallback: None,
                step: None,
                random,
                mounted: true,
            }),
            text,
            listeners: RefCell::new(SlotMap::with_key()),
            scheduler,
            motion,
            store,
            surface,
            input,
            config,
            input_listener: Cell::new(None),
            motion_sub: RefCell::new(None),
        });
        core.render();

        if resolved {
            tracing::debug!(
                "TextRevealer: resolved at mount (reduced: {reduced}, played: {played})"
            );
            return Self { core };
        }

        let weak = Rc::downgrade(&core);
        let fallback = core
            .scheduler
            .set_timeout(core.config.fallback_trigger(), move || {
                if let Some(core) = weak.upgrade() {
                    RevealCore::trigger(&core, TriggerSource::Fallback);
                }
            });
        core.inner.borrow_mut().fallback = Some(fallback);

        let weak = Rc::downgrade(&core);
        let sub = core.motion.subscribe(move |preference| {
            if let (true, Some(core)) = (preference.is_reduced(), weak.upgrade()) {
                core.complete(false, Caret::Absent);
            }
        });
        *core.motion_sub.borrow_mut() = Some(sub);

        let weak = Rc::downgrade(&core);
        let id = core.input.add_listener(Box::new(move |event: &InputEvent| {
            if let Some(core) = weak.upgrade() {
                core.handle_input(event);
            }
        }));
        core.input_listener.set(Some(id));

        Self { core }
    }

    /// Start the reveal if it is still pending
    ///
    /// Returns `false` if it had already started, finished or been torn down.
    pub fn trigger(&self, source: TriggerSource) -> bool {
        RevealCore::trigger(&self.core, source)
    }

    /// A weak handle that can start the reveal from elsewhere
    pub fn trigger_handle(&self) -> RevealTrigger {
        RevealTrigger {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Show the full text now and mark the session as played
    ///
    /// Idempotent. Returns `true` if this call finished the reveal.
    pub fn skip(&self) -> bool {
        self.core.complete(true, Caret::Hidden)
    }

    /// Click or tap on the reveal surface
    pub fn activate(&self) -> bool {
        self.skip()
    }

    /// Apply the reveal's key and pointer bindings to `event`
    ///
    /// Escape skips from anywhere; Enter and Space skip only when the reveal
    /// surface has focus. Returns `true` if the event finished the reveal.
    pub fn handle_input(&self, event: &InputEvent) -> bool {
        self.core.handle_input(event)
    }

    /// Listen for state changes
    ///
    /// Called on every state transition, not on each character.
    pub fn subscribe<F>(&self, listener: F) -> RevealListenerId
    where
        F: Fn(&RevealSnapshot) + 'static,
    {
        self.core.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: RevealListenerId) -> bool {
        self.core.listeners.borrow_mut().remove(id).is_some()
    }

    pub fn snapshot(&self) -> RevealSnapshot {
        self.core.snapshot()
    }

    pub fn state(&self) -> RevealState {
        self.core.inner.borrow().state
    }

    pub fn displayed(&self) -> String {
        self.core.snapshot().displayed
    }

    pub fn text(&self) -> &str {
        &self.core.text
    }

    /// Cancel timers and detach every listener
    pub fn teardown(&self) {
        {
            let mut inner = self.core.inner.borrow_mut();
            if !inner.mounted {
                return;
            }
            inner.mounted = false;
            for task in [inner.fallback.take(), inner.step.take()].into_iter().flatten() {
                task.cancel();
            }
        }
        if let Some(id) = self.core.input_listener.take() {
            self.core.input.remove_listener(id);
        }
        self.core.motion_sub.borrow_mut().take();
        self.core.listeners.borrow_mut().clear();
        tracing::debug!("TextRevealer: torn down");
    }
}

impl Drop for TextRevealer {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Weak trigger for a [`TextRevealer`]
#[derive(Clone)]
pub struct RevealTrigger {
    core: Weak<RevealCore>,
}

impl RevealTrigger {
    /// Start the reveal if it is still alive and pending
    pub fn fire(&self, source: TriggerSource) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| RevealCore::trigger(&core, source))
    }
}
