//! Simulate command - run the intro on the headless platform
//!
//! Drives a virtual clock through the whole intro and records every
//! observable change (overlay state, completion signal, reveal progress) with
//! its timestamp. Scripted actions such as a skip or a navigation are
//! scheduled as timers on the same clock.

use overture_animation::{HeadlessPlatform, IntroChoreographer, IntroConfig, OverlayState, RevealState};
use overture_core::Scheduler;
use overture_platform::{EventTarget, Key, SessionStorage};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// ANSI color codes
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GRAY: &str = "\x1b[90m";
    pub const BOLD: &str = "\x1b[1m";
}

/// Everything that shapes a simulation run
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub text: String,
    pub config: IntroConfig,
    pub reduced_motion: bool,
    /// Start with the session flag already set
    pub played: bool,
    pub storage_fails: bool,
    pub seed: u64,
    /// Press Escape at this time
    pub skip_at: Option<Duration>,
    /// Toggle reduced motion at this time
    pub toggle_motion_at: Option<Duration>,
    /// Navigate to `navigate_text` at this time
    pub navigate_at: Option<Duration>,
    pub navigate_text: String,
    /// Delay between a navigation and its page load
    pub load_delay: Duration,
    pub duration: Duration,
    pub frame_interval: Duration,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            text: "Hello, world".to_string(),
            config: IntroConfig::default(),
            reduced_motion: false,
            played: false,
            storage_fails: false,
            seed: 1,
            skip_at: None,
            toggle_motion_at: None,
            navigate_at: None,
            navigate_text: "Projects".to_string(),
            load_delay: Duration::from_millis(200),
            duration: Duration::from_secs(3),
            frame_interval: overture_core::FRAME_INTERVAL,
        }
    }
}

/// One observed change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    /// Virtual time in milliseconds
    pub at_ms: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    Overlay { state: String },
    Signal { emission: u64 },
    Reveal { state: String, displayed: String },
    Action { name: String },
}

/// Result of a run
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub text: String,
    pub events: Vec<TimelineEvent>,
    pub background_ticks: u64,
    pub background_frames: usize,
    pub final_text: String,
    pub session_played: bool,
}

struct Observer {
    overlay: OverlayState,
    emissions: u64,
    reveal: (RevealState, usize),
    events: Vec<TimelineEvent>,
}

impl Observer {
    fn new(intro: &IntroChoreographer) -> Self {
        let snapshot = intro.revealer().snapshot();
        let mut observer = Self {
            overlay: intro.overlay().state(),
            emissions: 0,
            reveal: (snapshot.state, snapshot.prefix_len),
            events: Vec::new(),
        };
        observer.push(
            Duration::ZERO,
            EventKind::Overlay {
                state: format!("{:?}", observer.overlay),
            },
        );
        observer.push(
            Duration::ZERO,
            EventKind::Reveal {
                state: format!("{:?}", snapshot.state),
                displayed: snapshot.displayed,
            },
        );
        observer
    }

    fn push(&mut self, at: Duration, kind: EventKind) {
        self.events.push(TimelineEvent {
            at_ms: at.as_micros() as f64 / 1000.0,
            kind,
        });
    }

    fn observe(&mut self, at: Duration, intro: &IntroChoreographer) {
        let emissions = intro.overlay().completion().emissions();
        while self.emissions < emissions {
            self.emissions += 1;
            self.push(at, EventKind::Signal { emission: self.emissions });
        }

        let overlay = intro.overlay().state();
        if overlay != self.overlay {
            self.overlay = overlay;
            self.push(at, EventKind::Overlay { state: format!("{overlay:?}") });
        }

        let snapshot = intro.revealer().snapshot();
        let reveal = (snapshot.state, snapshot.prefix_len);
        if reveal != self.reveal {
            self.reveal = reveal;
            self.push(
                at,
                EventKind::Reveal {
                    state: format!("{:?}", snapshot.state),
                    displayed: snapshot.displayed,
                },
            );
        }
    }
}

/// Run the intro and record its timeline
pub fn run(options: &SimulationOptions) -> Timeline {
    let scheduler = Scheduler::new();
    let headless = HeadlessPlatform::new(options.reduced_motion);
    if options.played {
        let key = &options.config.reveal.session_key;
        if let Err(err) = headless.storage.set_item(key, "true") {
            tracing::warn!("Could not preset session flag: {err}");
        }
    }
    if options.storage_fails {
        headless.storage.set_failing(true);
    }

    let intro = IntroChoreographer::builder(headless.platform())
        .config(options.config.clone())
        .seed(options.seed)
        .mount(scheduler.handle(), options.text.as_str());
    let intro = Rc::new(RefCell::new(intro));
    let actions: Rc<RefCell<Vec<(Duration, String)>>> = Rc::default();

    schedule_actions(options, &scheduler, &headless, &intro, &actions);

    let mut observer = Observer::new(&intro.borrow());
    // A zero interval runs the timers alone, with no frames
    let end = options.duration;
    let frames = !options.frame_interval.is_zero();
    while scheduler.now() < end {
        let frame_at = if frames {
            (scheduler.now() + options.frame_interval).min(end)
        } else {
            end
        };
        while let Some(due) = scheduler.next_due().filter(|due| *due <= frame_at) {
            scheduler.advance_to(due);
            drain_actions(&actions, &mut observer);
            observer.observe(scheduler.now(), &intro.borrow());
        }
        scheduler.advance_to(frame_at);
        if frames {
            scheduler.dispatch_frame();
        }
        observer.observe(scheduler.now(), &intro.borrow());
    }

    let intro = intro.borrow();
    if options.storage_fails {
        headless.storage.set_failing(false);
    }
    let session_played = headless
        .storage
        .peek(&options.config.reveal.session_key)
        .is_some_and(|value| value == "true");

    Timeline {
        text: options.text.clone(),
        events: observer.events,
        background_ticks: intro.background().ticks(),
        background_frames: headless.background.presented(),
        final_text: intro.revealer().displayed(),
        session_played,
    }
}

fn schedule_actions(
    options: &SimulationOptions,
    scheduler: &Scheduler,
    headless: &HeadlessPlatform,
    intro: &Rc<RefCell<IntroChoreographer>>,
    actions: &Rc<RefCell<Vec<(Duration, String)>>>,
) {
    let handle = scheduler.handle();

    if let Some(at) = options.skip_at {
        let (input, log, clock) = (Rc::clone(&headless.input), Rc::clone(actions), handle.clone());
        handle.set_timeout(at, move || {
            log.borrow_mut().push((clock.now(), "escape pressed".into()));
            input.press_key(Key::Escape, EventTarget::Document);
        });
    }

    if let Some(at) = options.toggle_motion_at {
        let (motion, log, clock) = (Rc::clone(&headless.motion), Rc::clone(actions), handle.clone());
        let reduced = !options.reduced_motion;
        handle.set_timeout(at, move || {
            log.borrow_mut()
                .push((clock.now(), format!("reduced motion {}", if reduced { "on" } else { "off" })));
            motion.set_reduced(reduced);
        });
    }

    if let Some(at) = options.navigate_at {
        let (intro, log, clock) = (Rc::clone(intro), Rc::clone(actions), handle.clone());
        let text = options.navigate_text.clone();
        let load_delay = options.load_delay;
        handle.set_timeout(at, move || {
            log.borrow_mut().push((clock.now(), format!("navigate to {text:?}")));
            intro.borrow_mut().navigate(text.as_str());

            let (intro, log, timer_clock) = (Rc::clone(&intro), Rc::clone(&log), clock.clone());
            clock.set_timeout(load_delay, move || {
                log.borrow_mut().push((timer_clock.now(), "page loaded".into()));
                intro.borrow().page_loaded();
            });
        });
    }
}

fn drain_actions(actions: &Rc<RefCell<Vec<(Duration, String)>>>, observer: &mut Observer) {
    for (at, name) in actions.borrow_mut().drain(..) {
        observer.push(at, EventKind::Action { name });
    }
}

/// Print a timeline for humans
pub fn print_timeline(timeline: &Timeline) {
    println!(
        "{}Intro timeline{} for {:?}",
        colors::BOLD,
        colors::RESET,
        timeline.text
    );
    println!();

    for event in &timeline.events {
        let (label, color, detail) = match &event.kind {
            EventKind::Overlay { state } => ("overlay", colors::CYAN, state.clone()),
            EventKind::Signal { emission } => {
                ("signal", colors::YELLOW, format!("completion #{emission}"))
            }
            EventKind::Reveal { state, displayed } => {
                ("reveal", colors::GREEN, format!("{state:<9} {displayed:?}"))
            }
            EventKind::Action { name } => ("action", colors::BOLD, name.clone()),
        };
        println!(
            "  {}{:>9.3}ms{}  {}{:<8}{} {}",
            colors::GRAY,
            event.at_ms,
            colors::RESET,
            color,
            label,
            colors::RESET,
            detail
        );
    }

    println!();
    println!("  Final text:        {:?}", timeline.final_text);
    println!("  Session played:    {}", timeline.session_played);
    println!(
        "  Background:        {} tick(s), {} frame(s) presented",
        timeline.background_ticks, timeline.background_frames
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn reveal_states(timeline: &Timeline) -> Vec<String> {
        timeline
            .events
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Reveal { state, .. } => Some(state.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_default_run_plays_through() {
        let timeline = run(&SimulationOptions {
            text: "Hi".into(),
            ..Default::default()
        });

        assert_eq!(timeline.final_text, "Hi");
        assert!(timeline.session_played);
        assert!(timeline.background_ticks > 0);

        let signal = timeline
            .events
            .iter()
            .find(|event| matches!(event.kind, EventKind::Signal { .. }))
            .unwrap();
        assert_eq!(signal.at_ms, 600.0);
        assert_eq!(reveal_states(&timeline).last().unwrap(), "Done");
    }

    #[test]
    fn test_reduced_motion_run_is_static() {
        let timeline = run(&SimulationOptions {
            reduced_motion: true,
            ..Default::default()
        });

        assert_eq!(timeline.background_ticks, 0);
        assert!(!timeline.session_played);
        assert!(!timeline
            .events
            .iter()
            .any(|event| matches!(event.kind, EventKind::Signal { .. })));
        assert_eq!(reveal_states(&timeline), vec!["Done"]);
    }

    #[test]
    fn test_skip_is_recorded() {
        let timeline = run(&SimulationOptions {
            skip_at: Some(ms(650)),
            ..Default::default()
        });

        let skip = timeline
            .events
            .iter()
            .position(|event| matches!(&event.kind, EventKind::Action { name } if name == "escape pressed"))
            .unwrap();
        assert_eq!(timeline.events[skip].at_ms, 650.0);
        assert_eq!(timeline.final_text, "Hello, world");
    }

    #[test]
    fn test_navigation_run() {
        let timeline = run(&SimulationOptions {
            navigate_at: Some(ms(2000)),
            ..Default::default()
        });

        assert_eq!(timeline.final_text, "Projects");
        let signals = timeline
            .events
            .iter()
            .filter(|event| matches!(event.kind, EventKind::Signal { .. }))
            .count();
        assert_eq!(signals, 2);
    }

    #[test]
    fn test_zero_frame_interval_runs_timers_only() {
        let timeline = run(&SimulationOptions {
            text: "Hi".into(),
            frame_interval: Duration::from_secs_f64(1e-10),
            ..Default::default()
        });

        assert_eq!(timeline.final_text, "Hi");
        assert!(timeline.session_played);
        assert_eq!(timeline.background_ticks, 0);
    }

    #[test]
    fn test_timeline_serializes_tagged_events() {
        let timeline = run(&SimulationOptions {
            text: "Yo".into(),
            duration: ms(700),
            ..Default::default()
        });
        let json = serde_json::to_value(&timeline).unwrap();
        assert_eq!(json["events"][0]["event"], "overlay");
        assert_eq!(json["events"][0]["state"], "Visible");
    }
}
