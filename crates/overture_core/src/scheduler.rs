//! Cooperative scheduler
//!
//! Owns a virtual clock and the two kinds of suspension point used by the
//! intro choreography:
//! - **Timers** (`set_timeout`) fire once when the clock reaches their due time
//! - **Frame requests** (`request_frame`) fire once on the next dispatched frame
//!
//! Every scheduled task is represented by a [`TaskHandle`] with an explicit
//! `cancel()`, so owners can tear down deterministically. The host drives the
//! clock with [`Scheduler::advance_by`], [`Scheduler::dispatch_frame`] or
//! [`Scheduler::run_for`]; nothing runs on its own.
//!
//! Callbacks are invoked with no internal borrow held, so they may schedule
//! new work or cancel other tasks.

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Frame interval used when the host does not specify one (60Hz)
pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

new_key_type! {
    /// Handle to a scheduled timer or frame request
    pub struct TaskId;
}

enum TaskKind {
    Timer {
        due: Duration,
        callback: Box<dyn FnOnce()>,
    },
    Frame {
        callback: Box<dyn FnOnce(Duration)>,
    },
}

struct Task {
    /// Insertion order, breaks ties between timers due at the same instant
    seq: u64,
    kind: TaskKind,
}

/// Internal state of the scheduler
struct SchedulerInner {
    tasks: SlotMap<TaskId, Task>,
    now: Duration,
    next_seq: u64,
    frames_dispatched: u64,
}

impl SchedulerInner {
    fn insert(&mut self, kind: TaskKind) -> TaskId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.insert(Task { seq, kind })
    }

    /// Remove and return the earliest timer due at or before `limit`
    fn pop_due(&mut self, limit: Duration) -> Option<(Duration, Box<dyn FnOnce()>)> {
        let id = self
            .tasks
            .iter()
            .filter_map(|(id, task)| match task.kind {
                TaskKind::Timer { due, .. } if due <= limit => Some((due, task.seq, id)),
                _ => None,
            })
            .min_by_key(|&(due, seq, _)| (due, seq))
            .map(|(_, _, id)| id)?;

        match self.tasks.remove(id)?.kind {
            TaskKind::Timer { due, callback } => Some((due, callback)),
            TaskKind::Frame { .. } => None,
        }
    }
}

/// The scheduler that runs every timer and frame callback
///
/// Held by the host; components receive a [`SchedulerHandle`].
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                tasks: SlotMap::with_key(),
                now: Duration::ZERO,
                next_seq: 0,
                frames_dispatched: 0,
            })),
        }
    }

    /// Get a handle to this scheduler for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Current virtual time since the scheduler was created
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Advance the clock by `delta`, firing every timer that comes due
    ///
    /// Returns the number of timers fired.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        self.advance_to(target)
    }

    /// Advance the clock to `target`, firing due timers in (due, insertion) order
    ///
    /// Timers scheduled by a callback are eligible in the same call if they
    /// fall due before `target`. The clock never moves backwards.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let next = inner.pop_due(target);
                if let Some((due, _)) = &next {
                    inner.now = inner.now.max(*due);
                }
                next
            };

            match next {
                Some((_, callback)) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.max(target);
        fired
    }

    /// Dispatch one display frame
    ///
    /// Runs every frame request registered before this call. Requests made
    /// from inside a frame callback wait for the next frame. Returns the
    /// number of callbacks run.
    pub fn dispatch_frame(&self) -> usize {
        let (now, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            let mut ids: Vec<(u64, TaskId)> = inner
                .tasks
                .iter()
                .filter(|(_, task)| matches!(task.kind, TaskKind::Frame { .. }))
                .map(|(id, task)| (task.seq, id))
                .collect();
            ids.sort_unstable_by_key(|&(seq, _)| seq);

            let callbacks: Vec<_> = ids
                .into_iter()
                .filter_map(|(_, id)| match inner.tasks.remove(id)?.kind {
                    TaskKind::Frame { callback } => Some(callback),
                    TaskKind::Timer { .. } => None,
                })
                .collect();
            inner.frames_dispatched += 1;
            (inner.now, callbacks)
        };

        let count = callbacks.len();
        for callback in callbacks {
            callback(now);
        }
        count
    }

    /// Run the clock forward by `duration`, dispatching a frame every `frame_interval`
    ///
    /// Timers due within each interval fire before that interval's frame.
    pub fn run_for(&self, duration: Duration, frame_interval: Duration) {
        let end = self.now() + duration;
        if frame_interval.is_zero() {
            self.advance_to(end);
            return;
        }

        while self.now() < end {
            let step = (self.now() + frame_interval).min(end);
            self.advance_to(step);
            self.dispatch_frame();
        }
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<Duration> {
        self.inner
            .borrow()
            .tasks
            .values()
            .filter_map(|task| match task.kind {
                TaskKind::Timer { due, .. } => Some(due),
                TaskKind::Frame { .. } => None,
            })
            .min()
    }

    /// Fire timers one after another until none remain, or `limit` is reached
    ///
    /// Frame requests are left untouched. Returns the number of timers fired.
    pub fn flush_timers(&self, limit: usize) -> usize {
        let mut fired = 0;
        while fired < limit {
            match self.next_due() {
                Some(due) => fired += self.advance_to(due),
                None => break,
            }
        }
        fired
    }

    /// Number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .values()
            .filter(|task| matches!(task.kind, TaskKind::Timer { .. }))
            .count()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending_frames(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .values()
            .filter(|task| matches!(task.kind, TaskKind::Frame { .. }))
            .count()
    }

    pub fn frames_dispatched(&self) -> u64 {
        self.inner.borrow().frames_dispatched
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to the scheduler
///
/// This is passed to components that need to schedule work. It won't keep the
/// scheduler alive; once the scheduler is gone, new tasks are inert handles
/// that never fire.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Current virtual time, or zero if the scheduler is gone
    pub fn now(&self) -> Duration {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().now)
            .unwrap_or_default()
    }

    /// Schedule `callback` to run once after `delay`
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TaskHandle
    where
        F: FnOnce() + 'static,
    {
        let id = self.inner.upgrade().map(|inner| {
            let mut guard = inner.borrow_mut();
            let due = guard.now + delay;
            tracing::trace!("Scheduler: timer due at {:?}", due);
            guard.insert(TaskKind::Timer {
                due,
                callback: Box::new(callback),
            })
        });
        TaskHandle::new(id, self.inner.clone())
    }

    /// Schedule `callback` to run on the next dispatched frame
    ///
    /// The callback receives the frame timestamp.
    pub fn request_frame<F>(&self, callback: F) -> TaskHandle
    where
        F: FnOnce(Duration) + 'static,
    {
        let id = self.inner.upgrade().map(|inner| {
            inner.borrow_mut().insert(TaskKind::Frame {
                callback: Box::new(callback),
            })
        });
        TaskHandle::new(id, self.inner.clone())
    }
}

/// Handle to a single scheduled task
///
/// Dropping the handle does not cancel the task; call [`cancel`](Self::cancel).
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: Option<TaskId>,
    scheduler: Weak<RefCell<SchedulerInner>>,
}

impl TaskHandle {
    fn new(id: Option<TaskId>, scheduler: Weak<RefCell<SchedulerInner>>) -> Self {
        Self { id, scheduler }
    }

    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    /// Cancel the task if it has not run yet
    ///
    /// Returns `true` if a pending task was removed. Cancelling a task that
    /// already ran, was already cancelled, or is currently running is a no-op.
    pub fn cancel(&self) -> bool {
        let (Some(id), Some(inner)) = (self.id, self.scheduler.upgrade()) else {
            return false;
        };
        let removed = inner.borrow_mut().tasks.remove(id).is_some();
        removed
    }

    /// Whether the task is still waiting to run
    pub fn is_pending(&self) -> bool {
        match (self.id, self.scheduler.upgrade()) {
            (Some(id), Some(inner)) => inner.borrow().tasks.contains_key(id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_timer_fires_at_due_time() {
        let scheduler = Scheduler::new();
        let fired_at = Rc::new(Cell::new(None));

        let slot = Rc::clone(&fired_at);
        let handle = scheduler.handle();
        let clock = handle.clone();
        let task = handle.set_timeout(ms(600), move || slot.set(Some(clock.now())));

        assert_eq!(scheduler.advance_by(ms(599)), 0);
        assert!(task.is_pending());

        assert_eq!(scheduler.advance_by(ms(10)), 1);
        assert_eq!(fired_at.get(), Some(ms(600)));
        assert_eq!(scheduler.now(), ms(609));
        assert!(!task.is_pending());
    }

    #[test]
    fn test_timers_fire_in_due_then_insertion_order() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("c", 30), ("a", 10), ("b1", 20), ("b2", 20)] {
            let order = Rc::clone(&order);
            handle.set_timeout(ms(delay), move || order.borrow_mut().push(label));
        }

        scheduler.advance_by(ms(100));
        assert_eq!(*order.borrow(), vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let task = scheduler.handle().set_timeout(ms(5), move || flag.set(true));

        assert!(task.cancel());
        assert!(!task.cancel());
        scheduler.advance_by(ms(10));
        assert!(!fired.get());
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_chained_timers_within_one_advance() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let times = Rc::new(RefCell::new(Vec::new()));

        let inner_handle = handle.clone();
        let sink = Rc::clone(&times);
        handle.set_timeout(ms(10), move || {
            sink.borrow_mut().push(inner_handle.now());
            let sink = Rc::clone(&sink);
            let clock = inner_handle.clone();
            inner_handle.set_timeout(ms(15), move || sink.borrow_mut().push(clock.now()));
        });

        assert_eq!(scheduler.advance_by(ms(50)), 2);
        assert_eq!(*times.borrow(), vec![ms(10), ms(25)]);
    }

    #[test]
    fn test_frame_requests_made_during_frame_wait_for_next() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let ticks = Rc::new(Cell::new(0));

        fn schedule(handle: SchedulerHandle, ticks: Rc<Cell<u32>>) {
            let next = handle.clone();
            handle.request_frame(move |_| {
                ticks.set(ticks.get() + 1);
                schedule(next, ticks);
            });
        }
        schedule(handle, Rc::clone(&ticks));

        assert_eq!(scheduler.dispatch_frame(), 1);
        assert_eq!(ticks.get(), 1);
        assert_eq!(scheduler.pending_frames(), 1);
        assert_eq!(scheduler.dispatch_frame(), 1);
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_run_for_interleaves_timers_and_frames() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&log);
        handle.set_timeout(ms(20), move || sink.borrow_mut().push("timer"));
        let sink = Rc::clone(&log);
        handle.request_frame(move |_| sink.borrow_mut().push("frame"));

        scheduler.run_for(ms(32), ms(16));
        assert_eq!(*log.borrow(), vec!["frame", "timer"]);
        assert_eq!(scheduler.frames_dispatched(), 2);
        assert_eq!(scheduler.now(), ms(32));
    }

    #[test]
    fn test_flush_timers() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        handle.set_timeout(ms(100), || {});
        handle.set_timeout(ms(300), || {});
        handle.request_frame(|_| {});

        assert_eq!(scheduler.next_due(), Some(ms(100)));
        assert_eq!(scheduler.flush_timers(10), 2);
        assert_eq!(scheduler.now(), ms(300));
        assert_eq!(scheduler.pending_frames(), 1);
    }

    #[test]
    fn test_handle_outlives_scheduler() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        drop(scheduler);

        let task = handle.set_timeout(ms(1), || {});
        assert!(!task.is_pending());
        assert!(!task.cancel());
        assert_eq!(handle.now(), Duration::ZERO);
    }

    #[test]
    fn test_cancel_from_inside_callback() {
        let scheduler = Scheduler::new();
        let handle = scheduler.handle();
        let fired = Rc::new(Cell::new(false));

        let flag = Rc::clone(&fired);
        let victim = handle.set_timeout(ms(20), move || flag.set(true));
        handle.set_timeout(ms(10), move || {
            victim.cancel();
        });

        scheduler.advance_by(ms(30));
        assert!(!fired.get());
    }
}
