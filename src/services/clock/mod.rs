//! Injected source of "now" plus one-shot wake-ups.
//!
//! Every component that derives time-varying state receives a
//! [`SharedClock`] instead of reading the wall clock directly, so tests can
//! swap in a [`VirtualClock`] and advance time deterministically.
//!
//! Timers are plain callbacks. They never run on another thread: the wall
//! clock fires them from [`SystemClock::run_due`] / [`SystemClock::run`],
//! the virtual clock from [`VirtualClock::advance`]. Dropping the
//! [`CancelToken`] returned by [`Clock::schedule`] cancels the wake-up.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Duration, Utc};

use crate::utils::date::clamp_non_negative;

pub type TimerCallback = Box<dyn FnOnce()>;

/// Clock handle shared by engines, builders and selectors.
pub type SharedClock = Rc<dyn Clock>;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Runs `fire` once `after` has elapsed. Negative delays fire on the next
    /// pass of the timer loop.
    fn schedule(&self, after: Duration, fire: TimerCallback) -> CancelToken;
}

/// Ordering key: deadline first, then scheduling order for equal deadlines.
type TimerKey = (DateTime<Utc>, u64);

#[derive(Default)]
struct TimerQueue {
    next_seq: u64,
    pending: BTreeMap<TimerKey, TimerCallback>,
}

impl TimerQueue {
    fn insert(&mut self, deadline: DateTime<Utc>, fire: TimerCallback) -> TimerKey {
        let key = (deadline, self.next_seq);
        self.next_seq += 1;
        self.pending.insert(key, fire);
        key
    }

    fn remove(&mut self, key: &TimerKey) -> Option<TimerCallback> {
        self.pending.remove(key)
    }

    fn contains(&self, key: &TimerKey) -> bool {
        self.pending.contains_key(key)
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, TimerCallback)> {
        let key = *self.pending.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.pending.remove(&key).map(|fire| (key.0, fire))
    }
}

type SharedQueue = Rc<RefCell<TimerQueue>>;

fn enqueue(queue: &SharedQueue, deadline: DateTime<Utc>, fire: TimerCallback) -> CancelToken {
    let key = queue.borrow_mut().insert(deadline, fire);
    log::debug!("timer scheduled for {}", deadline);
    CancelToken {
        queue: Rc::downgrade(queue),
        key: Some(key),
    }
}

/// Ownership of one pending wake-up. Dropping the token cancels it.
#[must_use = "dropping a CancelToken cancels its timer"]
pub struct CancelToken {
    queue: Weak<RefCell<TimerQueue>>,
    key: Option<TimerKey>,
}

impl CancelToken {
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.key.map(|(deadline, _)| deadline)
    }

    /// True until the timer fires or is cancelled.
    pub fn is_pending(&self) -> bool {
        match (self.key, self.queue.upgrade()) {
            (Some(key), Some(queue)) => queue.borrow().contains(&key),
            _ => false,
        }
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        if let Some(queue) = self.queue.upgrade() {
            // The callback is dropped after the queue borrow ends; it may own
            // tokens of its own.
            let removed = queue.borrow_mut().remove(&key);
            drop(removed);
        }
    }
}

impl Drop for CancelToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("deadline", &self.deadline())
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Holds at most one wake-up for a single purpose (progress tick, terminal
/// transition, rebuild...). Arming the slot cancels whatever it held.
#[derive(Debug, Default)]
pub struct TimerSlot {
    token: Option<CancelToken>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, token: CancelToken) {
        self.token = Some(token);
    }

    pub fn cancel(&mut self) {
        self.token = None;
    }

    pub fn is_armed(&self) -> bool {
        self.token.as_ref().is_some_and(CancelToken::is_pending)
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.token
            .as_ref()
            .filter(|token| token.is_pending())
            .and_then(CancelToken::deadline)
    }
}

/// Test clock: time only moves through [`VirtualClock::advance`] and
/// [`VirtualClock::advance_to`], which fire due timers in deadline order.
pub struct VirtualClock {
    now: Cell<DateTime<Utc>>,
    queue: SharedQueue,
}

impl VirtualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
            queue: SharedQueue::default(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + clamp_non_negative(by);
        self.advance_to(target);
    }

    /// Moves time forward to `target`, firing every timer due on the way.
    /// Timers scheduled by a callback fire in the same pass when their
    /// deadline is not after `target`.
    pub fn advance_to(&self, target: DateTime<Utc>) {
        loop {
            let due = self.queue.borrow_mut().pop_due(target);
            let Some((deadline, fire)) = due else {
                break;
            };
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            fire();
        }
        if target > self.now.get() {
            self.now.set(target);
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.borrow().next_deadline()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn schedule(&self, after: Duration, fire: TimerCallback) -> CancelToken {
        let deadline = self.now.get() + clamp_non_negative(after);
        enqueue(&self.queue, deadline, fire)
    }
}

/// Wall clock. Deadlines are absolute UTC instants, so a wake-up that was
/// missed while the machine slept fires as soon as the loop runs again.
#[derive(Default)]
pub struct SystemClock {
    queue: SharedQueue,
}

impl SystemClock {
    /// Longest single sleep; the wall clock may jump (suspend, NTP).
    const MAX_SLEEP: std::time::Duration = std::time::Duration::from_secs(60);

    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every timer whose deadline has passed. Returns how many fired.
    pub fn run_due(&self) -> usize {
        let mut fired = 0;
        loop {
            let due = self.queue.borrow_mut().pop_due(Utc::now());
            let Some((_, fire)) = due else {
                break;
            };
            fire();
            fired += 1;
        }
        fired
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.borrow().next_deadline()
    }

    /// Drives the timer loop until no timer is pending.
    pub async fn run(&self) {
        loop {
            self.run_due();
            let Some(deadline) = self.next_deadline() else {
                log::debug!("system clock idle, no pending timers");
                return;
            };
            let wait = (deadline - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO)
                .min(Self::MAX_SLEEP);
            tokio::time::sleep(wait).await;
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn schedule(&self, after: Duration, fire: TimerCallback) -> CancelToken {
        let deadline = Utc::now() + clamp_non_negative(after);
        enqueue(&self.queue, deadline, fire)
    }
}
