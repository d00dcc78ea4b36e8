//! Periodic value push for notify-capable characteristics.
//!
//! A [`Subscription`] is a two state machine (Idle, Active) driven by ticks queued on a
//! [`Scheduler`]. Stopping only clears the active flag: a tick that was already queued
//! still fires once, sees the subscription idle and neither emits nor reschedules.

use super::path::AttributePath;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Handle of a queued tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Cooperative timer queue shared by every characteristic of one tree.
///
/// Nothing fires on its own: the event loop asks for due entries with
/// [`Scheduler::pop_due`] after [`Scheduler::sleep`] returns.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: BTreeMap<(Instant, TimerId), AttributePath>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Queues a tick for `path` to fire `after` from now.
    pub fn schedule(&mut self, path: &AttributePath, after: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert((Instant::now() + after, id), path.clone());
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, timer)| *timer == id).copied();
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Drops every queued tick.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest tick due at `now`, if any.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, AttributePath)> {
        let (deadline, id) = *self.timers.keys().next()?;
        if deadline > now {
            return None;
        }
        self.timers.remove(&(deadline, id)).map(|path| (id, path))
    }

    /// Removes every tick due at `now` in deadline order.
    ///
    /// Ticks queued while the returned batch is processed land in the next batch.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerId, AttributePath)> {
        let later = self.timers.split_off(&(now, TimerId(u64::MAX)));
        std::mem::replace(&mut self.timers, later)
            .into_iter()
            .map(|((_, id), path)| (id, path))
            .collect()
    }

    /// Waits until the earliest tick is due. Pending forever while the queue is empty.
    pub async fn sleep(&self) {
        match self.next_deadline() {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => futures::future::pending::<()>().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyState {
    #[default]
    Idle,
    Active,
}

/// Subscription state of one characteristic.
#[derive(Debug, Default)]
pub struct Subscription {
    state: NotifyState,
    pending: Option<TimerId>,
}

impl Subscription {
    pub fn state(&self) -> NotifyState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == NotifyState::Active
    }

    pub fn pending(&self) -> Option<TimerId> {
        self.pending
    }

    /// Idle -> Active. Returns `false` when already active.
    ///
    /// A tick still queued from an earlier subscription is replaced, so the first tick
    /// always lands a full interval after the start.
    pub fn start(
        &mut self,
        path: &AttributePath,
        interval: Duration,
        scheduler: &mut Scheduler,
    ) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = NotifyState::Active;
        if let Some(stray) = self.pending.take() {
            scheduler.cancel(stray);
        }
        self.pending = Some(scheduler.schedule(path, interval));
        true
    }

    /// Active -> Idle. Returns `false` when already idle.
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = NotifyState::Idle;
        true
    }

    /// Consumes the queued tick `id`. Returns whether the tick should sample and emit.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        self.pending = None;
        self.is_active()
    }

    /// Queues the next tick. Only called from within an active tick.
    pub fn reschedule(
        &mut self,
        path: &AttributePath,
        interval: Duration,
        scheduler: &mut Scheduler,
    ) {
        if self.is_active() && self.pending.is_none() {
            self.pending = Some(scheduler.schedule(path, interval));
        }
    }

    /// Returns to Idle and drops the queued tick.
    pub fn cancel(&mut self, scheduler: &mut Scheduler) {
        self.state = NotifyState::Idle;
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }
}
