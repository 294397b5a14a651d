//! Periodic metrics refresh, independent of any event loop.
//!
//! The driver calls [`RefreshScheduler::poll`] whenever it wakes up and acts on
//! the returned events; [`RefreshScheduler::next_deadline`] tells it when to
//! wake next. At most one refresh tick and one debounced interval change are
//! pending at any time.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    clock::Clock,
    settings::{MAX_REFRESH_INTERVAL_MS, MIN_REFRESH_INTERVAL_MS},
};

/// Quiet period before a dragged interval is committed.
pub const INTERVAL_DEBOUNCE: Duration = Duration::from_millis(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { due: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Take a fresh metrics snapshot.
    Refresh,
    /// The debounced interval settled; persist it.
    CommitInterval(u64),
}

#[derive(Debug, Clone, Copy)]
struct PendingInterval {
    interval_ms: u64,
    due: Instant,
}

pub struct RefreshScheduler {
    clock: Box<dyn Clock>,
    interval_ms: u64,
    enabled: bool,
    pending_tick: Option<Instant>,
    pending_interval: Option<PendingInterval>,
}

impl RefreshScheduler {
    /// Starts idle and disabled.
    pub fn new(clock: Box<dyn Clock>, interval_ms: u64) -> Self {
        Self {
            clock,
            interval_ms: clamp_ms(interval_ms),
            enabled: false,
            pending_tick: None,
            pending_interval: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.pending_tick {
            Some(due) => SchedulerState::Scheduled { due },
            None => SchedulerState::Idle,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn has_pending_interval(&self) -> bool {
        self.pending_interval.is_some()
    }

    /// Replaces any pending tick with one `interval_ms` from now.
    pub fn enable(&mut self, interval_ms: u64) {
        self.enabled = true;
        self.interval_ms = clamp_ms(interval_ms);
        let now = self.clock.now();
        self.schedule_from(now);
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        if self.pending_tick.take().is_some() {
            debug!(event = "scheduler.tick_cancelled");
        }
    }

    /// Debounced interval change, for continuous controls such as a slider.
    pub fn request_interval(&mut self, interval_ms: u64) {
        let due = self.clock.now() + INTERVAL_DEBOUNCE;
        self.pending_interval = Some(PendingInterval {
            interval_ms: clamp_ms(interval_ms),
            due,
        });
    }

    /// Immediate interval change. Drops any debounced request and returns the
    /// clamped value to persist.
    pub fn set_interval(&mut self, interval_ms: u64) -> u64 {
        self.pending_interval = None;
        self.interval_ms = clamp_ms(interval_ms);
        if self.enabled {
            let now = self.clock.now();
            self.schedule_from(now);
        }
        self.interval_ms
    }

    /// Earliest instant at which `poll` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let debounce = self.pending_interval.map(|pending| pending.due);
        match (self.pending_tick, debounce) {
            (Some(tick), Some(debounce)) => Some(tick.min(debounce)),
            (tick, debounce) => tick.or(debounce),
        }
    }

    /// Fire everything that is due. A settled interval is reported before a
    /// refresh and reschedules the tick, superseding one that was also due.
    pub fn poll(&mut self) -> Vec<SchedulerEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        if let Some(pending) = self.pending_interval.filter(|pending| pending.due <= now) {
            self.pending_interval = None;
            self.interval_ms = pending.interval_ms;
            events.push(SchedulerEvent::CommitInterval(pending.interval_ms));
            if self.enabled {
                self.schedule_from(now);
            }
        }

        if self.pending_tick.is_some_and(|due| due <= now) {
            self.pending_tick = None;
            events.push(SchedulerEvent::Refresh);
            if self.enabled {
                self.schedule_from(now);
            }
        }

        events
    }

    fn schedule_from(&mut self, now: Instant) {
        let due = now + Duration::from_millis(self.interval_ms);
        if self.pending_tick.replace(due).is_some() {
            debug!(event = "scheduler.tick_replaced", interval_ms = self.interval_ms);
        } else {
            debug!(event = "scheduler.tick_scheduled", interval_ms = self.interval_ms);
        }
    }
}

fn clamp_ms(interval_ms: u64) -> u64 {
    interval_ms.clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS)
}
