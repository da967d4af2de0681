// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline primitives driven by injected host time.
//!
//! None of these own a timer. Each exposes the instant it next wants to be
//! serviced; the caller folds those into one host timeout and hands the
//! current time back in.
//!
//! - [`Debounce`]: single slot, last write wins.
//! - [`Interval`]: fixed-period repeating deadline, started and stopped
//!   explicitly.
//! - [`OneShots`]: a small set of independent one-shot deadlines.

use alloc::vec::Vec;

use crate::time::{Duration, HostTime};

/// A single-slot debounce timer.
///
/// Scheduling while a value is pending replaces both the value and the
/// deadline, so N schedules inside the window fire once with the last value.
#[derive(Clone, Debug)]
pub struct Debounce<T> {
    slot: Option<(HostTime, T)>,
}

impl<T> Default for Debounce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debounce<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Arms the slot. Returns `true` if a pending value was replaced.
    pub fn schedule(&mut self, due: HostTime, value: T) -> bool {
        self.slot.replace((due, value)).is_some()
    }

    /// When the pending value fires, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<HostTime> {
        self.slot.as_ref().map(|(due, _)| *due)
    }

    /// Returns `true` if a value is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// The pending value, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.slot.as_ref().map(|(_, value)| value)
    }

    /// Takes the pending value if its deadline has passed.
    pub fn take_due(&mut self, now: HostTime) -> Option<T> {
        match self.slot {
            Some((due, _)) if due <= now => self.slot.take().map(|(_, value)| value),
            _ => None,
        }
    }

    /// Drops the pending value.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(_, value)| value)
    }
}

/// A repeating deadline with a fixed period.
#[derive(Clone, Copy, Debug)]
pub struct Interval {
    period: Duration,
    next: Option<HostTime>,
}

impl Interval {
    /// Creates a stopped interval.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// The period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Starts firing at `first`, then every period. Restarting a running
    /// interval moves its phase.
    pub fn start_at(&mut self, first: HostTime) {
        self.next = Some(first);
    }

    /// Stops the interval.
    pub fn stop(&mut self) {
        self.next = None;
    }

    /// Returns `true` while started.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// The next firing instant.
    #[must_use]
    pub const fn deadline(&self) -> Option<HostTime> {
        self.next
    }

    /// Fires if due and advances to the next period.
    ///
    /// A host that slept through several periods sees one firing, not a
    /// burst; the next deadline is re-anchored on `now`.
    pub fn fire_due(&mut self, now: HostTime) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        if next > now {
            return false;
        }
        let mut following = next + self.period;
        if following <= now {
            following = now + self.period;
        }
        self.next = Some(following);
        true
    }
}

/// Independent one-shot deadlines.
#[derive(Clone, Debug, Default)]
pub struct OneShots {
    deadlines: Vec<HostTime>,
}

impl OneShots {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deadlines: Vec::new(),
        }
    }

    /// Adds a deadline.
    pub fn schedule(&mut self, at: HostTime) {
        self.deadlines.push(at);
    }

    /// The earliest pending deadline.
    #[must_use]
    pub fn earliest(&self) -> Option<HostTime> {
        self.deadlines.iter().copied().min()
    }

    /// Number of pending deadlines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Removes every deadline at or before `now`; returns how many fired.
    pub fn take_due(&mut self, now: HostTime) -> usize {
        let before = self.deadlines.len();
        self.deadlines.retain(|&at| at > now);
        before - self.deadlines.len()
    }

    /// Drops every pending deadline.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
