// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change detection: three producers, one merge stage.
//!
//! ```text
//!   mutation batches ──(200 ms)──┐
//!   poll interval    ──(0 ms)────┼──► Debounce<TriggerSource> ──► extract
//!   settle one-shots ──(0 ms)────┘                                  │
//!                                         publish iff triple differs ◄┘
//! ```
//!
//! Every trigger writes the single merge slot; the last write decides both
//! the deadline and the reported source. Poll and settle triggers use a zero
//! debounce, so a steady stream of relevant mutations (each pushing the
//! 200 ms deadline out) cannot starve extraction while polling runs.
//!
//! The merge stage moves `Idle → Pending → Settled → Idle`. `Settled` is
//! held between [`ChangeDetector::poll_due`] and [`ChangeDetector::settle`];
//! [`ChangeDetector::service`] runs both.

use crate::debounce::{Debounce, Interval, OneShots};
use crate::mutation::{MutationRecord, is_relevant_batch};
use crate::scrape::TrackInfoSource;
use crate::time::{Duration, HostTime};
use crate::trace::{PublishEvent, SuppressedEvent, Tracer};
use crate::track::TrackInfo;

/// Which producer armed the merge stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    /// The start-up extraction.
    Initial,
    /// A relevant mutation batch.
    Mutation,
    /// A poll interval tick.
    Poll,
    /// A settle one-shot after a transport action or PiP open.
    Settle,
    /// A class change on the play control.
    PlayControl,
}

impl TriggerSource {
    /// Short label for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Mutation => "mutation",
            Self::Poll => "poll",
            Self::Settle => "settle",
            Self::PlayControl => "play-control",
        }
    }
}

/// Timing for the change detector.
#[derive(Clone, Copy, Debug)]
pub struct DetectorConfig {
    /// Debounce for relevant mutation batches.
    pub mutation_debounce: Duration,
    /// Debounce for poll ticks.
    pub poll_debounce: Duration,
    /// Debounce for settle one-shots and play-control changes.
    pub settle_debounce: Duration,
    /// Poll period while PiP is open.
    pub poll_interval: Duration,
    /// Delay before the start-up extraction.
    pub initial_delay: Duration,
}

impl DetectorConfig {
    /// Timings observed on the supported site.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            mutation_debounce: Duration::from_millis(200),
            poll_debounce: Duration::ZERO,
            settle_debounce: Duration::ZERO,
            poll_interval: Duration::from_millis(300),
            initial_delay: Duration::from_millis(1_200),
        }
    }

    /// Debounce applied to triggers from `source`.
    #[must_use]
    pub const fn debounce_for(&self, source: TriggerSource) -> Duration {
        match source {
            TriggerSource::Mutation => self.mutation_debounce,
            TriggerSource::Poll => self.poll_debounce,
            TriggerSource::Initial | TriggerSource::Settle | TriggerSource::PlayControl => {
                self.settle_debounce
            }
        }
    }
}

/// Merge stage state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeState {
    /// Nothing armed.
    Idle,
    /// Armed; extraction at `due`.
    Pending {
        /// When the merge stage fires.
        due: HostTime,
        /// The most recent trigger.
        source: TriggerSource,
    },
    /// Quiet period elapsed; an extraction is owed.
    Settled {
        /// The trigger that fired.
        source: TriggerSource,
    },
}

/// Fuses mutation, poll and settle triggers into deduplicated publishes.
#[derive(Debug)]
pub struct ChangeDetector {
    config: DetectorConfig,
    merge: Debounce<TriggerSource>,
    settled: Option<TriggerSource>,
    poll: Interval,
    settles: OneShots,
    last_published: Option<TrackInfo>,
}

impl ChangeDetector {
    /// Creates an idle detector.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            merge: Debounce::new(),
            settled: None,
            poll: Interval::new(config.poll_interval),
            settles: OneShots::new(),
            last_published: None,
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Schedules the start-up extraction.
    pub fn start(&mut self, now: HostTime) {
        self.merge
            .schedule(now + self.config.initial_delay, TriggerSource::Initial);
    }

    /// Current merge stage state.
    #[must_use]
    pub fn state(&self) -> MergeState {
        if let Some(source) = self.settled {
            return MergeState::Settled { source };
        }
        match (self.merge.deadline(), self.merge.peek()) {
            (Some(due), Some(&source)) => MergeState::Pending { due, source },
            _ => MergeState::Idle,
        }
    }

    /// Arms the merge stage with the debounce for `source`.
    pub fn trigger(&mut self, source: TriggerSource, now: HostTime) {
        let due = now + self.config.debounce_for(source);
        self.merge.schedule(due, source);
    }

    /// Feeds a mutation batch. Returns `true` if it was relevant.
    pub fn on_mutations(&mut self, batch: &[MutationRecord], now: HostTime) -> bool {
        let relevant = is_relevant_batch(batch);
        if relevant {
            self.trigger(TriggerSource::Mutation, now);
        }
        relevant
    }

    /// Feeds a batch from the play-control observer. Only `class` changes
    /// count.
    pub fn on_play_control(&mut self, batch: &[MutationRecord], now: HostTime) -> bool {
        let changed = batch.iter().any(MutationRecord::is_class_change);
        if changed {
            self.trigger(TriggerSource::PlayControl, now);
        }
        changed
    }

    /// Starts polling. The first poll fires immediately.
    pub fn start_polling(&mut self, now: HostTime) {
        self.poll.start_at(now);
    }

    /// Stops polling.
    pub fn stop_polling(&mut self) {
        self.poll.stop();
    }

    /// Returns `true` while polling.
    #[must_use]
    pub const fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    /// Schedules a settle trigger at `at`.
    pub fn schedule_settle(&mut self, at: HostTime) {
        self.settles.schedule(at);
    }

    /// Number of pending settle one-shots.
    #[must_use]
    pub fn pending_settles(&self) -> usize {
        self.settles.len()
    }

    /// The last snapshot published, if any.
    #[must_use]
    pub fn last_published(&self) -> Option<&TrackInfo> {
        self.last_published.as_ref()
    }

    /// Records `info` as the published baseline without tracing a publish.
    ///
    /// For snapshots applied outside the merge stage, so later reads compare
    /// against what the surface shows.
    pub fn record_published(&mut self, info: &TrackInfo) {
        self.last_published = Some(info.clone());
    }

    /// The earliest instant at which [`service`](Self::service) has work.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        [
            self.merge.deadline(),
            self.poll.deadline(),
            self.settles.earliest(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fires due producers and, if the merge slot is due, moves to
    /// [`MergeState::Settled`]. Returns the settled trigger.
    pub fn poll_due(&mut self, now: HostTime) -> Option<TriggerSource> {
        if self.poll.fire_due(now) {
            self.trigger(TriggerSource::Poll, now);
        }
        if self.settles.take_due(now) > 0 {
            self.trigger(TriggerSource::Settle, now);
        }
        if let Some(source) = self.merge.take_due(now) {
            self.settled = Some(source);
        }
        self.settled
    }

    /// Completes a settled merge: extracts, compares and publishes on
    /// difference. Returns to [`MergeState::Idle`] unless re-armed.
    pub fn settle(
        &mut self,
        now: HostTime,
        scraper: &impl TrackInfoSource,
        tracer: &mut Tracer<'_>,
    ) -> Option<TrackInfo> {
        let source = self.settled.take()?;
        let info = scraper.extract(tracer);
        let unchanged = self
            .last_published
            .as_ref()
            .is_some_and(|last| last.snapshot_eq(&info));
        if unchanged {
            tracer.suppressed(&SuppressedEvent { at: now, source });
            return None;
        }
        tracer.publish(&PublishEvent {
            at: now,
            source,
            info: &info,
        });
        self.last_published = Some(info.clone());
        Some(info)
    }

    /// Runs [`poll_due`](Self::poll_due) then [`settle`](Self::settle).
    pub fn service(
        &mut self,
        now: HostTime,
        scraper: &impl TrackInfoSource,
        tracer: &mut Tracer<'_>,
    ) -> Option<TrackInfo> {
        self.poll_due(now)?;
        self.settle(now, scraper, tracer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use crate::mutation::TouchedNode;

    /// Returns whatever snapshot is currently staged and counts reads.
    struct Staged {
        info: RefCell<TrackInfo>,
        reads: Cell<u32>,
    }

    impl Staged {
        fn new(title: &str, playing: bool) -> Self {
            Self {
                info: RefCell::new(TrackInfo::new(title, None, playing, None)),
                reads: Cell::new(0),
            }
        }

        fn set(&self, title: &str, playing: bool, href: Option<&str>) {
            *self.info.borrow_mut() = TrackInfo::new(title, None, playing, href.map(String::from));
        }
    }

    impl TrackInfoSource for Staged {
        fn extract(&self, _tracer: &mut Tracer<'_>) -> TrackInfo {
            self.reads.set(self.reads.get() + 1);
            self.info.borrow().clone()
        }
    }

    fn ms(n: u64) -> HostTime {
        HostTime::from_millis(n)
    }

    fn relevant() -> [MutationRecord; 1] {
        [MutationRecord::attribute("class")]
    }

    #[test]
    fn initial_extraction_after_delay() {
        let page = Staged::new("Song", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.start(ms(0));
        assert_eq!(d.next_deadline(), Some(ms(1_200)), "start-up read is delayed");
        assert_eq!(d.service(ms(1_199), &page, &mut Tracer::none()), None, "not before the delay");
        let first = d.service(ms(1_200), &page, &mut Tracer::none());
        assert_eq!(first.as_ref().map(TrackInfo::title), Some("Song"), "start-up read publishes");
        assert_eq!(d.state(), MergeState::Idle, "idle after publishing");
    }

    #[test]
    fn burst_of_mutations_extracts_once_with_last_state() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());

        for (t, title) in [(0, "B"), (50, "C"), (120, "D")] {
            page.set(title, false, None);
            assert!(d.on_mutations(&relevant(), ms(t)), "relevant batch");
        }
        assert_eq!(
            d.state(),
            MergeState::Pending {
                due: ms(320),
                source: TriggerSource::Mutation
            },
            "last mutation sets the deadline"
        );
        assert_eq!(d.service(ms(319), &page, &mut Tracer::none()), None, "still debouncing");
        let published = d.service(ms(320), &page, &mut Tracer::none());
        assert_eq!(published.as_ref().map(TrackInfo::title), Some("D"), "last staged state");
        assert_eq!(page.reads.get(), 1, "one extraction for the whole burst");
    }

    #[test]
    fn irrelevant_mutations_do_not_arm() {
        let mut d = ChangeDetector::new(DetectorConfig::web());
        let batch = [
            MutationRecord::attribute("data-x"),
            MutationRecord::ChildList {
                nodes: vec![TouchedNode::Other],
            },
        ];
        assert!(!d.on_mutations(&batch, ms(0)), "nothing relevant");
        assert_eq!(d.state(), MergeState::Idle, "still idle");
        assert_eq!(d.next_deadline(), None, "nothing scheduled");
    }

    #[test]
    fn publishes_only_on_triple_difference() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        let mut publishes = 0;
        let mut run = |d: &mut ChangeDetector, t: u64| {
            d.trigger(TriggerSource::Settle, ms(t));
            if d.service(ms(t), &page, &mut Tracer::none()).is_some() {
                publishes += 1;
            }
        };

        run(&mut d, 0);
        run(&mut d, 10);
        page.set("A", false, Some("/other"));
        run(&mut d, 20);
        page.set("A", true, Some("/other"));
        run(&mut d, 30);
        assert_eq!(publishes, 2, "href-only change is not a publish");
    }

    #[test]
    fn poll_is_not_starved_by_mutation_churn() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.start_polling(ms(0));
        assert!(d.service(ms(0), &page, &mut Tracer::none()).is_some(), "first poll publishes");

        page.set("B", false, None);
        // A mutation every 100 ms keeps pushing the 200 ms debounce out.
        let mut seen = None;
        for t in (100..=300).step_by(100) {
            d.on_mutations(&relevant(), ms(t));
            if let Some(info) = d.service(ms(t), &page, &mut Tracer::none()) {
                seen = Some((t, info));
            }
        }
        let (t, info) = seen.expect("poll tick should extract");
        assert_eq!(t, 300, "first poll tick after start");
        assert_eq!(info.title(), "B", "poll saw the change");
    }

    #[test]
    fn recorded_baseline_is_compared_against() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.trigger(TriggerSource::Settle, ms(0));
        assert!(d.service(ms(0), &page, &mut Tracer::none()).is_some(), "first publish");

        page.set("A", true, None);
        d.record_published(&TrackInfo::new("A", None, true, None));
        assert_eq!(
            d.last_published().map(TrackInfo::is_playing),
            Some(true),
            "baseline replaced"
        );

        page.set("A", false, None);
        d.trigger(TriggerSource::Mutation, ms(10));
        let back = d.service(ms(210), &page, &mut Tracer::none());
        assert_eq!(
            back.as_ref().map(TrackInfo::is_playing),
            Some(false),
            "return to the earlier state is published"
        );
    }

    #[test]
    fn settle_one_shots_trigger_extraction() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.schedule_settle(ms(800));
        assert_eq!(d.next_deadline(), Some(ms(800)), "settle scheduled");
        assert_eq!(d.service(ms(799), &page, &mut Tracer::none()), None, "not before the settle");
        assert!(d.service(ms(800), &page, &mut Tracer::none()).is_some(), "settle publishes");
        assert_eq!(d.pending_settles(), 0, "one-shot consumed");
    }

    #[test]
    fn play_control_only_reacts_to_class() {
        let mut d = ChangeDetector::new(DetectorConfig::web());
        assert!(
            !d.on_play_control(&[MutationRecord::attribute("title")], ms(0)),
            "title changes are ignored"
        );
        assert!(
            d.on_play_control(&[MutationRecord::attribute("class")], ms(0)),
            "class changes count"
        );
        assert!(
            matches!(
                d.state(),
                MergeState::Pending {
                    source: TriggerSource::PlayControl,
                    ..
                }
            ),
            "armed by the play control"
        );
    }

    #[test]
    fn settled_state_is_observable() {
        let page = Staged::new("A", false);
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.trigger(TriggerSource::Settle, ms(5));
        assert_eq!(d.poll_due(ms(5)), Some(TriggerSource::Settle), "settle is due");
        assert_eq!(
            d.state(),
            MergeState::Settled {
                source: TriggerSource::Settle
            },
            "held until settled"
        );
        assert!(d.settle(ms(5), &page, &mut Tracer::none()).is_some(), "settle publishes");
        assert_eq!(d.state(), MergeState::Idle, "back to idle");
    }

    #[test]
    fn stop_polling_clears_deadline() {
        let mut d = ChangeDetector::new(DetectorConfig::web());
        d.start_polling(ms(0));
        assert!(d.is_polling(), "polling");
        d.stop_polling();
        assert!(!d.is_polling(), "stopped");
        assert_eq!(d.next_deadline(), None, "nothing scheduled");
    }
}
