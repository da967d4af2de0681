// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the synchronization loop.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! scraper, change detector and PiP surface emit. All method bodies default
//! to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Warnings are the error channel of periodic work: a failed host operation
//! inside `service` never surfaces as a `Result`, only as a
//! [`WarningEvent`].

use crate::detect::TriggerSource;
use crate::error::HostError;
use crate::scrape::{ArtworkSource, PlaySignals, TitleSource};
use crate::surface::PipState;
use crate::time::HostTime;
use crate::track::TrackInfo;
use crate::transport::TransportAction;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What an apply did to the artwork entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtworkChange {
    /// Same URL as before; nothing to do.
    Unchanged,
    /// A new load was started with this generation.
    Loading {
        /// Generation of the new entry.
        generation: u64,
    },
    /// The snapshot had no artwork and the link changed; entry cleared.
    Cleared,
    /// The snapshot had no artwork but the link did not change; entry kept.
    Kept,
}

/// Outcome of an artwork load completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtworkOutcome {
    /// Decoded and stored.
    Loaded,
    /// The load failed; the placeholder is drawn.
    Failed,
    /// The completion belonged to a superseded generation and was dropped.
    Stale,
}

/// Why a lifecycle event was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleCause {
    /// An open command started a PiP request.
    OpenRequested,
    /// An open command was ignored: PiP is live or a request is in flight.
    OpenIgnored,
    /// The browser granted the PiP window.
    Granted,
    /// A grant arrived after the request was abandoned.
    LateGrant,
    /// The PiP request failed.
    Failed,
    /// An explicit close command (or media-session stop).
    CloseRequested,
    /// The browser tore the PiP window down on its own.
    LeftPip,
    /// The page is unloading.
    Unload,
}

/// Outcome of a transport action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportOutcome {
    /// The control was pressed; state should be re-read at `settle_at`.
    Pressed {
        /// When the settle trigger fires.
        settle_at: HostTime,
    },
    /// The control does not exist on the page.
    Missing,
    /// The page was navigated to a stashed previous-track link instead.
    Navigated,
}

/// Why a frame was drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameReason {
    /// First frame after the PiP window was granted.
    Opened,
    /// An apply changed the title or play state.
    StateChanged,
    /// An artwork load completed or the artwork entry was cleared.
    Artwork,
    /// Render loop tick while playing.
    Loop,
}

/// Something went wrong but work continues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Warning<'a> {
    /// A transport control was missing.
    MissingControl(TransportAction),
    /// A host operation failed.
    Host(&'a HostError),
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after every extraction.
#[derive(Clone, Copy, Debug)]
pub struct ExtractEvent {
    /// Winning title source, or `None` when the document title was used.
    pub title_source: Option<TitleSource>,
    /// Winning artwork source, if any.
    pub artwork_source: Option<ArtworkSource>,
    /// Play signals that fired.
    pub signals: PlaySignals,
    /// Whether a track link was found.
    pub has_link: bool,
}

/// Emitted when the change detector publishes a new snapshot.
#[derive(Clone, Copy, Debug)]
pub struct PublishEvent<'a> {
    /// Host time of the extraction.
    pub at: HostTime,
    /// Which trigger armed the merge stage.
    pub source: TriggerSource,
    /// The published snapshot.
    pub info: &'a TrackInfo,
}

/// Emitted when an extraction matched the last published snapshot.
#[derive(Clone, Copy, Debug)]
pub struct SuppressedEvent {
    /// Host time of the extraction.
    pub at: HostTime,
    /// Which trigger armed the merge stage.
    pub source: TriggerSource,
}

/// Emitted when the surface applies a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ApplyEvent {
    /// Host time of the apply.
    pub at: HostTime,
    /// Whether the title changed.
    pub title_changed: bool,
    /// Whether the play state changed.
    pub playing_changed: bool,
    /// Artwork entry transition.
    pub artwork: ArtworkChange,
}

/// Emitted when an artwork load completes.
#[derive(Clone, Copy, Debug)]
pub struct ArtworkEvent {
    /// Host time of the completion.
    pub at: HostTime,
    /// Generation the completion belongs to.
    pub generation: u64,
    /// What happened.
    pub outcome: ArtworkOutcome,
}

/// Emitted on PiP lifecycle transitions (and ignored open requests).
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEvent {
    /// Host time of the transition.
    pub at: HostTime,
    /// State before.
    pub from: PipState,
    /// State after.
    pub to: PipState,
    /// What caused it.
    pub cause: LifecycleCause,
}

/// Emitted for every transport action.
#[derive(Clone, Copy, Debug)]
pub struct TransportEvent {
    /// Host time of the action.
    pub at: HostTime,
    /// The action.
    pub action: TransportAction,
    /// What happened.
    pub outcome: TransportOutcome,
}

/// Emitted after a frame is handed to the presenter.
#[derive(Clone, Copy, Debug)]
pub struct FrameEvent {
    /// Host time of the draw.
    pub at: HostTime,
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Why the frame was drawn.
    pub reason: FrameReason,
}

/// Emitted when an operation degrades.
#[derive(Clone, Copy, Debug)]
pub struct WarningEvent<'a> {
    /// Host time of the failure.
    pub at: HostTime,
    /// What went wrong.
    pub warning: Warning<'a>,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the synchronization loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after every extraction.
    fn on_extract(&mut self, e: &ExtractEvent) {
        _ = e;
    }

    /// Called when a snapshot is published.
    fn on_publish(&mut self, e: &PublishEvent<'_>) {
        _ = e;
    }

    /// Called when an extraction is suppressed as a duplicate.
    fn on_suppressed(&mut self, e: &SuppressedEvent) {
        _ = e;
    }

    /// Called when the surface applies a snapshot.
    fn on_apply(&mut self, e: &ApplyEvent) {
        _ = e;
    }

    /// Called when an artwork load completes.
    fn on_artwork(&mut self, e: &ArtworkEvent) {
        _ = e;
    }

    /// Called on PiP lifecycle transitions.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called for every transport action.
    fn on_transport(&mut self, e: &TransportEvent) {
        _ = e;
    }

    /// Called after a frame is presented.
    fn on_frame(&mut self, e: &FrameEvent) {
        _ = e;
    }

    /// Called when an operation degrades.
    fn on_warning(&mut self, e: &WarningEvent<'_>) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`ExtractEvent`].
    #[inline]
    pub fn extract(&mut self, e: &ExtractEvent) {
        emit!(self, on_extract, e);
    }

    /// Emits a [`PublishEvent`].
    #[inline]
    pub fn publish(&mut self, e: &PublishEvent<'_>) {
        emit!(self, on_publish, e);
    }

    /// Emits a [`SuppressedEvent`].
    #[inline]
    pub fn suppressed(&mut self, e: &SuppressedEvent) {
        emit!(self, on_suppressed, e);
    }

    /// Emits an [`ApplyEvent`].
    #[inline]
    pub fn apply(&mut self, e: &ApplyEvent) {
        emit!(self, on_apply, e);
    }

    /// Emits an [`ArtworkEvent`].
    #[inline]
    pub fn artwork(&mut self, e: &ArtworkEvent) {
        emit!(self, on_artwork, e);
    }

    /// Emits a [`LifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LifecycleEvent) {
        emit!(self, on_lifecycle, e);
    }

    /// Emits a [`TransportEvent`].
    #[inline]
    pub fn transport(&mut self, e: &TransportEvent) {
        emit!(self, on_transport, e);
    }

    /// Emits a [`FrameEvent`].
    #[inline]
    pub fn frame(&mut self, e: &FrameEvent) {
        emit!(self, on_frame, e);
    }

    /// Emits a [`WarningEvent`].
    #[inline]
    pub fn warning(&mut self, e: &WarningEvent<'_>) {
        emit!(self, on_warning, e);
    }

    /// Convenience for a host failure warning.
    #[inline]
    pub fn host_error(&mut self, at: HostTime, error: &HostError) {
        self.warning(&WarningEvent {
            at,
            warning: Warning::Host(error),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        frames: u32,
        warnings: u32,
    }

    impl TraceSink for CountingSink {
        fn on_frame(&mut self, _e: &FrameEvent) {
            self.frames += 1;
        }

        fn on_warning(&mut self, _e: &WarningEvent<'_>) {
            self.warnings += 1;
        }
    }

    fn frame() -> FrameEvent {
        FrameEvent {
            at: HostTime(10),
            frame_index: 1,
            reason: FrameReason::Loop,
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        sink.on_frame(&frame());
        sink.on_transport(&TransportEvent {
            at: HostTime(0),
            action: TransportAction::Next,
            outcome: TransportOutcome::Missing,
        });
    }

    #[test]
    fn tracer_none_is_silent() {
        let mut tracer = Tracer::none();
        tracer.frame(&frame());
        tracer.host_error(HostTime(0), &HostError::MissingElement("canvas"));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.frame(&frame());
            tracer.frame(&frame());
            tracer.host_error(HostTime(0), &HostError::MissingElement("canvas"));
            // Not overridden by the sink.
            tracer.apply(&ApplyEvent {
                at: HostTime(0),
                title_changed: true,
                playing_changed: false,
                artwork: ArtworkChange::Unchanged,
            });
        }
        assert_eq!(sink.frames, 2, "both frame events should reach the sink");
        assert_eq!(sink.warnings, 1, "the host error should reach the sink");
    }

    #[cfg(not(feature = "trace"))]
    #[test]
    fn tracer_discards_without_feature() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.frame(&frame());
        }
        assert_eq!(sink.frames, 0, "tracing is compiled out");
    }
}
