// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Borrowed payloads are stored owned: a publish keeps its whole
//! [`TrackInfo`], and a host-error warning keeps only its message.

use nowpip_core::detect::TriggerSource;
use nowpip_core::scrape::{ArtworkSource, PlaySignal, PlaySignals, TitleSource};
use nowpip_core::surface::PipState;
use nowpip_core::time::HostTime;
use nowpip_core::trace::{
    ApplyEvent, ArtworkChange, ArtworkEvent, ArtworkOutcome, ExtractEvent, FrameEvent,
    FrameReason, LifecycleCause, LifecycleEvent, PublishEvent, SuppressedEvent, TraceSink,
    TransportEvent, TransportOutcome, Warning, WarningEvent,
};
use nowpip_core::track::TrackInfo;
use nowpip_core::transport::TransportAction;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_EXTRACT: u8 = 1;
const TAG_PUBLISH: u8 = 2;
const TAG_SUPPRESSED: u8 = 3;
const TAG_APPLY: u8 = 4;
const TAG_ARTWORK: u8 = 5;
const TAG_LIFECYCLE: u8 = 6;
const TAG_TRANSPORT: u8 = 7;
const TAG_FRAME: u8 = 8;
const TAG_WARNING: u8 = 9;

// ---------------------------------------------------------------------------
// Enum codes
// ---------------------------------------------------------------------------

fn trigger_code(source: TriggerSource) -> u8 {
    match source {
        TriggerSource::Initial => 0,
        TriggerSource::Mutation => 1,
        TriggerSource::Poll => 2,
        TriggerSource::Settle => 3,
        TriggerSource::PlayControl => 4,
    }
}

fn trigger_from(code: u8) -> Option<TriggerSource> {
    Some(match code {
        0 => TriggerSource::Initial,
        1 => TriggerSource::Mutation,
        2 => TriggerSource::Poll,
        3 => TriggerSource::Settle,
        4 => TriggerSource::PlayControl,
        _ => return None,
    })
}

fn state_code(state: PipState) -> u8 {
    match state {
        PipState::Closed => 0,
        PipState::Opening => 1,
        PipState::Open => 2,
    }
}

fn state_from(code: u8) -> Option<PipState> {
    Some(match code {
        0 => PipState::Closed,
        1 => PipState::Opening,
        2 => PipState::Open,
        _ => return None,
    })
}

const CAUSES: [LifecycleCause; 8] = [
    LifecycleCause::OpenRequested,
    LifecycleCause::OpenIgnored,
    LifecycleCause::Granted,
    LifecycleCause::LateGrant,
    LifecycleCause::Failed,
    LifecycleCause::CloseRequested,
    LifecycleCause::LeftPip,
    LifecycleCause::Unload,
];

const ACTIONS: [TransportAction; 3] = [
    TransportAction::Previous,
    TransportAction::TogglePlay,
    TransportAction::Next,
];

const REASONS: [FrameReason; 4] = [
    FrameReason::Opened,
    FrameReason::StateChanged,
    FrameReason::Artwork,
    FrameReason::Loop,
];

const OUTCOMES: [ArtworkOutcome; 3] = [
    ArtworkOutcome::Loaded,
    ArtworkOutcome::Failed,
    ArtworkOutcome::Stale,
];

/// Position of `value` in `table`, as a one-byte code.
fn code_of<T: PartialEq>(table: &[T], value: &T) -> u8 {
    let index = table.iter().position(|v| v == value).unwrap_or(0);
    u8::try_from(index).unwrap_or(0)
}

fn from_code<T: Copy>(table: &[T], code: u8) -> Option<T> {
    table.get(usize::from(code)).copied()
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.micros());
    }

    fn write_str(&mut self, s: &str) {
        let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(&s.as_bytes()[..len as usize]);
    }

    fn write_option_str(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                self.write_u8(1);
                self.write_str(s);
            }
            None => self.write_u8(0),
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_extract(&mut self, e: &ExtractEvent) {
        self.write_u8(TAG_EXTRACT);
        self.write_u8(e.title_source.map_or(0, |s| 1 + code_of(&TitleSource::CHAIN, &s)));
        self.write_u8(
            e.artwork_source
                .map_or(0, |s| 1 + code_of(&ArtworkSource::CHAIN, &s)),
        );
        let mut bits = 0_u8;
        for signal in e.signals.iter() {
            bits |= 1 << code_of(&PlaySignal::ALL, &signal);
        }
        self.write_u8(bits);
        self.write_bool(e.has_link);
    }

    fn on_publish(&mut self, e: &PublishEvent<'_>) {
        self.write_u8(TAG_PUBLISH);
        self.write_time(e.at);
        self.write_u8(trigger_code(e.source));
        self.write_str(e.info.title());
        self.write_option_str(e.info.artwork_url());
        self.write_bool(e.info.is_playing());
        self.write_option_str(e.info.href());
    }

    fn on_suppressed(&mut self, e: &SuppressedEvent) {
        self.write_u8(TAG_SUPPRESSED);
        self.write_time(e.at);
        self.write_u8(trigger_code(e.source));
    }

    fn on_apply(&mut self, e: &ApplyEvent) {
        self.write_u8(TAG_APPLY);
        self.write_time(e.at);
        self.write_bool(e.title_changed);
        self.write_bool(e.playing_changed);
        let (code, generation) = match e.artwork {
            ArtworkChange::Unchanged => (0, 0),
            ArtworkChange::Loading { generation } => (1, generation),
            ArtworkChange::Cleared => (2, 0),
            ArtworkChange::Kept => (3, 0),
        };
        self.write_u8(code);
        self.write_u64(generation);
    }

    fn on_artwork(&mut self, e: &ArtworkEvent) {
        self.write_u8(TAG_ARTWORK);
        self.write_time(e.at);
        self.write_u64(e.generation);
        self.write_u8(code_of(&OUTCOMES, &e.outcome));
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_time(e.at);
        self.write_u8(state_code(e.from));
        self.write_u8(state_code(e.to));
        self.write_u8(code_of(&CAUSES, &e.cause));
    }

    fn on_transport(&mut self, e: &TransportEvent) {
        self.write_u8(TAG_TRANSPORT);
        self.write_time(e.at);
        self.write_u8(code_of(&ACTIONS, &e.action));
        let (code, settle_at) = match e.outcome {
            TransportOutcome::Pressed { settle_at } => (0, settle_at.micros()),
            TransportOutcome::Missing => (1, 0),
            TransportOutcome::Navigated => (2, 0),
        };
        self.write_u8(code);
        self.write_u64(settle_at);
    }

    fn on_frame(&mut self, e: &FrameEvent) {
        self.write_u8(TAG_FRAME);
        self.write_time(e.at);
        self.write_u64(e.frame_index);
        self.write_u8(code_of(&REASONS, &e.reason));
    }

    fn on_warning(&mut self, e: &WarningEvent<'_>) {
        self.write_u8(TAG_WARNING);
        self.write_time(e.at);
        match e.warning {
            Warning::MissingControl(action) => {
                self.write_u8(0);
                self.write_u8(code_of(&ACTIONS, &action));
            }
            Warning::Host(error) => {
                self.write_u8(1);
                self.write_str(&error.to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A recorded warning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedWarning {
    /// A transport control was not found.
    MissingControl(TransportAction),
    /// A host operation failed; the error's display text.
    Host(String),
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`ExtractEvent`].
    Extract(ExtractEvent),
    /// A [`PublishEvent`] with its snapshot.
    Publish {
        /// When it was published.
        at: HostTime,
        /// What triggered the extraction.
        source: TriggerSource,
        /// The published snapshot.
        info: TrackInfo,
    },
    /// A [`SuppressedEvent`].
    Suppressed(SuppressedEvent),
    /// An [`ApplyEvent`].
    Apply(ApplyEvent),
    /// An [`ArtworkEvent`].
    Artwork(ArtworkEvent),
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// A [`TransportEvent`].
    Transport(TransportEvent),
    /// A [`FrameEvent`].
    Frame(FrameEvent),
    /// A [`WarningEvent`].
    Warning {
        /// When it was raised.
        at: HostTime,
        /// What went wrong.
        warning: RecordedWarning,
    },
}

impl RecordedEvent {
    /// The event's timestamp. Extractions carry none.
    #[must_use]
    pub fn at(&self) -> Option<HostTime> {
        match self {
            Self::Extract(_) => None,
            Self::Publish { at, .. } | Self::Warning { at, .. } => Some(*at),
            Self::Suppressed(e) => Some(e.at),
            Self::Apply(e) => Some(e.at),
            Self::Artwork(e) => Some(e.at),
            Self::Lifecycle(e) => Some(e.at),
            Self::Transport(e) => Some(e.at),
            Self::Frame(e) => Some(e.at),
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_string(&mut self) -> Option<String> {
        let len = u32::from_le_bytes(self.take(4)?.try_into().ok()?);
        let bytes = self.take(usize::try_from(len).ok()?)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn read_option_string(&mut self) -> Option<Option<String>> {
        match self.read_u8()? {
            0 => Some(None),
            _ => self.read_string().map(Some),
        }
    }

    fn decode_extract(&mut self) -> Option<RecordedEvent> {
        let title = self.read_u8()?;
        let artwork = self.read_u8()?;
        let bits = self.read_u8()?;
        let has_link = self.read_bool()?;
        let mut signals = PlaySignals::NONE;
        for (i, signal) in PlaySignal::ALL.into_iter().enumerate() {
            if bits & (1 << i) != 0 {
                signals.insert(signal);
            }
        }
        Some(RecordedEvent::Extract(ExtractEvent {
            title_source: title
                .checked_sub(1)
                .and_then(|c| from_code(&TitleSource::CHAIN, c)),
            artwork_source: artwork
                .checked_sub(1)
                .and_then(|c| from_code(&ArtworkSource::CHAIN, c)),
            signals,
            has_link,
        }))
    }

    fn decode_publish(&mut self) -> Option<RecordedEvent> {
        let at = self.read_time()?;
        let source = trigger_from(self.read_u8()?)?;
        let title = self.read_string()?;
        let artwork = self.read_option_string()?;
        let playing = self.read_bool()?;
        let href = self.read_option_string()?;
        Some(RecordedEvent::Publish {
            at,
            source,
            info: TrackInfo::new(title, artwork, playing, href),
        })
    }

    fn decode_suppressed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Suppressed(SuppressedEvent {
            at: self.read_time()?,
            source: trigger_from(self.read_u8()?)?,
        }))
    }

    fn decode_apply(&mut self) -> Option<RecordedEvent> {
        let at = self.read_time()?;
        let title_changed = self.read_bool()?;
        let playing_changed = self.read_bool()?;
        let code = self.read_u8()?;
        let generation = self.read_u64()?;
        let artwork = match code {
            0 => ArtworkChange::Unchanged,
            1 => ArtworkChange::Loading { generation },
            2 => ArtworkChange::Cleared,
            _ => ArtworkChange::Kept,
        };
        Some(RecordedEvent::Apply(ApplyEvent {
            at,
            title_changed,
            playing_changed,
            artwork,
        }))
    }

    fn decode_artwork(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Artwork(ArtworkEvent {
            at: self.read_time()?,
            generation: self.read_u64()?,
            outcome: from_code(&OUTCOMES, self.read_u8()?)?,
        }))
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LifecycleEvent {
            at: self.read_time()?,
            from: state_from(self.read_u8()?)?,
            to: state_from(self.read_u8()?)?,
            cause: from_code(&CAUSES, self.read_u8()?)?,
        }))
    }

    fn decode_transport(&mut self) -> Option<RecordedEvent> {
        let at = self.read_time()?;
        let action = from_code(&ACTIONS, self.read_u8()?)?;
        let code = self.read_u8()?;
        let settle_at = self.read_time()?;
        let outcome = match code {
            0 => TransportOutcome::Pressed { settle_at },
            1 => TransportOutcome::Missing,
            _ => TransportOutcome::Navigated,
        };
        Some(RecordedEvent::Transport(TransportEvent {
            at,
            action,
            outcome,
        }))
    }

    fn decode_frame(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Frame(FrameEvent {
            at: self.read_time()?,
            frame_index: self.read_u64()?,
            reason: from_code(&REASONS, self.read_u8()?)?,
        }))
    }

    fn decode_warning(&mut self) -> Option<RecordedEvent> {
        let at = self.read_time()?;
        let warning = match self.read_u8()? {
            0 => RecordedWarning::MissingControl(from_code(&ACTIONS, self.read_u8()?)?),
            _ => RecordedWarning::Host(self.read_string()?),
        };
        Some(RecordedEvent::Warning { at, warning })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_EXTRACT => self.decode_extract(),
            TAG_PUBLISH => self.decode_publish(),
            TAG_SUPPRESSED => self.decode_suppressed(),
            TAG_APPLY => self.decode_apply(),
            TAG_ARTWORK => self.decode_artwork(),
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_TRANSPORT => self.decode_transport(),
            TAG_FRAME => self.decode_frame(),
            TAG_WARNING => self.decode_warning(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nowpip_core::error::{HostError, Operation};

    fn song_a() -> TrackInfo {
        TrackInfo::new(
            "Song A",
            Some("https://i1.sndcdn.com/a-t500x500.jpg".to_string()),
            false,
            Some("/artist/song-a".to_string()),
        )
    }

    #[test]
    fn publish_keeps_the_whole_snapshot() {
        let mut rec = RecorderSink::new();
        let info = song_a();
        rec.on_publish(&PublishEvent {
            at: HostTime(1_200_000),
            source: TriggerSource::Initial,
            info: &info,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1, "one event");
        match &events[0] {
            RecordedEvent::Publish {
                at,
                source,
                info: decoded,
            } => {
                assert_eq!(*at, HostTime(1_200_000), "publish time");
                assert_eq!(*source, TriggerSource::Initial, "trigger source");
                assert_eq!(decoded, &info, "whole snapshot");
            }
            other => panic!("expected Publish, got {other:?}"),
        }
    }

    #[test]
    fn extract_keeps_sources_and_signals() {
        let mut rec = RecorderSink::new();
        let mut signals = PlaySignals::NONE;
        signals.insert(PlaySignal::PauseTooltip);
        signals.insert(PlaySignal::PlayingStateClass);
        rec.on_extract(&ExtractEvent {
            title_source: Some(TitleSource::FullPage),
            artwork_source: None,
            signals,
            has_link: true,
        });

        match decode(rec.as_bytes()).next() {
            Some(RecordedEvent::Extract(e)) => {
                assert_eq!(e.title_source, Some(TitleSource::FullPage), "title source");
                assert_eq!(e.artwork_source, None, "no artwork source");
                assert!(e.signals.contains(PlaySignal::PauseTooltip), "tooltip signal");
                assert!(e.signals.contains(PlaySignal::PlayingStateClass), "class signal");
                assert!(!e.signals.contains(PlaySignal::PauseLabel), "label signal absent");
                assert!(e.has_link, "link flag");
            }
            other => panic!("expected Extract, got {other:?}"),
        }
    }

    #[test]
    fn warnings_store_the_error_text() {
        let mut rec = RecorderSink::new();
        let error = HostError::rejected(Operation::RequestPip, "NotAllowedError");
        rec.on_warning(&WarningEvent {
            at: HostTime(5),
            warning: Warning::Host(&error),
        });
        rec.on_warning(&WarningEvent {
            at: HostTime(6),
            warning: Warning::MissingControl(TransportAction::Next),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2, "two warnings");
        match &events[0] {
            RecordedEvent::Warning {
                warning: RecordedWarning::Host(text),
                ..
            } => assert_eq!(text, &error.to_string(), "display text stored"),
            other => panic!("expected host warning, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::Warning { at, warning } => {
                assert_eq!(*at, HostTime(6), "warning time");
                assert_eq!(
                    *warning,
                    RecordedWarning::MissingControl(TransportAction::Next),
                    "missing control action"
                );
            }
            other => panic!("expected control warning, got {other:?}"),
        }
    }

    #[test]
    fn mixed_sequence_preserves_order_and_payloads() {
        let mut rec = RecorderSink::new();
        rec.on_apply(&ApplyEvent {
            at: HostTime(10),
            title_changed: true,
            playing_changed: false,
            artwork: ArtworkChange::Loading { generation: 3 },
        });
        rec.on_lifecycle(&LifecycleEvent {
            at: HostTime(20),
            from: PipState::Opening,
            to: PipState::Open,
            cause: LifecycleCause::Granted,
        });
        rec.on_transport(&TransportEvent {
            at: HostTime(30),
            action: TransportAction::TogglePlay,
            outcome: TransportOutcome::Pressed {
                settle_at: HostTime(530),
            },
        });
        rec.on_frame(&FrameEvent {
            at: HostTime(40),
            frame_index: 2,
            reason: FrameReason::Loop,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4, "four events");
        assert!(
            matches!(
                events[0],
                RecordedEvent::Apply(ApplyEvent {
                    artwork: ArtworkChange::Loading { generation: 3 },
                    title_changed: true,
                    ..
                })
            ),
            "apply payload"
        );
        assert!(
            matches!(
                events[1],
                RecordedEvent::Lifecycle(LifecycleEvent {
                    to: PipState::Open,
                    cause: LifecycleCause::Granted,
                    ..
                })
            ),
            "lifecycle payload"
        );
        assert!(
            matches!(
                events[2],
                RecordedEvent::Transport(TransportEvent {
                    outcome: TransportOutcome::Pressed { settle_at: HostTime(530) },
                    ..
                })
            ),
            "transport payload"
        );
        assert!(
            matches!(
                events[3],
                RecordedEvent::Frame(FrameEvent {
                    frame_index: 2,
                    reason: FrameReason::Loop,
                    ..
                })
            ),
            "frame payload"
        );
        let times: Vec<_> = events.iter().filter_map(RecordedEvent::at).collect();
        assert_eq!(
            times,
            [HostTime(10), HostTime(20), HostTime(30), HostTime(40)],
            "timestamps in order"
        );
    }

    #[test]
    fn truncated_input_stops_cleanly() {
        let mut rec = RecorderSink::new();
        rec.on_suppressed(&SuppressedEvent {
            at: HostTime(1),
            source: TriggerSource::Poll,
        });
        let bytes = rec.into_bytes();
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 0, "partial record is dropped");
        assert_eq!(decode(&bytes).count(), 1, "whole record decodes");
    }
}
