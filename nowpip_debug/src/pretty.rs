// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable one-line-per-event output.

use std::io::{self, Write};

use nowpip_core::trace::{
    ApplyEvent, ArtworkChange, ArtworkEvent, ExtractEvent, FrameEvent, LifecycleEvent,
    PublishEvent, SuppressedEvent, TraceSink, TransportEvent, TransportOutcome, Warning,
    WarningEvent,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Write errors are ignored; tracing never fails the session.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> core::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Writes to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    /// Writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Writes to `writer`.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_extract(&mut self, e: &ExtractEvent) {
        let signals: Vec<_> = e.signals.iter().map(|s| format!("{s:?}")).collect();
        let _ = writeln!(
            self.writer,
            "[extract] title={:?} artwork={:?} signals=[{}] link={}",
            e.title_source,
            e.artwork_source,
            signals.join(","),
            e.has_link,
        );
    }

    fn on_publish(&mut self, e: &PublishEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[publish] at {}ms via {} title={:?} playing={} href={:?}",
            e.at.as_millis(),
            e.source.as_str(),
            e.info.title(),
            e.info.is_playing(),
            e.info.href(),
        );
    }

    fn on_suppressed(&mut self, e: &SuppressedEvent) {
        let _ = writeln!(
            self.writer,
            "[suppressed] at {}ms via {}",
            e.at.as_millis(),
            e.source.as_str(),
        );
    }

    fn on_apply(&mut self, e: &ApplyEvent) {
        let artwork = match e.artwork {
            ArtworkChange::Unchanged => "unchanged".to_string(),
            ArtworkChange::Loading { generation } => format!("loading#{generation}"),
            ArtworkChange::Cleared => "cleared".to_string(),
            ArtworkChange::Kept => "kept".to_string(),
        };
        let _ = writeln!(
            self.writer,
            "[apply] at {}ms title_changed={} playing_changed={} artwork={artwork}",
            e.at.as_millis(),
            e.title_changed,
            e.playing_changed,
        );
    }

    fn on_artwork(&mut self, e: &ArtworkEvent) {
        let _ = writeln!(
            self.writer,
            "[artwork] at {}ms #{} {:?}",
            e.at.as_millis(),
            e.generation,
            e.outcome,
        );
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[lifecycle] at {}ms {:?} -> {:?} ({:?})",
            e.at.as_millis(),
            e.from,
            e.to,
            e.cause,
        );
    }

    fn on_transport(&mut self, e: &TransportEvent) {
        let outcome = match e.outcome {
            TransportOutcome::Pressed { settle_at } => {
                format!("pressed, settle at {}ms", settle_at.as_millis())
            }
            TransportOutcome::Missing => "missing".to_string(),
            TransportOutcome::Navigated => "navigated".to_string(),
        };
        let _ = writeln!(
            self.writer,
            "[transport] at {}ms {} {outcome}",
            e.at.as_millis(),
            e.action.as_str(),
        );
    }

    fn on_frame(&mut self, e: &FrameEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] at {}ms #{} {:?}",
            e.at.as_millis(),
            e.frame_index,
            e.reason,
        );
    }

    fn on_warning(&mut self, e: &WarningEvent<'_>) {
        let _ = match e.warning {
            Warning::MissingControl(action) => writeln!(
                self.writer,
                "[warning] at {}ms {} control not found",
                e.at.as_millis(),
                action.as_str(),
            ),
            Warning::Host(error) => {
                writeln!(self.writer, "[warning] at {}ms {error}", e.at.as_millis())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowpip_core::detect::TriggerSource;
    use nowpip_core::error::{Capability, HostError};
    use nowpip_core::surface::PipState;
    use nowpip_core::time::HostTime;
    use nowpip_core::trace::LifecycleCause;
    use nowpip_core::track::TrackInfo;
    use nowpip_core::transport::TransportAction;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn publish_line_names_source_and_state() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        let info = TrackInfo::new("Song A", None, true, Some("/a".to_string()));
        sink.on_publish(&PublishEvent {
            at: HostTime::from_millis(1_500),
            source: TriggerSource::Mutation,
            info: &info,
        });
        let text = output(sink);
        assert!(text.starts_with("[publish] at 1500ms via "), "{text}");
        assert!(text.contains("\"Song A\""), "{text}");
        assert!(text.contains("playing=true"), "{text}");
        assert!(text.ends_with('\n'), "newline terminated");
    }

    #[test]
    fn one_line_per_event() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_lifecycle(&LifecycleEvent {
            at: HostTime::from_millis(10),
            from: PipState::Closed,
            to: PipState::Opening,
            cause: LifecycleCause::OpenRequested,
        });
        sink.on_transport(&TransportEvent {
            at: HostTime::from_millis(20),
            action: TransportAction::Next,
            outcome: TransportOutcome::Pressed {
                settle_at: HostTime::from_millis(620),
            },
        });
        let error = HostError::Unavailable(Capability::PictureInPicture);
        sink.on_warning(&WarningEvent {
            at: HostTime::from_millis(30),
            warning: Warning::Host(&error),
        });

        let text = output(sink);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3, "one line per event");
        assert!(lines[0].starts_with("[lifecycle] at 10ms Closed -> Opening"), "lifecycle line");
        assert!(lines[1].contains("settle at 620ms"), "{}", lines[1]);
        assert!(lines[2].starts_with("[warning] at 30ms"), "warning line");
        assert!(lines[2].contains(&error.to_string()), "error text included");
    }
}
