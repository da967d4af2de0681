// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use nowpip_core::surface::PipState;
use nowpip_core::trace::{ArtworkChange, TransportOutcome};

use crate::recorder::{RecordedEvent, RecordedWarning, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Time spent in PiP is a `B`/`E` duration pair; everything else is an
/// instant. Extractions carry no timestamp and are placed at the previous
/// event's time.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0_u64;

    for recorded in decode(bytes) {
        if let Some(at) = recorded.at() {
            last_ts = at.micros();
        }
        let ts = last_ts;
        match recorded {
            RecordedEvent::Extract(e) => {
                let signals: Vec<_> = e.signals.iter().map(|s| format!("{s:?}")).collect();
                events.push(instant("Extract", "Scraper", ts, json!({
                    "title_source": e.title_source.map(|s| format!("{s:?}")),
                    "artwork_source": e.artwork_source.map(|s| format!("{s:?}")),
                    "signals": signals,
                    "has_link": e.has_link,
                })));
            }
            RecordedEvent::Publish { source, info, .. } => {
                events.push(instant("Publish", "Detector", ts, json!({
                    "source": source.as_str(),
                    "title": info.title(),
                    "playing": info.is_playing(),
                    "artwork_url": info.artwork_url(),
                    "href": info.href(),
                })));
            }
            RecordedEvent::Suppressed(e) => {
                events.push(instant("Suppressed", "Detector", ts, json!({
                    "source": e.source.as_str(),
                })));
            }
            RecordedEvent::Apply(e) => {
                let (artwork, generation) = match e.artwork {
                    ArtworkChange::Unchanged => ("unchanged", None),
                    ArtworkChange::Loading { generation } => ("loading", Some(generation)),
                    ArtworkChange::Cleared => ("cleared", None),
                    ArtworkChange::Kept => ("kept", None),
                };
                events.push(instant("Apply", "Surface", ts, json!({
                    "title_changed": e.title_changed,
                    "playing_changed": e.playing_changed,
                    "artwork": artwork,
                    "generation": generation,
                })));
            }
            RecordedEvent::Artwork(e) => {
                events.push(instant("Artwork", "Surface", ts, json!({
                    "generation": e.generation,
                    "outcome": format!("{:?}", e.outcome),
                })));
            }
            RecordedEvent::Lifecycle(e) => {
                let args = json!({
                    "from": format!("{:?}", e.from),
                    "to": format!("{:?}", e.to),
                    "cause": format!("{:?}", e.cause),
                });
                let ph = match (e.from, e.to) {
                    (from, PipState::Open) if from != PipState::Open => Some("B"),
                    (PipState::Open, to) if to != PipState::Open => Some("E"),
                    _ => None,
                };
                events.push(match ph {
                    Some(ph) => json!({
                        "ph": ph,
                        "name": "PiP",
                        "cat": "Surface",
                        "ts": ts,
                        "pid": 0,
                        "tid": 0,
                        "args": args,
                    }),
                    None => instant("Lifecycle", "Surface", ts, args),
                });
            }
            RecordedEvent::Transport(e) => {
                let (outcome, settle_at) = match e.outcome {
                    TransportOutcome::Pressed { settle_at } => ("pressed", Some(settle_at.micros())),
                    TransportOutcome::Missing => ("missing", None),
                    TransportOutcome::Navigated => ("navigated", None),
                };
                events.push(instant("Transport", "Transport", ts, json!({
                    "action": e.action.as_str(),
                    "outcome": outcome,
                    "settle_at_us": settle_at,
                })));
            }
            RecordedEvent::Frame(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Frame",
                    "cat": "Surface",
                    "ts": ts,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::Warning { warning, .. } => {
                let message = match warning {
                    RecordedWarning::MissingControl(action) => {
                        format!("{} control not found", action.as_str())
                    }
                    RecordedWarning::Host(text) => text,
                };
                events.push(instant("Warning", "Warning", ts, json!({
                    "message": message,
                })));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, ts: u64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "s": "g",
        "args": args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use nowpip_core::detect::TriggerSource;
    use nowpip_core::scrape::{PlaySignals, TitleSource};
    use nowpip_core::time::HostTime;
    use nowpip_core::trace::{
        ExtractEvent, FrameEvent, FrameReason, LifecycleCause, LifecycleEvent, PublishEvent,
        TraceSink,
    };
    use nowpip_core::track::TrackInfo;

    fn parse(out: Vec<u8>) -> Vec<Value> {
        let json_str = String::from_utf8(out).unwrap();
        serde_json::from_str(&json_str).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        let info = TrackInfo::new("Song A", None, false, None);
        rec.on_publish(&PublishEvent {
            at: HostTime(1_000),
            source: TriggerSource::Initial,
            info: &info,
        });
        rec.on_extract(&ExtractEvent {
            title_source: Some(TitleSource::MiniPlayer),
            artwork_source: None,
            signals: PlaySignals::NONE,
            has_link: false,
        });
        rec.on_lifecycle(&LifecycleEvent {
            at: HostTime(2_000),
            from: PipState::Opening,
            to: PipState::Open,
            cause: LifecycleCause::Granted,
        });
        rec.on_frame(&FrameEvent {
            at: HostTime(2_100),
            frame_index: 0,
            reason: FrameReason::Opened,
        });
        rec.on_lifecycle(&LifecycleEvent {
            at: HostTime(9_000),
            from: PipState::Open,
            to: PipState::Closed,
            cause: LifecycleCause::CloseRequested,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed = parse(out);
        assert_eq!(parsed.len(), 5, "one trace event per record");

        assert_eq!(parsed[0]["name"], "Publish", "publish first");
        assert_eq!(parsed[0]["args"]["title"], "Song A", "title in args");

        // The extraction inherits the publish's timestamp.
        assert_eq!(parsed[1]["name"], "Extract", "extract second");
        assert_eq!(parsed[1]["ts"], 1_000, "previous timestamp");

        assert_eq!(parsed[2]["ph"], "B", "open begins a span");
        assert_eq!(parsed[2]["name"], "PiP", "span name");
        assert_eq!(parsed[3]["name"], "Frame", "frame inside the span");
        assert_eq!(parsed[4]["ph"], "E", "close ends the span");
        assert_eq!(parsed[4]["ts"], 9_000, "span end time");
    }

    #[test]
    fn opening_without_grant_is_an_instant() {
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            at: HostTime(5),
            from: PipState::Closed,
            to: PipState::Opening,
            cause: LifecycleCause::OpenRequested,
        });
        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed = parse(out);
        assert_eq!(parsed[0]["ph"], "i", "instant");
        assert_eq!(parsed[0]["name"], "Lifecycle", "lifecycle instant");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        assert!(parse(out).is_empty(), "no events");
    }
}
