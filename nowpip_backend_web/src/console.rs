// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser console trace output.

use alloc::format;
use alloc::string::String;

use nowpip_core::time::HostTime;
use nowpip_core::trace::{
    ApplyEvent, ArtworkEvent, ExtractEvent, FrameEvent, LifecycleEvent, PublishEvent,
    SuppressedEvent, TraceSink, TransportEvent, Warning, WarningEvent,
};
use wasm_bindgen::JsValue;

const PREFIX: &str = "[nowpip]";

/// Writes `[nowpip]`-prefixed lines to the browser console.
///
/// Warnings go to `console.warn`; everything else to `console.debug`, which
/// browsers hide unless verbose logging is on. Per-frame events are only
/// written when `frames` is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink {
    frames: bool,
}

impl ConsoleSink {
    /// Creates a sink that skips per-frame events.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: false }
    }

    /// Creates a sink that also logs every presented frame.
    #[must_use]
    pub const fn verbose() -> Self {
        Self { frames: true }
    }
}

fn ms(t: HostTime) -> String {
    format!("{:.1}ms", t.micros() as f64 / 1000.0)
}

fn debug(line: &str) {
    web_sys::console::debug_1(&JsValue::from_str(&format!("{PREFIX} {line}")));
}

pub(crate) fn warn(line: &str) {
    web_sys::console::warn_1(&JsValue::from_str(&format!("{PREFIX} {line}")));
}

impl TraceSink for ConsoleSink {
    fn on_extract(&mut self, e: &ExtractEvent) {
        debug(&format!(
            "extract title={:?} artwork={:?} signals={:?} link={}",
            e.title_source, e.artwork_source, e.signals, e.has_link,
        ));
    }

    fn on_publish(&mut self, e: &PublishEvent<'_>) {
        debug(&format!(
            "publish at {} via {} title={:?} playing={} artwork={}",
            ms(e.at),
            e.source.as_str(),
            e.info.title(),
            e.info.is_playing(),
            e.info.artwork_url().is_some(),
        ));
    }

    fn on_suppressed(&mut self, e: &SuppressedEvent) {
        debug(&format!("unchanged at {} via {}", ms(e.at), e.source.as_str()));
    }

    fn on_apply(&mut self, e: &ApplyEvent) {
        debug(&format!(
            "apply at {} title_changed={} playing_changed={} artwork={:?}",
            ms(e.at),
            e.title_changed,
            e.playing_changed,
            e.artwork,
        ));
    }

    fn on_artwork(&mut self, e: &ArtworkEvent) {
        debug(&format!(
            "artwork #{} {:?} at {}",
            e.generation,
            e.outcome,
            ms(e.at)
        ));
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        debug(&format!(
            "pip {:?} -> {:?} ({:?}) at {}",
            e.from,
            e.to,
            e.cause,
            ms(e.at)
        ));
    }

    fn on_transport(&mut self, e: &TransportEvent) {
        debug(&format!(
            "{} {:?} at {}",
            e.action.as_str(),
            e.outcome,
            ms(e.at)
        ));
    }

    fn on_frame(&mut self, e: &FrameEvent) {
        if self.frames {
            debug(&format!(
                "frame #{} {:?} at {}",
                e.frame_index,
                e.reason,
                ms(e.at)
            ));
        }
    }

    fn on_warning(&mut self, e: &WarningEvent<'_>) {
        match e.warning {
            Warning::MissingControl(action) => {
                warn(&format!("{} control not found", action.as_str()));
            }
            Warning::Host(error) => warn(&format!("{error}")),
        }
    }
}
