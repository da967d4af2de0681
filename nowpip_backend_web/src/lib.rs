// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for nowpip.
//!
//! This crate runs a [`Session`](nowpip_core::session::Session) inside a
//! streaming site's page:
//!
//! - [`DomPage`]: reads the page through a [`SiteProfile`] and presses its
//!   transport buttons
//! - [`DomPipHost`]: hidden canvas and video, picture-in-picture and media
//!   session
//! - [`CanvasPresenter`]: 2D canvas rasterizer for composed frames
//! - [`LocalStash`]: previous-track link in `localStorage`
//! - [`ConsoleSink`]: `[nowpip]` console trace output
//!
//! [`install`] wires them together and returns a [`NowPip`] handle whose
//! `open_pip` must be called from a user gesture.

#![no_std]
#![cfg_attr(
    not(target_arch = "wasm32"),
    allow(dead_code, reason = "browser glue only runs on wasm32")
)]

extern crate alloc;

mod canvas;
mod console;
mod listen;
mod observer;
mod page;
mod pip;
mod profile;
mod runtime;
mod storage;
mod timer;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;

pub use canvas::CanvasPresenter;
pub use console::ConsoleSink;
pub use page::DomPage;
pub use pip::{CANVAS_ID, DomPipHost, VIDEO_ID};
pub use profile::{ArtworkAttr, SiteProfile};
pub use runtime::{REQUEST_EVENTS, WebPlatform};
pub use storage::{LocalStash, PREVIOUS_HREF_KEY};

use nowpip_core::session::{SessionConfig, SurfaceStatus};
use nowpip_core::surface::{MediaSessionState, OpenOutcome};
use nowpip_core::time::HostTime;
use wasm_bindgen::prelude::*;

use crate::runtime::Runtime;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;
}

/// Returns the current host time from `performance.now()`.
#[must_use]
pub fn now() -> HostTime {
    let ms = performance_now();
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "performance.now() returns small positive f64; µs fits in u64"
    )]
    let us = (ms * 1000.0) as u64;
    HostTime(us)
}

/// The installed mini player for this page.
#[wasm_bindgen]
pub struct NowPip {
    runtime: Rc<Runtime>,
}

impl core::fmt::Debug for NowPip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NowPip")
            .field("runtime", &self.runtime)
            .finish()
    }
}

/// Installs the mini player on the current page with web defaults and
/// console tracing.
#[wasm_bindgen]
pub fn install() -> Result<NowPip, JsValue> {
    install_with(
        SiteProfile::soundcloud(),
        SessionConfig::web(),
        Box::new(ConsoleSink::new()),
    )
}

/// [`install`] with a console sink that also logs every presented frame.
#[wasm_bindgen(js_name = "installVerbose")]
pub fn install_verbose() -> Result<NowPip, JsValue> {
    install_with(
        SiteProfile::soundcloud(),
        SessionConfig::web(),
        Box::new(ConsoleSink::verbose()),
    )
}

/// Installs the mini player with an explicit profile, configuration and
/// trace sink.
pub fn install_with(
    profile: SiteProfile,
    config: SessionConfig,
    sink: Box<dyn nowpip_core::trace::TraceSink>,
) -> Result<NowPip, JsValue> {
    Ok(NowPip {
        runtime: Runtime::install(profile, config, sink)?,
    })
}

#[wasm_bindgen]
impl NowPip {
    /// Opens the PiP window. Call from a user gesture.
    ///
    /// Returns `"requested"`, `"already-open"`, `"in-flight"`, `"failed"` or
    /// `"busy"`.
    #[wasm_bindgen(js_name = "openPip")]
    pub fn open_pip(&self) -> String {
        let outcome = self.runtime.with_session(|session, now| session.open_pip(now));
        String::from(match outcome {
            Some(OpenOutcome::Requested) => "requested",
            Some(OpenOutcome::AlreadyOpen) => "already-open",
            Some(OpenOutcome::InFlight) => "in-flight",
            Some(OpenOutcome::Failed) => "failed",
            None => "busy",
        })
    }

    /// Closes the PiP window. Returns `true` if anything was live.
    #[wasm_bindgen(js_name = "closePip")]
    pub fn close_pip(&self) -> bool {
        self.runtime
            .with_session(|session, now| session.close_pip(now))
            .unwrap_or(false)
    }

    /// A diagnostic snapshot as a plain object.
    pub fn status(&self) -> JsValue {
        self.runtime
            .with_session(|session, _| status_object(&session.status()))
            .unwrap_or(JsValue::NULL)
    }
}

fn status_object(status: &SurfaceStatus) -> JsValue {
    let object = js_sys::Object::new();
    // Plain object, string keys: `Reflect.set` cannot throw.
    let set = |key: &str, value: JsValue| {
        let _ = js_sys::Reflect::set(&object, &JsValue::from_str(key), &value);
    };
    let opt = |value: Option<&str>| value.map_or(JsValue::NULL, JsValue::from_str);

    set("state", JsValue::from_str(&alloc::format!("{:?}", status.state)));
    set("isPipOpen", JsValue::from_bool(status.pip_element_active));
    set(
        "window",
        status
            .window
            .map_or(JsValue::NULL, |w| JsValue::from_f64(f64::from(w.0))),
    );
    set("title", JsValue::from_str(status.track.title()));
    set("href", opt(status.track.href()));
    set("isPlaying", JsValue::from_bool(status.track.is_playing()));
    set("artworkUrl", opt(status.artwork_url.as_deref()));
    set("artworkLoaded", JsValue::from_bool(status.artwork_loaded));
    set("artworkErrored", JsValue::from_bool(status.artwork_errored));
    set("renderLoopActive", JsValue::from_bool(status.render_loop_active));
    set("pollTimerActive", JsValue::from_bool(status.polling));
    set(
        "playControlObserverActive",
        JsValue::from_bool(status.play_control_observed),
    );
    set(
        "mediaSession",
        JsValue::from_str(match status.media_session {
            MediaSessionState::NotInstalled => "not-installed",
            MediaSessionState::Installed => "installed",
            MediaSessionState::Unavailable => "unavailable",
        }),
    );
    set("framesDrawn", JsValue::from_f64(status.frames_drawn as f64));
    set("videoPlaying", JsValue::from_bool(status.video_playing));
    object.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_events_cover_every_request() {
        use nowpip_core::event::TransportRequest;
        for request in [
            TransportRequest::Previous,
            TransportRequest::Next,
            TransportRequest::PlayToggle,
        ] {
            assert!(
                REQUEST_EVENTS.iter().any(|(_, r)| *r == request),
                "{request:?} has an event"
            );
        }
    }

    #[test]
    fn element_ids_are_distinct() {
        assert_ne!(CANVAS_ID, VIDEO_ID, "canvas and video ids differ");
    }
}
