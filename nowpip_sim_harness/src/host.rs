// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A PiP host that records what the session asked of it.

use alloc::string::String;
use alloc::vec::Vec;

use nowpip_core::error::{Capability, HostError, Operation};
use nowpip_core::host::{ArtworkRequest, PipHost, WindowHandle};
use nowpip_core::render::{DrawOp, Font, Frame, NO_ARTWORK_LABEL, Presenter};

/// A "decoded" artwork image: the URL it was loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimImage {
    /// Request URL, cache-busting stamp included.
    pub url: String,
}

/// The play/pause glyph drawn in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    /// The play triangle (paused).
    Play,
    /// The pause bars (playing).
    Pause,
}

/// An owned summary of a presented frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentedFrame {
    /// Text commands in paint order.
    pub texts: Vec<String>,
    /// URL of the image drawn in the artwork square.
    pub image: Option<String>,
    /// Play/pause glyph.
    pub glyph: Glyph,
}

impl PresentedFrame {
    /// Whether the artwork square shows the "No artwork" block.
    #[must_use]
    pub fn shows_placeholder(&self) -> bool {
        self.texts.iter().any(|t| t == NO_ARTWORK_LABEL)
    }

    /// Whether any text command equals `text`.
    #[must_use]
    pub fn has_text(&self, text: &str) -> bool {
        self.texts.iter().any(|t| t == text)
    }
}

/// Host operations a test can make fail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Failures {
    /// `ensure_elements` fails.
    pub elements: bool,
    /// `request_pip` fails synchronously.
    pub request_pip: bool,
    /// `set_video_playing(true)` is rejected.
    pub play: bool,
    /// The media session is unavailable.
    pub media_session: bool,
    /// `navigate` fails.
    pub navigate: bool,
}

/// Records every call and holds asynchronous requests for the test.
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Operations to fail.
    pub failures: Failures,
    pip_active: bool,
    elements_created: u32,
    pip_requests: u32,
    frames: Vec<PresentedFrame>,
    video: Vec<bool>,
    loads: Vec<ArtworkRequest>,
    completed_loads: usize,
    navigations: Vec<String>,
    exits: Vec<Option<WindowHandle>>,
    observing: bool,
    media_session_installs: u32,
    stamp: u64,
}

impl RecordingHost {
    /// A host where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames presented so far.
    #[must_use]
    pub fn frames(&self) -> &[PresentedFrame] {
        &self.frames
    }

    /// The most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&PresentedFrame> {
        self.frames.last()
    }

    /// Every successful `set_video_playing` argument, in order.
    #[must_use]
    pub fn video_calls(&self) -> &[bool] {
        &self.video
    }

    /// Every artwork load started, in order.
    #[must_use]
    pub fn loads(&self) -> &[ArtworkRequest] {
        &self.loads
    }

    /// Artwork loads not yet completed by the simulation.
    #[must_use]
    pub fn pending_loads(&self) -> &[ArtworkRequest] {
        &self.loads[self.completed_loads..]
    }

    /// Every navigation, in order.
    #[must_use]
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Every `exit_pip` call, in order.
    #[must_use]
    pub fn exits(&self) -> &[Option<WindowHandle>] {
        &self.exits
    }

    /// Times the element triple was created.
    #[must_use]
    pub const fn elements_created(&self) -> u32 {
        self.elements_created
    }

    /// Outstanding PiP requests.
    #[must_use]
    pub const fn pending_pip_requests(&self) -> u32 {
        self.pip_requests
    }

    /// Whether the play-control observer is connected.
    #[must_use]
    pub const fn observing(&self) -> bool {
        self.observing
    }

    /// Times media-session handlers were installed.
    #[must_use]
    pub const fn media_session_installs(&self) -> u32 {
        self.media_session_installs
    }

    /// Takes one outstanding PiP request and marks the video as shown.
    /// Returns `false` if none was outstanding.
    pub(crate) fn grant(&mut self) -> bool {
        if self.pip_requests == 0 {
            return false;
        }
        self.pip_requests -= 1;
        self.pip_active = true;
        true
    }

    /// Takes one outstanding PiP request without showing anything.
    pub(crate) fn deny(&mut self) -> bool {
        if self.pip_requests == 0 {
            return false;
        }
        self.pip_requests -= 1;
        true
    }

    /// The browser leaves PiP on its own.
    pub(crate) fn drop_pip(&mut self) {
        self.pip_active = false;
    }

    /// Returns the pending artwork loads and marks them completed.
    pub(crate) fn take_loads(&mut self) -> Vec<ArtworkRequest> {
        let pending = self.pending_loads().to_vec();
        self.completed_loads = self.loads.len();
        pending
    }
}

impl PipHost for RecordingHost {
    fn ensure_elements(&mut self) -> Result<(), HostError> {
        if self.failures.elements {
            return Err(HostError::Unavailable(Capability::CaptureStream));
        }
        self.elements_created += 1;
        Ok(())
    }

    fn pip_element_active(&self) -> bool {
        self.pip_active
    }

    fn request_pip(&mut self) -> Result<(), HostError> {
        if self.failures.request_pip {
            return Err(HostError::rejected(Operation::RequestPip, "NotAllowedError"));
        }
        self.pip_requests += 1;
        Ok(())
    }

    fn exit_pip(&mut self, window: Option<WindowHandle>) -> Result<(), HostError> {
        self.pip_active = false;
        self.exits.push(window);
        Ok(())
    }

    fn set_video_playing(&mut self, playing: bool) -> Result<(), HostError> {
        if playing && self.failures.play {
            return Err(HostError::rejected(Operation::Playback, "NotAllowedError"));
        }
        self.video.push(playing);
        Ok(())
    }

    fn load_artwork(&mut self, request: ArtworkRequest) {
        self.loads.push(request);
    }

    fn observe_play_control(&mut self) -> Result<(), HostError> {
        self.observing = true;
        Ok(())
    }

    fn disconnect_play_control(&mut self) {
        self.observing = false;
    }

    fn install_media_session(&mut self) -> Result<(), HostError> {
        if self.failures.media_session {
            return Err(HostError::Unavailable(Capability::MediaSession));
        }
        self.media_session_installs += 1;
        Ok(())
    }

    fn navigate(&mut self, href: &str) -> Result<(), HostError> {
        if self.failures.navigate {
            return Err(HostError::rejected(Operation::Navigate, "blocked"));
        }
        self.navigations.push(String::from(href));
        Ok(())
    }

    fn cache_stamp(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }
}

impl Presenter<SimImage> for RecordingHost {
    /// Monospace: every character is half the font size wide.
    fn text_width(&mut self, text: &str, font: Font) -> f64 {
        text.chars().count() as f64 * f64::from(font.size_px) / 2.0
    }

    fn present(&mut self, frame: &Frame<'_, SimImage>) {
        let mut image = None;
        let mut glyph = Glyph::Pause;
        for op in &frame.ops {
            match op {
                DrawOp::Image { image: img, .. } => image = Some(img.url.clone()),
                DrawOp::FillTriangle { .. } => glyph = Glyph::Play,
                _ => {}
            }
        }
        self.frames.push(PresentedFrame {
            texts: frame.texts().map(String::from).collect(),
            image,
            glyph,
        });
    }
}
