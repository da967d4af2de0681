// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! Nowpip splits browser-specific work into *backend* crates. Each backend
//! provides the following pieces:
//!
//! - **Page probe**: Implements [`PageProbe`] with the site profile's
//!   selectors, and [`TransportControls`] by clicking the page's buttons.
//!
//! - **Mutation feed**: Translates observer records into
//!   [`MutationRecord`](crate::mutation::MutationRecord)s and passes them to
//!   [`Session::on_mutations`](crate::session::Session::on_mutations).
//!
//! - **PiP host**: Implements [`PipHost`] over the canvas, the hidden video
//!   fed by the canvas capture stream, and the PiP/media-session APIs.
//!   Asynchronous completions (window granted, artwork decoded) are reported
//!   back through the matching `Session` methods.
//!
//! - **Presenter**: Implements [`Presenter`] to rasterize frames.
//!
//! - **Href stash**: Implements [`HrefStash`] over page storage.
//!
//! - **Timer**: One host timeout re-armed at
//!   [`Session::next_deadline`](crate::session::Session::next_deadline),
//!   calling [`Session::service`](crate::session::Session::service).
//!
//! # Crate boundaries
//!
//! `nowpip_core` owns the data model, change detection, the surface state
//! machine and this contract module. Backend crates depend on `nowpip_core`
//! and provide platform glue.

use alloc::string::String;

use crate::error::HostError;
use crate::render::Presenter;
use crate::scrape::PageProbe;
use crate::transport::TransportControls;

/// Opaque handle to a granted PiP window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u32);

/// An artwork load the surface wants the host to start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtworkRequest {
    /// Generation to echo back on completion.
    pub generation: u64,
    /// Cache-busted URL to fetch.
    pub url: String,
}

/// Media-session actions the surface handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaAction {
    /// Resume playback.
    Play,
    /// Pause playback.
    Pause,
    /// Previous track.
    PreviousTrack,
    /// Next track.
    NextTrack,
    /// Close the PiP window.
    Stop,
}

impl MediaAction {
    /// Every handled action, in registration order.
    pub const ALL: [Self; 5] = [
        Self::Play,
        Self::Pause,
        Self::PreviousTrack,
        Self::NextTrack,
        Self::Stop,
    ];

    /// The media-session action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::PreviousTrack => "previoustrack",
            Self::NextTrack => "nexttrack",
            Self::Stop => "stop",
        }
    }
}

/// The browser side of the PiP surface.
///
/// Methods that start asynchronous work return as soon as the work is
/// started; the host reports completion through the session.
pub trait PipHost {
    /// Creates the canvas, the hidden video and the capture stream between
    /// them if they do not exist yet. Idempotent.
    fn ensure_elements(&mut self) -> Result<(), HostError>;

    /// Whether the browser currently shows our video in PiP.
    fn pip_element_active(&self) -> bool;

    /// Starts a PiP request. Completion arrives as
    /// [`Session::pip_granted`](crate::session::Session::pip_granted) or
    /// [`Session::pip_failed`](crate::session::Session::pip_failed).
    fn request_pip(&mut self) -> Result<(), HostError>;

    /// Leaves PiP and closes `window`. Must tolerate a window the browser
    /// already tore down.
    fn exit_pip(&mut self, window: Option<WindowHandle>) -> Result<(), HostError>;

    /// Starts or pauses the hidden video.
    fn set_video_playing(&mut self, playing: bool) -> Result<(), HostError>;

    /// Starts an artwork load. Completion arrives as
    /// [`Session::artwork_loaded`](crate::session::Session::artwork_loaded) or
    /// [`Session::artwork_failed`](crate::session::Session::artwork_failed).
    fn load_artwork(&mut self, request: ArtworkRequest);

    /// Starts observing the page's play control for class changes.
    fn observe_play_control(&mut self) -> Result<(), HostError>;

    /// Stops the play-control observer. Idempotent.
    fn disconnect_play_control(&mut self);

    /// Registers handlers for every [`MediaAction`].
    fn install_media_session(&mut self) -> Result<(), HostError>;

    /// Navigates the page.
    fn navigate(&mut self, href: &str) -> Result<(), HostError>;

    /// A monotonically increasing stamp for cache-busting artwork URLs.
    fn cache_stamp(&mut self) -> u64;
}

/// Persistent single-entry storage for the previous-track link.
pub trait HrefStash {
    /// The stashed link, if any.
    fn load(&self) -> Option<String>;

    /// Replaces the stashed link.
    fn store(&mut self, href: &str);

    /// Removes the stashed link.
    fn clear(&mut self);
}

/// Bundles the host types a [`Session`](crate::session::Session) runs on.
pub trait Platform {
    /// Page reader.
    type Probe: PageProbe;
    /// Page transport buttons.
    type Controls: TransportControls;
    /// Previous-track link storage.
    type Stash: HrefStash;
    /// Decoded artwork image.
    type Artwork;
    /// PiP surface glue and frame rasterizer.
    type Host: PipHost + Presenter<Self::Artwork>;
}
