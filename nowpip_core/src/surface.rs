// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The PiP surface: lifecycle, render state and the render loop.
//!
//! ```text
//!            open()              pip_granted()
//!   Closed ─────────► Opening ─────────────────► Open
//!     ▲                  │ pip_failed()            │
//!     └──────────────────┴─────────────────────────┘
//!                close() / left_pip / unload
//! ```
//!
//! Snapshots arrive through [`PipSurface::on_track_changed`] and are applied
//! after a short single-slot debounce. Applying decides three things
//! independently: whether to (re)load artwork, whether to start or pause the
//! hidden video, and whether to redraw.
//!
//! While open and playing, a 4 Hz loop redraws so the capture stream keeps
//! producing frames; when playback pauses the loop stops after one final
//! frame.

use alloc::string::String;

use crate::debounce::{Debounce, Interval};
use crate::error::HostError;
use crate::host::{ArtworkRequest, PipHost, WindowHandle};
use crate::input::ClickZone;
use crate::render::{ArtworkView, Layout, Presenter, compose};
use crate::time::{Duration, HostTime};
use crate::trace::{
    ApplyEvent, ArtworkChange, ArtworkEvent, ArtworkOutcome, FrameEvent, FrameReason,
    LifecycleCause, LifecycleEvent, Tracer,
};
use crate::track::{TrackInfo, cache_busted};

/// PiP lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipState {
    /// No window and no request in flight.
    Closed,
    /// A request is in flight.
    Opening,
    /// The window is showing our video.
    Open,
}

/// Media-session handler installation, at most once per page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaSessionState {
    /// Not attempted yet.
    NotInstalled,
    /// Handlers are registered.
    Installed,
    /// The capability is missing; never retried.
    Unavailable,
}

/// Result of an open command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenOutcome {
    /// A PiP request was started.
    Requested,
    /// PiP is already showing our video.
    AlreadyOpen,
    /// A request is already in flight.
    InFlight,
    /// Elements or the request failed synchronously.
    Failed,
}

/// Timing and geometry for the surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceConfig {
    /// Debounce between a published snapshot and its apply.
    pub apply_debounce: Duration,
    /// Render loop period while playing.
    pub frame_interval: Duration,
    /// Extra re-read after a play/pause click.
    pub toggle_refresh: Duration,
    /// Re-read after the PiP window opens.
    pub open_settle: Duration,
    /// Frame geometry.
    pub layout: Layout,
}

impl SurfaceConfig {
    /// Defaults for the web backend: 100 ms apply debounce, 4 Hz redraw.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            apply_debounce: Duration::from_millis(100),
            frame_interval: Duration::from_millis(250),
            toggle_refresh: Duration::from_millis(300),
            open_settle: Duration::from_millis(300),
            layout: Layout::standard(),
        }
    }
}

/// The single live artwork entry.
#[derive(Debug)]
pub struct ArtworkEntry<A> {
    url: Option<String>,
    image: Option<A>,
    loaded: bool,
    errored: bool,
    generation: u64,
}

impl<A> ArtworkEntry<A> {
    const fn empty() -> Self {
        Self {
            url: None,
            image: None,
            loaded: false,
            errored: false,
            generation: 0,
        }
    }

    /// Artwork URL this entry is for (without the cache-busting stamp).
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The decoded image, once loaded.
    #[must_use]
    pub fn image(&self) -> Option<&A> {
        self.image.as_ref()
    }

    /// Whether the image decoded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the load failed.
    #[must_use]
    pub const fn is_errored(&self) -> bool {
        self.errored
    }

    /// Bumped on every new load or clear; completions from older
    /// generations are stale.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    fn replace(&mut self, url: Option<String>) -> u64 {
        self.generation += 1;
        self.url = url;
        self.image = None;
        self.loaded = false;
        self.errored = false;
        self.generation
    }
}

/// The PiP surface.
///
/// Generic over the host's decoded image type.
#[derive(Debug)]
pub struct PipSurface<A> {
    config: SurfaceConfig,
    state: PipState,
    window: Option<WindowHandle>,
    current: TrackInfo,
    artwork: ArtworkEntry<A>,
    pending_apply: Debounce<TrackInfo>,
    render_loop: Interval,
    frames_drawn: u64,
    media_session: MediaSessionState,
    play_control_observed: bool,
    elements_ready: bool,
    video_playing: bool,
}

impl<A> PipSurface<A> {
    /// Creates a closed surface.
    #[must_use]
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            config,
            state: PipState::Closed,
            window: None,
            current: TrackInfo::default(),
            artwork: ArtworkEntry::empty(),
            pending_apply: Debounce::new(),
            render_loop: Interval::new(config.frame_interval),
            frames_drawn: 0,
            media_session: MediaSessionState::NotInstalled,
            play_control_observed: false,
            elements_ready: false,
            video_playing: false,
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PipState {
        self.state
    }

    /// The granted window, while open.
    #[must_use]
    pub const fn window(&self) -> Option<WindowHandle> {
        self.window
    }

    /// The last applied snapshot.
    #[must_use]
    pub const fn current(&self) -> &TrackInfo {
        &self.current
    }

    /// The artwork entry.
    #[must_use]
    pub const fn artwork(&self) -> &ArtworkEntry<A> {
        &self.artwork
    }

    /// Whether the render loop is running.
    #[must_use]
    pub const fn render_loop_active(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Whether the play-control observer is connected.
    #[must_use]
    pub const fn play_control_observed(&self) -> bool {
        self.play_control_observed
    }

    /// Media-session installation state.
    #[must_use]
    pub const fn media_session(&self) -> MediaSessionState {
        self.media_session
    }

    /// Frames presented so far.
    #[must_use]
    pub const fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Whether the hidden video was last asked to play successfully.
    #[must_use]
    pub const fn video_playing(&self) -> bool {
        self.video_playing
    }

    /// A snapshot waiting for its apply, if any.
    #[must_use]
    pub fn pending_apply(&self) -> Option<&TrackInfo> {
        self.pending_apply.peek()
    }

    /// Maps a click position to its zone.
    #[must_use]
    pub fn click_zone(&self, x: f64) -> ClickZone {
        ClickZone::from_x(x, self.config.layout.size.width)
    }

    /// The earliest instant at which [`service`](Self::service) has work.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        match (self.pending_apply.deadline(), self.render_loop.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Schedules `info` to be applied after the apply debounce.
    pub fn on_track_changed(&mut self, info: TrackInfo, now: HostTime) {
        self.pending_apply
            .schedule(now + self.config.apply_debounce, info);
    }
}

impl<A> PipSurface<A> {
    /// Opens the PiP window.
    ///
    /// `latest` is applied immediately so the first frame has content. An
    /// open surface whose PiP element is no longer live is torn down first.
    pub fn open<H>(
        &mut self,
        latest: TrackInfo,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> OpenOutcome
    where
        H: PipHost + Presenter<A>,
    {
        if self.state == PipState::Open && !host.pip_element_active() {
            self.close(now, LifecycleCause::LeftPip, host, tracer);
        }
        let ignored = if host.pip_element_active() {
            Some(OpenOutcome::AlreadyOpen)
        } else if self.state == PipState::Opening {
            Some(OpenOutcome::InFlight)
        } else {
            None
        };
        if let Some(outcome) = ignored {
            self.lifecycle(now, self.state, LifecycleCause::OpenIgnored, tracer);
            return outcome;
        }

        if !self.elements_ready {
            if let Err(error) = host.ensure_elements() {
                tracer.host_error(now, &error);
                return OpenOutcome::Failed;
            }
            self.elements_ready = true;
        }

        self.pending_apply.cancel();
        self.apply(latest, now, host, tracer);

        self.lifecycle(now, PipState::Opening, LifecycleCause::OpenRequested, tracer);
        match host.request_pip() {
            Ok(()) => OpenOutcome::Requested,
            Err(error) => {
                tracer.host_error(now, &error);
                self.close(now, LifecycleCause::Failed, host, tracer);
                OpenOutcome::Failed
            }
        }
    }

    /// The browser granted the window. Returns `false` for a grant that
    /// arrived after the request was abandoned; that window is closed again.
    pub fn pip_granted<H>(
        &mut self,
        window: WindowHandle,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> bool
    where
        H: PipHost + Presenter<A>,
    {
        if self.state != PipState::Opening {
            self.lifecycle(now, self.state, LifecycleCause::LateGrant, tracer);
            if let Err(error) = host.exit_pip(Some(window)) {
                tracer.host_error(now, &error);
            }
            return false;
        }

        self.window = Some(window);
        self.lifecycle(now, PipState::Open, LifecycleCause::Granted, tracer);

        if self.media_session == MediaSessionState::NotInstalled {
            self.media_session = match host.install_media_session() {
                Ok(()) => MediaSessionState::Installed,
                Err(error) => {
                    tracer.host_error(now, &error);
                    MediaSessionState::Unavailable
                }
            };
        }

        match host.observe_play_control() {
            Ok(()) => self.play_control_observed = true,
            Err(error) => tracer.host_error(now, &error),
        }

        let playing = self.current.is_playing();
        self.set_video(playing, now, host, tracer);
        self.draw(now, FrameReason::Opened, host, tracer);
        if playing {
            self.render_loop
                .start_at(now + self.config.frame_interval);
        }
        true
    }

    /// The PiP request failed.
    pub fn pip_failed<H>(
        &mut self,
        error: &HostError,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) where
        H: PipHost + Presenter<A>,
    {
        tracer.host_error(now, error);
        if self.state == PipState::Opening {
            self.close(now, LifecycleCause::Failed, host, tracer);
        }
    }

    /// Tears the surface down. Idempotent; returns `true` if the state
    /// changed.
    ///
    /// Stops the render loop and disconnects the play-control observer
    /// regardless of the prior state. Unless the browser already left PiP
    /// ([`LifecycleCause::LeftPip`]), asks the host to exit PiP whenever our
    /// video might still be showing.
    pub fn close<H>(
        &mut self,
        now: HostTime,
        cause: LifecycleCause,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> bool
    where
        H: PipHost + Presenter<A>,
    {
        let from = self.state;
        let live = from != PipState::Closed || host.pip_element_active();
        if live && cause != LifecycleCause::LeftPip {
            if let Err(error) = host.exit_pip(self.window) {
                tracer.host_error(now, &error);
            }
        }

        self.render_loop.stop();
        host.disconnect_play_control();
        self.play_control_observed = false;
        self.window = None;

        if from == PipState::Closed {
            return false;
        }
        self.lifecycle(now, PipState::Closed, cause, tracer);
        true
    }

    /// Forces the hidden video to play or pause (media-session play/pause).
    pub fn force_video<H>(
        &mut self,
        playing: bool,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) where
        H: PipHost + Presenter<A>,
    {
        if self.elements_ready {
            self.set_video(playing, now, host, tracer);
        }
    }

    /// The host reported that an earlier play request was rejected after it
    /// started. Loop frames retry while the track is playing.
    pub fn video_rejected(&mut self) {
        self.video_playing = false;
    }

    /// Applies a snapshot now.
    pub fn apply<H>(
        &mut self,
        info: TrackInfo,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> ApplyEvent
    where
        H: PipHost + Presenter<A>,
    {
        let title_changed = info.title() != self.current.title();
        let playing_changed = info.is_playing() != self.current.is_playing();
        let href_changed = info.href() != self.current.href();

        let incoming = info.artwork_url().map(String::from);
        let previous = self.current.artwork_url().map(String::from);
        let (next, artwork) = match (incoming, previous) {
            (Some(url), old) if old.as_deref() != Some(url.as_str()) => {
                let stamp = host.cache_stamp();
                let request_url = cache_busted(&url, stamp);
                let generation = self.artwork.replace(Some(url));
                host.load_artwork(ArtworkRequest {
                    generation,
                    url: request_url,
                });
                (info, ArtworkChange::Loading { generation })
            }
            (Some(_), _) | (None, None) => (info, ArtworkChange::Unchanged),
            (None, Some(old)) if !href_changed => {
                let kept = info.with_artwork(Some(old));
                (kept, ArtworkChange::Kept)
            }
            (None, Some(_)) => {
                self.artwork.replace(None);
                (info, ArtworkChange::Cleared)
            }
        };
        self.current = next;

        let event = ApplyEvent {
            at: now,
            title_changed,
            playing_changed,
            artwork,
        };
        tracer.apply(&event);

        if playing_changed && self.state != PipState::Closed {
            let playing = self.current.is_playing();
            self.set_video(playing, now, host, tracer);
            if self.state == PipState::Open {
                if playing {
                    self.render_loop
                        .start_at(now + self.config.frame_interval);
                } else {
                    self.render_loop.stop();
                }
            }
        }

        if title_changed || playing_changed {
            self.draw(now, FrameReason::StateChanged, host, tracer);
        } else if artwork == ArtworkChange::Cleared {
            self.draw(now, FrameReason::Artwork, host, tracer);
        }
        event
    }

    /// An artwork load completed. Returns `false` for a stale completion.
    pub fn artwork_loaded<H>(
        &mut self,
        generation: u64,
        image: A,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> bool
    where
        H: PipHost + Presenter<A>,
    {
        if !self.is_live_generation(generation, now, tracer) {
            return false;
        }
        self.artwork.image = Some(image);
        self.artwork.loaded = true;
        self.artwork.errored = false;
        tracer.artwork(&ArtworkEvent {
            at: now,
            generation,
            outcome: ArtworkOutcome::Loaded,
        });
        self.draw(now, FrameReason::Artwork, host, tracer);
        true
    }

    /// An artwork load failed. Returns `false` for a stale completion.
    pub fn artwork_failed<H>(
        &mut self,
        generation: u64,
        now: HostTime,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> bool
    where
        H: PipHost + Presenter<A>,
    {
        if !self.is_live_generation(generation, now, tracer) {
            return false;
        }
        self.artwork.image = None;
        self.artwork.loaded = false;
        self.artwork.errored = true;
        tracer.artwork(&ArtworkEvent {
            at: now,
            generation,
            outcome: ArtworkOutcome::Failed,
        });
        self.draw(now, FrameReason::Artwork, host, tracer);
        true
    }

    /// Runs the pending apply and the render loop if due.
    pub fn service<H>(&mut self, now: HostTime, host: &mut H, tracer: &mut Tracer<'_>)
    where
        H: PipHost + Presenter<A>,
    {
        if let Some(info) = self.pending_apply.take_due(now) {
            self.apply(info, now, host, tracer);
        }
        if self.render_loop.fire_due(now) {
            if self.state == PipState::Open && self.current.is_playing() {
                self.draw(now, FrameReason::Loop, host, tracer);
            } else {
                self.render_loop.stop();
            }
        }
    }

    fn is_live_generation(&self, generation: u64, now: HostTime, tracer: &mut Tracer<'_>) -> bool {
        let live = generation == self.artwork.generation && self.artwork.url.is_some();
        if !live {
            tracer.artwork(&ArtworkEvent {
                at: now,
                generation,
                outcome: ArtworkOutcome::Stale,
            });
        }
        live
    }

    fn set_video<H>(&mut self, playing: bool, now: HostTime, host: &mut H, tracer: &mut Tracer<'_>)
    where
        H: PipHost + Presenter<A>,
    {
        match host.set_video_playing(playing) {
            Ok(()) => self.video_playing = playing,
            Err(error) => {
                tracer.host_error(now, &error);
                if playing {
                    self.video_playing = false;
                }
            }
        }
    }

    fn draw<H>(&mut self, now: HostTime, reason: FrameReason, host: &mut H, tracer: &mut Tracer<'_>)
    where
        H: PipHost + Presenter<A>,
    {
        if !self.elements_ready {
            return;
        }
        {
            let view = match (&self.artwork.image, self.artwork.loaded) {
                (Some(image), true) => ArtworkView::Image(image),
                _ => ArtworkView::Placeholder,
            };
            let frame = compose(&self.config.layout, &self.current, view, |text, font| {
                host.text_width(text, font)
            });
            host.present(&frame);
        }
        self.frames_drawn += 1;
        tracer.frame(&FrameEvent {
            at: now,
            frame_index: self.frames_drawn,
            reason,
        });

        // A rejected play() is retried on loop frames while playing.
        if reason == FrameReason::Loop
            && self.state == PipState::Open
            && self.current.is_playing()
            && !self.video_playing
        {
            self.set_video(true, now, host, tracer);
        }
    }

    fn lifecycle(&mut self, now: HostTime, to: PipState, cause: LifecycleCause, tracer: &mut Tracer<'_>) {
        tracer.lifecycle(&LifecycleEvent {
            at: now,
            from: self.state,
            to,
            cause,
        });
        self.state = to;
    }
}
