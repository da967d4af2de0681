// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The session: one owned instance wiring scraper, detector and surface.
//!
//! ```text
//!   Scraper ──► ChangeDetector ──► Event::TrackChanged ──► PipSurface
//!      ▲                                                      │
//!      │ settle             Event::Request ◄── clicks, media session
//!      └──────── Transport ◄──────┘
//! ```
//!
//! A host owns exactly one [`Session`], feeds it host events (mutation
//! batches, clicks, PiP and artwork completions) and calls
//! [`Session::service`] whenever [`Session::next_deadline`] passes. Every
//! method is synchronous and infallible; failures become warning trace
//! events.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use crate::detect::{ChangeDetector, DetectorConfig};
use crate::error::HostError;
use crate::event::{Event, EventQueue, HostCommand, TransportRequest};
use crate::host::{HrefStash, MediaAction, PipHost, Platform, WindowHandle};
use crate::input::{ClickIntent, route_click};
use crate::mutation::MutationRecord;
use crate::scrape::{Scraper, TrackInfoSource};
use crate::surface::{MediaSessionState, OpenOutcome, PipState, PipSurface, SurfaceConfig};
use crate::time::HostTime;
use crate::trace::{LifecycleCause, TraceSink, Tracer, TransportEvent, TransportOutcome};
use crate::track::TrackInfo;
use crate::transport::{Transport, TransportAction, TransportConfig};

/// Configuration for every component of a session.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Change detector timing.
    pub detector: DetectorConfig,
    /// Transport settle delays.
    pub transport: TransportConfig,
    /// Surface timing and layout.
    pub surface: SurfaceConfig,
}

impl SessionConfig {
    /// Defaults for the web backend.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            detector: DetectorConfig::web(),
            transport: TransportConfig::web(),
            surface: SurfaceConfig::web(),
        }
    }
}

/// A diagnostic snapshot of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceStatus {
    /// Lifecycle state.
    pub state: PipState,
    /// Whether the browser reports our video in PiP.
    pub pip_element_active: bool,
    /// Granted window, while open.
    pub window: Option<WindowHandle>,
    /// Last applied snapshot.
    pub track: TrackInfo,
    /// Artwork entry URL.
    pub artwork_url: Option<String>,
    /// Artwork decoded.
    pub artwork_loaded: bool,
    /// Artwork failed.
    pub artwork_errored: bool,
    /// Render loop running.
    pub render_loop_active: bool,
    /// Poll interval running.
    pub polling: bool,
    /// Play-control observer connected.
    pub play_control_observed: bool,
    /// Media-session handlers.
    pub media_session: MediaSessionState,
    /// Frames presented so far.
    pub frames_drawn: u64,
    /// Hidden video last asked to play successfully.
    pub video_playing: bool,
}

/// The single owned synchronization instance for a page.
pub struct Session<P: Platform> {
    config: SessionConfig,
    scraper: Scraper<P::Probe>,
    controls: P::Controls,
    stash: P::Stash,
    host: P::Host,
    transport: Transport,
    detector: ChangeDetector,
    surface: PipSurface<P::Artwork>,
    events: EventQueue,
    sink: Box<dyn TraceSink>,
}

impl<P: Platform> fmt::Debug for Session<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.surface.state())
            .field("detector", &self.detector.state())
            .field("queued_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl<P: Platform> Session<P> {
    /// Creates a session for a freshly loaded page.
    ///
    /// Clears the href stash and schedules the start-up extraction.
    pub fn new(
        config: SessionConfig,
        probe: P::Probe,
        controls: P::Controls,
        mut stash: P::Stash,
        host: P::Host,
        sink: Box<dyn TraceSink>,
        now: HostTime,
    ) -> Self {
        stash.clear();
        let mut detector = ChangeDetector::new(config.detector);
        detector.start(now);
        Self {
            config,
            scraper: Scraper::new(probe),
            controls,
            stash,
            host,
            transport: Transport::new(config.transport),
            detector,
            surface: PipSurface::new(config.surface),
            events: EventQueue::new(),
            sink,
        }
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The page probe.
    pub fn probe(&self) -> &P::Probe {
        self.scraper.probe()
    }

    /// Mutable access to the page probe.
    pub fn probe_mut(&mut self) -> &mut P::Probe {
        self.scraper.probe_mut()
    }

    /// The PiP host.
    pub fn host(&self) -> &P::Host {
        &self.host
    }

    /// Mutable access to the PiP host.
    pub fn host_mut(&mut self) -> &mut P::Host {
        &mut self.host
    }

    /// The href stash.
    pub fn stash(&self) -> &P::Stash {
        &self.stash
    }

    /// The change detector.
    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    /// The PiP surface.
    pub fn surface(&self) -> &PipSurface<P::Artwork> {
        &self.surface
    }

    /// Handles a host command.
    pub fn command(&mut self, command: HostCommand, now: HostTime) {
        match command {
            HostCommand::OpenPip => {
                self.open_pip(now);
            }
            HostCommand::ClosePip => {
                self.close_pip(now);
            }
        }
    }

    /// Opens PiP with a freshly extracted snapshot.
    pub fn open_pip(&mut self, now: HostTime) -> OpenOutcome {
        let mut tracer = Tracer::new(&mut *self.sink);
        let latest = self.scraper.extract(&mut tracer);
        let outcome = self
            .surface
            .open(latest.clone(), now, &mut self.host, &mut tracer);
        let applied = matches!(outcome, OpenOutcome::Requested | OpenOutcome::Failed)
            && self.surface.current().snapshot_eq(&latest);
        if applied {
            self.detector.record_published(&latest);
        }
        // Polling restarts on grant.
        if outcome == OpenOutcome::Requested || self.surface.state() == PipState::Closed {
            self.detector.stop_polling();
        }
        outcome
    }

    /// Closes PiP on request.
    pub fn close_pip(&mut self, now: HostTime) -> bool {
        self.teardown(now, LifecycleCause::CloseRequested)
    }

    /// The browser granted the PiP window.
    pub fn pip_granted(&mut self, window: WindowHandle, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        if self
            .surface
            .pip_granted(window, now, &mut self.host, &mut tracer)
        {
            self.detector.start_polling(now);
            self.detector
                .schedule_settle(now + self.config.surface.open_settle);
        }
    }

    /// The PiP request failed.
    pub fn pip_failed(&mut self, error: &HostError, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        self.surface
            .pip_failed(error, now, &mut self.host, &mut tracer);
        self.detector.stop_polling();
    }

    /// The browser left PiP on its own.
    pub fn left_pip(&mut self, now: HostTime) -> bool {
        self.teardown(now, LifecycleCause::LeftPip)
    }

    /// The page is unloading.
    pub fn unload(&mut self, now: HostTime) -> bool {
        self.teardown(now, LifecycleCause::Unload)
    }

    /// Feeds a batch from the player-subtree observer.
    pub fn on_mutations(&mut self, batch: &[MutationRecord], now: HostTime) -> bool {
        self.detector.on_mutations(batch, now)
    }

    /// Feeds a batch from the play-control observer.
    pub fn on_play_control_mutations(&mut self, batch: &[MutationRecord], now: HostTime) -> bool {
        self.detector.on_play_control(batch, now)
    }

    /// Routes a click at `x` (surface coordinates).
    pub fn on_click(&mut self, x: f64, now: HostTime) -> ClickIntent {
        let zone = self.surface.click_zone(x);
        let mut tracer = Tracer::new(&mut *self.sink);
        let scraper = &self.scraper;
        let intent = route_click(zone, &mut self.stash, || {
            scraper.extract(&mut tracer).href().map(String::from)
        });

        match &intent {
            ClickIntent::Navigate(href) => match self.host.navigate(href) {
                Ok(()) => tracer.transport(&TransportEvent {
                    at: now,
                    action: TransportAction::Previous,
                    outcome: TransportOutcome::Navigated,
                }),
                Err(error) => {
                    tracer.host_error(now, &error);
                    self.events.push(Event::Request(TransportRequest::Previous));
                }
            },
            ClickIntent::Transport(action) => {
                if *action == TransportAction::TogglePlay {
                    self.detector
                        .schedule_settle(now + self.config.surface.toggle_refresh);
                }
                self.events.push(Event::Request((*action).into()));
            }
        }
        self.pump(now);
        intent
    }

    /// Handles a media-session action.
    ///
    /// Play and pause only toggle the page when it is in the other state,
    /// then force the hidden video to match.
    pub fn on_media_action(&mut self, action: MediaAction, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        match action {
            MediaAction::Play | MediaAction::Pause => {
                let want = action == MediaAction::Play;
                if self.scraper.extract(&mut tracer).is_playing() != want {
                    self.events
                        .push(Event::Request(TransportRequest::PlayToggle));
                }
                self.surface
                    .force_video(want, now, &mut self.host, &mut tracer);
            }
            MediaAction::PreviousTrack => {
                self.events.push(Event::Request(TransportRequest::Previous));
            }
            MediaAction::NextTrack => {
                self.events.push(Event::Request(TransportRequest::Next));
            }
            MediaAction::Stop => {
                self.teardown(now, LifecycleCause::CloseRequested);
                return;
            }
        }
        self.pump(now);
    }

    /// Queues a transport request from any other source.
    pub fn request(&mut self, request: TransportRequest, now: HostTime) {
        self.events.push(Event::Request(request));
        self.pump(now);
    }

    /// An artwork load completed.
    pub fn artwork_loaded(&mut self, generation: u64, image: P::Artwork, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        self.surface
            .artwork_loaded(generation, image, now, &mut self.host, &mut tracer);
    }

    /// An artwork load failed.
    pub fn artwork_failed(&mut self, generation: u64, error: &HostError, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        tracer.host_error(now, error);
        self.surface
            .artwork_failed(generation, now, &mut self.host, &mut tracer);
    }

    /// The hidden video rejected a play request after it was started.
    pub fn video_rejected(&mut self, error: &HostError, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        tracer.host_error(now, error);
        self.surface.video_rejected();
    }

    /// Runs everything due at `now`.
    pub fn service(&mut self, now: HostTime) {
        {
            let mut tracer = Tracer::new(&mut *self.sink);
            if let Some(info) = self.detector.service(now, &self.scraper, &mut tracer) {
                self.events.push(Event::TrackChanged(info));
            }
        }
        self.pump(now);
        let mut tracer = Tracer::new(&mut *self.sink);
        self.surface.service(now, &mut self.host, &mut tracer);
    }

    /// The earliest instant at which [`service`](Self::service) has work.
    #[must_use]
    pub fn next_deadline(&self) -> Option<HostTime> {
        match (self.detector.next_deadline(), self.surface.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// A diagnostic snapshot.
    #[must_use]
    pub fn status(&self) -> SurfaceStatus {
        let artwork = self.surface.artwork();
        SurfaceStatus {
            state: self.surface.state(),
            pip_element_active: self.host.pip_element_active(),
            window: self.surface.window(),
            track: self.surface.current().clone(),
            artwork_url: artwork.url().map(String::from),
            artwork_loaded: artwork.is_loaded(),
            artwork_errored: artwork.is_errored(),
            render_loop_active: self.surface.render_loop_active(),
            polling: self.detector.is_polling(),
            play_control_observed: self.surface.play_control_observed(),
            media_session: self.surface.media_session(),
            frames_drawn: self.surface.frames_drawn(),
            video_playing: self.surface.video_playing(),
        }
    }

    fn teardown(&mut self, now: HostTime, cause: LifecycleCause) -> bool {
        let mut tracer = Tracer::new(&mut *self.sink);
        self.detector.stop_polling();
        self.surface.close(now, cause, &mut self.host, &mut tracer)
    }

    fn pump(&mut self, now: HostTime) {
        let mut tracer = Tracer::new(&mut *self.sink);
        while let Some(event) = self.events.pop() {
            match event {
                Event::TrackChanged(info) => self.surface.on_track_changed(info, now),
                Event::Request(request) => {
                    let action = TransportAction::from(request);
                    if let Some(settle) =
                        self.transport
                            .trigger(action, &mut self.controls, now, &mut tracer)
                    {
                        self.detector.schedule_settle(settle);
                    }
                }
            }
        }
    }
}
