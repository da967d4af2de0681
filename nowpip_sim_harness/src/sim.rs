// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The simulation driver and virtual clock.

use alloc::boxed::Box;
use alloc::string::String;

use nowpip_core::error::{HostError, Operation};
use nowpip_core::event::TransportRequest;
use nowpip_core::host::{HrefStash, MediaAction, Platform, WindowHandle};
use nowpip_core::input::ClickIntent;
use nowpip_core::mutation::MutationRecord;
use nowpip_core::session::{Session, SessionConfig, SurfaceStatus};
use nowpip_core::surface::OpenOutcome;
use nowpip_core::time::{Duration, HostTime};

use crate::host::{RecordingHost, SimImage};
use crate::page::ScriptedPage;
use crate::trace::RecordingSink;

/// Upper bound on deadlines serviced by one [`Simulation::advance`].
const MAX_STEPS: usize = 10_000;

/// An in-memory [`HrefStash`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStash {
    href: Option<String>,
}

impl MemoryStash {
    /// A stash holding `href`.
    #[must_use]
    pub fn holding(href: &str) -> Self {
        Self {
            href: Some(String::from(href)),
        }
    }

    /// The stashed link.
    #[must_use]
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}

impl HrefStash for MemoryStash {
    fn load(&self) -> Option<String> {
        self.href.clone()
    }

    fn store(&mut self, href: &str) {
        self.href = Some(String::from(href));
    }

    fn clear(&mut self) {
        self.href = None;
    }
}

/// The simulated host types.
#[derive(Clone, Copy, Debug)]
pub struct SimPlatform;

impl Platform for SimPlatform {
    type Probe = ScriptedPage;
    type Controls = ScriptedPage;
    type Stash = MemoryStash;
    type Artwork = SimImage;
    type Host = RecordingHost;
}

/// A session on a scripted page with a virtual clock.
#[derive(Debug)]
pub struct Simulation {
    session: Session<SimPlatform>,
    page: ScriptedPage,
    trace: RecordingSink,
    now: HostTime,
    next_window: u32,
}

impl Simulation {
    /// Starts a session on `page` at time zero with web defaults.
    #[must_use]
    pub fn new(page: ScriptedPage) -> Self {
        Self::with_config(SessionConfig::web(), page, RecordingHost::new())
    }

    /// Starts a session with explicit configuration and host.
    #[must_use]
    pub fn with_config(config: SessionConfig, page: ScriptedPage, host: RecordingHost) -> Self {
        let trace = RecordingSink::new();
        let now = HostTime(0);
        let session = Session::new(
            config,
            page.clone(),
            page.clone(),
            MemoryStash::default(),
            host,
            Box::new(trace.clone()),
            now,
        );
        Self {
            session,
            page,
            trace,
            now,
            next_window: 1,
        }
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> HostTime {
        self.now
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Session<SimPlatform> {
        &self.session
    }

    /// Mutable access to the session.
    pub fn session_mut(&mut self) -> &mut Session<SimPlatform> {
        &mut self.session
    }

    /// The page.
    #[must_use]
    pub const fn page(&self) -> &ScriptedPage {
        &self.page
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &RecordingHost {
        self.session.host()
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut RecordingHost {
        self.session.host_mut()
    }

    /// The trace log.
    #[must_use]
    pub const fn trace(&self) -> &RecordingSink {
        &self.trace
    }

    /// The session's diagnostic snapshot.
    #[must_use]
    pub fn status(&self) -> SurfaceStatus {
        self.session.status()
    }

    /// The href stash.
    #[must_use]
    pub fn stash(&self) -> &MemoryStash {
        self.session.stash()
    }

    /// Services the next deadline, moving the clock to it. Returns the
    /// serviced instant, or `None` when nothing is scheduled.
    pub fn step(&mut self) -> Option<HostTime> {
        let deadline = self.session.next_deadline()?;
        self.now = self.now.max(deadline);
        self.session.service(self.now);
        Some(self.now)
    }

    /// Moves the clock forward by `by`, servicing every deadline on the way.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        for _ in 0..MAX_STEPS {
            match self.session.next_deadline() {
                Some(deadline) if deadline <= target => {
                    self.step();
                }
                _ => break,
            }
        }
        self.now = self.now.max(target);
    }

    /// [`advance`](Self::advance) in milliseconds.
    pub fn advance_ms(&mut self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Runs past the start-up extraction and its apply.
    pub fn boot(&mut self) {
        let config = *self.session.config();
        self.advance(config.detector.initial_delay + config.surface.apply_debounce);
    }

    /// Services deadlines until `done` holds. Returns `false` if nothing was
    /// left to service first.
    pub fn run_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> bool {
        for _ in 0..MAX_STEPS {
            if done(&*self) {
                return true;
            }
            if self.step().is_none() {
                return done(&*self);
            }
        }
        false
    }

    /// A user gesture opens PiP.
    pub fn open_pip(&mut self) -> OpenOutcome {
        self.session.open_pip(self.now)
    }

    /// A user closes PiP.
    pub fn close_pip(&mut self) -> bool {
        self.session.close_pip(self.now)
    }

    /// The browser grants the outstanding PiP request. Returns the window,
    /// or `None` if no request was outstanding.
    pub fn grant_pip(&mut self) -> Option<WindowHandle> {
        if !self.session.host_mut().grant() {
            return None;
        }
        let window = WindowHandle(self.next_window);
        self.next_window += 1;
        self.session.pip_granted(window, self.now);
        Some(window)
    }

    /// Opens PiP and grants the request.
    pub fn open_and_grant(&mut self) -> Option<WindowHandle> {
        match self.open_pip() {
            OpenOutcome::Requested => self.grant_pip(),
            _ => None,
        }
    }

    /// The browser rejects the outstanding PiP request.
    pub fn deny_pip(&mut self) -> bool {
        if !self.session.host_mut().deny() {
            return false;
        }
        let error = HostError::rejected(Operation::RequestPip, "NotAllowedError");
        self.session.pip_failed(&error, self.now);
        true
    }

    /// The user closes the PiP window from the browser chrome.
    pub fn leave_pip(&mut self) -> bool {
        self.session.host_mut().drop_pip();
        self.session.left_pip(self.now)
    }

    /// Completes every outstanding artwork load successfully. Returns how
    /// many completed.
    pub fn finish_artwork_loads(&mut self) -> usize {
        let loads = self.session.host_mut().take_loads();
        let count = loads.len();
        for load in loads {
            let image = SimImage { url: load.url };
            self.session.artwork_loaded(load.generation, image, self.now);
        }
        count
    }

    /// Fails every outstanding artwork load. Returns how many failed.
    pub fn fail_artwork_loads(&mut self) -> usize {
        let loads = self.session.host_mut().take_loads();
        let count = loads.len();
        for load in loads {
            let error = HostError::rejected(Operation::LoadArtwork, "decode failed");
            self.session.artwork_failed(load.generation, &error, self.now);
        }
        count
    }

    /// The player subtree reports a text change.
    pub fn page_mutated(&mut self) -> bool {
        self.session
            .on_mutations(&[MutationRecord::CharacterData], self.now)
    }

    /// Feeds an arbitrary mutation batch.
    pub fn mutations(&mut self, batch: &[MutationRecord]) -> bool {
        self.session.on_mutations(batch, self.now)
    }

    /// The play control's class changes.
    pub fn play_control_changed(&mut self) -> bool {
        self.session
            .on_play_control_mutations(&[MutationRecord::attribute("class")], self.now)
    }

    /// A click at `x` on the surface.
    pub fn click(&mut self, x: f64) -> ClickIntent {
        self.session.on_click(x, self.now)
    }

    /// A click in the middle of the zone for `fraction` of the width.
    pub fn click_at_fraction(&mut self, fraction: f64) -> ClickIntent {
        let width = self.session.config().surface.layout.size.width;
        self.click(width * fraction)
    }

    /// A media-session action.
    pub fn media(&mut self, action: MediaAction) {
        self.session.on_media_action(action, self.now);
    }

    /// A transport request from outside the surface.
    pub fn request(&mut self, request: TransportRequest) {
        self.session.request(request, self.now);
    }

    /// The page unloads.
    pub fn unload(&mut self) -> bool {
        self.session.unload(self.now)
    }
}
