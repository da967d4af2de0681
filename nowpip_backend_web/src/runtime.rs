// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page runtime: one [`Session`] driven by an inbox and a timeout.
//!
//! Browser callbacks never touch the session directly. They push a
//! [`Completion`] onto the [`Inbox`], which arms the [`TimeoutSlot`] for
//! "now". Each tick drains the inbox into the session, services it, and
//! re-arms the slot at [`Session::next_deadline`].
//!
//! ```text
//!   observers ─┐
//!   listeners ─┼──► Inbox ──► tick() ──► Session ──► next_deadline ──┐
//!   promises ──┘                ▲                                    │
//!                               └──────────── TimeoutSlot ◄──────────┘
//! ```

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

use nowpip_core::error::HostError;
use nowpip_core::event::TransportRequest;
use nowpip_core::host::{MediaAction, Platform};
use nowpip_core::mutation::MutationRecord;
use nowpip_core::session::{Session, SessionConfig};
use nowpip_core::time::HostTime;
use nowpip_core::trace::TraceSink;
use wasm_bindgen::JsValue;
use web_sys::HtmlImageElement;

use crate::listen::Listener;
use crate::observer::{Observer, Watch};
use crate::page::DomPage;
use crate::pip::DomPipHost;
use crate::profile::SiteProfile;
use crate::storage::LocalStash;
use crate::timer::TimeoutSlot;

/// Window events that request a transport action without a PiP click.
pub const REQUEST_EVENTS: [(&str, TransportRequest); 3] = [
    ("nowpip-play-toggle", TransportRequest::PlayToggle),
    ("nowpip-next-track", TransportRequest::Next),
    ("nowpip-prev-track", TransportRequest::Previous),
];

/// The browser types a web session runs on.
#[derive(Clone, Copy, Debug)]
pub struct WebPlatform;

impl Platform for WebPlatform {
    type Probe = DomPage;
    type Controls = DomPage;
    type Stash = LocalStash;
    type Artwork = HtmlImageElement;
    type Host = DomPipHost;
}

/// Something that happened outside the session.
#[derive(Debug)]
pub(crate) enum Completion {
    PipGranted(JsValue),
    PipFailed(HostError),
    LeftPip,
    ArtworkLoaded {
        generation: u64,
        image: HtmlImageElement,
    },
    ArtworkFailed {
        generation: u64,
        error: HostError,
    },
    VideoRejected(HostError),
    Mutations(Vec<MutationRecord>),
    PlayControl(Vec<MutationRecord>),
    Click(f64),
    Media(MediaAction),
    Request(TransportRequest),
}

/// Pending completions plus the timeout that delivers them.
#[derive(Debug)]
pub(crate) struct Inbox {
    queue: RefCell<VecDeque<Completion>>,
    timer: TimeoutSlot,
}

impl Inbox {
    fn new(timer: TimeoutSlot) -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            timer,
        }
    }

    /// Queues `completion` and wakes the runtime.
    pub(crate) fn push(&self, completion: Completion) {
        self.queue.borrow_mut().push_back(completion);
        self.timer.arm_now(crate::now());
    }

    fn pop(&self) -> Option<Completion> {
        self.queue.borrow_mut().pop_front()
    }
}

/// The page's single session and everything feeding it.
pub(crate) struct Runtime {
    session: RefCell<Session<WebPlatform>>,
    inbox: Rc<Inbox>,
    page: DomPage,
    player_observer: RefCell<Option<Observer>>,
    listeners: RefCell<Vec<Listener>>,
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runtime")
            .field("session", &self.session)
            .field("observing", &self.player_observer.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Builds the session for the current page and starts driving it.
    pub(crate) fn install(
        profile: SiteProfile,
        config: SessionConfig,
        sink: Box<dyn TraceSink>,
    ) -> Result<Rc<Self>, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let page = DomPage::new(document, profile);
        let now = crate::now();

        let runtime = Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let timer = TimeoutSlot::new(move || {
                if let Some(runtime) = weak.upgrade() {
                    runtime.tick();
                }
            });
            let inbox = Rc::new(Inbox::new(timer));
            let host = DomPipHost::new(page.clone(), config.surface.layout.size, Rc::clone(&inbox));
            let session = Session::new(
                config,
                page.clone(),
                page.clone(),
                LocalStash::open(),
                host,
                sink,
                now,
            );
            Self {
                session: RefCell::new(session),
                inbox,
                page,
                player_observer: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
            }
        });

        runtime.listen(&window)?;
        runtime.ensure_player_observer();
        // Arms the start-up extraction.
        runtime.with_session(|_, _| ());
        Ok(runtime)
    }

    /// Runs `f` on the session, then re-arms the timeout.
    ///
    /// Returns `None` when the session is already borrowed.
    pub(crate) fn with_session<R>(
        &self,
        f: impl FnOnce(&mut Session<WebPlatform>, HostTime) -> R,
    ) -> Option<R> {
        let mut session = self.session.try_borrow_mut().ok()?;
        let now = crate::now();
        let result = f(&mut session, now);
        if let Some(deadline) = session.next_deadline() {
            self.inbox.timer.arm_at(deadline, now);
        }
        Some(result)
    }

    fn listen(self: &Rc<Self>, window: &web_sys::Window) -> Result<(), JsValue> {
        let mut listeners = self.listeners.borrow_mut();

        // Unload is handled synchronously; a queued completion would never
        // be delivered.
        let weak = Rc::downgrade(self);
        listeners.push(Listener::new(window, "beforeunload", move |_| {
            if let Some(runtime) = weak.upgrade() {
                runtime.with_session(|session, now| session.unload(now));
            }
        })?);

        for (kind, request) in REQUEST_EVENTS {
            let inbox = Rc::clone(&self.inbox);
            listeners.push(Listener::new(window, kind, move |_| {
                inbox.push(Completion::Request(request));
            })?);
        }
        Ok(())
    }

    /// Attaches the player-subtree observer once the player exists.
    fn ensure_player_observer(&self) {
        if self.player_observer.borrow().is_some() {
            return;
        }
        let profile = *self.page.profile();
        let Some(root) = self.page.find(profile.observer_root) else {
            return;
        };
        let inbox = Rc::clone(&self.inbox);
        if let Ok(observer) = Observer::observe(&root, Watch::Subtree, profile, move |batch| {
            inbox.push(Completion::Mutations(batch));
        }) {
            *self.player_observer.borrow_mut() = Some(observer);
        }
    }

    fn tick(&self) {
        self.ensure_player_observer();
        let inbox = Rc::clone(&self.inbox);
        let delivered = self.with_session(|session, now| {
            while let Some(completion) = inbox.pop() {
                deliver(session, completion, now);
            }
            session.service(now);
        });
        if delivered.is_none() {
            // Re-entered from inside a session call; try again shortly.
            self.inbox.timer.arm_now(crate::now());
        }
    }
}

fn deliver(session: &mut Session<WebPlatform>, completion: Completion, now: HostTime) {
    match completion {
        Completion::PipGranted(window) => {
            let handle = session.host_mut().adopt_window(window);
            session.pip_granted(handle, now);
        }
        Completion::PipFailed(error) => session.pip_failed(&error, now),
        Completion::LeftPip => {
            session.left_pip(now);
        }
        Completion::ArtworkLoaded { generation, image } => {
            session.artwork_loaded(generation, image, now);
        }
        Completion::ArtworkFailed { generation, error } => {
            session.artwork_failed(generation, &error, now);
        }
        Completion::VideoRejected(error) => session.video_rejected(&error, now),
        Completion::Mutations(batch) => {
            session.on_mutations(&batch, now);
        }
        Completion::PlayControl(batch) => {
            session.on_play_control_mutations(&batch, now);
        }
        Completion::Click(x) => {
            session.on_click(x, now);
        }
        Completion::Media(action) => session.on_media_action(action, now),
        Completion::Request(request) => session.request(request, now),
    }
}
