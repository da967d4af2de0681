// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A trace sink that keeps owned copies of every event.

use alloc::rc::Rc;
use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use core::cell::RefCell;

use nowpip_core::detect::TriggerSource;
use nowpip_core::trace::{
    ApplyEvent, ArtworkEvent, ExtractEvent, FrameEvent, LifecycleEvent, PublishEvent,
    SuppressedEvent, TraceSink, TransportEvent, Warning, WarningEvent,
};
use nowpip_core::time::HostTime;
use nowpip_core::track::TrackInfo;
use nowpip_core::transport::TransportAction;

/// One traced event, with borrowed payloads made owned.
#[derive(Clone, Debug)]
pub enum Traced {
    /// An extraction.
    Extract(ExtractEvent),
    /// A published snapshot.
    Publish {
        /// When.
        at: HostTime,
        /// Winning trigger.
        source: TriggerSource,
        /// The snapshot.
        info: TrackInfo,
    },
    /// An unchanged extraction.
    Suppressed(SuppressedEvent),
    /// A surface apply.
    Apply(ApplyEvent),
    /// An artwork completion.
    Artwork(ArtworkEvent),
    /// A lifecycle transition.
    Lifecycle(LifecycleEvent),
    /// A transport press.
    Transport(TransportEvent),
    /// A presented frame.
    Frame(FrameEvent),
    /// A missing control.
    MissingControl {
        /// When.
        at: HostTime,
        /// Which control.
        action: TransportAction,
    },
    /// A host error, as display text.
    HostError {
        /// When.
        at: HostTime,
        /// The error message.
        message: String,
    },
}

/// Records into a shared log; clones append to the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    log: Rc<RefCell<Vec<Traced>>>,
}

impl RecordingSink {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the log.
    #[must_use]
    pub fn events(&self) -> Vec<Traced> {
        self.log.borrow().clone()
    }

    /// Number of events matching `f`.
    pub fn count(&self, f: impl Fn(&Traced) -> bool) -> usize {
        self.log.borrow().iter().filter(|e| f(e)).count()
    }

    /// Number of events recorded so far; use as a mark for [`since`](Self::since).
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Events recorded after `mark`.
    #[must_use]
    pub fn since(&self, mark: usize) -> Vec<Traced> {
        self.log.borrow().get(mark..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Snapshots published so far.
    #[must_use]
    pub fn published(&self) -> Vec<TrackInfo> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Traced::Publish { info, .. } => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    /// Host error messages so far.
    #[must_use]
    pub fn host_errors(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Traced::HostError { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Traced) {
        self.log.borrow_mut().push(event);
    }
}

impl TraceSink for RecordingSink {
    fn on_extract(&mut self, e: &ExtractEvent) {
        self.push(Traced::Extract(*e));
    }

    fn on_publish(&mut self, e: &PublishEvent<'_>) {
        self.push(Traced::Publish {
            at: e.at,
            source: e.source,
            info: e.info.clone(),
        });
    }

    fn on_suppressed(&mut self, e: &SuppressedEvent) {
        self.push(Traced::Suppressed(*e));
    }

    fn on_apply(&mut self, e: &ApplyEvent) {
        self.push(Traced::Apply(*e));
    }

    fn on_artwork(&mut self, e: &ArtworkEvent) {
        self.push(Traced::Artwork(*e));
    }

    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.push(Traced::Lifecycle(*e));
    }

    fn on_transport(&mut self, e: &TransportEvent) {
        self.push(Traced::Transport(*e));
    }

    fn on_frame(&mut self, e: &FrameEvent) {
        self.push(Traced::Frame(*e));
    }

    fn on_warning(&mut self, e: &WarningEvent<'_>) {
        self.push(match e.warning {
            Warning::MissingControl(action) => Traced::MissingControl { at: e.at, action },
            Warning::Host(error) => Traced::HostError {
                at: e.at,
                message: error.to_string(),
            },
        });
    }
}
