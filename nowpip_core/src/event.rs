// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed events between the detector, the surface and the transport.

use alloc::collections::VecDeque;

use crate::track::TrackInfo;
use crate::transport::TransportAction;

/// Commands a host issues on behalf of the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostCommand {
    /// Open the PiP window.
    OpenPip,
    /// Close the PiP window.
    ClosePip,
}

/// A request to press a page transport control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportRequest {
    /// Previous track.
    Previous,
    /// Next track.
    Next,
    /// Play/pause.
    PlayToggle,
}

impl From<TransportRequest> for TransportAction {
    fn from(request: TransportRequest) -> Self {
        match request {
            TransportRequest::Previous => Self::Previous,
            TransportRequest::Next => Self::Next,
            TransportRequest::PlayToggle => Self::TogglePlay,
        }
    }
}

impl From<TransportAction> for TransportRequest {
    fn from(action: TransportAction) -> Self {
        match action {
            TransportAction::Previous => Self::Previous,
            TransportAction::Next => Self::Next,
            TransportAction::TogglePlay => Self::PlayToggle,
        }
    }
}

/// An event on the session queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The detector published a new snapshot.
    TrackChanged(TrackInfo),
    /// Something asked for a transport action.
    Request(TransportRequest),
}

/// FIFO of pending events.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Appends an event.
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Removes the oldest event.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let mut q = EventQueue::new();
        q.push(Event::Request(TransportRequest::Next));
        q.push(Event::TrackChanged(TrackInfo::default()));
        assert_eq!(q.len(), 2, "both queued");
        assert_eq!(q.pop(), Some(Event::Request(TransportRequest::Next)), "first in, first out");
        assert!(matches!(q.pop(), Some(Event::TrackChanged(_))), "then the track change");
        assert!(q.is_empty(), "drained");
    }

    #[test]
    fn request_action_mapping_round_trips() {
        for request in [
            TransportRequest::Previous,
            TransportRequest::Next,
            TransportRequest::PlayToggle,
        ] {
            let action = TransportAction::from(request);
            assert_eq!(TransportRequest::from(action), request, "maps back to the request");
        }
    }
}
