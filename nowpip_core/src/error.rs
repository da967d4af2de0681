// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host failure taxonomy.
//!
//! Nothing in the core propagates these out of a periodic callback. Hosts
//! return them from [`PipHost`](crate::host::PipHost) methods; the surface
//! turns each one into a warning trace event and keeps its last known good
//! state.

use alloc::string::String;
use core::fmt;

/// A browser capability the host may lack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Element picture-in-picture (`requestPictureInPicture`).
    PictureInPicture,
    /// OS/browser media-session action handlers.
    MediaSession,
    /// Canvas capture streams feeding the hidden video.
    CaptureStream,
    /// Persistent page storage for the href stash.
    Storage,
}

impl Capability {
    /// Short label for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PictureInPicture => "picture-in-picture",
            Self::MediaSession => "media-session",
            Self::CaptureStream => "capture-stream",
            Self::Storage => "storage",
        }
    }
}

/// An asynchronous or fallible host operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Creating the canvas/video/stream triple.
    CreateElements,
    /// Requesting the PiP window.
    RequestPip,
    /// Leaving PiP and closing the window handle.
    ExitPip,
    /// Starting or pausing the hidden video.
    Playback,
    /// Loading an artwork image.
    LoadArtwork,
    /// Observing the play control for class changes.
    ObservePlayControl,
    /// Navigating the page to a stashed href.
    Navigate,
}

impl Operation {
    /// Short label for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateElements => "create-elements",
            Self::RequestPip => "request-pip",
            Self::ExitPip => "exit-pip",
            Self::Playback => "playback",
            Self::LoadArtwork => "load-artwork",
            Self::ObservePlayControl => "observe-play-control",
            Self::Navigate => "navigate",
        }
    }
}

/// Errors reported by a host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The browser lacks a capability. Detected once, never retried.
    Unavailable(Capability),
    /// An operation was rejected (activation policy, decode failure, ...).
    Rejected {
        /// What was attempted.
        operation: Operation,
        /// Host-provided description.
        reason: String,
    },
    /// An element the operation needs does not exist.
    MissingElement(&'static str),
}

impl HostError {
    /// Shorthand for [`HostError::Rejected`].
    #[must_use]
    pub fn rejected(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(capability) => {
                write!(f, "{} is not available", capability.as_str())
            }
            Self::Rejected { operation, reason } => {
                write!(f, "{} rejected: {reason}", operation.as_str())
            }
            Self::MissingElement(what) => write!(f, "missing element: {what}"),
        }
    }
}

impl core::error::Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString as _;

    #[test]
    fn display_is_readable() {
        assert_eq!(
            HostError::Unavailable(Capability::MediaSession).to_string(),
            "media-session is not available",
            "capability named"
        );
        assert_eq!(
            HostError::rejected(Operation::Playback, "NotAllowedError").to_string(),
            "playback rejected: NotAllowedError",
            "operation and reason"
        );
        assert_eq!(
            HostError::MissingElement("video").to_string(),
            "missing element: video",
            "element named"
        );
    }
}
