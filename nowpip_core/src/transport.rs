// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page transport actions.
//!
//! A transport action presses one of the page's own controls and reports
//! when the page is expected to have settled, so the change detector can
//! re-read state at that instant. Missing controls are logged no-ops.

use crate::time::{Duration, HostTime};
use crate::trace::{Tracer, TransportEvent, TransportOutcome, Warning, WarningEvent};

/// A page transport action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportAction {
    /// Skip to the previous track.
    Previous,
    /// Toggle play/pause.
    TogglePlay,
    /// Skip to the next track.
    Next,
}

impl TransportAction {
    /// Short label for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::TogglePlay => "toggle-play",
            Self::Next => "next",
        }
    }
}

/// The page's transport controls.
pub trait TransportControls {
    /// Clicks the control for `action`. Returns `false` if no such control
    /// exists on the page.
    fn press(&mut self, action: TransportAction) -> bool;
}

/// Settle delays after transport actions.
#[derive(Clone, Copy, Debug)]
pub struct TransportConfig {
    /// Wait after next/previous before re-reading state.
    pub skip_settle: Duration,
    /// Wait after play/pause before re-reading state.
    pub toggle_settle: Duration,
}

impl TransportConfig {
    /// Delays observed on the supported site.
    #[must_use]
    pub const fn web() -> Self {
        Self {
            skip_settle: Duration::from_millis(800),
            toggle_settle: Duration::from_millis(500),
        }
    }

    /// The settle delay for `action`.
    #[must_use]
    pub const fn settle_for(&self, action: TransportAction) -> Duration {
        match action {
            TransportAction::Previous | TransportAction::Next => self.skip_settle,
            TransportAction::TogglePlay => self.toggle_settle,
        }
    }
}

/// Presses transport controls and computes settle instants.
#[derive(Clone, Copy, Debug)]
pub struct Transport {
    config: TransportConfig,
}

impl Transport {
    /// Creates a transport with the given delays.
    #[must_use]
    pub const fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// The configured delays.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Presses the control for `action`.
    ///
    /// Returns the settle instant if the control existed, `None` otherwise.
    /// Never fails.
    pub fn trigger(
        &self,
        action: TransportAction,
        controls: &mut impl TransportControls,
        now: HostTime,
        tracer: &mut Tracer<'_>,
    ) -> Option<HostTime> {
        if !controls.press(action) {
            tracer.warning(&WarningEvent {
                at: now,
                warning: Warning::MissingControl(action),
            });
            tracer.transport(&TransportEvent {
                at: now,
                action,
                outcome: TransportOutcome::Missing,
            });
            return None;
        }
        let settle_at = now + self.config.settle_for(action);
        tracer.transport(&TransportEvent {
            at: now,
            action,
            outcome: TransportOutcome::Pressed { settle_at },
        });
        Some(settle_at)
    }
}
