// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Click routing on the PiP surface.
//!
//! The surface is split into thirds: previous, play/pause, next.

use alloc::string::String;

use crate::host::HrefStash;
use crate::transport::TransportAction;

/// A horizontal third of the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClickZone {
    /// Left third.
    Previous,
    /// Middle third (boundaries included).
    PlayToggle,
    /// Right third.
    Next,
}

impl ClickZone {
    /// Maps a click at `x` on a surface `width` wide.
    #[must_use]
    pub fn from_x(x: f64, width: f64) -> Self {
        if x < width / 3.0 {
            Self::Previous
        } else if x > width * 2.0 / 3.0 {
            Self::Next
        } else {
            Self::PlayToggle
        }
    }

    /// The transport action for this zone.
    #[must_use]
    pub const fn action(self) -> TransportAction {
        match self {
            Self::Previous => TransportAction::Previous,
            Self::PlayToggle => TransportAction::TogglePlay,
            Self::Next => TransportAction::Next,
        }
    }
}

/// What a click should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickIntent {
    /// Press a transport control.
    Transport(TransportAction),
    /// Navigate the page to a stashed link.
    Navigate(String),
}

/// Resolves a click zone into an intent, updating the href stash.
///
/// - Previous navigates to the stashed link if there is one, otherwise
///   presses previous.
/// - Next stashes the current link (`fresh_href`, from a fresh extraction)
///   and presses next.
/// - The middle zone toggles playback.
pub fn route_click(
    zone: ClickZone,
    stash: &mut impl HrefStash,
    fresh_href: impl FnOnce() -> Option<String>,
) -> ClickIntent {
    match zone {
        ClickZone::Previous => match stash.load() {
            Some(href) => ClickIntent::Navigate(href),
            None => ClickIntent::Transport(TransportAction::Previous),
        },
        ClickZone::Next => {
            if let Some(href) = fresh_href() {
                stash.store(&href);
            }
            ClickIntent::Transport(TransportAction::Next)
        }
        ClickZone::PlayToggle => ClickIntent::Transport(TransportAction::TogglePlay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString as _;

    #[derive(Default)]
    struct Slot(Option<String>);

    impl HrefStash for Slot {
        fn load(&self) -> Option<String> {
            self.0.clone()
        }

        fn store(&mut self, href: &str) {
            self.0 = Some(href.to_string());
        }

        fn clear(&mut self) {
            self.0 = None;
        }
    }

    #[test]
    fn zones_split_in_thirds() {
        let w = 480.0;
        assert_eq!(ClickZone::from_x(0.0, w), ClickZone::Previous, "left edge");
        assert_eq!(ClickZone::from_x(159.9, w), ClickZone::Previous, "just inside the first third");
        assert_eq!(ClickZone::from_x(160.0, w), ClickZone::PlayToggle, "second third starts");
        assert_eq!(
            ClickZone::from_x(320.0, w),
            ClickZone::PlayToggle,
            "second third ends inclusive"
        );
        assert_eq!(ClickZone::from_x(320.1, w), ClickZone::Next, "last third");
        assert_eq!(ClickZone::from_x(480.0, w), ClickZone::Next, "right edge");
    }

    #[test]
    fn zone_mapping_is_pure() {
        for x in [0.0, 100.0, 240.0, 400.0] {
            assert_eq!(
                ClickZone::from_x(x, 300.0),
                ClickZone::from_x(x, 300.0),
                "same input, same zone"
            );
        }
    }

    #[test]
    fn previous_prefers_stashed_link() {
        let mut stash = Slot::default();
        assert_eq!(
            route_click(ClickZone::Previous, &mut stash, || None),
            ClickIntent::Transport(TransportAction::Previous),
            "empty stash presses the button"
        );
        stash.store("https://site/a");
        assert_eq!(
            route_click(ClickZone::Previous, &mut stash, || None),
            ClickIntent::Navigate("https://site/a".to_string()),
            "stashed link navigates"
        );
    }

    #[test]
    fn next_stashes_fresh_link() {
        let mut stash = Slot::default();
        let intent = route_click(ClickZone::Next, &mut stash, || {
            Some("https://site/a".to_string())
        });
        assert_eq!(intent, ClickIntent::Transport(TransportAction::Next), "next is a button press");
        assert_eq!(stash.load().as_deref(), Some("https://site/a"), "fresh link stashed");

        // No link on the page: stash untouched.
        route_click(ClickZone::Next, &mut stash, || None);
        assert_eq!(
            stash.load().as_deref(),
            Some("https://site/a"),
            "stash untouched without a link"
        );
    }

    #[test]
    fn middle_toggles() {
        let mut stash = Slot::default();
        assert_eq!(
            route_click(ClickZone::PlayToggle, &mut stash, || unreachable!()),
            ClickIntent::Transport(TransportAction::TogglePlay),
            "middle toggles"
        );
    }
}
