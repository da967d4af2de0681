// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted streaming page.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use nowpip_core::scrape::{ArtworkSource, PageProbe, PlaySignal, TitleSource};
use nowpip_core::transport::{TransportAction, TransportControls};

/// One playlist entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptedTrack {
    /// Title text as the page shows it (untrimmed).
    pub title: String,
    /// Artwork URL as the page shows it, before upscaling.
    pub artwork: Option<String>,
    /// Track link.
    pub href: Option<String>,
}

impl ScriptedTrack {
    /// A track with a title, optional artwork and optional link.
    #[must_use]
    pub fn new(title: &str, artwork: Option<&str>, href: Option<&str>) -> Self {
        Self {
            title: String::from(title),
            artwork: artwork.map(String::from),
            href: href.map(String::from),
        }
    }
}

/// Everything the scripted page shows.
#[derive(Clone, Debug)]
pub struct PageState {
    /// The queue; `index` is the loaded track.
    pub playlist: Vec<ScriptedTrack>,
    /// Loaded track.
    pub index: usize,
    /// Whether the player is playing.
    pub playing: bool,
    /// Where the title is rendered; `None` hides it.
    pub title_source: Option<TitleSource>,
    /// Where the artwork is rendered; `None` hides it.
    pub artwork_source: Option<ArtworkSource>,
    /// The signal the player exposes while playing.
    pub play_signal: PlaySignal,
    /// `document.title`.
    pub document_title: String,
    /// Whether the transport buttons exist.
    pub controls_present: bool,
    /// Every successful button press, in order.
    pub presses: Vec<TransportAction>,
}

impl PageState {
    /// The loaded track, if the playlist is not empty.
    #[must_use]
    pub fn track(&self) -> Option<&ScriptedTrack> {
        self.playlist.get(self.index)
    }
}

/// A page backed by a shared [`PageState`].
///
/// Clones share state, so the session's probe and controls and the test all
/// see the same page.
#[derive(Clone, Debug)]
pub struct ScriptedPage {
    state: Rc<RefCell<PageState>>,
}

impl ScriptedPage {
    /// A paused page with the mini player showing the first track.
    #[must_use]
    pub fn new(playlist: Vec<ScriptedTrack>) -> Self {
        Self {
            state: Rc::new(RefCell::new(PageState {
                playlist,
                index: 0,
                playing: false,
                title_source: Some(TitleSource::MiniPlayer),
                artwork_source: Some(ArtworkSource::MiniPlayerAvatar),
                play_signal: PlaySignal::PlayingStateClass,
                document_title: String::from("SoundCloud"),
                controls_present: true,
                presses: Vec::new(),
            })),
        }
    }

    /// A page with a single track.
    #[must_use]
    pub fn single(track: ScriptedTrack) -> Self {
        Self::new(alloc::vec![track])
    }

    /// Mutates the page.
    pub fn edit<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// Reads the page.
    pub fn read<R>(&self, f: impl FnOnce(&PageState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Starts or pauses the player.
    pub fn set_playing(&self, playing: bool) {
        self.edit(|s| s.playing = playing);
    }

    /// Replaces the loaded track in place.
    pub fn replace_track(&self, track: ScriptedTrack) {
        self.edit(|s| {
            let index = s.index;
            match s.playlist.get_mut(index) {
                Some(slot) => *slot = track,
                None => s.playlist.push(track),
            }
        });
    }

    /// Loads the playlist entry whose link is `href`, as a navigation would.
    /// Returns `false` if no entry matches.
    pub fn load_href(&self, href: &str) -> bool {
        self.edit(|s| {
            let found = s
                .playlist
                .iter()
                .position(|t| t.href.as_deref() == Some(href));
            if let Some(index) = found {
                s.index = index;
            }
            found.is_some()
        })
    }

    /// Button presses so far.
    #[must_use]
    pub fn presses(&self) -> Vec<TransportAction> {
        self.read(|s| s.presses.clone())
    }
}

impl PageProbe for ScriptedPage {
    fn title(&self, source: TitleSource) -> Option<String> {
        self.read(|s| {
            if s.title_source == Some(source) {
                s.track().map(|t| t.title.clone())
            } else {
                None
            }
        })
    }

    fn document_title(&self) -> String {
        self.read(|s| s.document_title.clone())
    }

    fn track_link(&self) -> Option<String> {
        self.read(|s| s.track().and_then(|t| t.href.clone()))
    }

    fn artwork(&self, source: ArtworkSource) -> Option<String> {
        self.read(|s| {
            if s.artwork_source == Some(source) {
                s.track().and_then(|t| t.artwork.clone())
            } else {
                None
            }
        })
    }

    fn play_signal(&self, signal: PlaySignal) -> bool {
        self.read(|s| s.playing && s.play_signal == signal)
    }
}

impl TransportControls for ScriptedPage {
    fn press(&mut self, action: TransportAction) -> bool {
        self.edit(|s| {
            if !s.controls_present {
                return false;
            }
            match action {
                TransportAction::TogglePlay => s.playing = !s.playing,
                TransportAction::Next => {
                    if s.index + 1 < s.playlist.len() {
                        s.index += 1;
                    }
                }
                TransportAction::Previous => s.index = s.index.saturating_sub(1),
            }
            s.presses.push(action);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn two_tracks() -> ScriptedPage {
        ScriptedPage::new(vec![
            ScriptedTrack::new("Song A", None, Some("/a")),
            ScriptedTrack::new("Song B", None, Some("/b")),
        ])
    }

    #[test]
    fn buttons_walk_the_playlist() {
        let mut page = two_tracks();
        assert!(page.press(TransportAction::Next), "next pressed");
        assert_eq!(page.track_link().as_deref(), Some("/b"), "second track");
        assert!(page.press(TransportAction::Next), "stays on the last track");
        assert_eq!(page.track_link().as_deref(), Some("/b"), "still the last track");
        assert!(page.press(TransportAction::Previous), "previous pressed");
        assert_eq!(page.track_link().as_deref(), Some("/a"), "back to the first track");
        assert!(page.press(TransportAction::TogglePlay), "toggle pressed");
        assert!(page.play_signal(PlaySignal::PlayingStateClass), "now playing");
        assert_eq!(page.presses().len(), 4, "every press recorded");
    }

    #[test]
    fn missing_controls_are_reported() {
        let mut page = two_tracks();
        page.edit(|s| s.controls_present = false);
        assert!(!page.press(TransportAction::Next), "no control to press");
        assert!(page.presses().is_empty(), "nothing recorded");
    }

    #[test]
    fn only_the_rendered_title_source_answers() {
        let page = two_tracks();
        assert_eq!(
            page.title(TitleSource::MiniPlayer).as_deref(),
            Some("Song A"),
            "rendered source"
        );
        assert_eq!(page.title(TitleSource::FullPage), None, "other source absent");
        page.edit(|s| s.title_source = None);
        assert_eq!(page.title(TitleSource::MiniPlayer), None, "no source rendered");
    }

    #[test]
    fn clones_share_state() {
        let page = two_tracks();
        let other = page.clone();
        other.set_playing(true);
        assert!(page.read(|s| s.playing), "shared play state");
        assert!(page.load_href("/b"), "known link loads");
        assert!(!page.load_href("/missing"), "unknown link does not");
        assert_eq!(
            other.title(TitleSource::MiniPlayer).as_deref(),
            Some("Song B"),
            "clone sees the navigation"
        );
    }
}
