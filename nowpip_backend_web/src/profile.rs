// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Site profile: the CSS selectors for one streaming site.
//!
//! The core only knows named sources ([`TitleSource`], [`ArtworkSource`],
//! [`PlaySignal`], [`TransportAction`]). A [`SiteProfile`] maps each name to
//! the selector list that finds it on a concrete site.

use nowpip_core::scrape::{ArtworkSource, PlaySignal, TitleSource};
use nowpip_core::transport::TransportAction;

/// How an artwork source stores its URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtworkAttr {
    /// Inline `background-image: url(...)` in the `style` attribute.
    BackgroundImage,
    /// The `src` of an `<img>`.
    ImageSrc,
}

/// Selector lists for a supported site.
#[derive(Clone, Copy, Debug)]
pub struct SiteProfile {
    /// Mini-player title element.
    pub mini_title: &'static str,
    /// Full-page title element.
    pub page_title: &'static str,
    /// Anchor whose `href` is the playing track's page.
    pub track_link: &'static str,
    /// Mini-player avatar span.
    pub mini_artwork: &'static str,
    /// Full-page artwork span.
    pub page_artwork: &'static str,
    /// Any artwork image.
    pub artwork_image: &'static str,
    /// A button whose `aria-label` says pause.
    pub pause_label: &'static str,
    /// A button whose `title` says pause.
    pub pause_tooltip: &'static str,
    /// The player's pause-button class.
    pub pause_class: &'static str,
    /// The play control in its playing state.
    pub playing_state: &'static str,
    /// Previous-track button.
    pub previous: &'static str,
    /// Play/pause button.
    pub play_toggle: &'static str,
    /// Next-track button.
    pub next: &'static str,
    /// Root of the subtree watched for track changes.
    pub observer_root: &'static str,
    /// Classes that make an added or removed node structural.
    pub structural_classes: &'static [&'static str],
    /// Selector matching structural descendants.
    pub structural_descendants: &'static str,
}

impl SiteProfile {
    /// The SoundCloud web player.
    #[must_use]
    pub const fn soundcloud() -> Self {
        Self {
            mini_title: ".playbackSoundBadge__titleLink, .playbackSoundBadge__title a, .playbackSoundBadge__title",
            page_title: ".soundTitle__title",
            track_link: ".playbackSoundBadge__titleLink, .playbackSoundBadge__title a",
            mini_artwork: ".playbackSoundBadge .image__full",
            page_artwork: ".listenArtworkWrapper__artwork .image__full",
            artwork_image: ".sc-artwork img",
            pause_label: "button[aria-label*=\"Pause\" i]",
            pause_tooltip: "button[title*=\"Pause\" i]",
            pause_class: ".playControls .sc-button-pause",
            playing_state: ".playControls .playControls__play.playing",
            previous: ".playControls .skipControl__previous, .playControls .skipControl_prev, .skipControl__previous, .skipControlPrev",
            play_toggle: ".playControls__play",
            next: ".playControls .skipControl__next, .playControls .skipControl_next, .skipControl__next, .skipControlNext",
            observer_root: ".playbackSoundBadge, .playControls",
            structural_classes: &["playbackSoundBadge__title", "sc-artwork", "playButton"],
            structural_descendants: ".playbackSoundBadge__title, .sc-artwork, .playButton",
        }
    }

    /// Selector for a title source.
    #[must_use]
    pub const fn title(&self, source: TitleSource) -> &'static str {
        match source {
            TitleSource::MiniPlayer => self.mini_title,
            TitleSource::FullPage => self.page_title,
        }
    }

    /// Selector and URL attribute for an artwork source.
    #[must_use]
    pub const fn artwork(&self, source: ArtworkSource) -> (&'static str, ArtworkAttr) {
        match source {
            ArtworkSource::MiniPlayerAvatar => (self.mini_artwork, ArtworkAttr::BackgroundImage),
            ArtworkSource::FullPageArtwork => (self.page_artwork, ArtworkAttr::BackgroundImage),
            ArtworkSource::ArtworkImage => (self.artwork_image, ArtworkAttr::ImageSrc),
        }
    }

    /// Selector whose presence fires a play signal.
    #[must_use]
    pub const fn play_signal(&self, signal: PlaySignal) -> &'static str {
        match signal {
            PlaySignal::PauseLabel => self.pause_label,
            PlaySignal::PauseTooltip => self.pause_tooltip,
            PlaySignal::PauseButtonClass => self.pause_class,
            PlaySignal::PlayingStateClass => self.playing_state,
        }
    }

    /// Selector for a transport button.
    #[must_use]
    pub const fn control(&self, action: TransportAction) -> &'static str {
        match action {
            TransportAction::Previous => self.previous,
            TransportAction::TogglePlay => self.play_toggle,
            TransportAction::Next => self.next,
        }
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::soundcloud()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_has_a_selector() {
        let p = SiteProfile::soundcloud();
        for source in TitleSource::CHAIN {
            assert!(!p.title(source).is_empty(), "{source:?} has no selector");
        }
        for source in ArtworkSource::CHAIN {
            assert!(!p.artwork(source).0.is_empty(), "{source:?} has no selector");
        }
        for signal in PlaySignal::ALL {
            assert!(!p.play_signal(signal).is_empty(), "{signal:?} has no selector");
        }
    }

    #[test]
    fn only_the_image_fallback_reads_src() {
        let p = SiteProfile::soundcloud();
        assert_eq!(
            p.artwork(ArtworkSource::ArtworkImage).1,
            ArtworkAttr::ImageSrc,
            "img fallback reads src"
        );
        assert_eq!(
            p.artwork(ArtworkSource::MiniPlayerAvatar).1,
            ArtworkAttr::BackgroundImage,
            "avatar reads inline style"
        );
    }

    #[test]
    fn controls_map_to_distinct_selectors() {
        let p = SiteProfile::soundcloud();
        assert_ne!(
            p.control(TransportAction::Previous),
            p.control(TransportAction::Next),
            "previous and next differ"
        );
        assert_eq!(
            p.control(TransportAction::TogglePlay),
            ".playControls__play",
            "toggle presses the play control"
        );
    }
}
