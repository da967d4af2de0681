// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Now-playing extraction through ordered fallback chains.
//!
//! The [`Scraper`] never touches the DOM itself. A host implements
//! [`PageProbe`], answering one question per named source ("what does the
//! mini-player title say?", "is the pause tooltip present?"), and the scraper
//! walks each chain in priority order:
//!
//! | Field | Chain | Final fallback |
//! |-------|-------|----------------|
//! | title | [`TitleSource::MiniPlayer`], [`TitleSource::FullPage`] | document title |
//! | artwork | [`ArtworkSource::CHAIN`], then upscaled | `None` |
//! | play state | OR over [`PlaySignal::ALL`] | `false` |
//!
//! Extraction is a pure read. A probe answering `None` for everything yields
//! a snapshot with the document title, no artwork, not playing and no link.

use alloc::string::String;
use core::fmt;

use crate::trace::{ExtractEvent, Tracer};
use crate::track::{TrackInfo, upscale_artwork_url};

/// Where a title can come from, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TitleSource {
    /// The persistent mini-player badge.
    MiniPlayer,
    /// The full-page track header.
    FullPage,
}

impl TitleSource {
    /// Fallback order.
    pub const CHAIN: [Self; 2] = [Self::MiniPlayer, Self::FullPage];
}

/// Where artwork can come from, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtworkSource {
    /// Background image of the mini-player avatar.
    MiniPlayerAvatar,
    /// Background image of the full-page artwork block.
    FullPageArtwork,
    /// Source of an artwork `<img>` element.
    ArtworkImage,
}

impl ArtworkSource {
    /// Fallback order.
    pub const CHAIN: [Self; 3] = [
        Self::MiniPlayerAvatar,
        Self::FullPageArtwork,
        Self::ArtworkImage,
    ];
}

/// A named heuristic that indicates playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaySignal {
    /// A button whose accessible label mentions "pause".
    PauseLabel,
    /// A button whose tooltip mentions "pause".
    PauseTooltip,
    /// The transport bar shows a pause-styled button.
    PauseButtonClass,
    /// The play button carries the "playing" state class.
    PlayingStateClass,
}

impl PlaySignal {
    /// Every signal, in probe order.
    pub const ALL: [Self; 4] = [
        Self::PauseLabel,
        Self::PauseTooltip,
        Self::PauseButtonClass,
        Self::PlayingStateClass,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::PauseLabel => 1 << 0,
            Self::PauseTooltip => 1 << 1,
            Self::PauseButtonClass => 1 << 2,
            Self::PlayingStateClass => 1 << 3,
        }
    }
}

/// The set of play signals that fired during one extraction.
///
/// Playback is the logical OR of the set: any one signal is enough.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlaySignals(u8);

impl PlaySignals {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Probes every signal independently.
    pub fn probe(mut fired: impl FnMut(PlaySignal) -> bool) -> Self {
        let mut set = Self::NONE;
        for signal in PlaySignal::ALL {
            if fired(signal) {
                set.insert(signal);
            }
        }
        set
    }

    /// Adds a signal to the set.
    pub fn insert(&mut self, signal: PlaySignal) {
        self.0 |= signal.bit();
    }

    /// Returns `true` if `signal` fired.
    #[must_use]
    pub const fn contains(self, signal: PlaySignal) -> bool {
        self.0 & signal.bit() != 0
    }

    /// Play state under the OR policy.
    #[must_use]
    pub const fn is_playing(self) -> bool {
        self.0 != 0
    }

    /// Iterates over the signals that fired.
    pub fn iter(self) -> impl Iterator<Item = PlaySignal> {
        PlaySignal::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl fmt::Debug for PlaySignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Read-only view of the page, one method per named source.
pub trait PageProbe {
    /// Raw text of a title source, if the element exists.
    fn title(&self, source: TitleSource) -> Option<String>;

    /// The document title, used when every title source misses.
    fn document_title(&self) -> String;

    /// Absolute link of the current track, if any.
    fn track_link(&self) -> Option<String>;

    /// Absolute artwork URL from a source, if present and non-empty.
    fn artwork(&self, source: ArtworkSource) -> Option<String>;

    /// Whether a play signal is currently present.
    fn play_signal(&self, signal: PlaySignal) -> bool;
}

/// Anything that can produce a [`TrackInfo`] on demand.
///
/// The change detector depends on this rather than on [`Scraper`] so tests
/// can feed it canned snapshots.
pub trait TrackInfoSource {
    /// Reads the current snapshot.
    fn extract(&self, tracer: &mut Tracer<'_>) -> TrackInfo;
}

/// A snapshot plus the sources that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    /// The snapshot.
    pub info: TrackInfo,
    /// Winning title source, or `None` when the document title was used.
    pub title_source: Option<TitleSource>,
    /// Winning artwork source.
    pub artwork_source: Option<ArtworkSource>,
    /// Play signals that fired.
    pub signals: PlaySignals,
}

impl Extraction {
    /// The trace event describing this extraction.
    #[must_use]
    pub fn event(&self) -> ExtractEvent {
        ExtractEvent {
            title_source: self.title_source,
            artwork_source: self.artwork_source,
            signals: self.signals,
            has_link: self.info.href().is_some(),
        }
    }
}

/// Returns the first candidate whose probe yields a value, with that value.
pub fn first_match<C: Copy, T>(
    candidates: &[C],
    mut probe: impl FnMut(C) -> Option<T>,
) -> Option<(C, T)> {
    candidates
        .iter()
        .find_map(|&candidate| probe(candidate).map(|value| (candidate, value)))
}

/// Builds [`TrackInfo`] snapshots from a [`PageProbe`].
#[derive(Debug)]
pub struct Scraper<P> {
    probe: P,
}

impl<P: PageProbe> Scraper<P> {
    /// Wraps a probe.
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// The underlying probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Mutable access to the underlying probe.
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    /// Extracts a snapshot and reports which sources won.
    #[must_use]
    pub fn extract_detailed(&self) -> Extraction {
        let title = first_match(&TitleSource::CHAIN, |source| {
            self.probe.title(source).and_then(non_empty_trimmed)
        });
        let (title_source, title) = match title {
            Some((source, text)) => (Some(source), text),
            None => (None, String::from(self.probe.document_title().trim())),
        };

        let artwork = first_match(&ArtworkSource::CHAIN, |source| {
            self.probe.artwork(source).filter(|url| !url.is_empty())
        });
        let (artwork_source, artwork_url) = match artwork {
            Some((source, url)) => (Some(source), Some(upscale_artwork_url(&url).into_owned())),
            None => (None, None),
        };

        let signals = PlaySignals::probe(|signal| self.probe.play_signal(signal));
        let href = self.probe.track_link().filter(|link| !link.is_empty());

        Extraction {
            info: TrackInfo::new(title, artwork_url, signals.is_playing(), href),
            title_source,
            artwork_source,
            signals,
        }
    }
}

impl<P: PageProbe> TrackInfoSource for Scraper<P> {
    fn extract(&self, tracer: &mut Tracer<'_>) -> TrackInfo {
        let extraction = self.extract_detailed();
        tracer.extract(&extraction.event());
        extraction.info
    }
}

fn non_empty_trimmed(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(String::from(trimmed))
    }
}
