// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Now-playing snapshots and artwork URL helpers.
//!
//! A [`TrackInfo`] is produced fresh on every extraction and never mutated
//! afterwards; consumers replace the whole value. Change detection compares
//! snapshots with [`TrackInfo::snapshot_eq`], which looks at the title,
//! artwork and play state but deliberately ignores the link.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;

/// Low-resolution artwork marker the site appends to image file names.
const LOW_RES_TOKEN: &str = "-t50x50";

/// High-resolution replacement for [`LOW_RES_TOKEN`].
const HIGH_RES_TOKEN: &str = "-t500x500";

/// Extensions that may follow the low-resolution marker.
const ARTWORK_EXTENSIONS: [&str; 2] = [".png", ".jpg"];

/// Query parameter used to force a fresh artwork fetch.
const CACHE_BUST_PARAM: &str = "cacheBust";

/// An immutable now-playing snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TrackInfo {
    title: String,
    artwork_url: Option<String>,
    is_playing: bool,
    href: Option<String>,
}

impl TrackInfo {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        artwork_url: Option<String>,
        is_playing: bool,
        href: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artwork_url,
            is_playing,
            href,
        }
    }

    /// Best-effort track title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Absolute high-resolution artwork URL, if any was found.
    #[must_use]
    pub fn artwork_url(&self) -> Option<&str> {
        self.artwork_url.as_deref()
    }

    /// Whether any play signal reported playback.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Canonical link of the current track, if any.
    #[must_use]
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Compares the `{title, artwork, is_playing}` triple.
    ///
    /// Two snapshots that differ only in `href` are the same snapshot for
    /// change-detection purposes.
    #[must_use]
    pub fn snapshot_eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.artwork_url == other.artwork_url
            && self.is_playing == other.is_playing
    }

    /// Returns a copy with a different artwork URL.
    #[must_use]
    pub fn with_artwork(&self, artwork_url: Option<String>) -> Self {
        Self {
            artwork_url,
            ..self.clone()
        }
    }
}

/// Rewrites a low-resolution artwork URL to its high-resolution variant.
///
/// Matches `-t50x50` at the very end of the URL, optionally followed by
/// `.png` or `.jpg` (ASCII case-insensitive), and replaces the marker with
/// `-t500x500`, keeping the extension as written. Any other URL is returned
/// unchanged, so the rewrite is total and idempotent.
#[must_use]
pub fn upscale_artwork_url(url: &str) -> Cow<'_, str> {
    let (stem, extension) = split_artwork_extension(url);
    if !ends_with_ignore_ascii_case(stem, LOW_RES_TOKEN) {
        return Cow::Borrowed(url);
    }
    let base = &stem[..stem.len() - LOW_RES_TOKEN.len()];
    Cow::Owned(format!("{base}{HIGH_RES_TOKEN}{extension}"))
}

/// Appends a cache-busting query parameter to `url`.
#[must_use]
pub fn cache_busted(url: &str, stamp: u64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{CACHE_BUST_PARAM}={stamp}")
}

/// Extracts the URL from an inline `background-image: url(...)` declaration.
///
/// Quotes around the URL are optional. Returns `None` when the style has no
/// background image or the value is empty.
#[must_use]
pub fn background_image_url(style: &str) -> Option<&str> {
    let lower_start = find_ignore_ascii_case(style, "background-image")?;
    let rest = &style[lower_start + "background-image".len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let open = find_ignore_ascii_case(rest, "url(")?;
    // Only whitespace may sit between the colon and `url(`.
    if !rest[..open].trim().is_empty() {
        return None;
    }
    let inner = &rest[open + "url(".len()..];
    let close = inner.find(')')?;
    let value = inner[..close]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    (!value.is_empty()).then_some(value)
}

fn split_artwork_extension(url: &str) -> (&str, &str) {
    for ext in ARTWORK_EXTENSIONS {
        if ends_with_ignore_ascii_case(url, ext) {
            let split = url.len() - ext.len();
            return (&url[..split], &url[split..]);
        }
    }
    (url, "")
}

fn ends_with_ignore_ascii_case(haystack: &str, suffix: &str) -> bool {
    haystack.len() >= suffix.len()
        && haystack.is_char_boundary(haystack.len() - suffix.len())
        && haystack[haystack.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > bytes.len() {
        return None;
    }
    (0..=bytes.len() - needle.len()).find(|&i| bytes[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
