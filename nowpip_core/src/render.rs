// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame composition for the PiP canvas.
//!
//! A frame is a display list: [`compose`] turns the applied [`TrackInfo`] and
//! the artwork entry into a [`Frame`] of [`DrawOp`]s, which a [`Presenter`]
//! rasterizes (on the web, onto a 2D canvas captured into the PiP video).
//!
//! ```text
//!   ┌──────────────────────────────────────────────┐
//!   │ ┌────────────┐  Title line one               │
//!   │ │            │  title line two               │
//!   │ │  artwork   │  title line thr…              │
//!   │ │  200×200   │                               │
//!   │ │            │  Playing                      │
//!   │ └────────────┘                          (▶)  │
//!   └──────────────────────────────────────────────┘
//! ```

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Circle, Point, Rect, Size};

use crate::track::TrackInfo;

/// Title drawn when neither the page nor the document has one.
pub const UNKNOWN_TITLE: &str = "Unknown track";
/// Placeholder label when no artwork is loaded.
pub const NO_ARTWORK_LABEL: &str = "No artwork";
/// Caption while playing.
pub const PLAYING_CAPTION: &str = "Playing";
/// Caption while paused.
pub const PAUSED_CAPTION: &str = "Paused";
/// Appended to a truncated last title line.
pub const ELLIPSIS: &str = "\u{2026}";

/// An sRGB color with 8-bit alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// A color with alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS `rgba()` form.
    #[must_use]
    pub fn to_css(self) -> String {
        if self.a == 255 {
            format!("rgb({},{},{})", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({},{},{},{:.3})",
                self.r,
                self.g,
                self.b,
                f64::from(self.a) / 255.0
            )
        }
    }
}

/// Colors used by [`compose`].
pub mod palette {
    use super::Color;

    /// Canvas background.
    pub const BACKGROUND: Color = Color::rgb(0x0f, 0x0f, 0x10);
    /// Placeholder block.
    pub const PLACEHOLDER: Color = Color::rgb(0x22, 0x22, 0x22);
    /// Placeholder label.
    pub const PLACEHOLDER_TEXT: Color = Color::rgb(0x66, 0x66, 0x66);
    /// Title text and glyph.
    pub const FOREGROUND: Color = Color::rgb(0xff, 0xff, 0xff);
    /// Playing/Paused caption.
    pub const CAPTION: Color = Color::rgb(0xcf, 0xcf, 0xcf);
    /// Disc behind the play/pause glyph.
    pub const GLYPH_DISC: Color = Color::rgba(0, 0, 0, 115);
}

/// A font request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Font {
    /// Size in CSS pixels.
    pub size_px: u16,
    /// CSS font-family list.
    pub family: &'static str,
}

impl Font {
    const UI_STACK: &'static str =
        "system-ui, -apple-system, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial";

    /// The title font.
    pub const TITLE: Self = Self {
        size_px: 18,
        family: Self::UI_STACK,
    };
    /// The caption font.
    pub const CAPTION: Self = Self {
        size_px: 13,
        family: "system-ui",
    };
    /// The placeholder label font.
    pub const PLACEHOLDER: Self = Self {
        size_px: 12,
        family: "system-ui",
    };

    /// CSS shorthand, e.g. `18px system-ui`.
    #[must_use]
    pub fn to_css(self) -> String {
        format!("{}px {}", self.size_px, self.family)
    }
}

/// Frame geometry.
#[derive(Clone, Copy, Debug)]
pub struct Layout {
    /// Canvas size.
    pub size: Size,
    /// Outer margin and gap between artwork and text.
    pub margin: f64,
    /// Upper bound on the artwork square.
    pub art_max: f64,
    /// Offset from the artwork top to the first title line's ascent.
    pub title_top: f64,
    /// Title line advance.
    pub line_height: f64,
    /// Title line cap.
    pub max_title_lines: usize,
    /// Caption baseline distance above the artwork bottom.
    pub caption_inset: f64,
    /// Glyph center distance from the right and bottom edges.
    pub glyph_inset: f64,
    /// Glyph disc radius.
    pub glyph_radius: f64,
}

impl Layout {
    /// The 480×270 mini-player layout.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            size: Size::new(480.0, 270.0),
            margin: 12.0,
            art_max: 200.0,
            title_top: 6.0,
            line_height: 20.0,
            max_title_lines: 3,
            caption_inset: 8.0,
            glyph_inset: 40.0,
            glyph_radius: 20.0,
        }
    }

    /// Side of the artwork square.
    #[must_use]
    pub fn art_size(&self) -> f64 {
        self.art_max.min(self.size.height - 2.0 * self.margin)
    }

    /// Artwork square.
    #[must_use]
    pub fn art_rect(&self) -> Rect {
        let side = self.art_size();
        Rect::from_origin_size((self.margin, self.margin), (side, side))
    }

    /// Left edge of the text column.
    #[must_use]
    pub fn text_x(&self) -> f64 {
        self.margin + self.art_size() + self.margin
    }

    /// Width of the text column.
    #[must_use]
    pub fn text_width(&self) -> f64 {
        self.size.width - self.text_x() - self.margin
    }

    /// Center of the play/pause glyph.
    #[must_use]
    pub fn glyph_center(&self) -> Point {
        Point::new(
            self.size.width - self.glyph_inset,
            self.size.height - self.glyph_inset,
        )
    }
}

/// One drawing command.
#[derive(Debug)]
pub enum DrawOp<'a, A> {
    /// Fill a rectangle.
    FillRect {
        /// Area.
        rect: Rect,
        /// Fill.
        color: Color,
    },
    /// Draw an image scaled into `rect`.
    Image {
        /// Decoded image.
        image: &'a A,
        /// Destination.
        rect: Rect,
    },
    /// Fill text with its baseline starting at `origin`.
    Text {
        /// Content.
        text: String,
        /// Baseline start.
        origin: Point,
        /// Font.
        font: Font,
        /// Fill.
        color: Color,
    },
    /// Fill a circle.
    FillCircle {
        /// Shape.
        circle: Circle,
        /// Fill.
        color: Color,
    },
    /// Fill a closed triangle.
    FillTriangle {
        /// Vertices.
        points: [Point; 3],
        /// Fill.
        color: Color,
    },
}

/// A composed frame.
#[derive(Debug)]
pub struct Frame<'a, A> {
    /// Canvas size.
    pub size: Size,
    /// Commands in paint order.
    pub ops: Vec<DrawOp<'a, A>>,
}

impl<A> Frame<'_, A> {
    /// Text commands in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns `true` if the frame draws an image.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Image { .. }))
    }
}

/// Rasterizes frames.
///
/// `A` is the host's decoded image type.
pub trait Presenter<A> {
    /// Advance width of `text` in `font`.
    fn text_width(&mut self, text: &str, font: Font) -> f64;

    /// Draws a frame.
    fn present(&mut self, frame: &Frame<'_, A>);
}

/// What to draw in the artwork square.
#[derive(Debug)]
pub enum ArtworkView<'a, A> {
    /// A decoded image.
    Image(&'a A),
    /// The "No artwork" block.
    Placeholder,
}

/// The placeholder block for `rect`.
///
/// Presenters that fail to draw an image (for example a tainted canvas) use
/// this to fall back.
#[must_use]
pub fn placeholder_ops<'a, A>(rect: Rect) -> [DrawOp<'a, A>; 2] {
    [
        DrawOp::FillRect {
            rect,
            color: palette::PLACEHOLDER,
        },
        DrawOp::Text {
            text: String::from(NO_ARTWORK_LABEL),
            origin: Point::new(rect.x0 + 10.0, rect.y0 + rect.height() / 2.0),
            font: Font::PLACEHOLDER,
            color: palette::PLACEHOLDER_TEXT,
        },
    ]
}

/// Word-wraps `text` into at most `max_lines` lines of `max_width`.
///
/// Words are never split; a single word wider than the column gets a line of
/// its own. When words remain after the last allowed line, that line is
/// shortened until it fits with [`ELLIPSIS`] appended.
pub fn wrap_lines(
    text: &str,
    max_width: f64,
    max_lines: usize,
    mut measure: impl FnMut(&str) -> f64,
) -> Vec<String> {
    let mut lines = Vec::new();
    if max_lines == 0 {
        return lines;
    }
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let kept = line.len();
        line.push(' ');
        line.push_str(word);
        if measure(&line) <= max_width {
            continue;
        }
        line.truncate(kept);
        if lines.len() + 1 == max_lines {
            lines.push(ellipsize(&line, max_width, &mut measure));
            return lines;
        }
        lines.push(core::mem::replace(&mut line, String::from(word)));
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn ellipsize(line: &str, max_width: f64, measure: &mut impl FnMut(&str) -> f64) -> String {
    let mut end = line.len();
    loop {
        let candidate = format!("{}{ELLIPSIS}", line[..end].trim_end());
        if end == 0 || measure(&candidate) <= max_width {
            return candidate;
        }
        end = line[..end].char_indices().next_back().map_or(0, |(i, _)| i);
    }
}

/// Composes the frame for `info`.
pub fn compose<'a, A>(
    layout: &Layout,
    info: &TrackInfo,
    artwork: ArtworkView<'a, A>,
    mut measure: impl FnMut(&str, Font) -> f64,
) -> Frame<'a, A> {
    let mut ops = Vec::with_capacity(12);
    ops.push(DrawOp::FillRect {
        rect: layout.size.to_rect(),
        color: palette::BACKGROUND,
    });

    let art = layout.art_rect();
    match artwork {
        ArtworkView::Image(image) => ops.push(DrawOp::Image { image, rect: art }),
        ArtworkView::Placeholder => ops.extend(placeholder_ops(art)),
    }

    let text_x = layout.text_x();
    let title = if info.title().is_empty() {
        UNKNOWN_TITLE
    } else {
        info.title()
    };
    let first_baseline = art.y0 + layout.title_top + f64::from(Font::TITLE.size_px);
    let lines = wrap_lines(title, layout.text_width(), layout.max_title_lines, |s| {
        measure(s, Font::TITLE)
    });
    let mut baseline = first_baseline;
    for line in lines {
        ops.push(DrawOp::Text {
            text: line,
            origin: Point::new(text_x, baseline),
            font: Font::TITLE,
            color: palette::FOREGROUND,
        });
        baseline += layout.line_height;
    }

    let caption = if info.is_playing() {
        PLAYING_CAPTION
    } else {
        PAUSED_CAPTION
    };
    ops.push(DrawOp::Text {
        text: String::from(caption),
        origin: Point::new(text_x, art.y1 - layout.caption_inset),
        font: Font::CAPTION,
        color: palette::CAPTION,
    });

    let c = layout.glyph_center();
    ops.push(DrawOp::FillCircle {
        circle: Circle::new(c, layout.glyph_radius),
        color: palette::GLYPH_DISC,
    });
    if info.is_playing() {
        for x in [c.x - 7.0, c.x + 2.0] {
            ops.push(DrawOp::FillRect {
                rect: Rect::from_origin_size((x, c.y - 9.0), (5.0, 18.0)),
                color: palette::FOREGROUND,
            });
        }
    } else {
        ops.push(DrawOp::FillTriangle {
            points: [
                Point::new(c.x - 6.0, c.y - 10.0),
                Point::new(c.x - 6.0, c.y + 10.0),
                Point::new(c.x + 10.0, c.y),
            ],
            color: palette::FOREGROUND,
        });
    }

    Frame {
        size: layout.size,
        ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Every character is 10 px wide.
    fn mono(s: &str) -> f64 {
        s.chars().count() as f64 * 10.0
    }

    #[test]
    fn layout_matches_mini_player_geometry() {
        let l = Layout::standard();
        assert_eq!(l.art_size(), 200.0, "square artwork");
        assert_eq!(
            l.art_rect(),
            Rect::new(12.0, 12.0, 212.0, 212.0),
            "artwork inset by the padding"
        );
        assert_eq!(l.text_x(), 224.0, "text starts right of the artwork");
        assert_eq!(l.text_width(), 244.0, "text column width");
        assert_eq!(l.glyph_center(), Point::new(440.0, 230.0), "glyph in the bottom-right corner");
    }

    #[test]
    fn wrap_fits_short_titles_on_one_line() {
        assert_eq!(
            wrap_lines("Song A", 100.0, 3, mono),
            vec!["Song A"],
            "short titles fit one line"
        );
        assert!(wrap_lines("   ", 100.0, 3, mono).is_empty(), "blank titles draw nothing");
    }

    #[test]
    fn wrap_breaks_on_words() {
        let lines = wrap_lines("aaaa bbbb cccc", 90.0, 3, mono);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"], "breaks between words");
    }

    #[test]
    fn wrap_caps_lines_with_ellipsis() {
        let lines = wrap_lines("aaa bbb ccc ddd eee", 50.0, 3, mono);
        assert_eq!(lines.len(), 3, "never more than the cap");
        assert_eq!(lines[0], "aaa", "first line");
        assert_eq!(lines[1], "bbb", "second line");
        assert_eq!(lines[2], "ccc\u{2026}", "ellipsis on the last line");
        for line in &lines {
            assert!(mono(line) <= 50.0, "{line} overflows");
        }
    }

    #[test]
    fn ellipsis_shortens_when_needed() {
        let lines = wrap_lines("aaaaa bbbbb", 50.0, 1, mono);
        assert_eq!(lines, vec!["aaaa\u{2026}"], "ellipsis replaces a character");
    }

    #[test]
    fn long_single_word_keeps_its_own_line() {
        let lines = wrap_lines("abcdefghijkl", 50.0, 3, mono);
        assert_eq!(lines, vec!["abcdefghijkl"], "unbreakable word overflows");
    }

    #[test]
    fn paused_frame_has_triangle_and_caption() {
        let info = TrackInfo::new("Song A", None, false, None);
        let frame = compose::<()>(
            &Layout::standard(),
            &info,
            ArtworkView::Placeholder,
            |s, _| mono(s),
        );
        let texts: Vec<&str> = frame.texts().collect();
        assert_eq!(
            texts,
            vec![NO_ARTWORK_LABEL, "Song A", PAUSED_CAPTION],
            "placeholder label, title, caption"
        );
        assert!(
            frame
                .ops
                .iter()
                .any(|op| matches!(op, DrawOp::FillTriangle { .. })),
            "paused frames show the play triangle"
        );
        assert!(!frame.has_image(), "no image while loading");
    }

    #[test]
    fn playing_frame_has_pause_bars_and_image() {
        let image = 7_u8;
        let info = TrackInfo::new("Song A", None, true, None);
        let frame = compose(
            &Layout::standard(),
            &info,
            ArtworkView::Image(&image),
            |s, _| mono(s),
        );
        assert!(frame.has_image(), "artwork drawn");
        assert!(frame.texts().any(|t| t == PLAYING_CAPTION), "playing caption");
        let bars = frame
            .ops
            .iter()
            .filter(|op| {
                matches!(op, DrawOp::FillRect { color, .. } if *color == palette::FOREGROUND)
            })
            .count();
        assert_eq!(bars, 2, "two pause bars");
        assert!(
            !frame
                .ops
                .iter()
                .any(|op| matches!(op, DrawOp::FillTriangle { .. })),
            "no triangle while playing"
        );
    }

    #[test]
    fn empty_title_draws_unknown_track() {
        let info = TrackInfo::default();
        let frame = compose::<()>(
            &Layout::standard(),
            &info,
            ArtworkView::Placeholder,
            |s, _| mono(s),
        );
        assert!(frame.texts().any(|t| t == UNKNOWN_TITLE), "fallback title");
    }

    #[test]
    fn css_strings() {
        assert_eq!(palette::BACKGROUND.to_css(), "rgb(15,15,16)", "background colour");
        assert_eq!(palette::GLYPH_DISC.to_css(), "rgba(0,0,0,0.451)", "translucent disc");
        assert_eq!(Font::CAPTION.to_css(), "13px system-ui", "caption font");
    }
}
