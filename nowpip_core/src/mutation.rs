// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-neutral mutation records and the relevance filter.
//!
//! The web backend translates `MutationRecord`s from the observed player
//! subtree into these values, classifying touched nodes with its site
//! profile. The core only decides whether a batch is worth an extraction.

use alloc::string::String;
use alloc::vec::Vec;

/// Attributes whose changes can alter the now-playing snapshot.
pub const WATCHED_ATTRIBUTES: [&str; 6] =
    ["src", "class", "title", "aria-pressed", "aria-label", "style"];

/// A node added to or removed from the observed subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchedNode {
    /// An element node.
    Element {
        /// The element is, or contains, title/artwork/play-button structure.
        structural: bool,
        /// The element carries an inline `background-image` style.
        background_image: bool,
    },
    /// A text, comment or other non-element node.
    Other,
}

impl TouchedNode {
    /// Whether touching this node can change the snapshot.
    #[must_use]
    pub const fn is_relevant(self) -> bool {
        match self {
            Self::Element {
                structural,
                background_image,
            } => structural || background_image,
            Self::Other => false,
        }
    }
}

/// One observed DOM mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    /// An attribute changed.
    Attributes {
        /// The attribute name, when the host reports one.
        name: Option<String>,
    },
    /// Text content of a character-data node changed.
    CharacterData,
    /// Children were added or removed.
    ChildList {
        /// Added and removed nodes, in any order.
        nodes: Vec<TouchedNode>,
    },
}

impl MutationRecord {
    /// Shorthand for an attribute record.
    #[must_use]
    pub fn attribute(name: &str) -> Self {
        Self::Attributes {
            name: Some(String::from(name)),
        }
    }

    /// Whether this record can change the snapshot.
    #[must_use]
    pub fn is_relevant(&self) -> bool {
        match self {
            Self::CharacterData => true,
            Self::Attributes { name } => name
                .as_deref()
                .is_some_and(|name| WATCHED_ATTRIBUTES.contains(&name)),
            Self::ChildList { nodes } => nodes.iter().any(|node| node.is_relevant()),
        }
    }

    /// Whether this record is a `class` attribute change.
    #[must_use]
    pub fn is_class_change(&self) -> bool {
        matches!(self, Self::Attributes { name: Some(name) } if name == "class")
    }
}

/// A batch is relevant if any record in it is.
#[must_use]
pub fn is_relevant_batch(batch: &[MutationRecord]) -> bool {
    batch.iter().any(MutationRecord::is_relevant)
}
