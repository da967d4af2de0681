// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM page probe and transport buttons.

use alloc::string::String;

use nowpip_core::scrape::{ArtworkSource, PageProbe, PlaySignal, TitleSource};
use nowpip_core::track::background_image_url;
use nowpip_core::transport::{TransportAction, TransportControls};
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Document, Element, HtmlElement};

use crate::profile::{ArtworkAttr, SiteProfile};

/// Reads the live document through a [`SiteProfile`].
///
/// One `DomPage` serves as both the session's [`PageProbe`] and its
/// [`TransportControls`]; clones share the same document.
#[derive(Clone, Debug)]
pub struct DomPage {
    document: Document,
    profile: SiteProfile,
}

impl DomPage {
    /// Creates a probe over `document`.
    #[must_use]
    pub fn new(document: Document, profile: SiteProfile) -> Self {
        Self { document, profile }
    }

    /// The site profile.
    #[must_use]
    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// The document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// First element matching `selector`.
    ///
    /// An invalid selector counts as no match.
    pub(crate) fn find(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }
}

/// Reads a string-valued DOM property (resolved, unlike the attribute).
fn string_property(element: &Element, name: &str) -> Option<String> {
    js_sys::Reflect::get(element, &JsValue::from_str(name))
        .ok()?
        .as_string()
        .filter(|s| !s.is_empty())
}

impl PageProbe for DomPage {
    fn title(&self, source: TitleSource) -> Option<String> {
        let text = self.find(self.profile.title(source))?.text_content()?;
        Some(String::from(text.trim()))
    }

    fn document_title(&self) -> String {
        self.document.title()
    }

    fn track_link(&self) -> Option<String> {
        string_property(&self.find(self.profile.track_link)?, "href")
    }

    fn artwork(&self, source: ArtworkSource) -> Option<String> {
        let (selector, attr) = self.profile.artwork(source);
        let element = self.find(selector)?;
        match attr {
            ArtworkAttr::BackgroundImage => {
                let style = element.get_attribute("style")?;
                background_image_url(&style).map(String::from)
            }
            ArtworkAttr::ImageSrc => string_property(&element, "src"),
        }
    }

    fn play_signal(&self, signal: PlaySignal) -> bool {
        self.find(self.profile.play_signal(signal)).is_some()
    }
}

impl TransportControls for DomPage {
    fn press(&mut self, action: TransportAction) -> bool {
        match self
            .find(self.profile.control(action))
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            Some(button) => {
                button.click();
                true
            }
            None => false,
        }
    }
}
