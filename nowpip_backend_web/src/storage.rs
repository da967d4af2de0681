// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `localStorage`-backed previous-track stash.

use alloc::format;
use alloc::string::String;

use nowpip_core::host::HrefStash;
use web_sys::Storage;

use crate::console::warn;
use crate::pip::describe;

/// The storage key for the stashed link.
pub const PREVIOUS_HREF_KEY: &str = "sc_prev_track_href";

/// An [`HrefStash`] over `window.localStorage`.
///
/// When storage is unavailable (blocked by privacy settings, for example)
/// the stash holds nothing. Failures are written to the console.
#[derive(Clone, Debug)]
pub struct LocalStash {
    storage: Option<Storage>,
}

impl LocalStash {
    /// Opens the window's local storage.
    #[must_use]
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            warn("localStorage unavailable; Previous will press the page button");
        }
        Self { storage }
    }
}

impl HrefStash for LocalStash {
    fn load(&self) -> Option<String> {
        self.storage
            .as_ref()?
            .get_item(PREVIOUS_HREF_KEY)
            .ok()
            .flatten()
            .filter(|href| !href.is_empty())
    }

    fn store(&mut self, href: &str) {
        if let Some(storage) = &self.storage {
            if let Err(error) = storage.set_item(PREVIOUS_HREF_KEY, href) {
                warn(&format!("could not stash previous track: {}", describe(&error)));
            }
        }
    }

    fn clear(&mut self) {
        if let Some(storage) = &self.storage {
            if let Err(error) = storage.remove_item(PREVIOUS_HREF_KEY) {
                warn(&format!("could not clear previous track: {}", describe(&error)));
            }
        }
    }
}
