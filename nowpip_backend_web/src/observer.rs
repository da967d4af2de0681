// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `MutationObserver` glue.
//!
//! [`Observer`] owns a DOM observer and its callback closure, and translates
//! each batch into core [`MutationRecord`]s before handing it on. Relevance
//! filtering happens in the core; translation only answers the questions the
//! core asks about touched nodes.

use alloc::boxed::Box;
use alloc::vec::Vec;

use nowpip_core::mutation::{MutationRecord, TouchedNode, WATCHED_ATTRIBUTES};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, Node, NodeList};

use crate::profile::SiteProfile;

type ObserverClosure = Closure<dyn FnMut(js_sys::Array)>;

/// What to watch on the target node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Watch {
    /// Text, child lists and the watched attributes of the whole subtree.
    Subtree,
    /// Only the target's `class` attribute.
    ClassOnly,
}

impl Watch {
    fn init(self) -> MutationObserverInit {
        let init = MutationObserverInit::new();
        match self {
            Self::Subtree => {
                init.set_child_list(true);
                init.set_subtree(true);
                init.set_attributes(true);
                init.set_character_data(true);
                let filter: js_sys::Array =
                    WATCHED_ATTRIBUTES.iter().map(|a| JsValue::from_str(a)).collect();
                init.set_attribute_filter(&filter);
            }
            Self::ClassOnly => {
                init.set_attributes(true);
                let filter: js_sys::Array = core::iter::once(JsValue::from_str("class")).collect();
                init.set_attribute_filter(&filter);
            }
        }
        init
    }
}

/// A connected `MutationObserver`. Disconnects on drop.
pub(crate) struct Observer {
    observer: MutationObserver,
    _closure: ObserverClosure,
}

impl core::fmt::Debug for Observer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}

impl Observer {
    /// Starts observing `target`, delivering translated batches to
    /// `callback`.
    pub(crate) fn observe(
        target: &Node,
        watch: Watch,
        profile: SiteProfile,
        mut callback: impl FnMut(Vec<MutationRecord>) + 'static,
    ) -> Result<Self, JsValue> {
        let closure = Closure::wrap(Box::new(move |records: js_sys::Array| {
            let batch = records
                .iter()
                .map(|record| translate(&record.unchecked_into(), &profile))
                .collect();
            callback(batch);
        }) as Box<dyn FnMut(js_sys::Array)>);

        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())?;
        observer.observe_with_options(target, &watch.init())?;
        Ok(Self {
            observer,
            _closure: closure,
        })
    }

    /// Stops delivering records.
    pub(crate) fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn translate(record: &web_sys::MutationRecord, profile: &SiteProfile) -> MutationRecord {
    match record.type_().as_str() {
        "attributes" => MutationRecord::Attributes {
            name: record.attribute_name(),
        },
        "characterData" => MutationRecord::CharacterData,
        _ => {
            let mut nodes = Vec::new();
            collect_nodes(&record.added_nodes(), profile, &mut nodes);
            collect_nodes(&record.removed_nodes(), profile, &mut nodes);
            MutationRecord::ChildList { nodes }
        }
    }
}

fn collect_nodes(list: &NodeList, profile: &SiteProfile, out: &mut Vec<TouchedNode>) {
    for i in 0..list.length() {
        if let Some(node) = list.item(i) {
            out.push(touched(node, profile));
        }
    }
}

fn touched(node: Node, profile: &SiteProfile) -> TouchedNode {
    let Ok(element) = node.dyn_into::<Element>() else {
        return TouchedNode::Other;
    };
    let classes = element.class_list();
    let structural = profile.structural_classes.iter().any(|c| classes.contains(c))
        || element
            .query_selector(profile.structural_descendants)
            .ok()
            .flatten()
            .is_some();
    let background_image = element
        .get_attribute("style")
        .is_some_and(|style| style.contains("background-image"));
    TouchedNode::Element {
        structural,
        background_image,
    }
}
