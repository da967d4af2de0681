// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` wake-up source.
//!
//! The session owns no timers: it reports its next deadline and expects to be
//! serviced then. [`TimeoutSlot`] is the single host timeout that makes that
//! happen. Arming an earlier deadline replaces the pending one; arming a later
//! one keeps it, since the callback re-arms from the session after servicing.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use nowpip_core::time::HostTime;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, delay_ms: i32) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);
}

type TimeoutClosure = Closure<dyn FnMut()>;

/// One re-armable `setTimeout`.
pub(crate) struct TimeoutSlot {
    inner: Rc<SlotInner>,
}

struct SlotInner {
    /// The JS closure passed to every `setTimeout` call.
    closure: RefCell<Option<TimeoutClosure>>,

    /// The callback run when the timeout fires.
    callback: RefCell<Box<dyn FnMut()>>,

    /// Pending timeout ID and the deadline it was armed for.
    pending: Cell<Option<(i32, HostTime)>>,
}

impl TimeoutSlot {
    /// Creates an unarmed slot.
    pub(crate) fn new(callback: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(SlotInner {
            closure: RefCell::new(None),
            callback: RefCell::new(Box::new(callback)),
            pending: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let closure = Closure::wrap(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.pending.set(None);
            // A re-entrant fire (callback still running) is dropped; the
            // running callback re-arms before it returns.
            if let Ok(mut callback) = inner.callback.try_borrow_mut() {
                callback();
            }
        }) as Box<dyn FnMut()>);
        *inner.closure.borrow_mut() = Some(closure);

        Self { inner }
    }

    /// Arms the slot for `due`, unless it is already armed no later.
    pub(crate) fn arm_at(&self, due: HostTime, now: HostTime) {
        if let Some((_, armed)) = self.inner.pending.get()
            && armed <= due
        {
            return;
        }
        self.cancel();

        // Rounded up so the callback never runs before `due`.
        let delay_ms = due.saturating_duration_since(now).micros().div_ceil(1000);
        let delay_ms = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        if let Some(ref closure) = *self.inner.closure.borrow() {
            let id = set_timeout(closure.as_ref().unchecked_ref(), delay_ms);
            self.inner.pending.set(Some((id, due)));
        }
    }

    /// Fires as soon as the event loop allows.
    pub(crate) fn arm_now(&self, now: HostTime) {
        self.arm_at(now, now);
    }

    /// Cancels the pending timeout, if any.
    pub(crate) fn cancel(&self) {
        if let Some((id, _)) = self.inner.pending.take() {
            clear_timeout(id);
        }
    }
}

impl Drop for TimeoutSlot {
    fn drop(&mut self) {
        self.cancel();
        self.inner.closure.borrow_mut().take();
    }
}

impl core::fmt::Debug for TimeoutSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimeoutSlot")
            .field("pending", &self.inner.pending.get())
            .finish()
    }
}
