// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic simulation of a page, a PiP host and a clock.
//!
//! A [`Simulation`] owns one [`Session`](nowpip_core::session::Session) over
//! the [`SimPlatform`] and drives it with a virtual clock:
//!
//! - [`ScriptedPage`]: a playlist-backed page whose transport buttons work
//! - [`RecordingHost`]: a PiP host that records frames, video state, loads,
//!   navigations and exits, and holds asynchronous requests until the test
//!   completes them
//! - [`MemoryStash`]: an in-memory href stash
//! - [`RecordingSink`]: a trace sink keeping owned copies of every event
//!
//! Time only moves through [`Simulation::advance`] and
//! [`Simulation::step`], which service the session at each deadline in turn.

#![no_std]

extern crate alloc;

mod host;
mod page;
mod sim;
mod trace;

#[cfg(test)]
mod scenarios;

pub use host::{Failures, Glyph, PresentedFrame, RecordingHost, SimImage};
pub use page::{PageState, ScriptedPage, ScriptedTrack};
pub use sim::{MemoryStash, SimPlatform, Simulation};
pub use trace::{RecordingSink, Traced};
