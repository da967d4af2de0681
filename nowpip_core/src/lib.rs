// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core state machines for a now-playing picture-in-picture mini player.
//!
//! `nowpip_core` reads now-playing metadata from a streaming site's page,
//! decides when it changed, and drives a picture-in-picture surface that
//! shows it. It is `no_std` compatible (with `alloc`) and sans-IO: the host
//! injects time and performs every browser operation through traits.
//!
//! # Architecture
//!
//! ```text
//!   PageProbe (DOM reads)
//!       │
//!       ▼
//!   Scraper::extract() ──► TrackInfo
//!                              │
//!   mutations ─┐               ▼
//!   poll ──────┼──► ChangeDetector::service() ──► Event::TrackChanged
//!   settle ────┘                                       │
//!       ▲                ┌─────────────────────────────┘
//!       │                ▼
//!       │     PipSurface::apply() ──► compose() ──► Presenter::present()
//!       │                │
//!       │                └──► PipHost (video play/pause, artwork loads)
//!       │
//!   Transport::trigger() ◄── Event::Request ◄── clicks, media session
//! ```
//!
//! **[`scrape`]**: Fallback chains over a [`PageProbe`](scrape::PageProbe),
//! artwork URL upscaling and the play-signal OR policy.
//!
//! **[`detect`]**: Mutation, poll and settle producers feeding one
//! debounced merge stage; publishes only on a changed snapshot.
//!
//! **[`surface`]**: PiP lifecycle, artwork entry, apply debounce and the
//! 4 Hz render loop.
//!
//! **[`render`]**: Frame composition as a display list of
//! [`DrawOp`](render::DrawOp)s, plus the [`Presenter`](render::Presenter)
//! trait.
//!
//! **[`session`]**: The single owned [`Session`](session::Session) that
//! wires the components together through the [`event`] queue.
//!
//! **[`host`]**: The host contract: [`PipHost`](host::PipHost),
//! [`HrefStash`](host::HrefStash) and the [`Platform`](host::Platform)
//! bundle.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod debounce;
pub mod detect;
pub mod error;
pub mod event;
pub mod host;
pub mod input;
pub mod mutation;
pub mod render;
pub mod scrape;
pub mod session;
pub mod surface;
pub mod time;
pub mod trace;
pub mod track;
pub mod transport;
