// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end scenarios on the simulated page and clock.

use alloc::format;
use alloc::string::ToString as _;
use alloc::vec;
use alloc::vec::Vec;

use nowpip_core::host::MediaAction;
use nowpip_core::input::ClickIntent;
use nowpip_core::render::{PAUSED_CAPTION, PLAYING_CAPTION};
use nowpip_core::surface::{MediaSessionState, OpenOutcome, PipState};
use nowpip_core::trace::{
    ApplyEvent, ArtworkChange, ArtworkEvent, ArtworkOutcome, FrameEvent, FrameReason,
    LifecycleCause, LifecycleEvent,
};
use nowpip_core::transport::TransportAction;

use crate::{Glyph, ScriptedPage, ScriptedTrack, Simulation, Traced};

const ART_A_SMALL: &str = "https://i1.sndcdn.com/artworks-a-t50x50.jpg";
const ART_A_LARGE: &str = "https://i1.sndcdn.com/artworks-a-t500x500.jpg";

fn song_a() -> ScriptedTrack {
    ScriptedTrack::new("Song A", Some(ART_A_SMALL), Some("/a"))
}

/// Boots a page showing Song A, decodes its artwork and opens PiP.
fn open_on_song_a() -> Simulation {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    assert_eq!(sim.finish_artwork_loads(), 1, "start-up apply loads artwork");
    assert!(sim.open_and_grant().is_some(), "PiP granted");
    sim
}

fn applies_with(sim: &Simulation, change: ArtworkChange) -> usize {
    sim.trace().count(|e| {
        matches!(e, Traced::Apply(ApplyEvent { artwork, .. }) if *artwork == change)
    })
}

#[test]
fn paused_track_opens_with_upscaled_artwork_and_play_glyph() {
    let sim = open_on_song_a();

    let status = sim.status();
    assert_eq!(status.state, PipState::Open, "open");
    assert_eq!(status.track.title(), "Song A", "title");
    assert_eq!(status.track.artwork_url(), Some(ART_A_LARGE), "upscaled");
    assert!(status.artwork_loaded, "decoded before open");
    assert!(!status.track.is_playing(), "paused");
    assert!(!status.render_loop_active, "no loop while paused");
    assert_eq!(status.media_session, MediaSessionState::Installed, "media session");
    assert!(status.play_control_observed, "observing play control");

    let load = &sim.host().loads()[0];
    assert!(
        load.url.starts_with(ART_A_LARGE) && load.url.len() > ART_A_LARGE.len(),
        "cache-busted request for the large artwork: {}",
        load.url
    );

    let frame = sim.host().last_frame().expect("a frame on open");
    assert!(frame.has_text("Song A"), "title drawn: {:?}", frame.texts);
    assert!(frame.has_text(PAUSED_CAPTION), "caption: {:?}", frame.texts);
    assert_eq!(frame.glyph, Glyph::Play, "play triangle while paused");
    assert_eq!(frame.image.as_deref(), Some(load.url.as_str()), "artwork drawn");
    assert!(!frame.shows_placeholder(), "no placeholder");
    assert_eq!(sim.host().video_calls(), [false], "video paused to match");
}

#[test]
fn starting_playback_redraws_once_without_reloading_artwork() {
    let mut sim = open_on_song_a();
    let frames_before = sim.host().frames().len();
    let loads_before = sim.host().loads().len();

    sim.page().set_playing(true);
    assert!(sim.page_mutated(), "text mutation is relevant");
    assert!(
        sim.run_until(|s| s.status().track.is_playing()),
        "play state applied"
    );

    assert_eq!(sim.host().frames().len(), frames_before + 1, "one redraw");
    assert_eq!(sim.host().loads().len(), loads_before, "artwork not reloaded");
    assert_eq!(sim.host().video_calls().last(), Some(&true), "video playing");
    assert!(sim.status().video_playing, "status agrees");
    assert!(sim.status().render_loop_active, "loop started");

    let frame = sim.host().last_frame().expect("redraw");
    assert!(frame.has_text(PLAYING_CAPTION), "caption: {:?}", frame.texts);
    assert_eq!(frame.glyph, Glyph::Pause, "pause bars while playing");

    // The loop keeps the captured stream alive at 4 Hz.
    let mark = sim.trace().len();
    sim.advance_ms(1_000);
    let loop_frames = sim
        .trace()
        .since(mark)
        .iter()
        .filter(|e| {
            matches!(
                e,
                Traced::Frame(FrameEvent {
                    reason: FrameReason::Loop,
                    ..
                })
            )
        })
        .count();
    assert_eq!(loop_frames, 4, "250 ms render loop");
}

#[test]
fn pausing_stops_the_render_loop() {
    let mut sim = open_on_song_a();
    sim.page().set_playing(true);
    sim.page_mutated();
    sim.advance_ms(1_000);
    assert!(sim.status().render_loop_active, "running while playing");

    sim.page().set_playing(false);
    assert!(sim.play_control_changed(), "class change");
    sim.advance_ms(500);
    assert!(!sim.status().render_loop_active, "stopped when paused");
    assert_eq!(sim.host().video_calls().last(), Some(&false), "video paused");
    let frames = sim.host().frames().len();
    sim.advance_ms(2_000);
    assert_eq!(sim.host().frames().len(), frames, "no frames while paused");
}

#[test]
fn next_stashes_the_link_and_previous_navigates_back() {
    let page = ScriptedPage::new(vec![
        ScriptedTrack::new("Song A", None, Some("/a")),
        ScriptedTrack::new("Song B", None, Some("/b")),
    ]);
    let mut sim = Simulation::new(page);
    sim.boot();
    sim.open_and_grant();

    let intent = sim.click_at_fraction(5.0 / 6.0);
    assert_eq!(intent, ClickIntent::Transport(TransportAction::Next), "next zone");
    assert_eq!(sim.stash().href(), Some("/a"), "current link stashed");
    assert_eq!(sim.page().presses(), [TransportAction::Next], "next pressed");

    sim.advance_ms(1_000);
    assert_eq!(sim.status().track.title(), "Song B", "page moved on");

    let intent = sim.click_at_fraction(1.0 / 6.0);
    assert_eq!(intent, ClickIntent::Navigate("/a".to_string()), "stashed link");
    assert_eq!(sim.host().navigations(), ["/a"], "navigated");
    assert_eq!(sim.page().presses().len(), 1, "previous button not pressed");
}

#[test]
fn previous_without_a_stash_presses_the_button() {
    let page = ScriptedPage::new(vec![
        ScriptedTrack::new("Song A", None, Some("/a")),
        ScriptedTrack::new("Song B", None, Some("/b")),
    ]);
    page.edit(|s| s.index = 1);
    let mut sim = Simulation::new(page);
    sim.boot();
    sim.open_and_grant();

    let intent = sim.click_at_fraction(1.0 / 6.0);
    assert_eq!(intent, ClickIntent::Transport(TransportAction::Previous), "button");
    assert!(sim.host().navigations().is_empty(), "no navigation");
    assert_eq!(sim.page().presses(), [TransportAction::Previous], "pressed");
}

#[test]
fn failed_navigation_falls_back_to_the_previous_button() {
    let page = ScriptedPage::new(vec![
        ScriptedTrack::new("Song A", None, Some("/a")),
        ScriptedTrack::new("Song B", None, Some("/b")),
    ]);
    let mut sim = Simulation::new(page);
    sim.boot();
    sim.open_and_grant();
    sim.click_at_fraction(5.0 / 6.0);
    sim.advance_ms(1_000);

    sim.host_mut().failures.navigate = true;
    sim.click_at_fraction(1.0 / 6.0);
    assert_eq!(
        sim.page().presses(),
        [TransportAction::Next, TransportAction::Previous],
        "previous pressed instead"
    );
    assert_eq!(sim.host().navigations().len(), 0, "nothing navigated");
}

#[test]
fn middle_click_toggles_and_rereads() {
    let mut sim = open_on_song_a();
    let intent = sim.click_at_fraction(0.5);
    assert_eq!(intent, ClickIntent::Transport(TransportAction::TogglePlay), "middle");
    assert!(sim.page().read(|s| s.playing), "page playing");
    sim.advance_ms(600);
    assert!(sim.status().track.is_playing(), "surface caught up");
}

#[test]
fn missing_artwork_on_the_same_track_keeps_the_old_image() {
    let mut sim = open_on_song_a();

    sim.page()
        .replace_track(ScriptedTrack::new("Song A", None, Some("/a")));
    sim.page_mutated();
    sim.advance_ms(500);

    assert_eq!(applies_with(&sim, ArtworkChange::Kept), 1, "kept once");
    let status = sim.status();
    assert_eq!(status.artwork_url.as_deref(), Some(ART_A_LARGE), "entry kept");
    assert_eq!(status.track.artwork_url(), Some(ART_A_LARGE), "snapshot keeps it");
    assert!(status.artwork_loaded, "still decoded");
    assert_eq!(sim.host().loads().len(), 1, "no reload");
}

#[test]
fn missing_artwork_on_a_new_track_clears_to_placeholder() {
    let mut sim = open_on_song_a();

    sim.page()
        .replace_track(ScriptedTrack::new("Song B", None, Some("/b")));
    sim.page_mutated();
    sim.advance_ms(500);

    assert_eq!(applies_with(&sim, ArtworkChange::Cleared), 1, "cleared once");
    let status = sim.status();
    assert_eq!(status.artwork_url, None, "entry cleared");
    assert!(!status.artwork_loaded, "nothing decoded");

    let frame = sim.host().last_frame().expect("redraw");
    assert!(frame.has_text("Song B"), "new title: {:?}", frame.texts);
    assert!(frame.shows_placeholder(), "placeholder drawn");
    assert_eq!(frame.image, None, "no image");
}

#[test]
fn burst_of_mutations_reads_the_page_once() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    let mark = sim.trace().len();

    for take in 0..5 {
        sim.page().replace_track(ScriptedTrack::new(
            &format!("Take {take}"),
            Some(ART_A_SMALL),
            Some("/a"),
        ));
        assert!(sim.page_mutated(), "relevant");
        sim.advance_ms(50);
    }
    sim.advance_ms(1_000);

    let events = sim.trace().since(mark);
    let extracts = events
        .iter()
        .filter(|e| matches!(e, Traced::Extract(_)))
        .count();
    assert_eq!(extracts, 1, "one extraction for the burst");
    let published: Vec<_> = sim.trace().published();
    assert_eq!(
        published.last().map(|i| i.title()),
        Some("Take 4"),
        "reflects the last state"
    );
}

#[test]
fn irrelevant_mutations_do_not_read_the_page() {
    use nowpip_core::mutation::MutationRecord;

    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    let mark = sim.trace().len();
    assert!(
        !sim.mutations(&[MutationRecord::attribute("data-foo")]),
        "unwatched attribute"
    );
    sim.advance_ms(1_000);
    assert!(sim.trace().since(mark).is_empty(), "nothing traced");
}

#[test]
fn unchanged_reads_are_suppressed() {
    let mut sim = open_on_song_a();
    let published = sim.trace().published().len();
    sim.advance_ms(3_000);
    assert_eq!(sim.trace().published().len(), published, "no new publish");
    assert!(
        sim.trace().count(|e| matches!(e, Traced::Suppressed(_))) > 0,
        "polls were suppressed"
    );
}

#[test]
fn close_is_idempotent() {
    let mut sim = open_on_song_a();
    assert!(sim.close_pip(), "first close changes state");
    assert!(!sim.close_pip(), "second close is a no-op");

    assert_eq!(sim.host().exits().len(), 1, "exited once");
    let status = sim.status();
    assert_eq!(status.state, PipState::Closed, "closed");
    assert!(!status.render_loop_active, "loop stopped");
    assert!(!status.polling, "polling stopped");
    assert!(!sim.host().observing(), "observer disconnected");
    assert_eq!(status.window, None, "window released");
}

#[test]
fn reopening_reuses_elements_and_media_session() {
    let mut sim = open_on_song_a();
    sim.close_pip();
    assert!(sim.open_and_grant().is_some(), "reopened");
    assert_eq!(sim.host().elements_created(), 1, "elements created once");
    assert_eq!(sim.host().media_session_installs(), 1, "handlers installed once");
}

#[test]
fn reopening_after_a_change_while_closed_keeps_following_the_page() {
    let mut sim = open_on_song_a();
    assert!(sim.close_pip(), "closed");
    sim.page().set_playing(true);
    assert!(sim.page_mutated(), "relevant");
    sim.advance_ms(50);
    assert!(sim.open_and_grant().is_some(), "reopened");
    assert!(sim.status().track.is_playing(), "open shows the playing page");

    sim.page().set_playing(false);
    assert!(sim.page_mutated(), "relevant");
    sim.advance_ms(3_000);

    let status = sim.status();
    assert!(!status.track.is_playing(), "pause reached the surface");
    assert!(!status.render_loop_active, "loop stopped");
    assert!(!status.video_playing, "video paused");
    assert_eq!(sim.host().video_calls().last(), Some(&false), "last video call pauses");
}

#[test]
fn open_after_an_unreported_browser_exit_requests_again() {
    let mut sim = open_on_song_a();
    sim.host_mut().drop_pip();

    assert_eq!(sim.open_pip(), OpenOutcome::Requested, "not blocked by stale state");
    assert_eq!(sim.status().state, PipState::Opening, "requesting");
    assert!(!sim.status().polling, "polling waits for the grant");
    assert!(sim.host().exits().is_empty(), "the browser already left");

    assert!(sim.grant_pip().is_some(), "granted");
    let status = sim.status();
    assert_eq!(status.state, PipState::Open, "open again");
    assert!(status.polling, "polling resumed");
}

#[test]
fn open_is_ignored_while_open_or_in_flight() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    assert_eq!(sim.open_pip(), OpenOutcome::Requested, "first request");
    assert_eq!(sim.open_pip(), OpenOutcome::InFlight, "already requested");
    sim.grant_pip();
    assert_eq!(sim.open_pip(), OpenOutcome::AlreadyOpen, "already open");
    assert_eq!(sim.host().pending_pip_requests(), 0, "one request only");
}

#[test]
fn late_grant_is_closed_again() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    assert_eq!(sim.open_pip(), OpenOutcome::Requested, "requested");
    assert!(sim.close_pip(), "abandoned while opening");

    let window = sim.grant_pip().expect("browser grants anyway");
    assert_eq!(sim.status().state, PipState::Closed, "stays closed");
    assert_eq!(sim.host().exits().last(), Some(&Some(window)), "window closed");
    assert!(!sim.status().polling, "no polling");
    assert_eq!(
        sim.trace().count(|e| matches!(
            e,
            Traced::Lifecycle(LifecycleEvent {
                cause: LifecycleCause::LateGrant,
                ..
            })
        )),
        1,
        "late grant traced"
    );
}

#[test]
fn denied_request_returns_to_closed() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    sim.open_pip();
    assert!(sim.deny_pip(), "denied");
    assert_eq!(sim.status().state, PipState::Closed, "closed");
    assert!(
        sim.trace()
            .host_errors()
            .iter()
            .any(|m| m.contains("NotAllowedError")),
        "error traced"
    );
}

#[test]
fn synchronous_request_failure_reports_failed() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    sim.host_mut().failures.request_pip = true;
    assert_eq!(sim.open_pip(), OpenOutcome::Failed, "failed");
    assert_eq!(sim.status().state, PipState::Closed, "closed");
}

#[test]
fn leaving_pip_from_the_browser_tears_down_without_exiting() {
    let mut sim = open_on_song_a();
    assert!(sim.leave_pip(), "state changed");
    assert_eq!(sim.status().state, PipState::Closed, "closed");
    assert!(sim.host().exits().is_empty(), "browser already left");
}

#[test]
fn unload_tears_down() {
    let mut sim = open_on_song_a();
    assert!(sim.unload(), "torn down");
    assert!(!sim.unload(), "idempotent");
    assert_eq!(sim.host().exits().len(), 1, "exited once");
}

#[test]
fn media_session_actions_drive_the_page() {
    let mut sim = open_on_song_a();

    sim.media(MediaAction::Play);
    assert_eq!(sim.page().presses(), [TransportAction::TogglePlay], "toggled");
    assert_eq!(sim.host().video_calls().last(), Some(&true), "video forced on");

    // Already playing: no second toggle.
    sim.media(MediaAction::Play);
    assert_eq!(sim.page().presses().len(), 1, "not toggled again");

    sim.media(MediaAction::NextTrack);
    assert_eq!(sim.page().presses().last(), Some(&TransportAction::Next), "next");

    sim.media(MediaAction::Stop);
    assert_eq!(sim.status().state, PipState::Closed, "stop closes");
}

#[test]
fn unavailable_media_session_is_not_retried() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.host_mut().failures.media_session = true;
    sim.boot();
    sim.open_and_grant();
    assert_eq!(
        sim.status().media_session,
        MediaSessionState::Unavailable,
        "marked unavailable"
    );
    sim.host_mut().failures.media_session = false;
    sim.close_pip();
    sim.open_and_grant();
    assert_eq!(sim.host().media_session_installs(), 0, "never retried");
}

#[test]
fn rejected_play_is_retried_on_loop_frames() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.page().set_playing(true);
    sim.boot();
    sim.host_mut().failures.play = true;
    sim.open_and_grant();
    assert!(!sim.status().video_playing, "rejected");
    assert!(sim.status().render_loop_active, "loop runs anyway");

    sim.host_mut().failures.play = false;
    sim.advance_ms(300);
    assert!(sim.status().video_playing, "retried on a loop frame");
}

#[test]
fn missing_controls_warn_and_do_nothing() {
    let mut sim = open_on_song_a();
    sim.page().edit(|s| s.controls_present = false);
    sim.click_at_fraction(0.5);
    assert!(sim.page().presses().is_empty(), "nothing pressed");
    assert_eq!(
        sim.trace().count(|e| matches!(
            e,
            Traced::MissingControl {
                action: TransportAction::TogglePlay,
                ..
            }
        )),
        1,
        "warning traced"
    );
}

#[test]
fn stale_artwork_completions_are_ignored() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    sim.page().replace_track(ScriptedTrack::new(
        "Song A",
        Some("https://i1.sndcdn.com/artworks-b-t50x50.jpg"),
        Some("/a"),
    ));
    sim.page_mutated();
    sim.advance_ms(500);
    assert_eq!(sim.host().pending_loads().len(), 2, "two loads in flight");

    sim.finish_artwork_loads();
    let outcomes: Vec<_> = sim
        .trace()
        .events()
        .iter()
        .filter_map(|e| match e {
            Traced::Artwork(ArtworkEvent { outcome, .. }) => Some(*outcome),
            _ => None,
        })
        .collect();
    assert_eq!(
        outcomes,
        [ArtworkOutcome::Stale, ArtworkOutcome::Loaded],
        "first completion is stale"
    );
    assert_eq!(
        sim.status().artwork_url.as_deref(),
        Some("https://i1.sndcdn.com/artworks-b-t500x500.jpg"),
        "newest entry"
    );
}

#[test]
fn failed_artwork_draws_the_placeholder() {
    let mut sim = Simulation::new(ScriptedPage::single(song_a()));
    sim.boot();
    sim.open_and_grant();
    assert_eq!(sim.fail_artwork_loads(), 1, "one load failed");
    let status = sim.status();
    assert!(status.artwork_errored, "errored");
    let frame = sim.host().last_frame().expect("redraw");
    assert!(frame.shows_placeholder(), "placeholder");
}
