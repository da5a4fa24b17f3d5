//! End-to-end tests of the clock/pool synchronization protocol.

use crate::harness::{create_buffered, session_with, TestSegment};
use parking_lot::Mutex;
use reelsync_core::PlayerConfig;
use reelsync_playback::{
    visible_ready_condition, IntervalDriver, PreheatPlan, ResourceStatus, SegmentPhase,
    TickDriver,
};
use std::sync::Arc;
use std::time::Duration;

// ── Timeline scenario: three 2 s segments on a 6 s clock ───────

#[test]
fn boundary_crossing_retargets_the_next_segment() {
    let (mut session, _) = session_with(PlayerConfig::default());
    let segments = [
        TestSegment::new(0.0, 2.0, 0.5),
        TestSegment::new(2.0, 4.0, 0.5),
        TestSegment::new(4.0, 6.0, 0.5),
    ];
    let registrations: Vec<_> = segments.iter().map(|s| s.registration).collect();

    let clock = session.clock_mut();
    clock.set_duration(6.0);
    clock.register_segments(&registrations);
    clock.play();
    clock.tick(0.0);
    clock.tick(2.001);
    assert!((clock.current_time() - 2.001).abs() < 1e-9);

    // Just past the boundary only the second segment is corrected, at its
    // source in point plus 1 ms.
    let corrections = clock.corrections_at(clock.current_time());
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].segment_id, segments[1].registration.segment_id);
    assert!((corrections[0].target - 0.501).abs() < 1e-9);

    // And the first segment is no longer visible.
    let plan = PreheatPlan::build(registrations.iter(), clock.current_time(), 1.5);
    assert!(!plan.visible.contains(&segments[0].registration.segment_id));
    assert!(plan.visible.contains(&segments[1].registration.segment_id));
}

#[test]
fn corrections_flow_from_clock_to_pool_on_cadence() {
    let (mut session, opener) = session_with(PlayerConfig::default());
    let segment = TestSegment::new(0.0, 10.0, 2.0);

    create_buffered(&session, &opener, &segment);
    session.pool().lock().poll();
    let control = opener.last_control().unwrap();
    assert_eq!(
        session.pool().lock().status(segment.spec.segment_id),
        Some(ResourceStatus::Ready)
    );

    let clock = session.clock_mut();
    clock.set_duration(10.0);
    clock.register_segments(&[segment.registration]);
    clock.play();

    // Drive past one correction interval; the handle starts at its in point
    // (2.0) while the target drifts with the clock, so the wired sink must
    // have seeked it.
    let mut now = 0.0;
    while now < 0.6 {
        session.advance(now);
        now += 0.016;
    }
    let clock_time = session.clock().current_time();
    let target = 2.0 + clock_time;
    assert!(control.seek_count() >= 2); // creation pre-seek + correction
    assert!((control.position() - target).abs() < 0.2);
}

#[test]
fn stalled_stream_holds_the_clock_driver_loop() {
    let (session, _) = session_with(PlayerConfig::default());
    let segment = TestSegment::new(0.0, 4.0, 0.0);

    // Created but never buffered: the visible-ready condition stays false.
    session.pool().lock().create(&segment.spec).unwrap();
    let condition = visible_ready_condition(
        &session.pool(),
        vec![segment.spec.segment_id],
        60.0,
    );

    let session = Arc::new(Mutex::new(session));
    {
        let mut s = session.lock();
        s.clock_mut().add_wait_condition(condition);
        s.clock_mut().set_duration(4.0);
        s.clock_mut().play();
    }

    let driven = session.clone();
    let mut driver = IntervalDriver::spawn(Duration::from_millis(4), move |now| {
        driven.lock().advance(now)
    });
    std::thread::sleep(Duration::from_millis(500));
    driver.stop();

    let s = session.lock();
    assert_eq!(s.clock().current_time(), 0.0);
    assert!(s.clock().is_waiting());
}

#[test]
fn playback_runs_to_the_end_and_loops_on_replay() {
    let (mut session, opener) = session_with(PlayerConfig::default());
    let segment = TestSegment::new(0.0, 1.0, 0.0);
    create_buffered(&session, &opener, &segment);

    session.clock_mut().set_duration(1.0);
    session.clock_mut().register_segments(&[segment.registration]);
    session.clock_mut().play();

    let mut now = 0.0;
    while session.advance(now) {
        now += 0.1;
        assert!(now < 5.0, "clock never ended");
    }
    assert!(session.clock().is_ended());
    assert_eq!(session.clock().current_time(), 1.0);

    session.clock_mut().play();
    assert_eq!(session.clock().current_time(), 0.0);
}

#[test]
fn failed_stream_does_not_stop_the_others() {
    let (mut session, opener) = session_with(PlayerConfig::default());
    let good = TestSegment::new(0.0, 4.0, 0.0);
    let bad = TestSegment::new(0.0, 4.0, 0.0);

    create_buffered(&session, &opener, &good);
    session.pool().lock().create(&bad.spec).unwrap();
    let bad_control = opener.last_control().unwrap();
    bad_control.fail(reelsync_core::PlaybackError::Decode(
        "corrupt mdat".to_string(),
    ));

    let rx = session.pool().lock().subscribe("test");
    session.clock_mut().set_duration(4.0);
    session.clock_mut().play();
    session.advance(0.0);
    session.advance(0.1);

    // The failure arrived as an event and an Error status, not a panic or a
    // stalled clock.
    assert!((session.clock().current_time() - 0.1).abs() < 1e-9);
    let pool = session.pool();
    let pool = pool.lock();
    assert_eq!(pool.status(good.spec.segment_id), Some(ResourceStatus::Ready));
    assert_eq!(pool.status(bad.spec.segment_id), Some(ResourceStatus::Error));
    assert!(rx.try_iter().any(|e| matches!(
        e.kind,
        reelsync_playback::PoolEventKind::LoadError { .. }
    )));
}

// ── Phase classification sanity across a session ───────────────

#[test]
fn phases_track_the_playhead() {
    let segment = TestSegment::new(5.0, 7.0, 0.0);
    let reg = segment.registration;
    assert_eq!(
        reelsync_playback::classify(&reg, 5.5, 1.5),
        SegmentPhase::Visible
    );
    assert_eq!(
        reelsync_playback::classify(&reg, 4.0, 1.5),
        SegmentPhase::Upcoming
    );
    assert_eq!(
        reelsync_playback::classify(&reg, 1.0, 1.5),
        SegmentPhase::Idle
    );
    assert_eq!(
        reelsync_playback::classify(&reg, 7.0, 1.5),
        SegmentPhase::Idle
    );
}
