//! Preheat protocol and eviction-policy tests.

use crate::harness::{create_buffered, session_with, TestSegment};
use reelsync_core::PlayerConfig;
use reelsync_playback::{
    upcoming_seeked_condition, PreheatPlan, ResourceStatus,
};
use std::collections::HashSet;

#[test]
fn plan_keep_set_shields_visible_and_upcoming_from_eviction() {
    let (mut session, opener) = session_with(PlayerConfig {
        max_resident: 2,
        ..Default::default()
    });
    let past = TestSegment::new(0.0, 2.0, 0.0);
    let visible = TestSegment::new(2.0, 4.0, 0.0);
    let upcoming = TestSegment::new(4.0, 6.0, 0.0);
    let registrations = [
        past.registration,
        visible.registration,
        upcoming.registration,
    ];

    for segment in [&past, &visible, &upcoming] {
        create_buffered(&session, &opener, segment);
    }
    session.pool().lock().poll();

    // Playhead inside the second segment, third within the 1.5 s horizon.
    session.clock_mut().set_duration(6.0);
    session.clock_mut().seek(3.0);
    let plan = PreheatPlan::build(registrations.iter(), 3.0, 1.5);
    assert_eq!(plan.visible, vec![visible.registration.segment_id]);
    assert_eq!(plan.upcoming, vec![upcoming.registration.segment_id]);
    assert_eq!(plan.idle, vec![past.registration.segment_id]);

    let evicted = session.pool().lock().evict_lru(&plan.keep_set());
    assert_eq!(evicted, vec![past.registration.segment_id]);
    let pool = session.pool();
    let pool = pool.lock();
    assert!(pool.contains(visible.registration.segment_id));
    assert!(pool.contains(upcoming.registration.segment_id));
    assert_eq!(pool.len(), 2);
}

#[test]
fn touched_resources_survive_eviction_of_older_ones() {
    // max_resident = 2; create A, B, touch A, create C: B goes, A stays.
    let (session, _) = session_with(PlayerConfig {
        max_resident: 2,
        ..Default::default()
    });
    let a = TestSegment::new(0.0, 2.0, 0.0);
    let b = TestSegment::new(2.0, 4.0, 0.0);
    let c = TestSegment::new(4.0, 6.0, 0.0);

    let pool = session.pool();
    let mut pool = pool.lock();
    pool.create(&a.spec).unwrap();
    pool.create(&b.spec).unwrap();
    pool.touch(a.spec.segment_id);
    pool.create(&c.spec).unwrap();

    let evicted = pool.evict_lru(&HashSet::new());
    assert_eq!(evicted, vec![b.spec.segment_id]);
    assert!(pool.contains(a.spec.segment_id));
    assert!(pool.contains(c.spec.segment_id));
}

#[test]
fn upcoming_segment_becomes_playable_before_its_start() {
    let (mut session, opener) = session_with(PlayerConfig::default());
    let current = TestSegment::new(0.0, 2.0, 0.0);
    let next = TestSegment::new(2.0, 4.0, 6.0); // plays [6.0, 8.0) of its source

    create_buffered(&session, &opener, &current);
    session.pool().lock().poll();
    session.pool().lock().set_playing(&[current.spec.segment_id], true);

    session.clock_mut().set_duration(4.0);
    session
        .clock_mut()
        .register_segments(&[current.registration, next.registration]);
    session.clock_mut().play();

    // Advance to 1.0: next enters the lookahead horizon. The orchestration
    // layer reacts by materializing it; progressive creation pre-seeks to
    // the in point.
    session.advance(0.0);
    session.advance(1.0);
    let plan = PreheatPlan::build(
        [current.registration, next.registration].iter(),
        session.clock().current_time(),
        1.5,
    );
    assert!(plan.upcoming.contains(&next.registration.segment_id));

    create_buffered(&session, &opener, &next);
    let next_control = opener.last_control().unwrap();
    assert_eq!(next_control.position(), 6.0);

    // Gate the boundary on the upcoming segment being prepared.
    let condition = upcoming_seeked_condition(
        &session.pool(),
        vec![(next.registration.segment_id, 6.0)],
        0.05,
        60.0,
    );
    session.clock_mut().add_wait_condition(condition);

    session.advance(1.1); // pool poll promotes `next` to Ready
    session.advance(1.2);
    assert!(!session.clock().is_waiting());

    // Cross the boundary and hand playback over.
    let mut now = 1.2;
    while session.clock().current_time() < 2.001 {
        now += 0.05;
        session.advance(now);
    }
    session.clock_mut().remove_wait_condition("upcoming-seeked");
    let pool = session.pool();
    let mut pool = pool.lock();
    assert_eq!(
        pool.status(next.registration.segment_id),
        Some(ResourceStatus::Ready)
    );
    pool.set_playing(&[next.registration.segment_id], true);
    assert!(next_control.is_playing());
    // Already at its in point, so no corrective seek was needed beyond the
    // creation pre-seek.
    assert!((next_control.position() - 6.0).abs() < 0.2);
}

#[test]
fn evicted_segment_is_recreated_on_demand() {
    let (session, opener) = session_with(PlayerConfig {
        max_resident: 1,
        ..Default::default()
    });
    let a = TestSegment::new(0.0, 2.0, 0.0);
    let b = TestSegment::new(2.0, 4.0, 0.0);

    let pool = session.pool();
    let mut pool = pool.lock();
    pool.create(&a.spec).unwrap();
    pool.create(&b.spec).unwrap();
    pool.evict_lru(&HashSet::new());
    assert!(!pool.contains(a.spec.segment_id));

    // Missing means "not yet created", never fatal: create again.
    assert_eq!(pool.buffered_amount(a.spec.segment_id), 0.0);
    assert_eq!(pool.create(&a.spec).unwrap(), ResourceStatus::Loading);
    assert_eq!(opener.controls(a.spec.source.id).len(), 2);
}
