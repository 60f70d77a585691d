// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use poltergeist_core::FakeClock;

fn engine() -> (Arc<FakeClock>, PriorityEngine) {
    let clock = Arc::new(FakeClock::new());
    let engine = PriorityEngine::new(clock.clone(), EngineConfig::default());
    (clock, engine)
}

fn name(s: &str) -> TargetName {
    TargetName::new(s).unwrap()
}

#[test]
fn unknown_target_scores_base_fifty() {
    let (_clock, engine) = engine();
    assert_eq!(engine.calculate_priority(&name("t"), 0), 50.0);
}

#[test]
fn recent_change_boosts_score_toward_focus_window_edge() {
    let (clock, engine) = engine();
    engine.record_file_change(&name("t"), "a.rs");
    let just_after = engine.calculate_priority(&name("t"), clock.now_ms());
    assert!(just_after > 50.0);

    // At the edge of the focus window the recency term should be ~0.
    let far = engine.calculate_priority(
        &name("t"),
        clock.now_ms() + EngineConfig::default().focus_window().as_millis() as i64,
    );
    assert!(far < just_after);
}

#[test]
fn score_is_always_clamped() {
    let (clock, engine) = engine();
    for _ in 0..50 {
        engine.record_file_change(&name("t"), "a.rs");
    }
    for _ in 0..200 {
        engine.update_target_metrics(&name("t"), 1.0, true);
    }
    let score = engine.calculate_priority(&name("t"), clock.now_ms());
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn failing_history_lowers_score_below_succeeding_history() {
    let (clock, engine) = engine();
    for _ in 0..20 {
        engine.update_target_metrics(&name("good"), 1_000.0, true);
        engine.update_target_metrics(&name("bad"), 1_000.0, false);
    }
    let good = engine.calculate_priority(&name("good"), clock.now_ms());
    let bad = engine.calculate_priority(&name("bad"), clock.now_ms());
    assert!(good > bad);
}

#[test]
fn fast_builds_score_higher_than_slow_builds() {
    let (clock, engine) = engine();
    engine.update_target_metrics(&name("fast"), 1_000.0, true);
    engine.update_target_metrics(&name("slow"), 60_000.0, true);
    let fast = engine.calculate_priority(&name("fast"), clock.now_ms());
    let slow = engine.calculate_priority(&name("slow"), clock.now_ms());
    assert!(fast > slow);
}

#[test]
fn more_recent_focus_outranks_older_focus_given_identical_history() {
    // Mirrors scenario S5: A changed first, B changed later; both then
    // become affected by a shared event. B (more recent) should score
    // higher.
    let (clock, engine) = engine();
    engine.record_file_change(&name("a"), "shared");
    clock.advance(std::time::Duration::from_millis(100));
    engine.record_file_change(&name("b"), "shared");
    clock.advance(std::time::Duration::from_millis(100));

    let now = clock.now_ms();
    let score_a = engine.calculate_priority(&name("a"), now);
    let score_b = engine.calculate_priority(&name("b"), now);
    assert!(score_b > score_a);
}

#[test]
fn record_file_change_decays_old_ring_entries() {
    let (clock, engine) = engine();
    engine.record_file_change(&name("t"), "old.rs");
    clock.advance(EngineConfig::default().priority_decay() + std::time::Duration::from_secs(1));
    engine.record_file_change(&name("t"), "new.rs");
    let priority = engine.get_target_priority(&name("t")).unwrap();
    assert_eq!(priority.ring_len(), 1);
}
