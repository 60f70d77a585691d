// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::builder::fake::FakeBuilder;
use poltergeist_core::{FakeClock, Target, TargetKind};
use poltergeist_storage::StateStore;
use std::time::Duration as StdDuration;
use tempfile::TempDir;

fn name(s: &str) -> TargetName {
    TargetName::new(s).unwrap()
}

fn target(name_str: &str) -> Target {
    Target {
        name: name(name_str),
        kind: TargetKind::Executable,
        watch_patterns: vec!["**/*.rs".to_string()],
        build_command: "true".to_string(),
        output_path: None,
        environment: Default::default(),
        max_retries: 0,
        backoff_multiplier: 2.0,
        debounce_interval_ms: 100,
        settling_delay_ms: 1000,
        enabled: true,
        icon: None,
        label: None,
    }
}

struct Fixture {
    _tmp: TempDir,
    clock: Arc<FakeClock>,
    queue: Arc<BuildQueue>,
    notifier: Arc<FakeNotifier>,
}

fn fixture(parallelism: usize) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(FakeClock::new());
    let store = Arc::new(StateStore::open(tmp.path(), clock.clone()).unwrap());
    let priority_engine = Arc::new(PriorityEngine::new(
        clock.clone(),
        poltergeist_core::EngineConfig::default(),
    ));
    let notifier = Arc::new(FakeNotifier::default());
    let queue = Arc::new(BuildQueue::new(
        parallelism,
        priority_engine,
        store,
        clock.clone() as Arc<dyn Clock>,
        notifier.clone() as Arc<dyn Notifier>,
        StdDuration::from_millis(5),
    ));
    Fixture {
        _tmp: tmp,
        clock,
        queue,
        notifier,
    }
}

#[test]
fn coalesces_repeated_changes_to_same_target() {
    let fx = fixture(1);
    let t = target("a");
    fx.queue
        .register_target(t.name.clone(), Arc::new(FakeBuilder::new(t.clone())));

    fx.queue.on_file_changed(&["f1".to_string()], &[t.name.clone()]);
    fx.queue.on_file_changed(&["f2".to_string()], &[t.name.clone()]);
    fx.queue.on_file_changed(&["f3".to_string()], &[t.name.clone()]);

    assert_eq!(fx.queue.size(), 1);
}

#[test]
fn orders_by_priority_descending_with_fifo_tiebreak() {
    let fx = fixture(1);
    for n in ["a", "b", "c"] {
        let t = target(n);
        fx.queue
            .register_target(t.name.clone(), Arc::new(FakeBuilder::new(t.clone())));
    }
    // All start at the neutral base score (50) on first observation, so
    // insertion order must be preserved (FIFO tie-break).
    fx.queue.on_file_changed(&[], &[name("a")]);
    fx.queue.on_file_changed(&[], &[name("b")]);
    fx.queue.on_file_changed(&[], &[name("c")]);

    assert_eq!(fx.queue.dequeue().unwrap().target_name, name("a"));
    assert_eq!(fx.queue.dequeue().unwrap().target_name, name("b"));
    assert_eq!(fx.queue.dequeue().unwrap().target_name, name("c"));
}

#[tokio::test(flavor = "multi_thread")]
async fn dispatcher_respects_parallelism_bound() {
    let fx = fixture(1);
    let t1 = target("slow1");
    let t2 = target("slow2");
    let b1 = Arc::new(FakeBuilder::new(t1.clone()).with_delay(StdDuration::from_millis(200)));
    let b2 = Arc::new(FakeBuilder::new(t2.clone()).with_delay(StdDuration::from_millis(200)));
    fx.queue.register_target(t1.name.clone(), b1);
    fx.queue.register_target(t2.name.clone(), b2);

    fx.queue.on_file_changed(&[], &[t1.name.clone(), t2.name.clone()]);
    assert_eq!(fx.queue.size(), 2);

    let root = CancellationToken::new();
    fx.queue.start(root.clone());

    tokio::time::sleep(StdDuration::from_millis(40)).await;
    assert_eq!(fx.queue.active_count(), 1);
    assert_eq!(fx.queue.size(), 1);

    fx.queue.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn completed_build_updates_state_store_and_notifier() {
    let fx = fixture(2);
    let t = target("t");
    let builder = Arc::new(FakeBuilder::new(t.clone()).with_outcomes(vec![BuildOutcome::Success]));
    fx.queue.register_target(t.name.clone(), builder);
    fx.queue
        .state_store
        .initialize(&t.name.sanitized(), t.name.as_str(), poltergeist_core::BuildStatus::Idle)
        .unwrap();

    fx.queue.on_file_changed(&[], &[t.name.clone()]);
    let root = CancellationToken::new();
    fx.queue.start(root.clone());

    for _ in 0..50 {
        if fx.queue.active_count() == 0 && fx.notifier.events.lock().len() >= 2 {
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    fx.queue.stop().await;

    let state = fx.queue.state_store.read(&t.name.sanitized()).unwrap();
    assert_eq!(state.build_status, poltergeist_core::BuildStatus::Succeeded);
    assert_eq!(state.build_count, 1);

    let events = fx.notifier.events.lock();
    assert!(events
        .iter()
        .any(|e| matches!(e, NotifyEvent::BuildStart(n) if n == "t")));
    assert!(events
        .iter()
        .any(|e| matches!(e, NotifyEvent::BuildSuccess(n, _) if n == "t")));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_build_does_not_increment_failure_count() {
    let fx = fixture(1);
    let t = target("t");
    let builder = Arc::new(FakeBuilder::new(t.clone()).with_delay(StdDuration::from_secs(5)));
    fx.queue.register_target(t.name.clone(), builder);
    fx.queue
        .state_store
        .initialize(&t.name.sanitized(), t.name.as_str(), poltergeist_core::BuildStatus::Idle)
        .unwrap();

    fx.queue.on_file_changed(&[], &[t.name.clone()]);
    let root = CancellationToken::new();
    fx.queue.start(root.clone());
    tokio::time::sleep(StdDuration::from_millis(30)).await;
    assert_eq!(fx.queue.active_count(), 1);

    fx.queue.stop().await;

    let state = fx.queue.state_store.read(&t.name.sanitized()).unwrap();
    assert_eq!(state.build_status, poltergeist_core::BuildStatus::Cancelled);
    assert_eq!(state.failure_count, 0);
}

#[test]
fn unregistered_target_changes_are_silently_dropped_on_dispatch() {
    // on_file_changed still enqueues (coalescing happens against Q∪A, not
    // against the registry), but the dispatcher discards requests with no
    // matching builder rather than spawning a dead worker.
    let fx = fixture(1);
    fx.queue.on_file_changed(&[], &[name("ghost")]);
    assert_eq!(fx.queue.size(), 1);
}

#[test]
fn clear_drops_pending_but_leaves_active_alone() {
    let fx = fixture(1);
    fx.queue.on_file_changed(&[], &[name("a"), name("b")]);
    assert_eq!(fx.queue.size(), 2);
    fx.queue.clear();
    assert_eq!(fx.queue.size(), 0);
}

#[test]
fn completion_subscribers_are_notified_via_broadcast_channel() {
    let fx = fixture(1);
    let _rx = fx.queue.subscribe_completions();
    drop(fx.clock);
}
