//! End-to-end deck flows over real storage backends.
//!
//! Each test builds a deck on a manual clock, drives it the way a host
//! would (pointer events, aggregate commands, frames), and reloads it from
//! the same store to check what survived.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use serde_json::json;
use timerdeck_core::collaborators::AlarmError;
use timerdeck_core::storage::{
    timer_key, KeyValueStore, TimerDefaults, GROUPS_KEY, SINGLE_TIMER_KEY,
};
use timerdeck_core::{
    Alarm, CardContext, CardEffect, Clock, Database, Deck, Event, FixedAnswer, GestureConfig,
    ManualClock, MemoryStore, Notifier, Persistence, PointerEvent, StorageError, TimerState,
    MAX_DURATION_SECS, SINGLE_GROUP_ID,
};

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Default)]
struct CountingAlarm(AtomicUsize);

impl Alarm for CountingAlarm {
    fn ring(&self) -> Result<(), AlarmError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Notices(Mutex<Vec<String>>);

impl Notifier for Notices {
    fn notify(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

struct Rig {
    clock: ManualClock,
    alarm: Arc<CountingAlarm>,
    notices: Arc<Notices>,
    ctx: CardContext,
}

fn rig(store: Box<dyn KeyValueStore>) -> Rig {
    let clock = ManualClock::at_epoch();
    clock.advance(Duration::days(20_000));
    let alarm = Arc::new(CountingAlarm::default());
    let notices = Arc::new(Notices::default());
    let ctx = CardContext {
        clock: Arc::new(clock.clone()),
        persistence: Persistence::new(store, notices.clone()),
        alarm: alarm.clone(),
        gesture: GestureConfig::default(),
    };
    Rig {
        clock,
        alarm,
        notices,
        ctx,
    }
}

fn ms(n: i64) -> Duration {
    Duration::milliseconds(n)
}

/// Press, optionally drag, and release on one timer.
fn gesture(deck: &mut Deck, clock: &ManualClock, timer_id: &str, dx: f64, hold_ms: i64) -> CardEffect {
    let t0 = clock.now();
    deck.handle_pointer(timer_id, PointerEvent::Down { x: 200.0, y: 10.0, at: t0 })
        .unwrap();
    if dx != 0.0 {
        deck.handle_pointer(
            timer_id,
            PointerEvent::Move { x: 200.0 + dx, y: 10.0, at: t0 + ms(hold_ms / 2) },
        )
        .unwrap();
    }
    deck.handle_pointer(timer_id, PointerEvent::Up { at: t0 + ms(hold_ms) })
        .unwrap()
}

// ============================================================================
// Flows
// ============================================================================

#[test]
fn tap_runs_timer_to_single_completion() {
    let r = rig(Box::new(MemoryStore::new()));
    let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
    let (id, _) = deck.add_timer(SINGLE_GROUP_ID).unwrap();

    let effect = gesture(&mut deck, &r.clock, &id, 0.0, 100);
    assert!(matches!(effect, CardEffect::Event(Event::TimerStarted { .. })));

    let mut completions = 0;
    for _ in 0..(301 * 4) {
        r.clock.advance(ms(250));
        completions += deck
            .poll()
            .into_iter()
            .filter(|(_, e)| matches!(e, CardEffect::Event(ev) if ev.is_completion()))
            .count();
    }
    assert_eq!(completions, 1);
    assert_eq!(r.alarm.0.load(Ordering::SeqCst), 1);
    assert_eq!(deck.timer(&id).unwrap().engine().state(), TimerState::Completed);
}

#[test]
fn swipes_reset_and_delete() {
    let r = rig(Box::new(MemoryStore::new()));
    let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
    let (id, _) = deck.add_timer(SINGLE_GROUP_ID).unwrap();
    deck.timer_mut(&id).unwrap().start().unwrap();
    r.clock.advance(Duration::seconds(30));

    // Short of the threshold: snaps back, nothing happens.
    let effect = gesture(&mut deck, &r.clock, &id, 90.0, 120);
    assert_eq!(effect, CardEffect::None);
    assert_eq!(deck.timer(&id).unwrap().engine().state(), TimerState::Running);

    let effect = gesture(&mut deck, &r.clock, &id, 130.0, 120);
    assert!(matches!(effect, CardEffect::Event(Event::TimerReset { .. })));
    assert_eq!(deck.timer(&id).unwrap().engine().remaining(), 300.0);

    let effect = gesture(&mut deck, &r.clock, &id, -130.0, 120);
    assert!(matches!(effect, CardEffect::RemoveRequested { .. }));
    assert!(deck.timer(&id).is_err());
    assert!(deck.singles().is_empty());
}

#[test]
fn group_broadcast_survives_an_exhausted_member() {
    let r = rig(Box::new(MemoryStore::new()));
    let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
    let (gid, _) = deck.create_group(Some("Batch")).unwrap();
    let ids: Vec<String> = (0..3).map(|_| deck.add_timer(&gid).unwrap().0).collect();

    let mut edit = deck.timer(&ids[1]).unwrap().edit_request();
    edit.minutes = 0;
    edit.seconds = 1;
    deck.timer_mut(&ids[1]).unwrap().configure(&edit).unwrap();
    deck.timer_mut(&ids[1]).unwrap().start().unwrap();
    r.clock.advance(Duration::seconds(1));
    deck.poll();

    let report = deck.start_all(&gid).unwrap();
    assert_eq!(report.visited.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].timer_id, ids[1]);
    assert!(deck.timer(&ids[2]).unwrap().engine().is_running());

    let paused = deck.pause_all(&gid).unwrap();
    assert_eq!(paused.events.len(), 2);
    assert!(!deck.any_running());
}

#[test]
fn database_round_trip_restores_deck() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deck.db");

    let (gid, running, paused) = {
        let r = rig(Box::new(Database::open_at(&path).unwrap()));
        let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
        let (gid, _) = deck.create_group(Some("Kitchen")).unwrap();
        let (running, _) = deck.add_timer(&gid).unwrap();
        let (paused, _) = deck.add_timer(SINGLE_GROUP_ID).unwrap();
        deck.timer_mut(&running).unwrap().start().unwrap();
        deck.timer_mut(&paused).unwrap().start().unwrap();
        r.clock.advance(Duration::seconds(45));
        deck.timer_mut(&paused).unwrap().pause();
        assert!(deck.flush().is_clean());
        (gid, running, paused)
    };

    let r = rig(Box::new(Database::open_at(&path).unwrap()));
    r.clock.advance(Duration::seconds(60));
    let deck = Deck::load(r.ctx.clone(), TimerDefaults::default());

    let group = deck.group(&gid).unwrap();
    assert_eq!(group.name(), "Kitchen");
    let engine = deck.timer(&running).unwrap().engine();
    assert_eq!(engine.state(), TimerState::Running);
    assert!((engine.remaining_at(r.clock.now()) - 240.0).abs() < 1e-6);

    let engine = deck.timer(&paused).unwrap().engine();
    assert_eq!(engine.state(), TimerState::Paused);
    assert!((engine.remaining() - 255.0).abs() < 1e-6);
}

#[test]
fn corrupt_records_fall_back_without_failing_load() {
    let store = MemoryStore::new();
    store
        .set(
            GROUPS_KEY,
            &json!([{ "id": "g1", "name": "Broken", "timerIds": ["x"] }]),
        )
        .unwrap();
    store.set(&timer_key("x"), &json!({ "id": 42 })).unwrap();
    let r = rig(Box::new(store));

    let deck = Deck::load(r.ctx.clone(), TimerDefaults::default());
    let engine = deck.timer("x").unwrap().engine();
    assert_eq!(engine.state(), TimerState::Idle);
    assert_eq!(engine.initial_duration(), 300.0);
    assert_eq!(r.notices.0.lock().unwrap().len(), 1);
}

#[test]
fn failed_flush_keeps_memory_state_and_notifies() {
    struct ReadOnly;
    impl KeyValueStore for ReadOnly {
        fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, StorageError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &serde_json::Value) -> Result<(), StorageError> {
            Err(StorageError::Locked)
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Locked)
        }
        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::Locked)
        }
    }

    let r = rig(Box::new(ReadOnly));
    let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
    let (id, _) = deck.add_timer(SINGLE_GROUP_ID).unwrap();
    deck.timer_mut(&id).unwrap().start().unwrap();

    let report = deck.flush();
    assert!(!report.is_clean());
    assert!(!r.notices.0.lock().unwrap().is_empty());
    assert!(deck.timer(&id).unwrap().engine().is_running());

    assert!(deck.clear_all(&FixedAnswer(true)).is_err());
    assert!(deck.timer(&id).is_ok());
    assert!(r.ctx.persistence.pending() > 0);
}

#[test]
fn writes_survive_a_failed_clear_until_store_recovers() {
    /// Memory store whose writes and wipes fail while `down` is set.
    #[derive(Clone, Default)]
    struct Outage {
        inner: MemoryStore,
        down: Arc<AtomicBool>,
    }

    impl Outage {
        fn check(&self) -> Result<(), StorageError> {
            if self.down.load(Ordering::SeqCst) {
                Err(StorageError::Locked)
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for Outage {
        fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
            self.check()?;
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.inner.remove(key)
        }
        fn clear(&self) -> Result<(), StorageError> {
            self.check()?;
            self.inner.clear()
        }
    }

    let store = Outage::default();
    let r = rig(Box::new(store.clone()));
    let mut deck = Deck::new(r.ctx.clone(), TimerDefaults::default());
    let (id, _) = deck.add_timer(SINGLE_GROUP_ID).unwrap();

    store.down.store(true, Ordering::SeqCst);
    assert!(deck.clear_all(&FixedAnswer(true)).is_err());
    assert!(deck.timer(&id).is_ok());

    store.down.store(false, Ordering::SeqCst);
    assert!(deck.flush().is_clean());
    assert!(store.inner.contains(&timer_key(&id)));
    assert!(store.inner.contains(SINGLE_TIMER_KEY));
}

#[test]
fn oversized_legacy_record_loads_and_starts() {
    let store = MemoryStore::new();
    store.set(SINGLE_TIMER_KEY, &json!(["x"])).unwrap();
    store
        .set(
            &timer_key("x"),
            &json!({ "id": "x", "initialDuration": 1e18, "remaining": 0.5, "state": "paused" }),
        )
        .unwrap();
    let r = rig(Box::new(store));

    let mut deck = Deck::load(r.ctx.clone(), TimerDefaults::default());
    let card = deck.timer_mut("x").unwrap();
    assert_eq!(card.engine().initial_duration(), MAX_DURATION_SECS);
    assert!(card.start().unwrap().is_some());

    r.clock.advance(Duration::seconds(1));
    let completed = deck
        .poll()
        .into_iter()
        .any(|(_, e)| matches!(e, CardEffect::Event(ev) if ev.is_completion()));
    assert!(completed);
}
