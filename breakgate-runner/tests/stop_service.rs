//! Stop service under concurrent writers.

use breakgate_core::domain::{Position, PositionId, Sleeve};
use breakgate_core::stops::{ProtectionLevel, StopEvent, StopInputs, StopLadder, StopRejection};
use breakgate_runner::{InMemoryStore, PositionStore, StopService, StopServiceError};
use chrono::NaiveDate;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn setup(ids: &[&str]) -> (Arc<InMemoryStore>, StopService) {
    let entry = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let positions = ids.iter().map(|id| {
        Position::open(PositionId::new(*id), *id, Sleeve::Core, 100.0, entry, 10, 90.0).unwrap()
    });
    let store = Arc::new(InMemoryStore::with_positions(100_000.0, positions).unwrap());
    let service = StopService::new(store.clone(), StopLadder::default());
    (store, service)
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_raises_end_at_the_highest_proposal() {
    let (store, service) = setup(&["NVDA"]);
    let id = PositionId::new("NVDA");

    let results: Vec<Result<StopEvent, StopServiceError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = &service;
                let id = &id;
                s.spawn(move || {
                    (0..25)
                        .map(|i| {
                            // interleaved, non-sorted proposals across threads
                            let stop = 90.0 + ((i * 8 + t) * 37 % 200) as f64 * 0.05 + 0.01;
                            service.apply(id, stop, ProtectionLevel::Initial)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let max_proposal = (0..8)
        .flat_map(|t| (0..25).map(move |i| 90.0 + ((i * 8 + t) * 37 % 200) as f64 * 0.05 + 0.01))
        .fold(f64::MIN, f64::max);
    assert_eq!(store.get(&id).unwrap().current_stop(), max_proposal);

    for r in &results {
        match r {
            Ok(StopEvent::Raised { from, to, .. }) => assert!(to > from),
            Ok(other) => panic!("unexpected event {other:?}"),
            // the per-position lock means the store never sees a conflict
            Err(e) => assert!(
                matches!(e, StopServiceError::Rejected(StopRejection::NonMonotonic { .. })),
                "unexpected error {e}"
            ),
        }
    }
}

#[test]
fn positions_do_not_block_each_other() {
    let ids = ["A", "B", "C", "D"];
    let (store, service) = setup(&ids);
    thread::scope(|s| {
        for id in ids {
            let service = &service;
            s.spawn(move || {
                let id = PositionId::new(id);
                for k in 1..=20 {
                    service
                        .apply(&id, 90.0 + k as f64 * 0.5, ProtectionLevel::Initial)
                        .unwrap();
                }
            });
        }
    });
    for id in ids {
        assert_eq!(store.get(&PositionId::new(id)).unwrap().current_stop(), 100.0);
    }
}

#[test]
fn concurrent_recommendations_apply_once() {
    let (store, service) = setup(&["AMD"]);
    let id = PositionId::new("AMD");
    let inputs = StopInputs {
        price: 126.0,
        atr14: Some(2.0),
        highest_close_since_entry: Some(126.0),
    };
    let applied: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| s.spawn(|| service.apply_recommended(&id, &inputs).unwrap().is_some()))
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum()
    });
    assert_eq!(applied, 1);
    let p = store.get(&id).unwrap();
    // R = 2.6 -> LOCK_08R, floor = 100 + 0.8 * 10
    assert_eq!(p.protection_level(), ProtectionLevel::Lock08R);
    assert!((p.current_stop() - 108.0).abs() < 1e-9);
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn stored_stop_never_decreases(proposals in prop::collection::vec(80.0f64..140.0, 1..40)) {
        let (store, service) = setup(&["X"]);
        let id = PositionId::new("X");
        let mut last = store.get(&id).unwrap().current_stop();
        for stop in proposals {
            let _ = service.apply(&id, stop, ProtectionLevel::Initial);
            let now = store.get(&id).unwrap().current_stop();
            prop_assert!(now >= last);
            last = now;
        }
    }
}
