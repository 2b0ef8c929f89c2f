//! Stop updates against the position store.
//!
//! Each update is read-compare-write under a per-position mutex: read the
//! stored position, apply the transition in memory, then write it back with
//! a compare-and-set on the stop that was read.

use crate::notify::{notify_best_effort, Alert, AlertKind, NotificationSink};
use crate::store::{PositionStore, StoreError};
use breakgate_core::domain::PositionId;
use breakgate_core::stops::{
    apply_transition, recommend, ProtectionLevel, StopEvent, StopInputs, StopLadder,
    StopRecommendation, StopRejection, StopTransition,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StopServiceError {
    #[error("stop rejected: {0}")]
    Rejected(#[from] StopRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct StopService {
    store: Arc<dyn PositionStore>,
    ladder: StopLadder,
    locks: Mutex<HashMap<PositionId, Arc<Mutex<()>>>>,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl StopService {
    pub fn new(store: Arc<dyn PositionStore>, ladder: StopLadder) -> Self {
        Self {
            store,
            ladder,
            locks: Mutex::new(HashMap::new()),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn ladder(&self) -> &StopLadder {
        &self.ladder
    }

    /// Per-position lock. Entries nobody else holds are dropped on the way,
    /// so the map only tracks positions with an update in flight.
    fn lock_for(&self, id: &PositionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|key, lock| key == id || Arc::strong_count(lock) > 1);
        locks.entry(id.clone()).or_default().clone()
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Proposal only; nothing is written.
    pub fn recommend(
        &self,
        id: &PositionId,
        inputs: &StopInputs,
    ) -> Result<StopRecommendation, StopServiceError> {
        let position = self.store.get(id)?;
        Ok(recommend(&position, inputs, &self.ladder))
    }

    /// Monotonic update: `new_stop` must exceed the stored stop.
    pub fn apply(
        &self,
        id: &PositionId,
        new_stop: f64,
        level: ProtectionLevel,
    ) -> Result<StopEvent, StopServiceError> {
        self.transition(id, StopTransition::Trail { new_stop, level })
    }

    /// Recommend and, when the recommendation raises the stop, apply it
    /// under the same lock.
    pub fn apply_recommended(
        &self,
        id: &PositionId,
        inputs: &StopInputs,
    ) -> Result<Option<StopEvent>, StopServiceError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let position = self.store.get(id)?;
        match recommend(&position, inputs, &self.ladder) {
            StopRecommendation::NoChange { reason, .. } => {
                tracing::debug!(position = %id, %reason, "no stop change");
                Ok(None)
            }
            StopRecommendation::Raise(proposal) => {
                self.commit(id, proposal.transition()).map(Some)
            }
        }
    }

    /// Audited override that may lower the stop.
    pub fn admin_reset(
        &self,
        id: &PositionId,
        new_stop: f64,
        reason: &str,
    ) -> Result<StopEvent, StopServiceError> {
        self.transition(
            id,
            StopTransition::AdminReset {
                new_stop,
                reason: reason.to_string(),
            },
        )
    }

    fn transition(
        &self,
        id: &PositionId,
        transition: StopTransition,
    ) -> Result<StopEvent, StopServiceError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.commit(id, transition)
    }

    /// Caller holds the position lock.
    fn commit(
        &self,
        id: &PositionId,
        transition: StopTransition,
    ) -> Result<StopEvent, StopServiceError> {
        let mut position = self.store.get(id)?;
        let expected = position.current_stop();
        let event = apply_transition(&mut position, transition)?;
        self.store.compare_and_set_stop(id, expected, &position)?;

        let alert = match &event {
            StopEvent::Raised {
                from, to, level_to, ..
            } => {
                tracing::info!(position = %id, from, to, level = %level_to, "stop raised");
                Alert::new(
                    AlertKind::StopRaised,
                    Some(&position.ticker),
                    format!("{}: stop {from:.2} -> {to:.2} ({level_to})", position.ticker),
                )
            }
            StopEvent::AdminReset { from, to, reason, .. } => Alert::new(
                AlertKind::StopAdminReset,
                Some(&position.ticker),
                format!(
                    "{}: stop reset {from:.2} -> {to:.2}: {reason}",
                    position.ticker
                ),
            ),
        };
        if let Some(notifier) = &self.notifier {
            notify_best_effort(notifier.as_ref(), &alert);
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use crate::store::InMemoryStore;
    use breakgate_core::domain::{Position, Sleeve};
    use chrono::NaiveDate;

    fn service() -> (StopService, Arc<MemorySink>, PositionId) {
        let id = PositionId::new("p1");
        let position = Position::open(
            id.clone(),
            "NVDA",
            Sleeve::Core,
            100.0,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            10,
            90.0,
        )
        .unwrap();
        let store = Arc::new(InMemoryStore::with_positions(100_000.0, [position]).unwrap());
        let sink = Arc::new(MemorySink::new());
        let service = StopService::new(store, StopLadder::default()).with_notifier(sink.clone());
        (service, sink, id)
    }

    #[test]
    fn lowering_is_rejected_and_store_untouched() {
        let (svc, _, id) = service();
        let err = svc.apply(&id, 85.0, ProtectionLevel::Initial).unwrap_err();
        assert!(matches!(
            err,
            StopServiceError::Rejected(StopRejection::NonMonotonic { .. })
        ));
        let rec = svc
            .recommend(
                &id,
                &StopInputs {
                    price: 101.0,
                    atr14: None,
                    highest_close_since_entry: None,
                },
            )
            .unwrap();
        assert!(matches!(rec, StopRecommendation::NoChange { .. }));
    }

    #[test]
    fn recommended_raise_is_applied_and_notified() {
        let (svc, sink, id) = service();
        let inputs = StopInputs {
            price: 116.0,
            atr14: Some(2.0),
            highest_close_since_entry: Some(116.0),
        };
        let event = svc.apply_recommended(&id, &inputs).unwrap().unwrap();
        assert!(matches!(event, StopEvent::Raised { to, .. } if to == 100.0));
        assert!(svc.apply_recommended(&id, &inputs).unwrap().is_none());

        let alerts = sink.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::StopRaised);
    }

    #[test]
    fn admin_reset_requires_reason() {
        let (svc, sink, id) = service();
        assert!(matches!(
            svc.admin_reset(&id, 80.0, "  "),
            Err(StopServiceError::Rejected(StopRejection::MissingAuditReason))
        ));
        svc.admin_reset(&id, 80.0, "split adjustment").unwrap();
        assert_eq!(sink.alerts()[0].kind, AlertKind::StopAdminReset);
    }

    #[test]
    fn idle_position_locks_are_released() {
        let (svc, _, id) = service();
        for i in 0..20 {
            let _ = svc.apply(&PositionId::new(format!("gone-{i}")), 95.0, ProtectionLevel::Initial);
        }
        svc.apply(&id, 95.0, ProtectionLevel::Initial).unwrap();
        assert_eq!(svc.tracked_locks(), 1);

        let held = svc.lock_for(&id);
        let _ = svc.lock_for(&PositionId::new("other"));
        assert_eq!(svc.tracked_locks(), 2);
        drop(held);
    }

    #[test]
    fn unknown_position_is_store_error() {
        let (svc, _, _) = service();
        let err = svc
            .apply(&PositionId::new("missing"), 95.0, ProtectionLevel::Initial)
            .unwrap_err();
        assert!(matches!(err, StopServiceError::Store(StoreError::NotFound(_))));
    }
}
