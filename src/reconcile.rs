//! Merges a scraped batch into the runner's snapshot.
//!
//! The snapshot only ever reflects what the store accepted: a failed insert
//! or price update leaves it untouched so the next cycle retries.

use crate::app::ports::EventStore;
use crate::domain::{EntityId, Event};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted(EntityId),
    PriceUpdated { id: EntityId, old_price: String },
    Unchanged,
    Failed,
}

impl ReconcileOutcome {
    fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Inserted(_) => "inserted",
            ReconcileOutcome::PriceUpdated { .. } => "updated",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted(_) => self.inserted += 1,
            ReconcileOutcome::PriceUpdated { .. } => self.updated += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
            ReconcileOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub snapshot: Vec<Event>,
    pub outcomes: Vec<ReconcileOutcome>,
    pub summary: ReconcileSummary,
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn EventStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Processes candidates in order against a snapshot that evolves as it
    /// goes, so duplicates within one batch collapse onto the first.
    #[instrument(skip_all, fields(candidates = candidates.len(), known = snapshot.len()))]
    pub async fn reconcile(&self, candidates: Vec<Event>, mut snapshot: Vec<Event>) -> Reconciled {
        let mut outcomes = Vec::with_capacity(candidates.len());
        let mut summary = ReconcileSummary::default();
        for candidate in candidates {
            let outcome = self.reconcile_one(candidate, &mut snapshot).await;
            counter!("gigs_reconcile_total", "outcome" => outcome.label()).increment(1);
            summary.record(&outcome);
            outcomes.push(outcome);
        }
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "Reconciled batch"
        );
        Reconciled {
            snapshot,
            outcomes,
            summary,
        }
    }

    async fn reconcile_one(&self, candidate: Event, snapshot: &mut Vec<Event>) -> ReconcileOutcome {
        if snapshot.iter().any(|known| *known == candidate) {
            return ReconcileOutcome::Unchanged;
        }

        if let Some(pos) = snapshot.iter().position(|known| known.is_same_event(&candidate)) {
            let Some(id) = snapshot[pos].id else {
                warn!(event = %candidate, "Known event has no store id, cannot update price");
                return ReconcileOutcome::Failed;
            };
            return match self.store.update_price(id, &candidate.price).await {
                Ok(true) => {
                    let old = snapshot.remove(pos);
                    debug!(id, old_price = %old.price, new_price = %candidate.price, "Price updated");
                    let mut updated = candidate;
                    updated.id = Some(id);
                    snapshot.push(updated);
                    ReconcileOutcome::PriceUpdated {
                        id,
                        old_price: old.price,
                    }
                }
                Ok(false) => {
                    warn!(id, event = %candidate, "Price update matched no stored row");
                    ReconcileOutcome::Failed
                }
                Err(e) => {
                    warn!(id, event = %candidate, error = %e, "Price update failed");
                    ReconcileOutcome::Failed
                }
            };
        }

        match self.store.insert_event(&candidate).await {
            Ok(id) => {
                debug!(id, event = %candidate, "Inserted event");
                let mut inserted = candidate;
                inserted.id = Some(id);
                snapshot.push(inserted);
                ReconcileOutcome::Inserted(id)
            }
            Err(e) => {
                warn!(event = %candidate, error = %e, "Insert failed, will retry next cycle");
                ReconcileOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{City, Venue};
    use crate::storage::in_memory::InMemoryStore;
    use chrono::NaiveDate;

    fn event(artist: &str, day: u32, price: &str) -> Event {
        Event {
            id: None,
            artist: artist.into(),
            showtime: NaiveDate::from_ymd_opt(2024, 4, day)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            has_showtime: true,
            price: price.into(),
            venue: Venue {
                id: Some(1),
                name: "Tavastiaklubi".into(),
                city_id: Some(1),
            },
            city: City {
                id: Some(1),
                name: "Helsinki".into(),
            },
        }
    }

    fn seeded(store: &InMemoryStore, e: Event) -> Event {
        let id = store.seed(&e);
        Event { id: Some(id), ..e }
    }

    #[tokio::test]
    async fn new_events_are_inserted_and_appended() {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(vec![event("Circle", 1, "20€")], Vec::new())
            .await;
        assert_eq!(out.snapshot.len(), 1);
        assert!(out.snapshot[0].id.is_some());
        assert!(matches!(out.outcomes[0], ReconcileOutcome::Inserted(_)));
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn identical_events_are_left_alone() {
        let store = Arc::new(InMemoryStore::new());
        let known = seeded(&store, event("Circle", 1, "20€"));
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(vec![event("CIRCLE ", 1, "20€")], vec![known])
            .await;
        assert_eq!(out.outcomes, vec![ReconcileOutcome::Unchanged]);
        assert_eq!(store.insert_calls(), 0);
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_price_changes_collapse_to_one_update() {
        let store = Arc::new(InMemoryStore::new());
        let known = seeded(&store, event("Circle", 1, "10€"));
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(
                vec![event("Circle", 1, "15€"), event("Circle", 1, "15€")],
                vec![known.clone()],
            )
            .await;

        assert_eq!(store.update_calls(), 1);
        assert_eq!(store.insert_calls(), 0);
        assert_eq!(out.snapshot.len(), 1);
        assert_eq!(out.snapshot[0].price, "15€");
        assert_eq!(out.snapshot[0].id, known.id);
        assert_eq!(out.summary.updated, 1);
        assert_eq!(out.summary.unchanged, 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_snapshot_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let known = seeded(&store, event("Circle", 1, "10€"));
        store.fail_updates(true);
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(vec![event("Circle", 1, "15€")], vec![known])
            .await;
        assert_eq!(out.outcomes, vec![ReconcileOutcome::Failed]);
        assert_eq!(out.snapshot.len(), 1);
        assert_eq!(out.snapshot[0].price, "10€");
    }

    #[tokio::test]
    async fn failed_insert_is_not_appended() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_inserts(true);
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(vec![event("Circle", 1, "10€")], Vec::new())
            .await;
        assert!(out.snapshot.is_empty());
        assert_eq!(out.summary.failed, 1);

        // next cycle retries the same insert
        store.fail_inserts(false);
        let out = reconciler
            .reconcile(vec![event("Circle", 1, "10€")], out.snapshot)
            .await;
        assert_eq!(out.snapshot.len(), 1);
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn sold_out_is_a_price_update_of_the_same_event() {
        let store = Arc::new(InMemoryStore::new());
        let known = seeded(&store, event("Circle", 1, "25€"));
        let reconciler = Reconciler::new(store.clone());
        let out = reconciler
            .reconcile(vec![event("Circle", 1, "SOLD OUT!")], vec![known])
            .await;
        assert_eq!(out.summary.updated, 1);
        assert_eq!(out.snapshot[0].price, "SOLD OUT!");
    }
}
