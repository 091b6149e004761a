//! Sales ledger repository.
//!
//! The ledger is a JSON array of [`Sale`] records stored under
//! [`SALES_KEY`]. Every call re-reads the store so that writes made from other
//! contexts are always observed; there is no in-process cache.
//!
//! Mutations are whole-collection read-modify-write. Two contexts writing at
//! the same time can lose one update (last writer wins).

#![forbid(unsafe_code)]

use astryx_persist::{ChangeFeed, SharedStore, StorageError};
use astryx_proto::{Sale, SaleDraft, ValidationError};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Record key holding the ledger.
pub const SALES_KEY: &str = "astryxSales";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid sale: {0}")]
    Invalid(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("stored ledger is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to encode ledger: {0}")]
    Encode(#[source] serde_json::Error),
}

impl LedgerError {
    /// The input field to highlight, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Invalid(e) => Some(e.field()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Repository owning the sale collection.
#[derive(Clone)]
pub struct SalesLedger {
    store: SharedStore,
}

impl SalesLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Read the full ledger, reporting storage and decoding failures.
    /// An absent record is an empty ledger.
    pub fn load(&self) -> Result<Vec<Sale>> {
        match self.store.get(SALES_KEY)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(LedgerError::Corrupt),
        }
    }

    /// All sales in stored order. Any read failure yields an empty list.
    pub fn list(&self) -> Vec<Sale> {
        match self.load() {
            Ok(sales) => sales,
            Err(e) => {
                warn!(key = SALES_KEY, error = %e, "cannot read sales ledger, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Sale> {
        self.list().into_iter().find(|s| s.id == id)
    }

    /// Validate `draft`, assign a fresh id and append it to the ledger.
    ///
    /// Nothing is written when validation fails. A corrupt stored ledger is
    /// left untouched and reported as [`LedgerError::Corrupt`].
    pub fn add(&self, draft: &SaleDraft) -> Result<Sale> {
        let valid = draft.validate().inspect_err(|e| {
            debug!(field = e.field(), error = %e, "sale draft rejected");
        })?;

        let mut sales = self.load()?;
        let sale = valid.into_sale(fresh_id(&sales));
        sales.push(sale.clone());
        self.write(&sales)?;

        info!(
            id = %sale.id,
            customer = %sale.customer_name,
            plan = %sale.plan.name,
            amount = sale.amount,
            expires = %sale.date_expiration,
            "sale recorded"
        );
        Ok(sale)
    }

    /// Remove the sale with `id`. Returns `false`, without writing, when no
    /// such sale exists.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let sales = self.load()?;
        let before = sales.len();
        let remaining: Vec<Sale> = sales.into_iter().filter(|s| s.id != id).collect();

        if remaining.len() == before {
            debug!(id, "remove: no such sale");
            return Ok(false);
        }

        self.write(&remaining)?;
        info!(id, remaining = remaining.len(), "sale removed");
        Ok(true)
    }

    /// Change signals for the ledger record from other contexts.
    pub fn subscribe(&self) -> ChangeFeed {
        self.store.watch(SALES_KEY)
    }

    fn write(&self, sales: &[Sale]) -> Result<()> {
        let raw = serde_json::to_string(sales).map_err(LedgerError::Encode)?;
        self.store.set(SALES_KEY, &raw).inspect_err(|e| {
            warn!(key = SALES_KEY, error = %e, "failed to write sales ledger");
        })?;
        Ok(())
    }
}

/// Display order: newest purchase first, ties broken by id descending.
pub fn sort_newest_first(sales: &mut [Sale]) {
    sales.sort_by(|a, b| {
        b.date_bought
            .cmp(&a.date_bought)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn fresh_id(existing: &[Sale]) -> String {
    let taken: HashSet<&str> = existing.iter().map(|s| s.id.as_str()).collect();
    loop {
        let id = Uuid::new_v4().to_string();
        if !taken.contains(id.as_str()) {
            return id;
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use astryx_persist::{FileStore, KeyValueStore, MemoryStore};
    use astryx_proto::{PlanChoice, PlanTier, SaleDuration};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn draft(customer: &str, amount: f64) -> SaleDraft {
        SaleDraft::new()
            .plan(PlanChoice::Catalog(PlanTier::Sheep))
            .customer(customer)
            .bought(date(2024, 1, 15))
            .duration(SaleDuration::SixMonths)
            .amount(amount)
    }

    fn memory_ledger() -> (Arc<MemoryStore>, SalesLedger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = SalesLedger::new(store.clone());
        (store, ledger)
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let (_, ledger) = memory_ledger();
        assert!(ledger.list().is_empty());
        assert!(ledger.load().expect("load").is_empty());
    }

    #[test]
    fn test_add_appends_normalized_sale() {
        let (_, ledger) = memory_ledger();
        let sale = ledger.add(&draft("  Notch ", 30.0)).expect("add");

        assert!(!sale.id.is_empty());
        assert_eq!(sale.customer_name, "Notch");
        assert_eq!(sale.plan, PlanTier::Sheep.plan());
        assert_eq!(sale.date_expiration, date(2024, 7, 15));

        let listed = ledger.list();
        assert_eq!(listed, vec![sale]);
    }

    #[test]
    fn test_add_assigns_distinct_ids() {
        let (_, ledger) = memory_ledger();
        for i in 0..20 {
            ledger.add(&draft(&format!("c{i}"), 1.0 + i as f64)).expect("add");
        }
        let sales = ledger.list();
        let ids: HashSet<&str> = sales.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_rejected_draft_writes_nothing() {
        let (store, ledger) = memory_ledger();
        ledger.add(&draft("first", 5.0)).expect("add");
        let before = store.get(SALES_KEY).expect("get");

        let err = ledger.add(&draft("second", 0.0)).unwrap_err();
        assert_eq!(err.field(), Some("amount"));

        let err = ledger.add(&draft("", 5.0)).unwrap_err();
        assert_eq!(err.field(), Some("customerName"));

        let err = ledger
            .add(&draft("third", 5.0).plan(PlanChoice::custom("", "100%", "5GB")))
            .unwrap_err();
        assert_eq!(err.field(), Some("plan.ram"));

        assert_eq!(store.get(SALES_KEY).expect("get"), before);
        assert_eq!(ledger.list().len(), 1);
    }

    #[test]
    fn test_remove_existing() {
        let (_, ledger) = memory_ledger();
        let keep = ledger.add(&draft("keep", 1.0)).expect("add");
        let gone = ledger.add(&draft("gone", 2.0)).expect("add");

        assert!(ledger.remove(&gone.id).expect("remove"));
        let sales = ledger.list();
        assert_eq!(sales, vec![keep]);
        assert!(ledger.get(&gone.id).is_none());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (store, ledger) = memory_ledger();
        ledger.add(&draft("only", 1.0)).expect("add");

        let observer = store.context();
        let mut feed = observer.watch(SALES_KEY);

        assert!(!ledger.remove("no-such-id").expect("remove"));
        assert_eq!(ledger.list().len(), 1);
        assert!(feed.try_changed().is_none(), "no write expected");
    }

    #[test]
    fn test_corrupt_record_lists_empty_and_is_kept() {
        let (store, ledger) = memory_ledger();
        store.set(SALES_KEY, "{not json").expect("seed");

        assert!(ledger.list().is_empty());
        assert!(matches!(ledger.load(), Err(LedgerError::Corrupt(_))));

        assert!(matches!(
            ledger.add(&draft("x", 1.0)),
            Err(LedgerError::Corrupt(_))
        ));
        assert!(matches!(ledger.remove("x"), Err(LedgerError::Corrupt(_))));
        assert_eq!(store.get(SALES_KEY).expect("get").as_deref(), Some("{not json"));
    }

    #[test]
    fn test_storage_failure_degrades() {
        let (store, ledger) = memory_ledger();
        ledger.add(&draft("x", 1.0)).expect("add");
        store.set_disabled(true);

        assert!(ledger.list().is_empty());
        assert!(matches!(
            ledger.add(&draft("y", 1.0)),
            Err(LedgerError::Storage(_))
        ));
    }

    #[test]
    fn test_quota_failure_surfaces() {
        let store = Arc::new(MemoryStore::with_quota(64));
        let ledger = SalesLedger::new(store.clone());

        let err = ledger.add(&draft("too big for the quota", 1.0)).unwrap_err();
        assert!(matches!(err, LedgerError::Storage(StorageError::QuotaExceeded { .. })));
        assert!(ledger.list().is_empty());
    }

    #[test]
    fn test_other_context_sees_writes() {
        let tab_a = Arc::new(MemoryStore::new());
        let tab_b = Arc::new(tab_a.context());
        let ledger_a = SalesLedger::new(tab_a);
        let ledger_b = SalesLedger::new(tab_b);

        let mut feed = ledger_b.subscribe();
        let sale = ledger_a.add(&draft("shared", 9.0)).expect("add");

        assert!(feed.try_changed().is_some());
        assert_eq!(ledger_b.get(&sale.id), Some(sale));
    }

    #[test]
    fn test_file_backed_ledger_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sale = {
            let ledger = SalesLedger::new(Arc::new(FileStore::new(dir.path())));
            ledger.add(&draft("durable", 42.0)).expect("add")
        };
        let ledger = SalesLedger::new(Arc::new(FileStore::new(dir.path())));
        assert_eq!(ledger.list(), vec![sale]);
    }

    #[test]
    fn test_sort_newest_first() {
        let (_, ledger) = memory_ledger();
        let mut old = draft("old", 1.0);
        old.date_bought = Some(date(2023, 5, 1));
        let mut new = draft("new", 1.0);
        new.date_bought = Some(date(2024, 5, 1));

        ledger.add(&old).expect("add");
        ledger.add(&new).expect("add");

        let mut sales = ledger.list();
        sort_newest_first(&mut sales);
        assert_eq!(sales[0].customer_name, "new");
        assert_eq!(sales[1].customer_name, "old");
    }
}
