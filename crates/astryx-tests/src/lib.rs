//! Shared fixtures for the cross-crate tests.

use astryx_ledger::SalesLedger;
use astryx_persist::SharedStore;
use astryx_proto::{PlanChoice, PlanTier, SaleDraft, SaleDuration};
use astryx_settings::SettingsStore;
use chrono::NaiveDate;
use std::sync::Arc;

/// Calendar date; panics on an impossible date.
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_else(|| panic!("invalid date {y}-{m}-{d}"))
}

/// A complete one-month Creeper sale bought on 2024-01-15.
pub fn draft(customer: &str, amount: f64) -> SaleDraft {
    SaleDraft::new()
        .plan(PlanChoice::Catalog(PlanTier::Creeper))
        .customer(customer)
        .bought(date(2024, 1, 15))
        .duration(SaleDuration::OneMonth)
        .amount(amount)
}

/// Ledger and settings repositories over the same store.
pub fn repos(store: SharedStore) -> (SalesLedger, SettingsStore) {
    (SalesLedger::new(Arc::clone(&store)), SettingsStore::new(store))
}
