//! Metrics command handler

use crate::DashState;
use crate::commands::date_param;
use crate::error::DashResult;
use astryx_metrics::{ExpiryBreakdown, format_usd};
use chrono::Local;
use serde_json::{Value, json};

/// `metrics.get` — figures recomputed from fresh reads, plus display strings.
pub fn handle_metrics(state: &DashState, params: &Value) -> DashResult<Value> {
    let today = date_param(params, "today")?.unwrap_or_else(|| Local::now().date_naive());
    let sales = state.ledger.list();
    let metrics = astryx_metrics::MetricsEngine::compute(&sales, &state.settings.get());
    let expiry = ExpiryBreakdown::tally(&sales, today);

    Ok(json!({
        "ok": true,
        "metrics": metrics,
        "display": {
            "totalSales": format_usd(metrics.total_sales),
            "netProfit": format_usd(metrics.net_profit),
            "ownerSalary": format_usd(metrics.owner_salary),
            "developerSalary": format_usd(metrics.developer_salary),
            "advertiserSalary": format_usd(metrics.advertiser_salary),
        },
        "expiry": expiry,
        "summary": metrics.summary(),
    }))
}
