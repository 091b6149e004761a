//! Plain-text rendering for the terminal dashboard.

use astryx_metrics::{DashboardMetrics, ExpiryBreakdown, ProfitStanding, format_usd};
use astryx_proto::{PlanTier, Sale, SaleDuration};
use chrono::NaiveDate;
use std::fmt::Write;

/// Metrics panel. Net profit carries a `+`/`-` marker for its standing.
pub fn dashboard(metrics: &DashboardMetrics, expiry: ExpiryBreakdown) -> String {
    let marker = match metrics.standing {
        ProfitStanding::Positive => "+",
        ProfitStanding::Negative => "-",
    };

    let mut out = String::new();
    let _ = writeln!(out, "Astryx Dashboard");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Total sales:       {:>12}  ({} sales)", format_usd(metrics.total_sales), metrics.sale_count);
    let _ = writeln!(out, "  VPS cost:          {:>12}", format_usd(metrics.vps_cost));
    let _ = writeln!(out, "  Panel cost:        {:>12}", format_usd(metrics.panel_cost));
    let _ = writeln!(out, "  Net profit:        {:>12}  [{marker}]", format_usd(metrics.net_profit));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Owner (30%):       {:>12}", format_usd(metrics.owner_salary));
    let _ = writeln!(out, "  Developer (30%):   {:>12}", format_usd(metrics.developer_salary));
    let _ = writeln!(out, "  Advertiser (20%):  {:>12}", format_usd(metrics.advertiser_salary));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Active: {}  Expired: {}", expiry.active, expiry.expired);
    out
}

/// Sales table, one row per sale in the given order.
pub fn sales_table(sales: &[Sale], today: NaiveDate) -> String {
    if sales.is_empty() {
        return "No sales recorded.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<20}  {:<14}  {:<10}  {:<10}  {:>10}  {}",
        "ID", "CUSTOMER", "PLAN", "BOUGHT", "EXPIRES", "AMOUNT", "STATUS"
    );
    for sale in sales {
        let status = if sale.is_expired(today) { "expired" } else { "active" };
        let _ = writeln!(
            out,
            "{:<36}  {:<20}  {:<14}  {:<10}  {:<10}  {:>10}  {}",
            sale.id,
            truncate(&sale.customer_name, 20),
            truncate(&sale.plan.name, 14),
            sale.date_bought,
            sale.date_expiration,
            format_usd(sale.amount),
            status
        );
    }
    out
}

/// Catalog listing with the selectable durations.
pub fn plans() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10}  {:<14}  {:>6}  {:>6}  {:>6}", "KEY", "PLAN", "RAM", "CPU", "DISK");
    for tier in PlanTier::ALL {
        let plan = tier.plan();
        let _ = writeln!(
            out,
            "{:<10}  {:<14}  {:>6}  {:>6}  {:>6}",
            tier.key(),
            plan.name,
            plan.ram,
            plan.cpu,
            plan.disk
        );
    }
    let _ = writeln!(out, "{:<10}  {:<14}  (specs entered per sale)", "custom", astryx_proto::CUSTOM_PLAN_NAME);
    let _ = writeln!(out);
    let labels: Vec<&str> = SaleDuration::ALL.iter().map(|d| d.label()).collect();
    let _ = writeln!(out, "Durations: {}", labels.join(", "));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
