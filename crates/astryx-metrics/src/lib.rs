//! Financial metrics for the Astryx dashboard.
//!
//! Pure functions over a ledger snapshot and a settings snapshot: total sales,
//! net profit, and the fixed 30/30/20 salary split. Nothing here touches
//! storage; callers recompute from fresh reads every time.

#![forbid(unsafe_code)]

use astryx_proto::{Sale, Settings};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const OWNER_SHARE: f64 = 0.30;
pub const DEVELOPER_SHARE: f64 = 0.30;
pub const ADVERTISER_SHARE: f64 = 0.20;

// ─── Results ──────────────────────────────────────────────────────────────────

/// Sign of the net profit, used to pick the display class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitStanding {
    /// Net profit is zero or more.
    Positive,
    Negative,
}

/// Net profit divided among the three recipients. Negative profit yields
/// negative shares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalarySplit {
    pub owner: f64,
    pub developer: f64,
    pub advertiser: f64,
}

/// Everything the dashboard shows, derived in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub sale_count: usize,
    pub total_sales: f64,
    pub vps_cost: f64,
    pub panel_cost: f64,
    pub net_profit: f64,
    pub owner_salary: f64,
    pub developer_salary: f64,
    pub advertiser_salary: f64,
    pub standing: ProfitStanding,
}

impl DashboardMetrics {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} sales totalling {}, costs {} (VPS) + {} (panel), net profit {} [{}]. \
             Owner {}, developer {}, advertiser {}.",
            self.sale_count,
            format_usd(self.total_sales),
            format_usd(self.vps_cost),
            format_usd(self.panel_cost),
            format_usd(self.net_profit),
            match self.standing {
                ProfitStanding::Positive => "positive",
                ProfitStanding::Negative => "negative",
            },
            format_usd(self.owner_salary),
            format_usd(self.developer_salary),
            format_usd(self.advertiser_salary),
        )
    }
}

/// Counts of sales still running versus past their expiration date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryBreakdown {
    pub active: usize,
    pub expired: usize,
}

impl ExpiryBreakdown {
    pub fn tally(sales: &[Sale], today: NaiveDate) -> Self {
        let expired = sales.iter().filter(|s| s.is_expired(today)).count();
        Self {
            active: sales.len() - expired,
            expired,
        }
    }
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Stateless metrics engine.
pub struct MetricsEngine;

impl MetricsEngine {
    /// Derive every dashboard figure from a ledger and settings snapshot.
    pub fn compute(sales: &[Sale], settings: &Settings) -> DashboardMetrics {
        let total_sales = Self::total_sales(sales);
        let net_profit = Self::net_profit(total_sales, settings);
        let split = Self::salary_split(net_profit);

        DashboardMetrics {
            sale_count: sales.len(),
            total_sales,
            vps_cost: settings.vps_cost,
            panel_cost: settings.panel_cost,
            net_profit,
            owner_salary: split.owner,
            developer_salary: split.developer,
            advertiser_salary: split.advertiser,
            standing: classify_standing(net_profit),
        }
    }

    /// Sum of sale amounts; `0.0` for an empty ledger.
    pub fn total_sales(sales: &[Sale]) -> f64 {
        sales.iter().fold(0.0, |total, s| total + s.amount)
    }

    /// Revenue minus both operating costs. Sign is preserved.
    pub fn net_profit(total_sales: f64, settings: &Settings) -> f64 {
        total_sales - settings.vps_cost - settings.panel_cost
    }

    pub fn salary_split(net_profit: f64) -> SalarySplit {
        SalarySplit {
            owner: net_profit * OWNER_SHARE,
            developer: net_profit * DEVELOPER_SHARE,
            advertiser: net_profit * ADVERTISER_SHARE,
        }
    }
}

/// Fixed-point dollar display: `$350.50`, `$-7447.00`.
pub fn format_usd(value: f64) -> String {
    format!("${value:.2}")
}

fn classify_standing(net_profit: f64) -> ProfitStanding {
    if net_profit >= 0.0 {
        ProfitStanding::Positive
    } else {
        ProfitStanding::Negative
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
