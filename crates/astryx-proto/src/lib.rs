//! Domain types for the Astryx sales ledger.
//!
//! Defines the persisted records ([`Sale`], [`Settings`]), the plan catalog,
//! and the [`SaleDraft`] that collects user input before a sale exists.
//! Field names serialize in camelCase to match the stored record layout.

#![forbid(unsafe_code)]

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ─── Plans ────────────────────────────────────────────────────────────────────

/// Resource specification sold with a sale. Free-form text, not numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub ram: String,
    pub cpu: String,
    pub disk: String,
}

pub const CUSTOM_PLAN_NAME: &str = "Custom Plan";

/// The fixed catalog tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Pig,
    Sheep,
    Cow,
    Creeper,
    Zombie,
    Skeleton,
}

impl PlanTier {
    pub const ALL: [PlanTier; 6] = [
        Self::Pig,
        Self::Sheep,
        Self::Cow,
        Self::Creeper,
        Self::Zombie,
        Self::Skeleton,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Pig => "pig",
            Self::Sheep => "sheep",
            Self::Cow => "cow",
            Self::Creeper => "creeper",
            Self::Zombie => "zombie",
            Self::Skeleton => "skeleton",
        }
    }

    /// Catalog entry as (name, ram, cpu, disk).
    fn spec(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            Self::Pig => ("Pig Plan", "2GB", "100%", "5GB"),
            Self::Sheep => ("Sheep Plan", "4GB", "100%", "10GB"),
            Self::Cow => ("Cow Plan", "6GB", "150%", "20GB"),
            Self::Creeper => ("Creeper Plan", "8GB", "150%", "30GB"),
            Self::Zombie => ("Zombie Plan", "10GB", "200%", "35GB"),
            Self::Skeleton => ("Skeleton Plan", "12GB", "250%", "40GB"),
        }
    }

    /// A fresh snapshot of this tier's plan.
    pub fn plan(self) -> Plan {
        let (name, ram, cpu, disk) = self.spec();
        Plan {
            name: name.to_string(),
            ram: ram.to_string(),
            cpu: cpu.to_string(),
            disk: disk.to_string(),
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for PlanTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.key() == wanted)
            .ok_or_else(|| ValidationError::UnknownPlan(s.to_string()))
    }
}

/// Plan picked on the sale form: a catalog tier or custom specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanChoice {
    Catalog(PlanTier),
    Custom {
        ram: String,
        cpu: String,
        disk: String,
    },
}

impl PlanChoice {
    pub fn custom(ram: impl Into<String>, cpu: impl Into<String>, disk: impl Into<String>) -> Self {
        Self::Custom {
            ram: ram.into(),
            cpu: cpu.into(),
            disk: disk.into(),
        }
    }

    /// Snapshot the chosen plan. Custom specs must all be non-empty.
    pub fn resolve(&self) -> Result<Plan, ValidationError> {
        match self {
            Self::Catalog(tier) => Ok(tier.plan()),
            Self::Custom { ram, cpu, disk } => {
                let ram = required_spec(ram, CustomField::Ram)?;
                let cpu = required_spec(cpu, CustomField::Cpu)?;
                let disk = required_spec(disk, CustomField::Disk)?;
                Ok(Plan {
                    name: CUSTOM_PLAN_NAME.to_string(),
                    ram,
                    cpu,
                    disk,
                })
            }
        }
    }
}

fn required_spec(value: &str, field: CustomField) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::IncompleteCustomPlan(field));
    }
    Ok(value.to_string())
}

// ─── Durations ────────────────────────────────────────────────────────────────

/// Subscription length chosen at sale time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleDuration {
    OneMonth,
    SixMonths,
    TwelveMonths,
}

impl SaleDuration {
    pub const ALL: [SaleDuration; 3] = [Self::OneMonth, Self::SixMonths, Self::TwelveMonths];

    pub fn months(self) -> u32 {
        match self {
            Self::OneMonth => 1,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneMonth => "1 month",
            Self::SixMonths => "6 Months",
            Self::TwelveMonths => "12 Months",
        }
    }

    /// Expiration date for a sale bought on `bought`.
    pub fn expiration_from(self, bought: NaiveDate) -> Option<NaiveDate> {
        add_months(bought, self.months())
    }
}

impl std::fmt::Display for SaleDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts the form labels (`"1 month"`, `"6 Months"`, `"12 Months"`) in any
/// case, and the short forms `1`, `6m`, `12 months`.
impl FromStr for SaleDuration {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let count = lowered
            .strip_suffix("months")
            .or_else(|| lowered.strip_suffix("month"))
            .or_else(|| lowered.strip_suffix('m'))
            .unwrap_or(&lowered)
            .trim();
        match count {
            "1" => Ok(Self::OneMonth),
            "6" => Ok(Self::SixMonths),
            "12" => Ok(Self::TwelveMonths),
            _ => Err(ValidationError::UnknownDuration(s.to_string())),
        }
    }
}

/// Advance `date` by `months` calendar months.
///
/// The day of month is kept when it exists in the target month and clamped to
/// that month's last day otherwise: 2024-01-31 + 1 month = 2024-02-29.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

// ─── Sales ────────────────────────────────────────────────────────────────────

/// A recorded sale. Immutable once stored; removed only by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_name: String,
    pub plan: Plan,
    pub date_bought: NaiveDate,
    pub date_expiration: NaiveDate,
    pub amount: f64,
}

impl Sale {
    /// Expired once the expiration date lies strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.date_expiration < today
    }
}

/// Form state for a sale that does not exist yet.
///
/// Every field may be missing; [`SaleDraft::validate`] reports the first
/// violated constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaleDraft {
    pub plan: Option<PlanChoice>,
    pub customer_name: String,
    pub date_bought: Option<NaiveDate>,
    pub duration: Option<SaleDuration>,
    pub amount: Option<f64>,
}

impl SaleDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(mut self, plan: PlanChoice) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = name.into();
        self
    }

    pub fn bought(mut self, date: NaiveDate) -> Self {
        self.date_bought = Some(date);
        self
    }

    pub fn duration(mut self, duration: SaleDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Expiration implied by the current purchase date and duration.
    /// Recomputed on every call, so it follows edits to either field.
    pub fn expiration(&self) -> Option<NaiveDate> {
        self.duration?.expiration_from(self.date_bought?)
    }

    /// Check the draft and produce the normalized fields of a sale.
    pub fn validate(&self) -> Result<ValidSale, ValidationError> {
        let choice = self.plan.as_ref().ok_or(ValidationError::MissingPlan)?;

        let customer_name = self.customer_name.trim();
        if customer_name.is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }

        let date_bought = self.date_bought.ok_or(ValidationError::MissingDateBought)?;
        let duration = self.duration.ok_or(ValidationError::MissingDuration)?;
        let date_expiration = duration.expiration_from(date_bought).ok_or(
            ValidationError::ExpirationUnavailable {
                date_bought,
                duration,
            },
        )?;

        let amount = match self.amount {
            Some(a) if a.is_finite() && a > 0.0 => a,
            _ => return Err(ValidationError::InvalidAmount),
        };

        let plan = choice.resolve()?;

        Ok(ValidSale {
            customer_name: customer_name.to_string(),
            plan,
            date_bought,
            date_expiration,
            amount,
        })
    }
}

/// A draft that passed validation, waiting for an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSale {
    pub customer_name: String,
    pub plan: Plan,
    pub date_bought: NaiveDate,
    pub date_expiration: NaiveDate,
    pub amount: f64,
}

impl ValidSale {
    pub fn into_sale(self, id: String) -> Sale {
        Sale {
            id,
            customer_name: self.customer_name,
            plan: self.plan,
            date_bought: self.date_bought,
            date_expiration: self.date_expiration,
            amount: self.amount,
        }
    }
}

// ─── Settings ─────────────────────────────────────────────────────────────────

pub const DEFAULT_VPS_COST: f64 = 679.0;
pub const DEFAULT_PANEL_COST: f64 = 6778.0;

/// Recurring operating costs subtracted from revenue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub vps_cost: f64,
    pub panel_cost: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vps_cost: DEFAULT_VPS_COST,
            panel_cost: DEFAULT_PANEL_COST,
        }
    }
}

impl Settings {
    /// Overlay the fields present in `patch`.
    pub fn merge(self, patch: SettingsPatch) -> Self {
        Self {
            vps_cost: patch.vps_cost.unwrap_or(self.vps_cost),
            panel_cost: patch.panel_cost.unwrap_or(self.panel_cost),
        }
    }
}

/// A partial settings record. Also the shape read back from storage, where
/// either field may be missing or null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vps_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_cost: Option<f64>,
}

impl SettingsPatch {
    pub fn vps_cost(value: f64) -> Self {
        Self {
            vps_cost: Some(value),
            panel_cost: None,
        }
    }

    pub fn panel_cost(value: f64) -> Self {
        Self {
            vps_cost: None,
            panel_cost: Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vps_cost.is_none() && self.panel_cost.is_none()
    }
}

// ─── Validation errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomField {
    Ram,
    Cpu,
    Disk,
}

impl std::fmt::Display for CustomField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ram => write!(f, "ram"),
            Self::Cpu => write!(f, "cpu"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

/// A sale draft violating one of the sale invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("a plan must be selected")]
    MissingPlan,
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("purchase date is required")]
    MissingDateBought,
    #[error("a duration must be selected")]
    MissingDuration,
    #[error("cannot compute expiration for {date_bought} + {duration}")]
    ExpirationUnavailable {
        date_bought: NaiveDate,
        duration: SaleDuration,
    },
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("custom plan {0} is required")]
    IncompleteCustomPlan(CustomField),
    #[error("unknown plan '{0}'")]
    UnknownPlan(String),
    #[error("unknown duration '{0}'")]
    UnknownDuration(String),
}

impl ValidationError {
    /// Name of the offending input field, in stored-record spelling.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingPlan | Self::UnknownPlan(_) => "plan",
            Self::MissingCustomerName => "customerName",
            Self::MissingDateBought => "dateBought",
            Self::MissingDuration | Self::UnknownDuration(_) => "duration",
            Self::ExpirationUnavailable { .. } => "dateExpiration",
            Self::InvalidAmount => "amount",
            Self::IncompleteCustomPlan(CustomField::Ram) => "plan.ram",
            Self::IncompleteCustomPlan(CustomField::Cpu) => "plan.cpu",
            Self::IncompleteCustomPlan(CustomField::Disk) => "plan.disk",
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
