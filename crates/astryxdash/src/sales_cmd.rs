//! Sales command handlers — delegates to astryx-ledger

use crate::DashState;
use crate::commands::{CommandRequest, choice_param, date_param, number_param, str_param};
use crate::error::{DashError, DashResult};
use astryx_proto::{PlanChoice, PlanTier, SaleDraft, SaleDuration};
use chrono::{Local, NaiveDate};
use serde_json::{Value, json};

pub fn handle_sales_command(state: &DashState, request: CommandRequest) -> DashResult<Value> {
    let params = &request.params;

    match request.command.as_str() {
        "sales.list" => {
            let today = today_param(params)?;
            let sales: Vec<Value> = state
                .sales_newest_first()
                .into_iter()
                .map(|sale| {
                    let expired = sale.is_expired(today);
                    let mut value = json!(sale);
                    value["expired"] = json!(expired);
                    value
                })
                .collect();
            Ok(json!({ "ok": true, "count": sales.len(), "sales": sales }))
        }

        "sales.get" => {
            let id = required_id(params)?;
            let sale = state.ledger.get(id).ok_or_else(|| DashError::NotFound {
                what: "sale",
                id: id.to_string(),
            })?;
            Ok(json!({ "ok": true, "sale": sale }))
        }

        "sales.add" => {
            let draft = draft_from_params(params)?;
            let sale = state.ledger.add(&draft)?;
            Ok(json!({ "ok": true, "sale": sale }))
        }

        "sales.remove" => {
            let id = required_id(params)?;
            let removed = state.ledger.remove(id)?;
            Ok(json!({ "ok": true, "removed": removed, "id": id }))
        }

        other => Err(DashError::Command(format!("unknown sales command: {other}"))),
    }
}

/// The plan catalog as offered on the sale form, custom entry last.
pub fn handle_plans_list() -> Value {
    let mut plans: Vec<Value> = PlanTier::ALL
        .into_iter()
        .map(|tier| {
            let plan = tier.plan();
            json!({
                "key": tier.key(),
                "name": plan.name,
                "ram": plan.ram,
                "cpu": plan.cpu,
                "disk": plan.disk,
            })
        })
        .collect();
    plans.push(json!({ "key": "custom", "name": astryx_proto::CUSTOM_PLAN_NAME }));

    let durations: Vec<&str> = SaleDuration::ALL.iter().map(|d| d.label()).collect();
    json!({ "ok": true, "plans": plans, "durations": durations })
}

/// Build a draft from command parameters. Missing fields stay missing so the
/// ledger's validation reports them; only malformed values fail here.
pub(crate) fn draft_from_params(params: &Value) -> DashResult<SaleDraft> {
    let mut draft = SaleDraft::new();

    draft.plan = match choice_param(params, "plan")? {
        None => None,
        Some(key) if key.trim().eq_ignore_ascii_case("custom") => Some(PlanChoice::custom(
            choice_param(params, "ram")?.unwrap_or_default(),
            choice_param(params, "cpu")?.unwrap_or_default(),
            choice_param(params, "disk")?.unwrap_or_default(),
        )),
        Some(key) => Some(PlanChoice::Catalog(key.parse::<PlanTier>()?)),
    };

    draft.customer_name = str_param(params, &["customerName", "customer"])
        .unwrap_or_default()
        .to_string();

    draft.date_bought = Some(match date_param(params, "dateBought")? {
        Some(date) => date,
        None => Local::now().date_naive(),
    });

    draft.duration = match choice_param(params, "duration")? {
        None => None,
        Some(raw) => Some(raw.parse::<SaleDuration>()?),
    };

    draft.amount = number_param(params, "amount")?;
    Ok(draft)
}

fn required_id(params: &Value) -> DashResult<&str> {
    str_param(params, &["id"])
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| DashError::BadParam {
            field: "id",
            reason: "missing 'id'".to_string(),
        })
}

fn today_param(params: &Value) -> DashResult<NaiveDate> {
    Ok(date_param(params, "today")?.unwrap_or_else(|| Local::now().date_naive()))
}
