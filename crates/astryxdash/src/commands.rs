//! Command dispatch for dashboard invocations
//!
//! Every front-end action is a named command with JSON parameters, answered
//! with a JSON document. Parameter names follow the stored-record spelling
//! (`customerName`, `dateBought`, `vpsCost`, ...).

use crate::DashState;
use crate::error::{DashError, DashResult};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

/// Command request from the CLI or another front end
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: String,
    pub params: Value,
}

impl CommandRequest {
    pub fn new(command: &str, params: Value) -> Self {
        Self {
            command: command.to_string(),
            params,
        }
    }
}

/// Every command understood by [`handle_command`].
pub const COMMANDS: &[&str] = &[
    "sales.list",
    "sales.get",
    "sales.add",
    "sales.remove",
    "plans.list",
    "settings.get",
    "settings.set",
    "metrics.get",
];

/// Handle one command against the dashboard state.
pub fn handle_command(state: &DashState, request: CommandRequest) -> DashResult<Value> {
    debug!(command = %request.command, "handling command");

    match request.command.as_str() {
        // ── Ledger ────────────────────────────────────────────────────────
        "sales.list" | "sales.get" | "sales.add" | "sales.remove" => {
            crate::sales_cmd::handle_sales_command(state, request)
        }
        "plans.list" => Ok(crate::sales_cmd::handle_plans_list()),

        // ── Settings ──────────────────────────────────────────────────────
        "settings.get" | "settings.set" => {
            crate::settings_cmd::handle_settings_command(state, request)
        }

        // ── Metrics ───────────────────────────────────────────────────────
        "metrics.get" => crate::metrics_cmd::handle_metrics(state, &request.params),

        unknown => Err(DashError::Command(format!("unknown command: {unknown}"))),
    }
}

// ─── Parameter helpers ────────────────────────────────────────────────────────

/// First string parameter found under any of `names`.
pub(crate) fn str_param<'a>(params: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| params.get(*name).and_then(Value::as_str))
}

/// A textual choice (plan key, duration) given as a string or a bare number.
/// `null`, absence and blank strings mean "not provided".
pub(crate) fn choice_param(params: &Value, field: &'static str) -> DashResult<Option<String>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(match n.as_u64() {
            Some(whole) => whole.to_string(),
            None => n.to_string(),
        })),
        Some(other) => Err(DashError::BadParam {
            field,
            reason: format!("expected a string or number, got {other}"),
        }),
    }
}

/// A number given either as JSON number or numeric string. `null` and absence
/// both mean "not provided".
pub(crate) fn number_param(params: &Value, field: &'static str) -> DashResult<Option<f64>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| DashError::BadParam {
            field,
            reason: format!("'{s}' is not a number"),
        }),
        Some(other) => Err(DashError::BadParam {
            field,
            reason: format!("expected a number, got {other}"),
        }),
    }
}

/// An ISO `YYYY-MM-DD` date.
pub(crate) fn date_param(params: &Value, field: &'static str) -> DashResult<Option<NaiveDate>> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|e| DashError::BadParam {
                field,
                reason: format!("'{s}' is not a YYYY-MM-DD date ({e})"),
            }),
        Some(other) => Err(DashError::BadParam {
            field,
            reason: format!("expected a date string, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DashConfig;
    use astryx_persist::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> DashState {
        DashState::with_store(DashConfig::default(), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_unknown_command() {
        let err = handle_command(&state(), CommandRequest::new("sales.edit", json!({}))).unwrap_err();
        assert!(err.to_string().contains("unknown command: sales.edit"));
    }

    #[test]
    fn test_every_listed_command_dispatches() {
        let state = state();
        for command in COMMANDS {
            let result = handle_command(&state, CommandRequest::new(command, json!({})));
            if let Err(DashError::Command(msg)) = &result {
                assert!(!msg.contains("unknown command"), "{command} not routed");
            }
        }
    }

    #[test]
    fn test_number_param_forms() {
        let params = json!({"a": 1.5, "b": "2.25", "c": null, "d": "", "e": "abc", "f": true});
        assert_eq!(number_param(&params, "a").unwrap(), Some(1.5));
        assert_eq!(number_param(&params, "b").unwrap(), Some(2.25));
        assert_eq!(number_param(&params, "c").unwrap(), None);
        assert_eq!(number_param(&params, "d").unwrap(), None);
        assert_eq!(number_param(&params, "missing").unwrap(), None);
        assert!(number_param(&params, "e").is_err());
        assert!(number_param(&params, "f").is_err());
    }

    #[test]
    fn test_choice_param_forms() {
        let params = json!({"a": "6 Months", "b": 12, "c": "  ", "d": [1], "e": {"x": 1}});
        assert_eq!(choice_param(&params, "a").unwrap().as_deref(), Some("6 Months"));
        assert_eq!(choice_param(&params, "b").unwrap().as_deref(), Some("12"));
        assert_eq!(choice_param(&params, "c").unwrap(), None);
        assert_eq!(choice_param(&params, "missing").unwrap(), None);
        assert_eq!(choice_param(&params, "d").unwrap_err().field(), Some("d"));
        assert!(choice_param(&params, "e").is_err());
    }

    #[test]
    fn test_date_param_forms() {
        let params = json!({"ok": "2024-01-15", "bad": "15/01/2024", "num": 5});
        assert_eq!(
            date_param(&params, "ok").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        let err = date_param(&params, "bad").unwrap_err();
        assert_eq!(err.field(), Some("bad"));
        assert!(date_param(&params, "num").is_err());
        assert_eq!(date_param(&params, "none").unwrap(), None);
    }
}
