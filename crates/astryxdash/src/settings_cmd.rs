//! Settings command handlers — delegates to astryx-settings

use crate::DashState;
use crate::commands::{CommandRequest, number_param};
use crate::error::{DashError, DashResult};
use astryx_proto::SettingsPatch;
use serde_json::{Value, json};

pub fn handle_settings_command(state: &DashState, request: CommandRequest) -> DashResult<Value> {
    match request.command.as_str() {
        "settings.get" => Ok(json!({ "ok": true, "settings": state.settings.get() })),

        "settings.set" => {
            let patch = SettingsPatch {
                vps_cost: number_param(&request.params, "vpsCost")?,
                panel_cost: number_param(&request.params, "panelCost")?,
            };
            if patch.is_empty() {
                return Err(DashError::BadParam {
                    field: "settings",
                    reason: "provide vpsCost and/or panelCost".to_string(),
                });
            }

            // Nothing is written unless every field is acceptable.
            astryx_settings::validate_patch(&patch)?;

            // Each field is committed on its own, as the edit form does.
            let mut current = state.settings.get();
            if let Some(vps) = patch.vps_cost {
                current = state.settings.set(SettingsPatch::vps_cost(vps))?;
            }
            if let Some(panel) = patch.panel_cost {
                current = state.settings.set(SettingsPatch::panel_cost(panel))?;
            }
            Ok(json!({ "ok": true, "settings": current }))
        }

        other => Err(DashError::Command(format!("unknown settings command: {other}"))),
    }
}
