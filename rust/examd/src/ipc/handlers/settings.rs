use crate::gate;
use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::{nullable_str, opt_bool};
use crate::ipc::types::{AppState, Request};
use crate::model::Settings;
use crate::store::SettingsPatch;
use chrono::{DateTime, Utc};
use serde_json::json;

fn settings_json(settings: &Settings) -> serde_json::Value {
    let mut out = json!(settings);
    out["release"] = json!(gate::release_state(settings, Utc::now()));
    out
}

fn handle_settings_get(state: &mut AppState, _req: &Request) -> HandlerResult {
    let settings = state.store()?.get_settings()?;
    Ok(settings_json(&settings))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let countdown_end = match nullable_str(req, "countdownEnd")? {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => {
            let end = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| {
                    HandlerErr::bad_params(format!("countdownEnd must be RFC 3339: {e}"))
                        .with_details(json!({ "countdownEnd": raw }))
                })?
                .with_timezone(&Utc);
            Some(Some(end))
        }
    };
    let patch = SettingsPatch {
        is_results_open: opt_bool(req, "isResultsOpen")?,
        countdown_end,
        announcement_text: nullable_str(req, "announcementText")?,
    };

    let settings = state
        .store()?
        .update_settings(&patch)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    tracing::info!(
        is_results_open = settings.is_results_open,
        countdown_end = ?settings.countdown_end,
        "settings updated"
    );
    Ok(settings_json(&settings))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "settings.get" => handle_settings_get(state, req),
        "settings.update" => handle_settings_update(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
