use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: &[Handler] = &[
    handlers::core::try_handle,
    handlers::settings::try_handle,
    handlers::catalog::try_handle,
    handlers::students::try_handle,
    handlers::results::try_handle,
    handlers::import::try_handle,
    handlers::objections::try_handle,
    handlers::stats::try_handle,
    handlers::backup::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = %req.id, method = %req.method, "request");
    for handler in HANDLERS {
        if let Some(resp) = handler(state, &req) {
            if resp.get("ok").and_then(|v| v.as_bool()) == Some(false) {
                tracing::debug!(
                    id = %req.id,
                    method = %req.method,
                    code = resp["error"]["code"].as_str().unwrap_or(""),
                    "request failed"
                );
            }
            return resp;
        }
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
