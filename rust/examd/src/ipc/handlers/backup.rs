use crate::backup;
use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn current_workspace(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state
        .workspace
        .clone()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> HandlerResult {
    let out_path = required_str(req, "outPath")?;
    let workspace_path = current_workspace(state)?;

    let export = backup::export_workspace_bundle(&workspace_path, &PathBuf::from(&out_path))
        .map_err(|e| {
            HandlerErr::new("backup_failed", format!("{e:#}"))
                .with_details(json!({ "path": out_path }))
        })?;
    tracing::info!(path = %out_path, "workspace exported");
    Ok(json!({
        "path": out_path,
        "bundleFormat": export.bundle_format,
        "dbSha256": export.db_sha256
    }))
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> HandlerResult {
    let in_path = required_str(req, "inPath")?;
    let workspace_path = current_workspace(state)?;

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found")
            .with_details(json!({ "path": in_path })));
    }

    // Drop open handle before replacing file.
    state.db = None;

    let imported = backup::import_workspace_bundle(&src, &workspace_path);
    // Reopen whatever database is on disk now, replaced or not.
    state
        .open_workspace(workspace_path.clone(), false)
        .map_err(|e| HandlerErr::new("db_open_failed", format!("{e:#}")))?;
    let imported = imported.map_err(|e| {
        HandlerErr::new("backup_failed", format!("{e:#}")).with_details(json!({ "path": in_path }))
    })?;

    tracing::info!(path = %in_path, exported_at = %imported.exported_at, "workspace restored");
    Ok(json!({
        "workspacePath": workspace_path.to_string_lossy(),
        "bundleFormat": imported.bundle_format,
        "exportedAt": imported.exported_at
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_backup_export(state, req),
        "backup.import" => handle_backup_import(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
