use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::{nullable_str, opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{NewObjection, ObjectionStatus};
use crate::store::ObjectionPatch;
use crate::text::fold_arabic_digits;
use serde_json::json;

fn parse_status(raw: Option<String>) -> Result<Option<ObjectionStatus>, HandlerErr> {
    raw.map(|s| {
        s.parse::<ObjectionStatus>().map_err(|e| {
            HandlerErr::bad_params(e).with_details(json!({ "status": s }))
        })
    })
    .transpose()
}

fn handle_objections_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let status = parse_status(opt_str(req, "status"))?;
    let objections = state.store()?.list_objections(status)?;
    Ok(json!({ "objections": objections }))
}

fn handle_objections_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let Some(subscription_number) = opt_str(req, "subscriptionNumber") else {
        return Err(HandlerErr::bad_params("يرجى إدخال رقم الاكتتاب"));
    };
    let Some(full_name) = opt_str(req, "fullName") else {
        return Err(HandlerErr::bad_params("يرجى إدخال الاسم الكامل"));
    };
    let Some(objection_text) = opt_str(req, "objectionText") else {
        return Err(HandlerErr::bad_params("يرجى كتابة نص الاعتراض"));
    };

    let objection = state
        .store()?
        .create_objection(&NewObjection {
            subscription_number: fold_arabic_digits(&subscription_number),
            full_name,
            section_id: opt_str(req, "sectionId"),
            phone: opt_str(req, "phone"),
            objection_text,
        })
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    tracing::info!(objection_id = %objection.id, "objection filed");
    Ok(json!(objection))
}

fn handle_objections_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let objection_id = required_str(req, "objectionId")?;
    let patch = ObjectionPatch {
        status: parse_status(opt_str(req, "status"))?,
        admin_note: nullable_str(req, "adminNote")?,
    };
    let objection = state
        .store()?
        .update_objection(&objection_id, &patch)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!(objection))
}

fn handle_objections_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let objection_id = required_str(req, "objectionId")?;
    state
        .store()?
        .delete_objection(&objection_id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "objections.list" => handle_objections_list(state, req),
        "objections.create" => handle_objections_create(state, req),
        "objections.update" => handle_objections_update(state, req),
        "objections.delete" => handle_objections_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
