use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::{opt_bool, opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::NewStudent;
use crate::store::{ResultsStore, StudentPatch};
use crate::text::{fold_arabic_digits, is_valid_subscription_number};
use serde_json::json;

/// Folded to ASCII digits and held to the same shape the public lookup
/// accepts, so every stored number stays searchable.
fn subscription_param(req: &Request, key: &str) -> Result<Option<String>, HandlerErr> {
    let Some(raw) = opt_str(req, key) else {
        return Ok(None);
    };
    let number = fold_arabic_digits(&raw);
    if !is_valid_subscription_number(&number) {
        return Err(HandlerErr::bad_params("رقم الاكتتاب غير صالح")
            .with_details(json!({ key: raw })));
    }
    Ok(Some(number))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let section_id = opt_str(req, "sectionId");
    let students = state.store()?.list_students(section_id.as_deref())?;
    Ok(json!({ "students": students }))
}

fn handle_students_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = required_str(req, "studentId")?;
    match state.store()?.get_student(&student_id)? {
        Some(student) => Ok(json!(student)),
        None => Err(HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": student_id }))),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let Some(subscription_number) = subscription_param(req, "subscriptionNumber")? else {
        return Err(HandlerErr::bad_params("missing params.subscriptionNumber"));
    };
    let full_name = required_str(req, "fullName")?;
    let section_id = required_str(req, "sectionId")?;
    let manual_fail = opt_bool(req, "manualFail")?.unwrap_or(false);

    let store = state.store()?;
    let Some(section) = store.get_section(&section_id)? else {
        return Err(HandlerErr::new("not_found", "section not found")
            .with_details(json!({ "sectionId": section_id })));
    };
    let student = store
        .create_student(&NewStudent {
            subscription_number,
            full_name,
            section_id: section.id,
            certificate_type_id: section.certificate_type_id,
            manual_fail,
        })
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    tracing::info!(student_id = %student.id, "student created");
    Ok(json!(student))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = required_str(req, "studentId")?;
    let patch = StudentPatch {
        subscription_number: subscription_param(req, "subscriptionNumber")?,
        full_name: opt_str(req, "fullName"),
        section_id: opt_str(req, "sectionId"),
        manual_fail: opt_bool(req, "manualFail")?,
    };
    let student = state
        .store()?
        .update_student(&student_id, &patch)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!(student))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = required_str(req, "studentId")?;
    state
        .store()?
        .delete_student(&student_id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::info!(student_id = %student_id, "student deleted");
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.get" => handle_students_get(state, req),
        "students.create" => handle_students_create(state, req),
        "students.update" => handle_students_update(state, req),
        "students.delete" => handle_students_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
