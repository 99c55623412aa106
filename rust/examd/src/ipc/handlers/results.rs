use crate::calc;
use crate::gate;
use crate::import::GradeCell;
use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::{params_as, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::store::{upsert_grade, ResultsStore, SqliteStore, Upsert};
use crate::text::{is_valid_subscription_number, sanitize_subscription_number};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

const MSG_INVALID_NUMBER: &str = "رقم الاكتتاب غير صالح";
const MSG_CLOSED: &str = "النتائج غير متاحة حالياً";
const MSG_UNKNOWN_NUMBER: &str = "رقم الاكتتاب غير موجود";

fn load_student(store: &SqliteStore<'_>, student_id: &str) -> Result<Student, HandlerErr> {
    store.get_student(student_id)?.ok_or_else(|| {
        HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": student_id }))
    })
}

fn evaluate_student(store: &SqliteStore<'_>, student: &Student) -> HandlerResult {
    let subjects = store.list_subjects_for_section(&student.section_id)?;
    let results = store.list_results_for_student(&student.id)?;
    Ok(json!(calc::evaluate(student, &subjects, &results)))
}

fn handle_results_list_for_student(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = required_str(req, "studentId")?;
    let store = state.store()?;
    let student = load_student(&store, &student_id)?;
    let results = store.list_results_for_student(&student.id)?;
    Ok(json!({ "results": results }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradeEntry {
    subject_id: String,
    #[serde(default)]
    grade: Option<GradeCell>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveParams {
    student_id: String,
    grades: Vec<GradeEntry>,
}

/// Admin grade entry for one student. Blank or invalid cells are skipped;
/// each rejected entry is reported without stopping the rest.
fn handle_results_save_for_student(state: &mut AppState, req: &Request) -> HandlerResult {
    let params: SaveParams = params_as(req)?;
    let store = state.store()?;
    let student = load_student(&store, &params.student_id)?;
    let subjects = store.list_subjects_for_section(&student.section_id)?;

    let mut created = 0usize;
    let mut updated = 0usize;
    let mut skipped = 0usize;
    let mut errors = Vec::new();

    for entry in &params.grades {
        let Some(grade) = entry.grade.as_ref().and_then(GradeCell::as_grade) else {
            skipped += 1;
            continue;
        };
        if !subjects.iter().any(|s| s.id == entry.subject_id) {
            errors.push(json!({
                "subjectId": entry.subject_id,
                "message": "subject does not belong to the student's section"
            }));
            continue;
        }
        match upsert_grade(&store, &student.id, &entry.subject_id, grade) {
            Ok(Upsert::Created) => created += 1,
            Ok(Upsert::Updated) => updated += 1,
            Err(e) => errors.push(json!({
                "subjectId": entry.subject_id,
                "message": e.to_string()
            })),
        }
    }

    tracing::info!(
        student_id = %student.id,
        created,
        updated,
        skipped,
        errors = errors.len(),
        "grades saved"
    );
    Ok(json!({
        "created": created,
        "updated": updated,
        "skipped": skipped,
        "errors": errors
    }))
}

fn handle_results_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let result_id = required_str(req, "resultId")?;
    state
        .store()?
        .delete_result(&result_id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    Ok(json!({ "ok": true }))
}

/// Public search by subscription number, behind the release gate.
fn handle_results_lookup(state: &mut AppState, req: &Request) -> HandlerResult {
    let raw = req
        .params
        .get("subscriptionNumber")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let number = sanitize_subscription_number(raw);
    if !is_valid_subscription_number(&number) {
        return Err(HandlerErr::bad_params(MSG_INVALID_NUMBER));
    }

    let store = state.store()?;
    let release = gate::release_state(&store.get_settings()?, Utc::now());
    if !release.open {
        return Err(HandlerErr::new("results_closed", MSG_CLOSED).with_details(json!(release)));
    }

    let Some(student) = store.find_student_by_subscription_number(&number)? else {
        tracing::debug!(subscription_number = %number, "lookup miss");
        return Err(HandlerErr::new("not_found", MSG_UNKNOWN_NUMBER));
    };
    evaluate_student(&store, &student)
}

fn handle_results_evaluate(state: &mut AppState, req: &Request) -> HandlerResult {
    let student_id = required_str(req, "studentId")?;
    let store = state.store()?;
    let student = load_student(&store, &student_id)?;
    evaluate_student(&store, &student)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "results.listForStudent" => handle_results_list_for_student(state, req),
        "results.saveForStudent" => handle_results_save_for_student(state, req),
        "results.delete" => handle_results_delete(state, req),
        "results.lookup" => handle_results_lookup(state, req),
        "results.evaluate" => handle_results_evaluate(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
