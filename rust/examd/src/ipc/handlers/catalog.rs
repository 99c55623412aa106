//! Certificate types, sections and subjects.

use crate::calc;
use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::{nullable_f64, opt_bool, opt_f64, opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{ResultsStore, SectionPatch, SubjectPatch};
use serde_json::json;

fn handle_certificate_types_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let types = state.store()?.list_certificate_types()?;
    Ok(json!({ "certificateTypes": types }))
}

fn handle_certificate_types_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = required_str(req, "name")?;
    let year = required_str(req, "year")?;
    let is_active = opt_bool(req, "isActive")?.unwrap_or(true);
    let created = state
        .store()?
        .create_certificate_type(&name, &year, is_active)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    Ok(json!(created))
}

fn handle_sections_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let sections = state.store()?.list_sections()?;
    Ok(json!({ "sections": sections }))
}

fn handle_sections_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = required_str(req, "name")?;
    let certificate_type_id = required_str(req, "certificateTypeId")?;
    let section = state
        .store()?
        .create_section(&name, &certificate_type_id)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    Ok(json!(section))
}

fn handle_sections_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let section_id = required_str(req, "sectionId")?;
    let patch = SectionPatch {
        name: opt_str(req, "name"),
        certificate_type_id: opt_str(req, "certificateTypeId"),
    };
    let section = state
        .store()?
        .update_section(&section_id, &patch)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!(section))
}

fn handle_sections_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let section_id = required_str(req, "sectionId")?;
    state
        .store()?
        .delete_section(&section_id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::info!(section_id = %section_id, "section deleted");
    Ok(json!({ "ok": true }))
}

fn validate_grades(max_grade: f64, min_grade: Option<f64>) -> Result<(), HandlerErr> {
    if max_grade <= 0.0 {
        return Err(HandlerErr::bad_params("maxGrade must be > 0")
            .with_details(json!({ "maxGrade": max_grade })));
    }
    if let Some(min) = min_grade {
        if min < 0.0 || min > max_grade {
            return Err(
                HandlerErr::bad_params("minGrade must be between 0 and maxGrade")
                    .with_details(json!({ "minGrade": min, "maxGrade": max_grade })),
            );
        }
    }
    Ok(())
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let store = state.store()?;
    let subjects = match opt_str(req, "sectionId") {
        Some(section_id) => store.list_subjects_for_section(&section_id)?,
        None => store.list_subjects()?,
    };
    Ok(json!({ "subjects": subjects }))
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = required_str(req, "name")?;
    let section_id = required_str(req, "sectionId")?;
    let Some(max_grade) = opt_f64(req, "maxGrade")? else {
        return Err(HandlerErr::bad_params("missing params.maxGrade"));
    };
    let min_grade = opt_f64(req, "minGrade")?.unwrap_or_else(|| calc::default_min_grade(max_grade));
    validate_grades(max_grade, Some(min_grade))?;

    let subject = state
        .store()?
        .create_subject(&name, &section_id, max_grade, Some(min_grade))
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    Ok(json!(subject))
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let subject_id = required_str(req, "subjectId")?;
    let store = state.store()?;
    let Some(current) = store.get_subject(&subject_id)? else {
        return Err(HandlerErr::new("not_found", "subject not found")
            .with_details(json!({ "subjectId": subject_id })));
    };

    let patch = SubjectPatch {
        name: opt_str(req, "name"),
        section_id: opt_str(req, "sectionId"),
        max_grade: opt_f64(req, "maxGrade")?,
        min_grade: nullable_f64(req, "minGrade")?,
    };
    let max_grade = patch.max_grade.unwrap_or(current.max_grade);
    let min_grade = patch.min_grade.unwrap_or(current.min_grade);
    validate_grades(max_grade, min_grade)?;

    let subject = store
        .update_subject(&subject_id, &patch)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!(subject))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let subject_id = required_str(req, "subjectId")?;
    let removed = state
        .store()?
        .delete_subject(&subject_id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::info!(subject_id = %subject_id, results_removed = removed, "subject deleted");
    Ok(json!({ "ok": true, "resultsRemoved": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "certificateTypes.list" => handle_certificate_types_list(state, req),
        "certificateTypes.create" => handle_certificate_types_create(state, req),
        "sections.list" => handle_sections_list(state, req),
        "sections.create" => handle_sections_create(state, req),
        "sections.update" => handle_sections_update(state, req),
        "sections.delete" => handle_sections_delete(state, req),
        "subjects.list" => handle_subjects_list(state, req),
        "subjects.create" => handle_subjects_create(state, req),
        "subjects.update" => handle_subjects_update(state, req),
        "subjects.delete" => handle_subjects_delete(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
