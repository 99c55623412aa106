use crate::calc;
use crate::ipc::error::{reply, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Subject;
use crate::store::ResultsStore;
use serde_json::json;
use std::collections::HashMap;

/// Admin dashboard figures. Every student is scored with the same evaluator
/// the public lookup uses.
fn handle_stats_dashboard(state: &mut AppState, _req: &Request) -> HandlerResult {
    let store = state.store()?;
    let students = store.list_students(None)?;
    let subjects = store.list_subjects()?;
    let settings = store.get_settings()?;

    let mut by_section: HashMap<&str, Vec<Subject>> = HashMap::new();
    for subject in &subjects {
        by_section
            .entry(subject.section_id.as_str())
            .or_default()
            .push(subject.clone());
    }

    let mut total_results = 0usize;
    let mut evaluated = Vec::with_capacity(students.len());
    for student in &students {
        let results = store.list_results_for_student(&student.id)?;
        total_results += results.len();
        let section_subjects = by_section
            .get(student.section_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        evaluated.push(calc::evaluate(student, section_subjects, &results));
    }
    let tally = calc::tally(&evaluated);

    tracing::debug!(
        students = students.len(),
        evaluated = tally.evaluated_students,
        "dashboard computed"
    );
    Ok(json!({
        "totalStudents": students.len(),
        "totalResults": total_results,
        "evaluatedStudents": tally.evaluated_students,
        "passedStudents": tally.passed_students,
        "failedStudents": tally.failed_students,
        "averageScore": tally.average_score,
        "totalSections": store.list_sections()?.len(),
        "totalSubjects": subjects.len(),
        "isResultsOpen": settings.is_results_open,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "stats.dashboard" => handle_stats_dashboard(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
