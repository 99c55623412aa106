use crate::import::{self, ImportSummary, ParsedRow};
use crate::ipc::error::{reply, HandlerErr, HandlerResult};
use crate::ipc::helpers::params_as;
use crate::ipc::types::{AppState, Request};
use crate::sheet;
use crate::store::ResultsStore;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RowsParams {
    rows: Vec<ParsedRow>,
}

#[derive(Debug, Deserialize)]
struct TableParams {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Run the reconciler straight against the connection. Every write commits
/// on its own, so the summary always describes what is on disk.
fn run_import(state: &AppState, rows: &[ParsedRow]) -> Result<ImportSummary, HandlerErr> {
    let store = state.store()?;
    let sections = store.list_sections()?;
    let subjects = store.list_subjects()?;
    let summary = import::reconcile(&store, rows, &sections, &subjects);

    tracing::info!(
        rows = rows.len(),
        students_added = summary.students_added,
        results_added = summary.results_added,
        errors = summary.errors.len(),
        "import finished"
    );
    Ok(summary)
}

fn handle_import_rows(state: &mut AppState, req: &Request) -> HandlerResult {
    let params: RowsParams = params_as(req)?;
    let summary = run_import(state, &params.rows)?;
    Ok(json!(summary))
}

fn handle_import_table(state: &mut AppState, req: &Request) -> HandlerResult {
    let params: TableParams = params_as(req)?;
    // Fail fast before parsing when there is nowhere to write.
    state.conn()?;

    let parse = sheet::normalize_table(&params.headers, &params.rows);
    if !parse.success {
        return Ok(json!({ "parse": parse, "import": null }));
    }
    let summary = run_import(state, &parse.rows)?;
    Ok(json!({ "parse": parse, "import": summary }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "import.rows" => handle_import_rows(state, req),
        "import.table" => handle_import_table(state, req),
        _ => return None,
    };
    Some(reply(&req.id, result))
}
