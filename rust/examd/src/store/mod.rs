//! Persistence seam for the evaluator and the import reconciler.
//!
//! [`ResultsStore`] is the narrow contract the reconciler depends on; the
//! SQLite implementation also carries the admin CRUD used by the IPC
//! handlers. Row/struct mapping lives in [`rows`] only.

mod rows;
mod sqlite;

use crate::model::{NewResult, NewStudent, ResultRecord, Section, Student, Subject};
use thiserror::Error;

pub use sqlite::{ObjectionPatch, SectionPatch, SettingsPatch, SqliteStore, StudentPatch, SubjectPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} is still referenced by {by}")]
    InUse { entity: &'static str, by: &'static str },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Map a write failure, turning UNIQUE violations into `Duplicate`.
    pub(crate) fn from_write(err: rusqlite::Error, entity: &'static str, key: &str) -> Self {
        if is_unique_violation(&err) {
            return StoreError::Duplicate {
                entity,
                key: key.to_string(),
            };
        }
        StoreError::Sqlite(err)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reads and writes needed to evaluate and import results.
///
/// Not-found lookups return `Ok(None)`; `Err` always means the operation
/// itself failed.
pub trait ResultsStore {
    fn list_sections(&self) -> StoreResult<Vec<Section>>;
    fn list_subjects(&self) -> StoreResult<Vec<Subject>>;
    fn list_results_for_student(&self, student_id: &str) -> StoreResult<Vec<ResultRecord>>;
    fn find_student_by_subscription_number(&self, value: &str) -> StoreResult<Option<Student>>;
    fn find_result(&self, student_id: &str, subject_id: &str) -> StoreResult<Option<ResultRecord>>;

    fn create_student(&self, data: &NewStudent) -> StoreResult<Student>;
    fn create_result(&self, data: &NewResult) -> StoreResult<ResultRecord>;
    fn update_result_grade(&self, id: &str, grade: f64) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Write a grade for (student, subject): overwrite the existing record if
/// one exists, insert otherwise.
pub fn upsert_grade<S: ResultsStore + ?Sized>(
    store: &S,
    student_id: &str,
    subject_id: &str,
    grade: f64,
) -> StoreResult<Upsert> {
    match store.find_result(student_id, subject_id)? {
        Some(existing) => {
            store.update_result_grade(&existing.id, grade)?;
            Ok(Upsert::Updated)
        }
        None => {
            store.create_result(&NewResult {
                student_id: student_id.to_string(),
                subject_id: subject_id.to_string(),
                grade,
            })?;
            Ok(Upsert::Created)
        }
    }
}
