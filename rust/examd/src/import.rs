//! Bulk grade import: reconcile parsed spreadsheet rows against the catalog.
//!
//! Rows are matched to sections and subjects by name, new subscription
//! numbers become students, and every grade is upserted. Nothing here
//! returns an error: each skipped row and each failed write is reported as a
//! message in [`ImportSummary::errors`] and the batch carries on.

use crate::model::{NewStudent, Section, Subject};
use crate::store::{upsert_grade, ResultsStore};
use crate::text::fold_arabic_digits;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashMap;

/// One spreadsheet cell under a subject column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeCell {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl GradeCell {
    /// The cell as a grade, or `None` when it is blank, non-numeric,
    /// non-finite or negative.
    pub fn as_grade(&self) -> Option<f64> {
        let v = match self {
            GradeCell::Number(v) => *v,
            GradeCell::Text(s) => fold_arabic_digits(s).trim().parse::<f64>().ok()?,
            GradeCell::Other(_) => return None,
        };
        (v.is_finite() && v >= 0.0).then_some(v)
    }
}

impl From<f64> for GradeCell {
    fn from(v: f64) -> Self {
        GradeCell::Number(v)
    }
}

impl From<&str> for GradeCell {
    fn from(s: &str) -> Self {
        GradeCell::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRow {
    pub subscription_number: String,
    pub full_name: String,
    /// Section *name* as typed in the sheet.
    pub section: String,
    #[serde(default)]
    /// Subject name to cell, in sheet column order.
    pub grades: IndexMap<String, GradeCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub students_added: usize,
    pub results_added: usize,
    pub errors: Vec<String>,
}

#[derive(Debug)]
struct StagedGrade<'r> {
    subscription_number: &'r str,
    subject_id: String,
    grade: f64,
}

fn record(errors: &mut Vec<String>, message: String) {
    tracing::warn!(%message, "import");
    errors.push(message);
}

/// Reconcile `rows` against the given reference data and write through `store`.
///
/// Students that already exist are never modified. New students are created
/// first (phase A) so that every grade can then be linked to a student id by
/// subscription number (phase B).
pub fn reconcile<S: ResultsStore + ?Sized>(
    store: &S,
    rows: &[ParsedRow],
    sections: &[Section],
    subjects: &[Subject],
) -> ImportSummary {
    let mut errors = Vec::new();
    let mut staged_students: Vec<NewStudent> = Vec::new();
    let mut staged_grades: Vec<StagedGrade<'_>> = Vec::new();

    for row in rows {
        let Some(section) = sections.iter().find(|s| s.name == row.section) else {
            record(
                &mut errors,
                format!(
                    "الصف {}: القسم \"{}\" غير موجود",
                    row.subscription_number, row.section
                ),
            );
            continue;
        };

        match store.find_student_by_subscription_number(&row.subscription_number) {
            Ok(Some(_)) => {}
            Ok(None) => staged_students.push(NewStudent {
                subscription_number: row.subscription_number.clone(),
                full_name: row.full_name.clone(),
                section_id: section.id.clone(),
                certificate_type_id: section.certificate_type_id.clone(),
                manual_fail: false,
            }),
            Err(e) => {
                record(
                    &mut errors,
                    format!(
                        "الصف {}: تعذر التحقق من الطالب: {}",
                        row.subscription_number, e
                    ),
                );
                continue;
            }
        }

        for (subject_name, cell) in &row.grades {
            let Some(subject) = subjects
                .iter()
                .find(|s| &s.name == subject_name && s.section_id == section.id)
            else {
                continue;
            };
            let Some(grade) = cell.as_grade() else {
                continue;
            };
            staged_grades.push(StagedGrade {
                subscription_number: &row.subscription_number,
                subject_id: subject.id.clone(),
                grade,
            });
        }
    }

    // Phase A: students.
    let mut students_added = 0;
    for new_student in &staged_students {
        match store.create_student(new_student) {
            Ok(_) => students_added += 1,
            Err(e) => record(
                &mut errors,
                format!(
                    "خطأ في إضافة الطالب {}: {}",
                    new_student.subscription_number, e
                ),
            ),
        }
    }

    // Phase B: grades. Lookups are cached per subscription number; Err keeps
    // the store failure text.
    let mut student_ids: HashMap<&str, Result<Option<String>, String>> = HashMap::new();
    let mut results_added = 0;
    for staged in &staged_grades {
        let resolved = student_ids
            .entry(staged.subscription_number)
            .or_insert_with(|| {
                store
                    .find_student_by_subscription_number(staged.subscription_number)
                    .map(|found| found.map(|s| s.id))
                    .map_err(|e| e.to_string())
            })
            .clone();

        let student_id = match resolved {
            Ok(Some(id)) => id,
            Ok(None) => {
                record(
                    &mut errors,
                    format!(
                        "تعذر ربط درجة الطالب {}: الطالب غير موجود",
                        staged.subscription_number
                    ),
                );
                continue;
            }
            Err(e) => {
                record(
                    &mut errors,
                    format!("تعذر ربط درجة الطالب {}: {}", staged.subscription_number, e),
                );
                continue;
            }
        };

        match upsert_grade(store, &student_id, &staged.subject_id, staged.grade) {
            Ok(_) => results_added += 1,
            Err(e) => record(
                &mut errors,
                format!(
                    "خطأ في إضافة النتيجة للطالب {}: {}",
                    staged.subscription_number, e
                ),
            ),
        }
    }

    tracing::info!(
        rows = rows.len(),
        students_added,
        results_added,
        errors = errors.len(),
        "import reconciled"
    );

    ImportSummary {
        students_added,
        results_added,
        errors,
    }
}
