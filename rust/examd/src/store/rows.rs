//! Column lists and row mappers. Every SELECT in the store goes through
//! one of these so table columns are renamed to struct fields in one place.

use crate::model::{
    CertificateType, Objection, ObjectionStatus, ResultRecord, Section, Settings, Student, Subject,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub const CERTIFICATE_TYPE_COLUMNS: &str = "id, name, year, is_active";
pub const SECTION_COLUMNS: &str = "id, name, certificate_type_id";
pub const SUBJECT_COLUMNS: &str = "id, name, section_id, max_grade, min_grade";
pub const STUDENT_COLUMNS: &str =
    "id, subscription_number, full_name, section_id, certificate_type_id, manual_fail, created_at";
pub const RESULT_COLUMNS: &str = "id, student_id, subject_id, grade, created_at";
pub const OBJECTION_COLUMNS: &str = "id, subscription_number, full_name, section_id, phone, \
     objection_text, status, admin_note, created_at";
pub const SETTINGS_COLUMNS: &str =
    "is_results_open, countdown_end, announcement_text, updated_at";

pub fn certificate_type(row: &Row<'_>) -> rusqlite::Result<CertificateType> {
    Ok(CertificateType {
        id: row.get("id")?,
        name: row.get("name")?,
        year: row.get("year")?,
        is_active: row.get::<_, i64>("is_active")? != 0,
    })
}

pub fn section(row: &Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: row.get("id")?,
        name: row.get("name")?,
        certificate_type_id: row.get("certificate_type_id")?,
    })
}

pub fn subject(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        section_id: row.get("section_id")?,
        max_grade: row.get("max_grade")?,
        min_grade: row.get("min_grade")?,
    })
}

pub fn student(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get("id")?,
        subscription_number: row.get("subscription_number")?,
        full_name: row.get("full_name")?,
        section_id: row.get("section_id")?,
        certificate_type_id: row.get("certificate_type_id")?,
        manual_fail: row.get::<_, i64>("manual_fail")? != 0,
        created_at: row.get("created_at")?,
    })
}

pub fn result(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    Ok(ResultRecord {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        subject_id: row.get("subject_id")?,
        grade: row.get("grade")?,
        created_at: row.get("created_at")?,
    })
}

pub fn objection(row: &Row<'_>) -> rusqlite::Result<Objection> {
    let status_text: String = row.get("status")?;
    let status = status_text.parse::<ObjectionStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, e.into())
    })?;
    Ok(Objection {
        id: row.get("id")?,
        subscription_number: row.get("subscription_number")?,
        full_name: row.get("full_name")?,
        section_id: row.get("section_id")?,
        phone: row.get("phone")?,
        objection_text: row.get("objection_text")?,
        status,
        admin_note: row.get("admin_note")?,
        created_at: row.get("created_at")?,
    })
}

pub fn settings(row: &Row<'_>) -> rusqlite::Result<Settings> {
    let countdown_end: Option<String> = row.get("countdown_end")?;
    let countdown_end = countdown_end
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_stamp(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(Settings {
        is_results_open: row.get::<_, i64>("is_results_open")? != 0,
        countdown_end,
        announcement_text: row.get("announcement_text")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn parse_stamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s.trim()).map(|d| d.with_timezone(&Utc))
}

pub fn format_stamp(d: &DateTime<Utc>) -> String {
    d.to_rfc3339()
}
