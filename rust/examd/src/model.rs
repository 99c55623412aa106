use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateType {
    pub id: String,
    pub name: String,
    pub year: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub certificate_type_id: String,
}

/// A graded subject of one section.
///
/// `min_grade` is the passing threshold; `None` means the default of half the
/// maximum (see [`crate::calc::effective_min_grade`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub section_id: String,
    pub max_grade: f64,
    pub min_grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub subscription_number: String,
    pub full_name: String,
    pub section_id: String,
    pub certificate_type_id: String,
    pub manual_fail: bool,
    pub created_at: String,
}

/// One stored grade. At most one exists per (student, subject).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub grade: f64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub subscription_number: String,
    pub full_name: String,
    pub section_id: String,
    pub certificate_type_id: String,
    pub manual_fail: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResult {
    pub student_id: String,
    pub subject_id: String,
    pub grade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectionStatus {
    New,
    Reviewing,
    Accepted,
    Rejected,
}

impl ObjectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectionStatus::New => "new",
            ObjectionStatus::Reviewing => "reviewing",
            ObjectionStatus::Accepted => "accepted",
            ObjectionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ObjectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(ObjectionStatus::New),
            "reviewing" => Ok(ObjectionStatus::Reviewing),
            "accepted" => Ok(ObjectionStatus::Accepted),
            "rejected" => Ok(ObjectionStatus::Rejected),
            other => Err(format!("unknown objection status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objection {
    pub id: String,
    pub subscription_number: String,
    pub full_name: String,
    pub section_id: Option<String>,
    pub phone: Option<String>,
    pub objection_text: String,
    pub status: ObjectionStatus,
    pub admin_note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewObjection {
    pub subscription_number: String,
    pub full_name: String,
    pub section_id: Option<String>,
    pub phone: Option<String>,
    pub objection_text: String,
}

/// The single row of portal settings that drives the release gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub is_results_open: bool,
    pub countdown_end: Option<DateTime<Utc>>,
    pub announcement_text: Option<String>,
    pub updated_at: String,
}

pub fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}
