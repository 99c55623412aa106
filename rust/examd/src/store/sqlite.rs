use super::rows::{
    self, CERTIFICATE_TYPE_COLUMNS, OBJECTION_COLUMNS, RESULT_COLUMNS, SECTION_COLUMNS,
    SETTINGS_COLUMNS, STUDENT_COLUMNS, SUBJECT_COLUMNS,
};
use super::{ResultsStore, StoreError, StoreResult};
use crate::model::{
    now_stamp, CertificateType, NewObjection, NewResult, NewStudent, Objection, ObjectionStatus,
    ResultRecord, Section, Settings, Student, Subject,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

/// Store over the workspace SQLite connection. Borrowed per request.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub certificate_type_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub section_id: Option<String>,
    pub max_grade: Option<f64>,
    pub min_grade: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub subscription_number: Option<String>,
    pub full_name: Option<String>,
    pub section_id: Option<String>,
    pub manual_fail: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectionPatch {
    pub status: Option<ObjectionStatus>,
    pub admin_note: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub is_results_open: Option<bool>,
    pub countdown_end: Option<Option<DateTime<Utc>>>,
    pub announcement_text: Option<Option<String>>,
}

fn not_found(entity: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn opt_text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn run_update(&self, table: &str, id: &str, sets: Vec<&str>, mut args: Vec<Value>) -> StoreResult<usize> {
        if sets.is_empty() {
            return Ok(0);
        }
        args.push(Value::Text(id.to_string()));
        let sql = format!("UPDATE {} SET {} WHERE id = ?", table, sets.join(", "));
        Ok(self.conn.execute(&sql, params_from_iter(args))?)
    }

    // --- certificate types -------------------------------------------------

    pub fn list_certificate_types(&self) -> StoreResult<Vec<CertificateType>> {
        let sql = format!(
            "SELECT {CERTIFICATE_TYPE_COLUMNS} FROM certificate_types ORDER BY year DESC, rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map([], rows::certificate_type)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    pub fn get_certificate_type(&self, id: &str) -> StoreResult<Option<CertificateType>> {
        let sql = format!("SELECT {CERTIFICATE_TYPE_COLUMNS} FROM certificate_types WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, [id], rows::certificate_type)
            .optional()?)
    }

    pub fn create_certificate_type(
        &self,
        name: &str,
        year: &str,
        is_active: bool,
    ) -> StoreResult<CertificateType> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO certificate_types(id, name, year, is_active) VALUES(?, ?, ?, ?)",
                (&id, name, year, is_active as i64),
            )
            .map_err(|e| StoreError::from_write(e, "certificate type", name))?;
        Ok(CertificateType {
            id,
            name: name.to_string(),
            year: year.to_string(),
            is_active,
        })
    }

    // --- sections ----------------------------------------------------------

    pub fn get_section(&self, id: &str) -> StoreResult<Option<Section>> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?");
        Ok(self.conn.query_row(&sql, [id], rows::section).optional()?)
    }

    pub fn create_section(&self, name: &str, certificate_type_id: &str) -> StoreResult<Section> {
        if self.get_certificate_type(certificate_type_id)?.is_none() {
            return Err(not_found("certificate type", certificate_type_id));
        }
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO sections(id, name, certificate_type_id) VALUES(?, ?, ?)",
                (&id, name, certificate_type_id),
            )
            .map_err(|e| StoreError::from_write(e, "section", name))?;
        Ok(Section {
            id,
            name: name.to_string(),
            certificate_type_id: certificate_type_id.to_string(),
        })
    }

    pub fn update_section(&self, id: &str, patch: &SectionPatch) -> StoreResult<Section> {
        if let Some(cert) = &patch.certificate_type_id {
            if self.get_certificate_type(cert)?.is_none() {
                return Err(not_found("certificate type", cert));
            }
        }
        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            args.push(Value::Text(name.clone()));
        }
        if let Some(cert) = &patch.certificate_type_id {
            sets.push("certificate_type_id = ?");
            args.push(Value::Text(cert.clone()));
        }
        self.run_update("sections", id, sets, args)?;
        self.get_section(id)?.ok_or_else(|| not_found("section", id))
    }

    /// Refuses while students or subjects still point at the section.
    pub fn delete_section(&self, id: &str) -> StoreResult<()> {
        let students: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM students WHERE section_id = ?",
            [id],
            |r| r.get(0),
        )?;
        if students > 0 {
            return Err(StoreError::InUse {
                entity: "section",
                by: "students",
            });
        }
        let subjects: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM subjects WHERE section_id = ?",
            [id],
            |r| r.get(0),
        )?;
        if subjects > 0 {
            return Err(StoreError::InUse {
                entity: "section",
                by: "subjects",
            });
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE objections SET section_id = NULL WHERE section_id = ?",
            [id],
        )?;
        let n = tx.execute("DELETE FROM sections WHERE id = ?", [id])?;
        if n == 0 {
            return Err(not_found("section", id));
        }
        tx.commit()?;
        Ok(())
    }

    // --- subjects ----------------------------------------------------------

    pub fn list_subjects_for_section(&self, section_id: &str) -> StoreResult<Vec<Subject>> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE section_id = ? ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map([section_id], rows::subject)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    pub fn get_subject(&self, id: &str) -> StoreResult<Option<Subject>> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?");
        Ok(self.conn.query_row(&sql, [id], rows::subject).optional()?)
    }

    pub fn create_subject(
        &self,
        name: &str,
        section_id: &str,
        max_grade: f64,
        min_grade: Option<f64>,
    ) -> StoreResult<Subject> {
        if self.get_section(section_id)?.is_none() {
            return Err(not_found("section", section_id));
        }
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO subjects(id, name, section_id, max_grade, min_grade)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, name, section_id, max_grade, min_grade),
            )
            .map_err(|e| StoreError::from_write(e, "subject", name))?;
        Ok(Subject {
            id,
            name: name.to_string(),
            section_id: section_id.to_string(),
            max_grade,
            min_grade,
        })
    }

    pub fn update_subject(&self, id: &str, patch: &SubjectPatch) -> StoreResult<Subject> {
        if let Some(section_id) = &patch.section_id {
            if self.get_section(section_id)?.is_none() {
                return Err(not_found("section", section_id));
            }
        }
        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(name) = &patch.name {
            sets.push("name = ?");
            args.push(Value::Text(name.clone()));
        }
        if let Some(section_id) = &patch.section_id {
            sets.push("section_id = ?");
            args.push(Value::Text(section_id.clone()));
        }
        if let Some(max) = patch.max_grade {
            sets.push("max_grade = ?");
            args.push(Value::Real(max));
        }
        if let Some(min) = patch.min_grade {
            sets.push("min_grade = ?");
            args.push(min.map(Value::Real).unwrap_or(Value::Null));
        }
        self.run_update("subjects", id, sets, args)?;
        self.get_subject(id)?.ok_or_else(|| not_found("subject", id))
    }

    /// Deletes the subject together with every grade recorded against it.
    pub fn delete_subject(&self, id: &str) -> StoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM results WHERE subject_id = ?", [id])?;
        let n = tx.execute("DELETE FROM subjects WHERE id = ?", [id])?;
        if n == 0 {
            return Err(not_found("subject", id));
        }
        tx.commit()?;
        Ok(removed)
    }

    // --- students ----------------------------------------------------------

    pub fn list_students(&self, section_id: Option<&str>) -> StoreResult<Vec<Student>> {
        let (sql, args) = match section_id {
            Some(sid) => (
                format!(
                    "SELECT {STUDENT_COLUMNS} FROM students WHERE section_id = ? ORDER BY rowid DESC"
                ),
                vec![Value::Text(sid.to_string())],
            ),
            None => (
                format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY rowid DESC"),
                Vec::new(),
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map(params_from_iter(args), rows::student)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    pub fn get_student(&self, id: &str) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?");
        Ok(self.conn.query_row(&sql, [id], rows::student).optional()?)
    }

    /// A section change also moves the student to that section's certificate type.
    pub fn update_student(&self, id: &str, patch: &StudentPatch) -> StoreResult<Student> {
        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(sn) = &patch.subscription_number {
            sets.push("subscription_number = ?");
            args.push(Value::Text(sn.clone()));
        }
        if let Some(name) = &patch.full_name {
            sets.push("full_name = ?");
            args.push(Value::Text(name.clone()));
        }
        if let Some(section_id) = &patch.section_id {
            let section = self
                .get_section(section_id)?
                .ok_or_else(|| not_found("section", section_id))?;
            sets.push("section_id = ?");
            args.push(Value::Text(section.id));
            sets.push("certificate_type_id = ?");
            args.push(Value::Text(section.certificate_type_id));
        }
        if let Some(flag) = patch.manual_fail {
            sets.push("manual_fail = ?");
            args.push(Value::Integer(flag as i64));
        }
        let key = patch.subscription_number.as_deref().unwrap_or(id);
        match self.run_update("students", id, sets, args) {
            Ok(_) => {}
            Err(StoreError::Sqlite(e)) => return Err(StoreError::from_write(e, "student", key)),
            Err(e) => return Err(e),
        }
        self.get_student(id)?.ok_or_else(|| not_found("student", id))
    }

    /// Deletes the student and their grades.
    pub fn delete_student(&self, id: &str) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM results WHERE student_id = ?", [id])?;
        let n = tx.execute("DELETE FROM students WHERE id = ?", [id])?;
        if n == 0 {
            return Err(not_found("student", id));
        }
        tx.commit()?;
        Ok(())
    }

    // --- results -----------------------------------------------------------

    pub fn delete_result(&self, id: &str) -> StoreResult<()> {
        let n = self.conn.execute("DELETE FROM results WHERE id = ?", [id])?;
        if n == 0 {
            return Err(not_found("result", id));
        }
        Ok(())
    }

    // --- objections --------------------------------------------------------

    pub fn list_objections(&self, status: Option<ObjectionStatus>) -> StoreResult<Vec<Objection>> {
        let (sql, args) = match status {
            Some(s) => (
                format!(
                    "SELECT {OBJECTION_COLUMNS} FROM objections WHERE status = ?
                     ORDER BY created_at DESC, rowid DESC"
                ),
                vec![Value::Text(s.as_str().to_string())],
            ),
            None => (
                format!(
                    "SELECT {OBJECTION_COLUMNS} FROM objections ORDER BY created_at DESC, rowid DESC"
                ),
                Vec::new(),
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map(params_from_iter(args), rows::objection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    pub fn get_objection(&self, id: &str) -> StoreResult<Option<Objection>> {
        let sql = format!("SELECT {OBJECTION_COLUMNS} FROM objections WHERE id = ?");
        Ok(self.conn.query_row(&sql, [id], rows::objection).optional()?)
    }

    pub fn create_objection(&self, data: &NewObjection) -> StoreResult<Objection> {
        if let Some(section_id) = &data.section_id {
            if self.get_section(section_id)?.is_none() {
                return Err(not_found("section", section_id));
            }
        }
        let id = Uuid::new_v4().to_string();
        let created_at = now_stamp();
        self.conn
            .execute(
                "INSERT INTO objections(id, subscription_number, full_name, section_id, phone,
                   objection_text, status, admin_note, created_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, NULL, ?)",
                (
                    &id,
                    &data.subscription_number,
                    &data.full_name,
                    &data.section_id,
                    &data.phone,
                    &data.objection_text,
                    ObjectionStatus::New.as_str(),
                    &created_at,
                ),
            )
            .map_err(|e| StoreError::from_write(e, "objection", &data.subscription_number))?;
        Ok(Objection {
            id,
            subscription_number: data.subscription_number.clone(),
            full_name: data.full_name.clone(),
            section_id: data.section_id.clone(),
            phone: data.phone.clone(),
            objection_text: data.objection_text.clone(),
            status: ObjectionStatus::New,
            admin_note: None,
            created_at,
        })
    }

    pub fn update_objection(&self, id: &str, patch: &ObjectionPatch) -> StoreResult<Objection> {
        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(status) = patch.status {
            sets.push("status = ?");
            args.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(note) = &patch.admin_note {
            sets.push("admin_note = ?");
            args.push(opt_text(note));
        }
        self.run_update("objections", id, sets, args)?;
        self.get_objection(id)?.ok_or_else(|| not_found("objection", id))
    }

    pub fn delete_objection(&self, id: &str) -> StoreResult<()> {
        let n = self.conn.execute("DELETE FROM objections WHERE id = ?", [id])?;
        if n == 0 {
            return Err(not_found("objection", id));
        }
        Ok(())
    }

    // --- settings ----------------------------------------------------------

    pub fn get_settings(&self) -> StoreResult<Settings> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM settings WHERE id = 1");
        self.conn
            .query_row(&sql, [], rows::settings)
            .optional()?
            .ok_or_else(|| not_found("settings", "1"))
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> StoreResult<Settings> {
        let mut sets = Vec::new();
        let mut args = Vec::new();
        if let Some(open) = patch.is_results_open {
            sets.push("is_results_open = ?");
            args.push(Value::Integer(open as i64));
        }
        if let Some(end) = &patch.countdown_end {
            sets.push("countdown_end = ?");
            args.push(opt_text(&end.as_ref().map(rows::format_stamp)));
        }
        if let Some(text) = &patch.announcement_text {
            sets.push("announcement_text = ?");
            args.push(opt_text(text));
        }
        sets.push("updated_at = ?");
        args.push(Value::Text(now_stamp()));
        self.run_update("settings", "1", sets, args)?;
        self.get_settings()
    }
}

impl ResultsStore for SqliteStore<'_> {
    fn list_sections(&self) -> StoreResult<Vec<Section>> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map([], rows::section)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    fn list_subjects(&self) -> StoreResult<Vec<Subject>> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY section_id, rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map([], rows::subject)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    fn list_results_for_student(&self, student_id: &str) -> StoreResult<Vec<ResultRecord>> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM results WHERE student_id = ? ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let out = stmt
            .query_map([student_id], rows::result)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(out)
    }

    fn find_student_by_subscription_number(&self, value: &str) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE subscription_number = ?");
        Ok(self.conn.query_row(&sql, [value], rows::student).optional()?)
    }

    fn find_result(&self, student_id: &str, subject_id: &str) -> StoreResult<Option<ResultRecord>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE student_id = ? AND subject_id = ?"
        );
        Ok(self
            .conn
            .query_row(&sql, [student_id, subject_id], rows::result)
            .optional()?)
    }

    fn create_student(&self, data: &NewStudent) -> StoreResult<Student> {
        let id = Uuid::new_v4().to_string();
        let created_at = now_stamp();
        self.conn
            .execute(
                "INSERT INTO students(id, subscription_number, full_name, section_id,
                   certificate_type_id, manual_fail, created_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &id,
                    &data.subscription_number,
                    &data.full_name,
                    &data.section_id,
                    &data.certificate_type_id,
                    data.manual_fail as i64,
                    &created_at,
                ),
            )
            .map_err(|e| StoreError::from_write(e, "student", &data.subscription_number))?;
        Ok(Student {
            id,
            subscription_number: data.subscription_number.clone(),
            full_name: data.full_name.clone(),
            section_id: data.section_id.clone(),
            certificate_type_id: data.certificate_type_id.clone(),
            manual_fail: data.manual_fail,
            created_at,
        })
    }

    fn create_result(&self, data: &NewResult) -> StoreResult<ResultRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = now_stamp();
        self.conn
            .execute(
                "INSERT INTO results(id, student_id, subject_id, grade, created_at)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, &data.student_id, &data.subject_id, data.grade, &created_at),
            )
            .map_err(|e| StoreError::from_write(e, "result", &data.subject_id))?;
        Ok(ResultRecord {
            id,
            student_id: data.student_id.clone(),
            subject_id: data.subject_id.clone(),
            grade: data.grade,
            created_at,
        })
    }

    fn update_result_grade(&self, id: &str, grade: f64) -> StoreResult<()> {
        let n = self
            .conn
            .execute("UPDATE results SET grade = ? WHERE id = ?", (grade, id))?;
        if n == 0 {
            return Err(not_found("result", id));
        }
        Ok(())
    }
}
