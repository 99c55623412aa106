use chrono::{Datelike, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "results.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE_NAME)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(db_path(workspace))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            id INTEGER PRIMARY KEY CHECK(id = 1),
            is_results_open INTEGER NOT NULL DEFAULT 0,
            countdown_end TEXT,
            announcement_text TEXT,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO settings(id, is_results_open, announcement_text, updated_at)
         VALUES(1, 0, 'مرحباً بكم في نظام نتائج الامتحانات', ?)",
        [Utc::now().to_rfc3339()],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS certificate_types(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            year TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sections(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            certificate_type_id TEXT NOT NULL,
            FOREIGN KEY(certificate_type_id) REFERENCES certificate_types(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            section_id TEXT NOT NULL,
            max_grade REAL NOT NULL,
            min_grade REAL,
            FOREIGN KEY(section_id) REFERENCES sections(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_section ON subjects(section_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            subscription_number TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            section_id TEXT NOT NULL,
            certificate_type_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(section_id) REFERENCES sections(id),
            FOREIGN KEY(certificate_type_id) REFERENCES certificate_types(id)
        )",
        [],
    )?;
    // Workspaces created before the administrative override existed lack manual_fail.
    ensure_students_manual_fail(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_section ON students(section_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            grade REAL NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_results_student_subject
         ON results(student_id, subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_subject ON results(subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS objections(
            id TEXT PRIMARY KEY,
            subscription_number TEXT NOT NULL,
            full_name TEXT NOT NULL,
            section_id TEXT,
            phone TEXT,
            objection_text TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            admin_note TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(section_id) REFERENCES sections(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_objections_status ON objections(status)",
        [],
    )?;

    Ok(())
}

fn ensure_students_manual_fail(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "manual_fail")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE students ADD COLUMN manual_fail INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Scientific-section subjects shipped with a fresh portal: (name, max, min).
const DEFAULT_SCIENCE_SUBJECTS: &[(&str, f64, f64)] = &[
    ("الرياضيات", 300.0, 150.0),
    ("الفيزياء", 200.0, 100.0),
    ("الكيمياء", 200.0, 100.0),
    ("اللغة العربية", 400.0, 200.0),
    ("اللغة الأجنبية", 200.0, 100.0),
    ("التربية الوطنية", 100.0, 50.0),
    ("التربية الدينية", 100.0, 50.0),
];

const DEFAULT_SECTIONS: &[&str] = &[
    "علمي",
    "أدبي",
    "مهني تجاري",
    "مهني نسوي",
    "مهني صناعي",
    "شرعي",
];

/// Seed a certificate type, the standard sections and the scientific
/// subjects. Does nothing once any section exists.
pub fn seed_defaults(conn: &Connection) -> anyhow::Result<bool> {
    let sections: i64 = conn.query_row("SELECT COUNT(*) FROM sections", [], |r| r.get(0))?;
    if sections > 0 {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;

    let existing_cert: Option<String> = tx
        .query_row(
            "SELECT id FROM certificate_types ORDER BY rowid LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let cert_id = match existing_cert {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO certificate_types(id, name, year, is_active) VALUES(?, ?, ?, 1)",
                (&id, "الثانوية العامة", Utc::now().year().to_string()),
            )?;
            id
        }
    };

    let mut science_id = None;
    for name in DEFAULT_SECTIONS {
        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO sections(id, name, certificate_type_id) VALUES(?, ?, ?)",
            (&id, name, &cert_id),
        )?;
        if science_id.is_none() {
            science_id = Some(id);
        }
    }

    if let Some(section_id) = science_id {
        for (name, max, min) in DEFAULT_SCIENCE_SUBJECTS {
            tx.execute(
                "INSERT INTO subjects(id, name, section_id, max_grade, min_grade)
                 VALUES(?, ?, ?, ?, ?)",
                (Uuid::new_v4().to_string(), name, &section_id, max, min),
            )?;
        }
    }

    tx.commit()?;
    tracing::info!(sections = DEFAULT_SECTIONS.len(), "seeded default catalog");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent_and_settings_row_exists() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 1);
        assert!(table_has_column(&conn, "students", "manual_fail").expect("pragma"));
    }

    #[test]
    fn seed_runs_once() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("init");
        assert!(seed_defaults(&conn).expect("seed"));
        assert!(!seed_defaults(&conn).expect("reseed"));
        let subjects: i64 = conn
            .query_row("SELECT COUNT(*) FROM subjects", [], |r| r.get(0))
            .expect("count");
        assert_eq!(subjects, DEFAULT_SCIENCE_SUBJECTS.len() as i64);
    }
}
