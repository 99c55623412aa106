//! Turn a decoded spreadsheet table (header row + data rows) into
//! [`ParsedRow`]s. Decoding xlsx/csv bytes happens in the host; this only
//! knows the column layout of the results template.

use crate::import::{GradeCell, ParsedRow};
use crate::text::fold_arabic_digits;
use serde::Serialize;
use serde_json::Value;
use indexmap::IndexMap;

pub const COL_SUBSCRIPTION_NUMBER: &str = "رقم الاكتتاب";
pub const COL_FULL_NAME: &str = "الاسم الكامل";
pub const COL_SECTION: &str = "القسم";

pub const REQUIRED_COLUMNS: [&str; 3] = [COL_SUBSCRIPTION_NUMBER, COL_FULL_NAME, COL_SECTION];

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableParse {
    pub success: bool,
    pub rows: Vec<ParsedRow>,
    pub errors: Vec<String>,
    pub headers: Vec<String>,
}

fn cell_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => String::new(),
                }
            }
        }
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn grade_cell(v: &Value) -> GradeCell {
    match v {
        Value::Number(n) => n
            .as_f64()
            .map(GradeCell::Number)
            .unwrap_or_else(|| GradeCell::Other(v.clone())),
        Value::String(s) => GradeCell::Text(s.clone()),
        other => GradeCell::Other(other.clone()),
    }
}

/// Normalise one sheet. Row numbers in messages are 1-based sheet rows, so
/// the first data row is row 2.
pub fn normalize_table(headers: &[String], rows: &[Vec<Value>]) -> TableParse {
    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    if rows.is_empty() {
        return TableParse {
            success: false,
            errors: vec!["الملف فارغ أو لا يحتوي على بيانات كافية".to_string()],
            headers,
            ..TableParse::default()
        };
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == c))
        .collect();
    if !missing.is_empty() {
        return TableParse {
            success: false,
            errors: vec![format!("الأعمدة التالية مطلوبة: {}", missing.join(", "))],
            headers,
            ..TableParse::default()
        };
    }

    let index_of = |name: &str| headers.iter().position(|h| h == name);
    let (Some(sn_idx), Some(name_idx), Some(section_idx)) = (
        index_of(COL_SUBSCRIPTION_NUMBER),
        index_of(COL_FULL_NAME),
        index_of(COL_SECTION),
    ) else {
        return TableParse {
            success: false,
            headers,
            ..TableParse::default()
        };
    };

    // First occurrence wins when a subject header repeats.
    let mut grade_columns: Vec<(usize, &str)> = Vec::new();
    for (i, h) in headers.iter().enumerate() {
        if h.is_empty() || REQUIRED_COLUMNS.contains(&h.as_str()) {
            continue;
        }
        if grade_columns.iter().any(|(_, name)| *name == h.as_str()) {
            continue;
        }
        grade_columns.push((i, h.as_str()));
    }

    let mut parsed = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if row.iter().all(is_blank) {
            continue;
        }

        let subscription_number = fold_arabic_digits(&cell_text(row.get(sn_idx)));
        let full_name = cell_text(row.get(name_idx));
        let section = cell_text(row.get(section_idx));

        if subscription_number.is_empty() || full_name.is_empty() {
            errors.push(format!("الصف {}: بيانات ناقصة", i + 2));
            continue;
        }

        let mut grades = IndexMap::new();
        for (col, name) in &grade_columns {
            let Some(v) = row.get(*col) else {
                continue;
            };
            if is_blank(v) {
                continue;
            }
            grades.insert(name.to_string(), grade_cell(v));
        }

        parsed.push(ParsedRow {
            subscription_number,
            full_name,
            section,
            grades,
        });
    }

    TableParse {
        success: true,
        rows: parsed,
        errors,
        headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn template_rows_normalise() {
        let h = headers(&[
            "رقم الاكتتاب",
            "الاسم الكامل",
            "القسم",
            "الرياضيات",
            "اللغة العربية",
        ]);
        let rows = vec![
            vec![json!(123456), json!("عمر زين الدين"), json!("علمي"), json!(280), json!(185)],
            vec![json!("123458"), json!("يوسف شقير"), json!("مهني"), json!(""), json!(290)],
        ];
        let t = normalize_table(&h, &rows);
        assert!(t.success);
        assert!(t.errors.is_empty());
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0].subscription_number, "123456");
        assert_eq!(t.rows[0].grades["الرياضيات"].as_grade(), Some(280.0));
        assert!(!t.rows[1].grades.contains_key("الرياضيات"));
        assert_eq!(t.rows[1].grades["اللغة العربية"].as_grade(), Some(290.0));
    }

    #[test]
    fn missing_required_column_rejects_table() {
        let h = headers(&["رقم الاكتتاب", "القسم", "الرياضيات"]);
        let t = normalize_table(&h, &[vec![json!("1"), json!("علمي"), json!(1)]]);
        assert!(!t.success);
        assert_eq!(t.errors.len(), 1);
        assert!(t.errors[0].contains("الاسم الكامل"));
    }

    #[test]
    fn incomplete_rows_report_sheet_row_number() {
        let h = headers(&["رقم الاكتتاب", "الاسم الكامل", "القسم"]);
        let rows = vec![
            vec![json!("1001"), json!("أ"), json!("علمي")],
            vec![json!(null), json!(""), json!(null)],
            vec![json!("1003"), json!(""), json!("علمي")],
        ];
        let t = normalize_table(&h, &rows);
        assert!(t.success);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.errors, vec!["الصف 4: بيانات ناقصة".to_string()]);
    }

    #[test]
    fn headers_are_trimmed_and_arabic_digits_folded() {
        let h = headers(&[" رقم الاكتتاب ", "الاسم الكامل", "القسم "]);
        let rows = vec![vec![json!("١٠٠٢"), json!("ب"), json!("أدبي")]];
        let t = normalize_table(&h, &rows);
        assert_eq!(t.rows[0].subscription_number, "1002");
    }

    #[test]
    fn empty_table_is_rejected() {
        let t = normalize_table(&headers(&["رقم الاكتتاب"]), &[]);
        assert!(!t.success);
        assert_eq!(t.errors.len(), 1);
    }
}
