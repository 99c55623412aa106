use crate::store::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// `db_code` is used for raw SQLite failures, e.g. `db_insert_failed`.
    pub fn store(e: StoreError, db_code: &'static str) -> Self {
        match e {
            StoreError::Duplicate { entity, ref key } => {
                let details = json!({ "entity": entity, "key": key });
                Self::new("duplicate", e.to_string()).with_details(details)
            }
            StoreError::NotFound { entity, ref id } => {
                let details = json!({ "entity": entity, "id": id });
                Self::new("not_found", e.to_string()).with_details(details)
            }
            StoreError::InUse { entity, by } => {
                let details = json!({ "entity": entity, "by": by });
                Self::new("in_use", e.to_string()).with_details(details)
            }
            StoreError::Sqlite(inner) => Self::new(db_code, inner.to_string()),
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr::store(e, "db_query_failed")
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerErr>;

pub fn reply(id: &str, result: HandlerResult) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_codes() {
        let dup = HandlerErr::store(
            StoreError::Duplicate {
                entity: "student",
                key: "123456".into(),
            },
            "db_insert_failed",
        );
        assert_eq!(dup.code, "duplicate");

        let in_use: HandlerErr = StoreError::InUse {
            entity: "section",
            by: "students",
        }
        .into();
        assert_eq!(in_use.code, "in_use");

        let raw = HandlerErr::store(
            StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows),
            "db_update_failed",
        );
        assert_eq!(raw.code, "db_update_failed");
    }

    #[test]
    fn envelope_shapes() {
        let resp = reply("7", Err(HandlerErr::bad_params("missing params.path")));
        assert_eq!(resp["id"], "7");
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "bad_params");
        assert!(resp["error"].get("details").is_none());

        let resp = reply("8", Ok(json!({ "x": 1 })));
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["result"]["x"], 1);
    }
}
