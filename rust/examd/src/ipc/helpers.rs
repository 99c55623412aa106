use super::error::HandlerErr;
use super::types::Request;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trimmed, non-empty string param.
pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_str(req: &Request, key: &str) -> Result<String, HandlerErr> {
    opt_str(req, key).ok_or_else(|| HandlerErr::bad_params(format!("missing params.{key}")))
}

pub fn opt_bool(req: &Request, key: &str) -> Result<Option<bool>, HandlerErr> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(HandlerErr::bad_params(format!("params.{key} must be a boolean"))),
    }
}

pub fn opt_f64(req: &Request, key: &str) -> Result<Option<f64>, HandlerErr> {
    Ok(nullable_f64(req, key)?.flatten())
}

/// Absent → `None`, explicit null → `Some(None)`.
pub fn nullable_f64(req: &Request, key: &str) -> Result<Option<Option<f64>>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() => Ok(Some(Some(n))),
            _ => Err(HandlerErr::bad_params(format!("params.{key} must be a number"))),
        },
    }
}

/// Absent → `None`, null or blank → `Some(None)`.
pub fn nullable_str(req: &Request, key: &str) -> Result<Option<Option<String>>, HandlerErr> {
    match req.params.get(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok(Some((!s.is_empty()).then(|| s.to_string())))
        }
        Some(_) => Err(HandlerErr::bad_params(format!("params.{key} must be a string"))),
    }
}

/// Deserialize the whole params object.
pub fn params_as<T: DeserializeOwned>(req: &Request) -> Result<T, HandlerErr> {
    serde_json::from_value(req.params.clone()).map_err(|e| HandlerErr::bad_params(e.to_string()))
}
