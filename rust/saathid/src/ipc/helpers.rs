use crate::ipc::error::err;
use crate::model::Language;
use crate::store::RecordStore;
use serde_json::json;

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

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        Self::new("not_found", format!("{} not found", what)).with_details(json!({ "id": id }))
    }

    pub fn write_failed(e: anyhow::Error) -> Self {
        Self::new("db_write_failed", format!("{e:#}"))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn no_workspace() -> HandlerErr {
    HandlerErr::new("no_workspace", "select a workspace first")
}

pub fn require_store(store: Option<&RecordStore>) -> Result<&RecordStore, HandlerErr> {
    store.ok_or_else(no_workspace)
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Present, string, and not blank.
pub fn get_nonempty_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?;
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_language(params: &serde_json::Value, fallback: Option<Language>) -> Language {
    get_optional_str(params, "language")
        .map(|t| Language::from_tag(&t))
        .or(fallback)
        .unwrap_or_default()
}

pub fn to_json<T: serde::Serialize>(v: &T) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or(serde_json::Value::Null)
}
