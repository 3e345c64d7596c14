use serde_json::{json, Map, Value};

/// One response line. `id` is omitted only for input that never parsed.
fn envelope(id: Option<&str>, outcome: Result<Value, Value>) -> Value {
    let mut line = Map::new();
    if let Some(id) = id {
        line.insert("id".into(), Value::from(id));
    }
    match outcome {
        Ok(result) => {
            line.insert("ok".into(), Value::Bool(true));
            line.insert("result".into(), result);
        }
        Err(error) => {
            line.insert("ok".into(), Value::Bool(false));
            line.insert("error".into(), error);
        }
    }
    Value::Object(line)
}

fn error_body(code: &str, message: String, details: Option<Value>) -> Value {
    let mut error = json!({ "code": code, "message": message });
    if let Some(d) = details {
        error["details"] = d;
    }
    error
}

pub fn ok(id: &str, result: Value) -> Value {
    envelope(Some(id), Ok(result))
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    envelope(Some(id), Err(error_body(code, message.into(), details)))
}

/// Reply for a line that did not parse as a request, so it has no id.
pub fn bad_json(message: &str) -> Value {
    envelope(None, Err(error_body("bad_json", message.to_string(), None)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_line_carries_id_and_result() {
        let line = ok("7", json!({ "seeded": true }));
        assert_eq!(line, json!({ "id": "7", "ok": true, "result": { "seeded": true } }));
    }

    #[test]
    fn details_only_appear_when_given() {
        let plain = err("1", "not_found", "student not found", None);
        assert!(plain["error"].get("details").is_none());
        assert_eq!(plain["ok"], false);

        let detailed = err("2", "bad_params", "bad date", Some(json!({ "date": "June" })));
        assert_eq!(detailed["error"]["details"]["date"], "June");
        assert_eq!(detailed["error"]["code"], "bad_params");
    }

    #[test]
    fn unparsed_input_has_no_id() {
        let line = bad_json("expected value");
        assert!(line.get("id").is_none());
        assert_eq!(line["error"]["code"], "bad_json");
    }
}
