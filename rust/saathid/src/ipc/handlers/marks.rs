use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, require_store, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Mark;
use crate::mutate::{self, MarkEntry};
use crate::query;
use crate::store::RecordStore;
use serde_json::json;

fn marks_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let marks: Vec<Mark> = match get_optional_str(params, "studentId") {
        Some(sid) => {
            let test_id = get_optional_str(params, "testId");
            query::marks_for_student(store, &sid)
                .into_iter()
                .filter(|m| test_id.as_deref().map_or(true, |t| m.test_id == t))
                .collect()
        }
        None => query::marks_for_test(store, get_optional_str(params, "testId").as_deref()),
    };
    Ok(json!({ "marks": marks }))
}

/// Each row needs studentId, testId and subjectId; testId/subjectId may be
/// given once at the top level for a whole entry sheet.
fn parse_mark_rows(params: &serde_json::Value) -> Result<Vec<MarkEntry>, HandlerErr> {
    let rows = params
        .get("marks")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing marks"))?;
    let default_test = get_optional_str(params, "testId");
    let default_subject = get_optional_str(params, "subjectId");

    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let field = |key: &str, fallback: &Option<String>| {
            get_optional_str(row, key)
                .or_else(|| fallback.clone())
                .ok_or_else(|| {
                    HandlerErr::bad_params(format!("marks[{}] missing {}", i, key))
                        .with_details(json!({ "index": i }))
                })
        };
        out.push(MarkEntry {
            student_id: field("studentId", &None)?,
            test_id: field("testId", &default_test)?,
            subject_id: field("subjectId", &default_subject)?,
            obtained_marks: row
                .get("obtainedMarks")
                .map(mutate::coerce_marks)
                .unwrap_or(0.0),
        });
    }
    Ok(out)
}

fn marks_save(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let entries = parse_mark_rows(params)?;
    let summary = mutate::save_marks(store, entries).map_err(HandlerErr::write_failed)?;
    Ok(to_json(&summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let result = match req.method.as_str() {
        "marks.list" => require_store(store).and_then(|s| marks_list(s, &req.params)),
        "marks.save" => require_store(store).and_then(|s| marks_save(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
