use crate::calc;
use crate::insight;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_language, get_nonempty_str, require_store, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::query;
use crate::session;
use crate::store::RecordStore;
use serde_json::json;

fn class_average(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_nonempty_str(params, "classId")?;
    if query::class(store, &class_id).is_none() {
        return Err(HandlerErr::not_found("class", &class_id));
    }
    Ok(json!({ "classId": class_id, "average": calc::class_average(store, &class_id) }))
}

fn test_average(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let test_id = get_nonempty_str(params, "testId")?;
    let Some(test) = query::test(store, &test_id) else {
        return Err(HandlerErr::not_found("test", &test_id));
    };
    Ok(json!({
        "testId": test.id,
        "maxMarks": test.max_marks,
        "average": calc::test_average(store, &test_id),
    }))
}

fn student_stats(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_nonempty_str(params, "studentId")?;
    let overview = calc::student_overview(store, &student_id)
        .ok_or_else(|| HandlerErr::not_found("student", &student_id))?;
    Ok(to_json(&overview))
}

fn school_stats(store: &RecordStore) -> Result<serde_json::Value, HandlerErr> {
    Ok(to_json(&calc::school_stats(store)))
}

fn session_language(store: &RecordStore) -> Option<crate::model::Language> {
    session::current_user(store).and_then(|u| u.language)
}

fn pulse(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state.store.as_ref())?;
    let student_id = get_nonempty_str(params, "studentId")?;
    let lang = get_language(params, session_language(store));
    let text = insight::student_pulse(state.enhancements.engine(), store, &student_id, lang)
        .ok_or_else(|| HandlerErr::not_found("student", &student_id))?;
    Ok(json!({ "studentId": student_id, "language": lang.tag(), "pulse": text }))
}

fn strategic(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = require_store(state.store.as_ref())?;
    let lang = get_language(params, session_language(store));
    let text = insight::strategic_insight(state.enhancements.engine(), store, lang);
    Ok(json!({ "language": lang.tag(), "insight": text }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let result = match req.method.as_str() {
        "stats.classAverage" => require_store(store).and_then(|s| class_average(s, &req.params)),
        "stats.testAverage" => require_store(store).and_then(|s| test_average(s, &req.params)),
        "stats.student" => require_store(store).and_then(|s| student_stats(s, &req.params)),
        "stats.school" => require_store(store).and_then(school_stats),
        "insights.pulse" => pulse(state, &req.params),
        "insights.strategic" => strategic(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
