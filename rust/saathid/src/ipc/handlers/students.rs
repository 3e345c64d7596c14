use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_nonempty_str, get_optional_str, require_store, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::mutate::{self, NewStudent};
use crate::query;
use crate::seed::SCHOOL_ID;
use crate::store::RecordStore;
use serde_json::json;

fn students_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    Ok(json!({ "students": query::students(store, class_id.as_deref()) }))
}

fn students_search(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    let q = params.get("query").and_then(|v| v.as_str()).unwrap_or("");
    Ok(json!({ "students": query::search_students(store, class_id.as_deref(), q) }))
}

fn students_create(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_nonempty_str(params, "name")?;
    let roll_number = get_nonempty_str(params, "rollNumber")?;
    let class_id = get_nonempty_str(params, "classId")?;
    if query::class(store, &class_id).is_none() {
        return Err(HandlerErr::not_found("class", &class_id));
    }
    let school_id = get_optional_str(params, "schoolId").unwrap_or_else(|| SCHOOL_ID.to_string());
    let parent_phone = get_optional_str(params, "parentPhone");

    let student = mutate::add_student(
        store,
        NewStudent {
            name,
            roll_number,
            class_id,
            school_id,
            parent_phone,
        },
    )
    .map_err(HandlerErr::write_failed)?;
    Ok(json!({ "student": to_json(&student) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let result = match req.method.as_str() {
        "students.list" => require_store(store).and_then(|s| students_list(s, &req.params)),
        "students.search" => require_store(store).and_then(|s| students_search(s, &req.params)),
        "students.create" => require_store(store).and_then(|s| students_create(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
