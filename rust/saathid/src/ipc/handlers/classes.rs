use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_nonempty_str, get_optional_str, require_store, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::mutate::{self, NewTest};
use crate::query;
use crate::store::RecordStore;
use serde_json::json;

fn school_get(store: &RecordStore) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "school": query::school(store) }))
}

fn classes_list(store: &RecordStore) -> Result<serde_json::Value, HandlerErr> {
    // Counts let the host render the overview without extra calls.
    let students = query::students(store, None);
    let tests = query::tests(store, None);
    let classes: Vec<serde_json::Value> = query::classes(store)
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": students.iter().filter(|s| s.class_id == c.id).count(),
                "testCount": tests.iter().filter(|t| t.class_id == c.id).count(),
            })
        })
        .collect();
    Ok(json!({ "classes": classes }))
}

fn subjects_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    Ok(json!({ "subjects": query::subjects(store, class_id.as_deref()) }))
}

fn tests_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_optional_str(params, "classId");
    Ok(json!({ "tests": query::tests(store, class_id.as_deref()) }))
}

fn tests_create(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_nonempty_str(params, "name")?;
    let class_id = get_nonempty_str(params, "classId")?;
    if query::class(store, &class_id).is_none() {
        return Err(HandlerErr::not_found("class", &class_id));
    }
    let max_marks = params
        .get("maxMarks")
        .map(mutate::coerce_marks)
        .ok_or_else(|| HandlerErr::bad_params("missing maxMarks"))?;
    let date = get_optional_str(params, "date");
    if let Some(d) = date.as_deref() {
        if !mutate::is_valid_date(d) {
            return Err(HandlerErr::bad_params("date must be YYYY-MM-DD"));
        }
    }

    let test = mutate::add_test(
        store,
        NewTest {
            name,
            class_id,
            max_marks,
            date,
        },
    )
    .map_err(HandlerErr::write_failed)?;
    Ok(json!({ "test": to_json(&test) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let result = match req.method.as_str() {
        "school.get" => require_store(store).and_then(school_get),
        "classes.list" => require_store(store).and_then(classes_list),
        "subjects.list" => require_store(store).and_then(|s| subjects_list(s, &req.params)),
        "tests.list" => require_store(store).and_then(|s| tests_list(s, &req.params)),
        "tests.create" => require_store(store).and_then(|s| tests_create(s, &req.params)),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
