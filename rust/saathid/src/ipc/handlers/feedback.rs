use crate::enhance::{EnhancementQueue, SubmitError, SubmitMode};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_language, get_nonempty_str, get_optional_str, require_store, to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::mutate::NewFeedback;
use crate::query;
use crate::session;
use crate::store::RecordStore;
use serde_json::json;

const UNKNOWN_TEACHER: &str = "current_teacher";

fn feedback_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_optional_str(params, "studentId");
    Ok(json!({ "feedback": query::feedback(store, student_id.as_deref()) }))
}

fn feedback_submit(
    store: &RecordStore,
    queue: &mut EnhancementQueue,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_nonempty_str(params, "studentId")?;
    let comment = get_nonempty_str(params, "comment")?;
    if query::student(store, &student_id).is_none() {
        return Err(HandlerErr::not_found("student", &student_id));
    }
    let mode = match get_optional_str(params, "mode") {
        Some(m) => SubmitMode::parse(&m)
            .ok_or_else(|| HandlerErr::bad_params("mode must be await or background"))?,
        None => SubmitMode::Await,
    };

    let user = session::current_user(store);
    let teacher_id = get_optional_str(params, "teacherId")
        .or_else(|| user.as_ref().map(|u| u.id.clone()))
        .unwrap_or_else(|| UNKNOWN_TEACHER.to_string());
    let lang = get_language(params, user.and_then(|u| u.language));

    let new = NewFeedback {
        student_id,
        teacher_id,
        month: get_optional_str(params, "month"),
        comment,
    };
    let fb = queue.submit(store, new, lang, mode).map_err(|e| match e {
        SubmitError::Pending(sid) => HandlerErr::new(
            "enhancement_pending",
            "previous feedback for this student is still being enhanced",
        )
        .with_details(json!({ "studentId": sid })),
        SubmitError::Store(inner) => HandlerErr::write_failed(inner),
    })?;
    Ok(json!({ "feedback": to_json(&fb) }))
}

fn feedback_flush(store: &RecordStore, queue: &mut EnhancementQueue) -> Result<serde_json::Value, HandlerErr> {
    let applied = queue.flush(store);
    Ok(json!({ "applied": applied, "pending": queue.pending_count() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let queue = &mut state.enhancements;
    let result = match req.method.as_str() {
        "feedback.list" => require_store(store).and_then(|s| feedback_list(s, &req.params)),
        "feedback.submit" => require_store(store).and_then(|s| feedback_submit(s, queue, &req.params)),
        "feedback.flush" => require_store(store).and_then(|s| feedback_flush(s, queue)),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
