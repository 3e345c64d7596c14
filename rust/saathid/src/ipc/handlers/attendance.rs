use crate::ipc::error::ok;
use crate::ipc::helpers::{get_nonempty_str, get_optional_str, require_store, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::mutate::{self, AttendanceEntry};
use crate::query;
use crate::store::RecordStore;
use serde_json::json;
use std::collections::HashMap;

fn parse_status(v: Option<&serde_json::Value>, at: &str) -> Result<AttendanceStatus, HandlerErr> {
    let Some(s) = v.and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params(format!("{} missing status", at)));
    };
    AttendanceStatus::parse(s).ok_or_else(|| {
        HandlerErr::bad_params(format!("{} status must be PRESENT or ABSENT", at))
            .with_details(json!({ "status": s }))
    })
}

fn parse_date(raw: &str) -> Result<String, HandlerErr> {
    if !mutate::is_valid_date(raw) {
        return Err(HandlerErr::bad_params("date must be YYYY-MM-DD").with_details(json!({ "date": raw })));
    }
    Ok(raw.to_string())
}

fn attendance_list(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_optional_str(params, "studentId");
    let date = get_optional_str(params, "date");
    let records: Vec<_> = query::attendance(store, student_id.as_deref())
        .into_iter()
        .filter(|r| date.as_deref().map_or(true, |d| r.date == d))
        .collect();
    Ok(json!({ "records": records }))
}

fn attendance_save(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let rows = params
        .get("records")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing records"))?;
    let mut entries = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let at = format!("records[{}]", i);
        let student_id = get_optional_str(row, "studentId")
            .ok_or_else(|| HandlerErr::bad_params(format!("{} missing studentId", at)))?;
        let date = get_optional_str(row, "date")
            .ok_or_else(|| HandlerErr::bad_params(format!("{} missing date", at)))?;
        entries.push(AttendanceEntry {
            student_id,
            date: parse_date(&date)?,
            status: parse_status(row.get("status"), &at)?,
        });
    }
    let summary = mutate::save_attendance(store, entries).map_err(HandlerErr::write_failed)?;
    Ok(to_json(&summary))
}

fn attendance_save_class(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_nonempty_str(params, "classId")?;
    if query::class(store, &class_id).is_none() {
        return Err(HandlerErr::not_found("class", &class_id));
    }
    let date = match get_optional_str(params, "date") {
        Some(d) => parse_date(&d)?,
        None => mutate::today(),
    };

    let mut overrides: HashMap<String, AttendanceStatus> = HashMap::new();
    if let Some(map) = params.get("statuses").and_then(|v| v.as_object()) {
        for (sid, v) in map {
            let status = parse_status(Some(v), &format!("statuses.{}", sid))?;
            overrides.insert(sid.clone(), status);
        }
    }

    let summary = mutate::mark_class_attendance(store, &class_id, &date, &overrides)
        .map_err(HandlerErr::write_failed)?;
    Ok(json!({
        "classId": class_id,
        "date": date,
        "inserted": summary.inserted,
        "updated": summary.updated,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = state.store.as_ref();
    let result = match req.method.as_str() {
        "attendance.list" => require_store(store).and_then(|s| attendance_list(s, &req.params)),
        "attendance.save" => require_store(store).and_then(|s| attendance_save(s, &req.params)),
        "attendance.saveClass" => {
            require_store(store).and_then(|s| attendance_save_class(s, &req.params))
        }
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
