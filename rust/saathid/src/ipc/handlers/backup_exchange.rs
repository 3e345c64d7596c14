use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_nonempty_str, no_workspace, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use serde_json::json;
use std::path::PathBuf;

fn store_export(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    let out_path = PathBuf::from(get_nonempty_str(params, "path")?);
    // A snapshot must not carry rows whose worker it cannot bring along.
    state.enhancements.flush(store);
    let records = store
        .snapshot()
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{e:#}")))?;
    let summary = backup::export_snapshot(&records, &out_path)
        .map_err(|e| HandlerErr::new("snapshot_failed", format!("{e:#}")))?;
    tracing::info!(path = %out_path.to_string_lossy(), records = summary.record_count, "exported records");
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "format": summary.snapshot_format,
        "recordCount": summary.record_count,
        "sha256": summary.sha256,
    }))
}

fn store_import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let in_path = PathBuf::from(get_nonempty_str(params, "path")?);
    if state.store.is_none() {
        return Err(no_workspace());
    }
    let imported = backup::import_snapshot(&in_path).map_err(|e| {
        tracing::warn!(path = %in_path.to_string_lossy(), error = %e, "snapshot rejected");
        HandlerErr::new("snapshot_failed", format!("{e:#}"))
    })?;
    // Pending rows from the old data would have nowhere to land.
    if let Some(store) = state.store.as_ref() {
        state.enhancements.flush(store);
    }
    let store = state.store.as_mut().ok_or_else(no_workspace)?;
    store
        .restore(&imported.records)
        .map_err(HandlerErr::write_failed)?;
    let settled = state.enhancements.settle_orphans(store);
    tracing::info!(records = imported.records.len(), "imported records");
    Ok(json!({
        "format": imported.snapshot_format,
        "recordCount": imported.records.len(),
        "settledFeedback": settled,
    }))
}

fn store_reset(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let store = state.store.as_ref().ok_or_else(no_workspace)?;
    state.enhancements.flush(store);
    store.clear().map_err(HandlerErr::write_failed)?;
    let seeded = seed::initialize(store).map_err(HandlerErr::write_failed)?;
    Ok(json!({ "seeded": seeded }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "store.export" => store_export(state, &req.params),
        "store.import" => store_import(state, &req.params),
        "store.reset" => store_reset(state),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
