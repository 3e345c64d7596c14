use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_str, get_required_str, require_store, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{Language, User};
use crate::session::{self, LoginError};
use crate::store::RecordStore;
use serde_json::json;

fn user_json(user: Option<&User>) -> serde_json::Value {
    match user {
        Some(u) => json!({
            "user": to_json(u),
            "views": session::views_for_role(u.role),
        }),
        None => json!({ "user": null, "views": [] }),
    }
}

fn login(store: &RecordStore, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let kind = get_optional_str(params, "kind").unwrap_or_else(|| "staff".to_string());
    let user = match kind.as_str() {
        "staff" => {
            let username = get_required_str(params, "username")?;
            let password = params
                .get("password")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            session::staff_login(&username, password)
        }
        "parent" => {
            let phone = get_required_str(params, "phone")?;
            session::parent_login(store, &phone)
        }
        other => {
            return Err(HandlerErr::bad_params(format!(
                "kind must be staff or parent, got {}",
                other
            )))
        }
    };
    let user = user.map_err(|e| match e {
        LoginError::InvalidCredentials => HandlerErr::new("invalid_credentials", e.to_string()),
        LoginError::InvalidPhone => HandlerErr::bad_params(e.to_string()),
    })?;
    let lang = get_optional_str(params, "language").map(|t| Language::from_tag(&t));
    let user = session::with_language(user, lang);

    session::set_current_user(store, Some(&user)).map_err(HandlerErr::write_failed)?;
    tracing::info!(user = %user.id, role = ?user.role, "signed in");
    Ok(user_json(Some(&user)))
}

fn logout(store: &RecordStore) -> Result<serde_json::Value, HandlerErr> {
    session::set_current_user(store, None).map_err(HandlerErr::write_failed)?;
    Ok(user_json(None))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.login" => require_store(state.store.as_ref()).and_then(|s| login(s, &req.params)),
        "session.current" => require_store(state.store.as_ref())
            .map(|s| user_json(session::current_user(s).as_ref())),
        "session.logout" => require_store(state.store.as_ref()).and_then(logout),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
