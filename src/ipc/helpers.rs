use super::error::err;
use super::types::{AppState, Request, WorkspacePaths};
use crate::auth::{Capability, Session};
use crate::engine::Level;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

pub fn required_level(req: &Request) -> Result<Level, serde_json::Value> {
    req.params
        .get("level")
        .and_then(|v| v.as_u64())
        .and_then(|n| u8::try_from(n).ok())
        .and_then(|n| Level::try_from(n).ok())
        .ok_or_else(|| err(&req.id, "bad_params", "level must be 1, 2 or 3", None))
}

pub fn workspace_paths(state: &AppState, req: &Request) -> Result<WorkspacePaths, serde_json::Value> {
    state
        .paths()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn require_capability(
    state: &AppState,
    req: &Request,
    capability: Capability,
) -> Result<Session, serde_json::Value> {
    let Some(session) = state.session.as_ref() else {
        return Err(err(&req.id, "not_logged_in", "login first", None));
    };
    if !session.allows(capability) {
        return Err(err(
            &req.id,
            "forbidden",
            format!("the {} role cannot do this", session.role.as_str()),
            None,
        ));
    }
    Ok(session.clone())
}
