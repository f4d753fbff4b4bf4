use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "loggedIn": state.session.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    if let Err(e) = std::fs::create_dir_all(&path) {
        return err(&req.id, "workspace_open_failed", format!("{e}"), None);
    }
    state.workspace = Some(path.clone());

    let paths = state.paths().expect("workspace just set");
    let record_count = store::read_all(&paths.records).len();
    let trainer_count = directory::load(&paths.trainers).len();
    tracing::info!(workspace = %path.display(), record_count, trainer_count, "workspace selected");

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "recordCount": record_count,
            "trainerCount": trainer_count,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
