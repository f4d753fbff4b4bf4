use crate::auth::{self, AccessRole};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, workspace_paths};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let role_raw = match required_str(req, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(role) = AccessRole::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            "role must be one of: Evaluator, Viewer, Administrator",
            None,
        );
    };

    let accounts = roster::load(&paths.evaluators);
    match auth::login(&accounts, role, &username, &password) {
        Ok(session) => {
            tracing::info!(username = %session.username, role = session.role.as_str(), "login");
            let body = json!({ "session": &session });
            state.session = Some(session);
            ok(&req.id, body)
        }
        Err(message) => {
            tracing::warn!(username = %username, "rejected login");
            err(&req.id, "invalid_credentials", message, None)
        }
    }
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "session": &state.session }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    ok(&req.id, json!({ "loggedOut": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
