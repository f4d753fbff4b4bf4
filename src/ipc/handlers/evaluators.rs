use crate::auth::{AccessRole, Capability};
use crate::email;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, require_capability, required_str, workspace_paths};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, EvaluatorAccount};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ManageEvaluators) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let accounts = roster::load(&paths.evaluators);
    let count = accounts.len();
    ok(&req.id, json!({ "evaluators": accounts, "count": count }))
}

/// Creates an account. While the roster is still empty no session is needed,
/// so the very first administrator can be set up; every later creation needs
/// the ManageEvaluators capability.
fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut accounts = roster::load(&paths.evaluators);
    if !accounts.is_empty() {
        if let Err(resp) = require_capability(state, req, Capability::ManageEvaluators) {
            return resp;
        }
    }

    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let role_raw = match required_str(req, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if username.trim().is_empty() || password.is_empty() {
        return err(
            &req.id,
            "validation_failed",
            "username and password are required",
            None,
        );
    }
    let Some(role) = AccessRole::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            "role must be one of: Evaluator, Viewer, Administrator",
            None,
        );
    };
    if roster::find(&accounts, &username).is_some() {
        return err(&req.id, "validation_failed", "username already exists", None);
    }
    let email_address = optional_str(req, "email").unwrap_or_default();
    if !email_address.is_empty() && !email::is_deliverable(&email_address) {
        return err(&req.id, "validation_failed", "invalid evaluator email", None);
    }

    let account = EvaluatorAccount {
        username: username.clone(),
        password_hash: roster::hash_password(&password),
        full_name: optional_str(req, "fullName").unwrap_or_default(),
        email: email_address,
        role: role.as_str().to_string(),
        created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    accounts.push(account);
    if let Err(e) = roster::save(&paths.evaluators, &accounts) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    tracing::info!(username = %username, role = role.as_str(), "evaluator added");
    ok(&req.id, json!({ "username": username, "role": role.as_str() }))
}

/// Username is immutable; everything else may change, the password only when
/// a new one is supplied.
fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ManageEvaluators) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut accounts = roster::load(&paths.evaluators);
    let Some(account) = accounts.iter_mut().find(|a| a.username == username) else {
        return err(&req.id, "not_found", "evaluator not found", None);
    };

    if let Some(full_name) = optional_str(req, "fullName") {
        account.full_name = full_name;
    }
    if let Some(email_address) = optional_str(req, "email") {
        if !email_address.is_empty() && !email::is_deliverable(&email_address) {
            return err(&req.id, "validation_failed", "invalid evaluator email", None);
        }
        account.email = email_address;
    }
    if let Some(role_raw) = optional_str(req, "role") {
        let Some(role) = AccessRole::parse(&role_raw) else {
            return err(
                &req.id,
                "bad_params",
                "role must be one of: Evaluator, Viewer, Administrator",
                None,
            );
        };
        account.role = role.as_str().to_string();
    }
    if let Some(password) = optional_str(req, "password") {
        if !password.is_empty() {
            account.password_hash = roster::hash_password(&password);
        }
    }

    if let Err(e) = roster::save(&paths.evaluators, &accounts) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    ok(&req.id, json!({ "username": username }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ManageEvaluators) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let username = match required_str(req, "username") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut accounts = roster::load(&paths.evaluators);
    let before = accounts.len();
    accounts.retain(|a| a.username != username);
    if accounts.len() == before {
        return err(&req.id, "not_found", "evaluator not found", None);
    }
    if let Err(e) = roster::save(&paths.evaluators, &accounts) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    tracing::info!(username = %username, "evaluator deleted");
    ok(&req.id, json!({ "deleted": username }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "evaluators.list" => Some(handle_list(state, req)),
        "evaluators.create" => Some(handle_create(state, req)),
        "evaluators.update" => Some(handle_update(state, req)),
        "evaluators.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
