use crate::auth::Capability;
use crate::directory::{self, TrainerFilter, TrainerRecord};
use crate::email;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, require_capability, required_str, workspace_paths};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ViewReports) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filter: TrainerFilter = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("{e}"), None),
    };
    let records = directory::load(&paths.trainers);
    let hits = directory::filtered(&records, &filter);
    let count = hits.len();
    ok(&req.id, json!({ "trainers": hits, "count": count }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ViewReports) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let trainer_id = match required_str(req, "trainerId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match directory::lookup(&paths.trainers, &trainer_id) {
        Some(record) => ok(&req.id, json!({ "trainer": record })),
        None => err(&req.id, "not_found", "trainer not found", None),
    }
}

/// Registers a trainer. With no explicit ID, the name, department and email
/// must all be present before a sequential ID is minted; otherwise nothing is
/// written.
fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::SubmitAssessments) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let trainer_id = optional_str(req, "trainerId").unwrap_or_default();
    let name = optional_str(req, "name").unwrap_or_default();
    let department = optional_str(req, "department").unwrap_or_default();
    let branch = optional_str(req, "branch").unwrap_or_default();
    let email_address = optional_str(req, "email").unwrap_or_default();

    if !email_address.is_empty() && !email::is_deliverable(&email_address) {
        return err(&req.id, "validation_failed", "invalid trainer email", None);
    }

    let records = directory::load(&paths.trainers);
    let (trainer_id, generated) = if trainer_id.trim().is_empty() {
        if name.trim().is_empty() || department.trim().is_empty() || email_address.trim().is_empty()
        {
            return err(
                &req.id,
                "validation_failed",
                "trainer name, department and email are required to auto-generate a trainer id",
                None,
            );
        }
        (directory::next_auto_id(&records), true)
    } else {
        (trainer_id.trim().to_string(), false)
    };

    let record = TrainerRecord {
        trainer_id: trainer_id.clone(),
        name,
        department,
        branch,
        email: email_address,
    };
    if let Err(e) = directory::upsert(&paths.trainers, record.clone()) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    tracing::info!(trainer_id = %trainer_id, generated, "trainer registered");
    ok(&req.id, json!({ "trainer": record, "generated": generated }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "trainers.list" => Some(handle_list(state, req)),
        "trainers.get" => Some(handle_get(state, req)),
        "trainers.create" => Some(handle_create(state, req)),
        _ => None,
    }
}
