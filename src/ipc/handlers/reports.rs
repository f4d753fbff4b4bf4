use crate::auth::Capability;
use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{optional_str, require_capability, required_str, workspace_paths};
use crate::ipc::types::{AppState, Request};
use crate::report;
use crate::roster;
use crate::store;
use serde_json::json;

fn generated_on() -> String {
    chrono::Local::now().format("%d-%m-%Y %I:%M %p").to_string()
}

fn handle_trainer_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let rows: Vec<_> = store::read_all(&paths.records)
        .into_iter()
        .filter(|row| row.trainer_id == trainer_id)
        .collect();
    let csv = match report::to_csv_text(&rows) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "render_failed", format!("{e:#}"), None),
    };
    if let Some(out_path) = optional_str(req, "outPath") {
        if let Err(e) = std::fs::write(&out_path, csv.as_bytes()) {
            return err(&req.id, "write_failed", format!("{e}"), None);
        }
    }
    ok(&req.id, json!({ "csv": csv, "rowCount": rows.len() }))
}

fn handle_trainer_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let rows: Vec<_> = store::read_all(&paths.records)
        .into_iter()
        .filter(|row| row.trainer_id == trainer_id)
        .collect();
    if rows.is_empty() {
        return err(
            &req.id,
            "not_found",
            "no assessment records for this trainer",
            None,
        );
    }
    let bytes = match report::trainer_document(&rows, &generated_on()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "render_failed", format!("{e:#}"), None),
    };
    if let Err(e) = std::fs::write(&out_path, &bytes) {
        return err(&req.id, "write_failed", format!("{e}"), None);
    }
    tracing::info!(trainer_id = %trainer_id, out_path = %out_path, "trainer report exported");
    ok(&req.id, json!({ "outPath": out_path, "bytes": bytes.len() }))
}

fn handle_overview_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::ManageEvaluators) {
        return resp;
    }
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let out_path = match required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let evaluators = roster::load(&paths.evaluators);
    let trainers = directory::load(&paths.trainers);
    let bytes = match report::overview_document(&evaluators, &trainers, &generated_on()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "render_failed", format!("{e:#}"), None),
    };
    if let Err(e) = std::fs::write(&out_path, &bytes) {
        return err(&req.id, "write_failed", format!("{e}"), None);
    }
    ok(&req.id, json!({ "outPath": out_path, "bytes": bytes.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.trainerCsv" => Some(handle_trainer_csv(state, req)),
        "reports.trainerPdf" => Some(handle_trainer_pdf(state, req)),
        "reports.overviewPdf" => Some(handle_overview_pdf(state, req)),
        _ => None,
    }
}
