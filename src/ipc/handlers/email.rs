use crate::auth::Capability;
use crate::directory;
use crate::email;
use crate::engine::{self, AssessmentRow, LevelGate};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    optional_str, require_capability, required_level, required_str, workspace_paths,
};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

/// Reminder mail works from the trainer's latest stored row; before any
/// submission exists it falls back to a bare identity row from the directory.
fn handle_reminder(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::SubmitAssessments) {
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
    let level = match required_level(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let recipient = match required_str(req, "recipient") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !email::is_deliverable(&recipient) {
        return err(
            &req.id,
            "validation_failed",
            "recipient email must contain '@'",
            None,
        );
    }
    let reminder_text = optional_str(req, "reminder").unwrap_or_default();

    let Some(trainer) = directory::lookup(&paths.trainers, &trainer_id) else {
        return err(&req.id, "not_found", "trainer not found", None);
    };
    let row = store::read_all(&paths.records)
        .into_iter()
        .filter(|row| row.trainer_id == trainer_id)
        .last()
        .unwrap_or_else(|| AssessmentRow {
            trainer_id: trainer.trainer_id.clone(),
            trainer_name: trainer.name.clone(),
            department: trainer.department.clone(),
            branch: trainer.branch.clone(),
            assessment_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            ..Default::default()
        });

    let message = email::reminder(&recipient, &row, level, &reminder_text);
    ok(&req.id, json!({ "message": message }))
}

/// Score cards only go out for a fully qualified level; sending marks the
/// level's score-card flag on the trainer's latest row.
fn handle_score_card(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = require_capability(state, req, Capability::SubmitAssessments) {
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
    let level = match required_level(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(trainer) = directory::lookup(&paths.trainers, &trainer_id) else {
        return err(&req.id, "not_found", "trainer not found", None);
    };
    let recipient = optional_str(req, "recipient").unwrap_or_else(|| trainer.email.clone());
    if !email::is_deliverable(&recipient) {
        return err(
            &req.id,
            "validation_failed",
            "no valid trainer email on record",
            None,
        );
    }

    let history: Vec<AssessmentRow> = store::read_all(&paths.records)
        .into_iter()
        .filter(|row| row.trainer_id == trainer_id)
        .collect();
    if engine::gate_state(&history, level) != LevelGate::QualifiedFull {
        return err(
            &req.id,
            "score_card_unavailable",
            format!("{} is not yet qualified by both evaluators", level.tag()),
            None,
        );
    }
    let Some(last) = history.last() else {
        return err(&req.id, "not_found", "no assessment records for this trainer", None);
    };

    let message = email::score_card(&recipient, last, level);

    let mut updated = last.clone();
    updated.level_mut(level).score_card_sent = true;
    if let Err(e) = store::append_or_update_last(&paths.records, &updated) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    tracing::info!(trainer_id = %trainer_id, level = level.number(), "score card prepared");

    ok(
        &req.id,
        json!({ "message": message, "scoreCardStatus": crate::schema::SCORE_CARD_SENT }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "email.reminder" => Some(handle_reminder(state, req)),
        "email.scoreCard" => Some(handle_score_card(state, req)),
        _ => None,
    }
}
