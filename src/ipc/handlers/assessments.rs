use crate::auth::Capability;
use crate::directory;
use crate::engine::{self, AssessmentRow, LevelGate, SubmissionDraft};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_capability, required_str, workspace_paths};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn trainer_history(all_rows: Vec<AssessmentRow>, trainer_id: &str) -> Vec<AssessmentRow> {
    all_rows
        .into_iter()
        .filter(|row| row.trainer_id == trainer_id)
        .collect()
}

fn handle_history(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let rows = trainer_history(store::read_all(&paths.records), &trainer_id);
    let count = rows.len();
    ok(&req.id, json!({ "rows": rows, "count": count }))
}

fn handle_gates(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let history = trainer_history(store::read_all(&paths.records), &trainer_id);

    let levels: Vec<serde_json::Value> = engine::Level::all()
        .into_iter()
        .map(|level| {
            let review = engine::level_review(&history, level);
            json!({
                "level": level.number(),
                "state": engine::gate_state(&history, level),
                "unlocked": engine::is_level_unlocked(&history, level),
                "qualified": review.qualified,
                "hasTechnical": review.has_technical,
                "hasOperations": review.has_operations,
                "distinctEvaluators": review.distinct_evaluators,
                "qualifyingAverage": level.qualifying_average(),
            })
        })
        .collect();

    ok(&req.id, json!({ "trainerId": trainer_id, "levels": levels }))
}

/// The submission path: parse the draft, check shape and bounds, confirm the
/// trainer is registered and the level open, adjudicate the proposed outcome,
/// then persist exactly one row.
fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_capability(state, req, Capability::SubmitAssessments) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let paths = match workspace_paths(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(draft_value) = req.params.get("draft") else {
        return err(&req.id, "bad_params", "missing params.draft", None);
    };
    let mut draft: SubmissionDraft = match serde_json::from_value(draft_value.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("{e}"), None),
    };
    draft.evaluator_username = session.username.clone();

    if let Err(e) = engine::check_draft(&draft) {
        return err(&req.id, &e.code, e.message, None);
    }
    let Some(trainer) = directory::lookup(&paths.trainers, draft.trainer_id.trim()) else {
        return err(&req.id, "not_found", "trainer is not registered", None);
    };

    let history = trainer_history(store::read_all(&paths.records), draft.trainer_id.trim());
    if engine::gate_state(&history, draft.level) == LevelGate::QualifiedFull {
        return err(
            &req.id,
            "already_qualified",
            format!("{} is already qualified by both evaluators", draft.level.tag()),
            None,
        );
    }
    if !engine::is_level_unlocked(&history, draft.level) {
        return err(
            &req.id,
            "level_locked",
            format!("{} is locked, complete the previous level first", draft.level.tag()),
            None,
        );
    }

    let validated = engine::validate_submission(&draft, &history);
    for warning in &validated.warnings {
        tracing::warn!(
            trainer_id = %draft.trainer_id,
            level = draft.level.number(),
            "{}",
            warning.message(draft.level)
        );
    }

    let today = chrono::Local::now().date_naive();
    let row = engine::build_row(
        &draft,
        validated.outcome,
        &history,
        today,
        &trainer.name,
        &trainer.department,
        &trainer.branch,
    );
    if let Err(e) = store::append_or_update_last(&paths.records, &row) {
        return err(&req.id, "store_unavailable", format!("{e:#}"), None);
    }
    tracing::info!(
        trainer_id = %row.trainer_id,
        level = draft.level.number(),
        outcome = validated.outcome.as_str(),
        "assessment saved"
    );

    let warnings: Vec<serde_json::Value> = validated
        .warnings
        .iter()
        .map(|warning| {
            let mut value = serde_json::to_value(warning).expect("serialize warning");
            value["message"] = json!(warning.message(draft.level));
            value
        })
        .collect();

    ok(
        &req.id,
        json!({
            "trainerId": row.trainer_id,
            "level": draft.level.number(),
            "finalStatus": validated.outcome.as_str(),
            "levelTotal": validated.level_total,
            "levelAverage": validated.level_average,
            "levelPercent": validated.level_percent,
            "warnings": warnings,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assessment.history" => Some(handle_history(state, req)),
        "assessment.gates" => Some(handle_gates(state, req)),
        "assessment.submit" => Some(handle_submit(state, req)),
        _ => None,
    }
}
