//! Role-gated sessions. Credentials are checked against the evaluator
//! roster's stored hashes; each role maps to a fixed capability set.

use serde::{Deserialize, Serialize};

use crate::roster::{self, EvaluatorAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessRole {
    Evaluator,
    Viewer,
    Administrator,
}

impl AccessRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessRole::Evaluator => "Evaluator",
            AccessRole::Viewer => "Viewer",
            AccessRole::Administrator => "Administrator",
        }
    }

    /// Accepts the spellings found in stored rosters ("Super Administrator",
    /// "Super_Administrator") alongside the canonical names.
    pub fn parse(raw: &str) -> Option<AccessRole> {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "evaluator" => Some(AccessRole::Evaluator),
            "viewer" => Some(AccessRole::Viewer),
            _ if lower.contains("admin") => Some(AccessRole::Administrator),
            _ => None,
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            AccessRole::Evaluator => {
                &[Capability::SubmitAssessments, Capability::ViewReports]
            }
            AccessRole::Viewer => &[Capability::ViewReports],
            AccessRole::Administrator => {
                &[Capability::ViewReports, Capability::ManageEvaluators]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    SubmitAssessments,
    ViewReports,
    ManageEvaluators,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub full_name: String,
    pub role: AccessRole,
}

impl Session {
    pub fn allows(&self, capability: Capability) -> bool {
        self.role.capabilities().contains(&capability)
    }
}

/// A single failure code for every credential problem; the caller learns
/// nothing about which part was wrong.
pub fn login(
    accounts: &[EvaluatorAccount],
    role: AccessRole,
    username: &str,
    password: &str,
) -> Result<Session, String> {
    let account = roster::find(accounts, username)
        .ok_or_else(|| "invalid login credentials".to_string())?;
    if !roster::verify_password(password, &account.password_hash) {
        return Err("invalid login credentials".to_string());
    }
    if AccessRole::parse(&account.role) != Some(role) {
        return Err("invalid login credentials".to_string());
    }
    Ok(Session {
        username: account.username.clone(),
        full_name: account.full_name.clone(),
        role,
    })
}
