use std::path::PathBuf;

use serde::Deserialize;

use crate::auth::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub session: Option<Session>,
}

/// The three flat files living inside a selected workspace.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub records: PathBuf,
    pub trainers: PathBuf,
    pub evaluators: PathBuf,
}

impl AppState {
    pub fn paths(&self) -> Option<WorkspacePaths> {
        self.workspace.as_ref().map(|root| WorkspacePaths {
            records: root.join("assessment_data.csv"),
            trainers: root.join("trainers.csv"),
            evaluators: root.join("evaluators.csv"),
        })
    }
}
