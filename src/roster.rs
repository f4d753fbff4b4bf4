//! Evaluator roster: the accounts that may log in. Passwords are stored as
//! SHA-256 hex digests, never in the clear.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

pub const EVALUATOR_COLUMNS: [&str; 6] = [
    "username",
    "password_hash",
    "full_name",
    "email",
    "role",
    "created_at",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorAccount {
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{:x}", digest)
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    !stored_hash.is_empty() && hash_password(password) == stored_hash
}

pub fn load(path: &Path) -> Vec<EvaluatorAccount> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "evaluator roster unreadable, treating as empty");
            return Vec::new();
        }
    };
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(_) => return Vec::new(),
    };
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let mut accounts = Vec::new();
    for record in reader.records().flatten() {
        let get = |column: &str| -> String {
            index
                .get(column)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
                .to_string()
        };
        accounts.push(EvaluatorAccount {
            username: get("username"),
            password_hash: get("password_hash"),
            full_name: get("full_name"),
            email: get("email"),
            role: get("role"),
            created_at: get("created_at"),
        });
    }
    accounts
}

pub fn save(path: &Path, accounts: &[EvaluatorAccount]) -> anyhow::Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer.write_record(EVALUATOR_COLUMNS)?;
        for account in accounts {
            writer.write_record([
                account.username.as_str(),
                account.password_hash.as_str(),
                account.full_name.as_str(),
                account.email.as_str(),
                account.role.as_str(),
                account.created_at.as_str(),
            ])?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub fn find<'a>(accounts: &'a [EvaluatorAccount], username: &str) -> Option<&'a EvaluatorAccount> {
    accounts.iter().find(|account| account.username == username)
}
