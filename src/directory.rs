//! Trainer directory: the flat identity table behind trainer lookups and the
//! sequential TR00{n} auto-ID.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const TRAINER_COLUMNS: [&str; 5] =
    ["Trainer ID", "Trainer Name", "Department", "Branch", "Email"];

const AUTO_ID_PREFIX: &str = "TR00";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerRecord {
    pub trainer_id: String,
    pub name: String,
    pub department: String,
    pub branch: String,
    pub email: String,
}

pub fn load(path: &Path) -> Vec<TrainerRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "trainer directory unreadable, treating as empty");
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

    let mut records = Vec::new();
    for record in reader.records().flatten() {
        let get = |column: &str| -> String {
            index
                .get(column)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
                .to_string()
        };
        records.push(TrainerRecord {
            trainer_id: get("Trainer ID"),
            name: get("Trainer Name"),
            department: get("Department"),
            branch: get("Branch"),
            email: get("Email"),
        });
    }
    records
}

pub fn save(path: &Path, records: &[TrainerRecord]) -> anyhow::Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer.write_record(TRAINER_COLUMNS)?;
        for record in records {
            writer.write_record([
                record.trainer_id.as_str(),
                record.name.as_str(),
                record.department.as_str(),
                record.branch.as_str(),
                record.email.as_str(),
            ])?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub fn lookup(path: &Path, trainer_id: &str) -> Option<TrainerRecord> {
    load(path)
        .into_iter()
        .find(|record| record.trainer_id == trainer_id)
}

/// Replaces the record with the same ID, else appends. Trainers are never
/// deleted.
pub fn upsert(path: &Path, record: TrainerRecord) -> anyhow::Result<()> {
    let mut records = load(path);
    match records
        .iter()
        .position(|existing| existing.trainer_id == record.trainer_id)
    {
        Some(i) => records[i] = record,
        None => records.push(record),
    }
    save(path, &records)
}

/// Next sequential ID: `TR00{max numeric suffix + 1}`, `TR001` when no
/// numbered IDs exist yet.
pub fn next_auto_id(records: &[TrainerRecord]) -> String {
    let max = records
        .iter()
        .filter_map(|record| record.trainer_id.strip_prefix(AUTO_ID_PREFIX))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{}", AUTO_ID_PREFIX, max + 1)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerFilter {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub search: String,
}

/// Branch and department filter exactly; the search term matches name or ID,
/// case-insensitive.
pub fn filtered(records: &[TrainerRecord], filter: &TrainerFilter) -> Vec<TrainerRecord> {
    let search = filter.search.to_lowercase();
    records
        .iter()
        .filter(|record| filter.branch.is_empty() || record.branch == filter.branch)
        .filter(|record| filter.department.is_empty() || record.department == filter.department)
        .filter(|record| {
            search.is_empty()
                || record.name.to_lowercase().contains(&search)
                || record.trainer_id.to_lowercase().contains(&search)
        })
        .cloned()
        .collect()
}
