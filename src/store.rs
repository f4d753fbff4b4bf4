//! Record store: one wide CSV row per (trainer, evaluator, submission event).
//! Loading is by column name; columns absent in the file are synthesized as
//! empty strings. Saving rewrites the whole file through a temp-file rename.

use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

use crate::engine::{
    AssessmentRow, CourseStatus, Level, LevelOutcome, Parameter, COURSES_PER_LEVEL,
};
use crate::schema::{self, CourseField, LevelField};

/// Reads every assessment row. A missing file is the empty table; an
/// unreadable file or record is logged and skipped rather than aborting the
/// caller's request.
pub fn read_all(path: &Path) -> Vec<AssessmentRow> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "record store unreadable, treating as empty");
            return Vec::new();
        }
    };
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "record store header unreadable, treating as empty");
            return Vec::new();
        }
    };
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name, i))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(row_from_record(&index, &record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed record");
            }
        }
    }
    rows
}

/// Updates the most recent row matching the trainer and evaluator, else
/// appends. Keying by trainer alone would let the second evaluator's row
/// overwrite the first's, and a level can only qualify with both on file.
pub fn append_or_update_last(path: &Path, row: &AssessmentRow) -> anyhow::Result<()> {
    let mut rows = read_all(path);
    match rows.iter().rposition(|r| {
        r.trainer_id == row.trainer_id && r.evaluator_username == row.evaluator_username
    }) {
        Some(i) => rows[i] = row.clone(),
        None => rows.push(row.clone()),
    }
    write_all(path, &rows)
}

pub fn write_all(path: &Path, rows: &[AssessmentRow]) -> anyhow::Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer.write_record(schema::header().iter())?;
        for row in rows {
            writer.write_record(record_from_row(row).iter())?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

fn row_from_record(index: &HashMap<&str, usize>, record: &csv::StringRecord) -> AssessmentRow {
    let get = |column: &str| -> String {
        index
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .to_string()
    };

    let mut row = AssessmentRow {
        trainer_id: get(schema::TRAINER_ID),
        trainer_name: get(schema::TRAINER_NAME),
        department: get(schema::DEPARTMENT),
        branch: get(schema::BRANCH),
        assessment_date: get(schema::ASSESSMENT_DATE),
        evaluator_username: get(schema::EVALUATOR_USERNAME),
        evaluator_role: get(schema::EVALUATOR_ROLE),
        manager_referral: get(schema::MANAGER_REFERRAL),
        levels: Default::default(),
    };

    for level in Level::all() {
        let block = row.level_mut(level);
        for slot in 0..COURSES_PER_LEVEL {
            let course = &mut block.courses[slot];
            course.name = get(&schema::course_column(level, slot, CourseField::Name));
            for param in Parameter::all() {
                let raw = get(&schema::course_column(level, slot, CourseField::Score(param)));
                if raw.is_empty() {
                    continue;
                }
                if let Ok(value) = raw.trim().parse::<u32>() {
                    course.scores.insert(param, value);
                }
            }
            course.total = parse_or_default(&get(&schema::course_column(
                level,
                slot,
                CourseField::Total,
            )));
            course.average = parse_or_default(&get(&schema::course_column(
                level,
                slot,
                CourseField::Average,
            )));
            course.status =
                CourseStatus::parse(&get(&schema::course_column(level, slot, CourseField::Status)));
            course.remarks = get(&schema::course_column(level, slot, CourseField::Remarks));
            course.attempts = parse_or_default(&get(&schema::course_column(
                level,
                slot,
                CourseField::Attempts,
            )));
        }
        block.total = parse_or_default(&get(&schema::level_column(level, LevelField::Total)));
        block.average = parse_or_default(&get(&schema::level_column(level, LevelField::Average)));
        block.outcome = LevelOutcome::parse(&get(&schema::level_column(level, LevelField::Status)));
        block.reminder = get(&schema::level_column(level, LevelField::Reminder));
        block.score_card_sent =
            get(&schema::level_column(level, LevelField::ScoreCard)) == schema::SCORE_CARD_SENT;
    }

    row
}

/// One record in header order. Values are collected by column name first so
/// the ordering lives in exactly one place.
pub fn record_from_row(row: &AssessmentRow) -> Vec<String> {
    let mut values: HashMap<String, String> = HashMap::new();
    values.insert(schema::TRAINER_ID.to_string(), row.trainer_id.clone());
    values.insert(schema::TRAINER_NAME.to_string(), row.trainer_name.clone());
    values.insert(schema::DEPARTMENT.to_string(), row.department.clone());
    values.insert(schema::BRANCH.to_string(), row.branch.clone());
    values.insert(schema::ASSESSMENT_DATE.to_string(), row.assessment_date.clone());
    values.insert(
        schema::EVALUATOR_USERNAME.to_string(),
        row.evaluator_username.clone(),
    );
    values.insert(schema::EVALUATOR_ROLE.to_string(), row.evaluator_role.clone());
    values.insert(
        schema::MANAGER_REFERRAL.to_string(),
        row.manager_referral.clone(),
    );

    for level in Level::all() {
        let block = row.level(level);
        for slot in 0..COURSES_PER_LEVEL {
            let course = &block.courses[slot];
            values.insert(
                schema::course_column(level, slot, CourseField::Name),
                course.name.clone(),
            );
            for (&param, &value) in &course.scores {
                values.insert(
                    schema::course_column(level, slot, CourseField::Score(param)),
                    value.to_string(),
                );
            }
            if course.status.is_some() {
                values.insert(
                    schema::course_column(level, slot, CourseField::Total),
                    course.total.to_string(),
                );
                values.insert(
                    schema::course_column(level, slot, CourseField::Average),
                    course.average.to_string(),
                );
                values.insert(
                    schema::course_column(level, slot, CourseField::Attempts),
                    course.attempts.to_string(),
                );
            }
            if let Some(status) = course.status {
                values.insert(
                    schema::course_column(level, slot, CourseField::Status),
                    status.as_str().to_string(),
                );
            }
            values.insert(
                schema::course_column(level, slot, CourseField::Remarks),
                course.remarks.clone(),
            );
        }
        if let Some(outcome) = block.outcome {
            values.insert(
                schema::level_column(level, LevelField::Total),
                block.total.to_string(),
            );
            values.insert(
                schema::level_column(level, LevelField::Average),
                block.average.to_string(),
            );
            values.insert(
                schema::level_column(level, LevelField::Status),
                outcome.as_str().to_string(),
            );
            values.insert(
                schema::level_column(level, LevelField::ScoreCard),
                if block.score_card_sent {
                    schema::SCORE_CARD_SENT
                } else {
                    schema::SCORE_CARD_NOT_SENT
                }
                .to_string(),
            );
        }
        values.insert(
            schema::level_column(level, LevelField::Reminder),
            block.reminder.clone(),
        );
    }

    schema::header()
        .iter()
        .map(|column| values.remove(column).unwrap_or_default())
        .collect()
}

fn parse_or_default<T: std::str::FromStr + Default>(raw: &str) -> T {
    raw.trim().parse().unwrap_or_default()
}
