//! The record store's wide column schema. Every column name is produced here
//! from a structured (level, course, field) key; nothing else in the crate
//! concatenates column strings.

use crate::engine::{Level, Parameter, COURSES_PER_LEVEL};

pub const TRAINER_ID: &str = "Trainer ID";
pub const TRAINER_NAME: &str = "Trainer Name";
pub const DEPARTMENT: &str = "Department";
pub const BRANCH: &str = "Branch";
pub const ASSESSMENT_DATE: &str = "Date of assessment";
pub const EVALUATOR_USERNAME: &str = "Evaluator Username";
pub const EVALUATOR_ROLE: &str = "Evaluator Role";
pub const MANAGER_REFERRAL: &str = "Manager Referral";

pub const IDENTITY_COLUMNS: [&str; 8] = [
    TRAINER_ID,
    TRAINER_NAME,
    DEPARTMENT,
    BRANCH,
    ASSESSMENT_DATE,
    EVALUATOR_USERNAME,
    EVALUATOR_ROLE,
    MANAGER_REFERRAL,
];

pub const SCORE_CARD_SENT: &str = "SENT";
pub const SCORE_CARD_NOT_SENT: &str = "NOT SENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseField {
    Name,
    Score(Parameter),
    Total,
    Average,
    Status,
    Remarks,
    Attempts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelField {
    Total,
    Average,
    Status,
    Reminder,
    ScoreCard,
}

/// Column name for one course-level field, e.g. `LEVEL #2 Course :7 TOTAL`.
/// `slot` is zero-based; the column naming stays one-based.
pub fn course_column(level: Level, slot: usize, field: CourseField) -> String {
    let base = format!("{} Course :{}", level.tag(), slot + 1);
    match field {
        CourseField::Name => base,
        CourseField::Score(param) => format!("{} {}", base, param.label()),
        CourseField::Total => format!("{} TOTAL", base),
        CourseField::Average => format!("{} AVERAGE", base),
        CourseField::Status => format!("{} STATUS", base),
        CourseField::Remarks => format!("{} REMARKS", base),
        CourseField::Attempts => format!("{} ATTEMPTS", base),
    }
}

pub fn level_column(level: Level, field: LevelField) -> String {
    match field {
        LevelField::Total => format!("{} TOTAL", level.tag()),
        LevelField::Average => format!("{} AVERAGE", level.tag()),
        LevelField::Status => format!("{} STATUS", level.tag()),
        LevelField::Reminder => format!("{} Reminder", level.tag()),
        LevelField::ScoreCard => format!("{} Score Card Status", level.tag()),
    }
}

const COURSE_FIELD_TAIL: [CourseField; 5] = [
    CourseField::Total,
    CourseField::Average,
    CourseField::Status,
    CourseField::Remarks,
    CourseField::Attempts,
];

const LEVEL_FIELDS: [LevelField; 5] = [
    LevelField::Total,
    LevelField::Average,
    LevelField::Status,
    LevelField::Reminder,
    LevelField::ScoreCard,
];

/// The full ordered header the store writes. Loading goes by name, so files
/// with a narrower or shuffled header still read; missing columns come back
/// as empty strings.
pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = IDENTITY_COLUMNS.iter().map(|c| c.to_string()).collect();
    for level in Level::all() {
        for slot in 0..COURSES_PER_LEVEL {
            columns.push(course_column(level, slot, CourseField::Name));
            for param in Parameter::all() {
                columns.push(course_column(level, slot, CourseField::Score(param)));
            }
            for field in COURSE_FIELD_TAIL {
                columns.push(course_column(level, slot, field));
            }
        }
        for field in LEVEL_FIELDS {
            columns.push(level_column(level, field));
        }
    }
    columns
}
