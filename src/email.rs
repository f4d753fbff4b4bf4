//! Reminder and score-card composition. The daemon never sends mail; it hands
//! back a formatted body plus a mailto link for whatever client the front end
//! opens.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use std::fmt::Write as _;

use crate::engine::{role_of_stored, AssessmentRow, Level, COURSES_PER_LEVEL};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub mailto: String,
}

/// The only shape check the original ever applied.
pub fn is_deliverable(recipient: &str) -> bool {
    recipient.contains('@')
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

pub fn mailto_link(recipient: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{}?subject={}&body={}",
        encode(recipient),
        encode(subject),
        encode(body)
    )
}

fn message(recipient: &str, subject: String, body: String) -> EmailMessage {
    let mailto = mailto_link(recipient, &subject, &body);
    EmailMessage {
        recipient: recipient.to_string(),
        subject,
        body,
        mailto,
    }
}

/// Reminder mail: identity header, the free-text reminder, and a one-line
/// status overview per course at the level.
pub fn reminder(
    recipient: &str,
    row: &AssessmentRow,
    level: Level,
    reminder_text: &str,
) -> EmailMessage {
    let mut body = String::new();
    let _ = writeln!(body, "Reminder for Trainer ID: {}", row.trainer_id);
    let _ = writeln!(body, "Trainer Name: {}", row.trainer_name);
    let _ = writeln!(body, "Department: {}", row.department);
    let _ = writeln!(body, "Date of Assessment: {}", row.assessment_date);
    let _ = writeln!(
        body,
        "Evaluator: {} ({})",
        row.evaluator_username, row.evaluator_role
    );
    let _ = writeln!(body);
    let _ = writeln!(body, "Reminder Message:");
    let _ = writeln!(
        body,
        "{}",
        if reminder_text.trim().is_empty() {
            "No reminder message provided."
        } else {
            reminder_text
        }
    );
    let _ = writeln!(body);
    let _ = writeln!(body, "Assessment Overview for {}:", level.tag());
    let block = row.level(level);
    for slot in 0..COURSES_PER_LEVEL {
        let course = &block.courses[slot];
        let name = if course.name.is_empty() { "N/A" } else { &course.name };
        let status = course.status.map(|s| s.as_str()).unwrap_or("NOT RECORDED");
        let _ = writeln!(body, "  Course :{}: {} ({})", slot + 1, name, status);
    }
    if level == Level::Three && !row.manager_referral.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "Manager Referral: {}", row.manager_referral);
    }

    let subject = format!(
        "Reminder for Trainer {} - {} - {}",
        row.trainer_id,
        level.tag(),
        row.assessment_date
    );
    message(recipient, subject, body)
}

/// Score-card mail: full per-course detail for the evaluator's parameter set.
pub fn score_card(recipient: &str, row: &AssessmentRow, level: Level) -> EmailMessage {
    let mut body = String::new();
    let _ = writeln!(body, "Score Card for Trainer ID: {}", row.trainer_id);
    let _ = writeln!(body, "Trainer Name: {}", row.trainer_name);
    let _ = writeln!(body, "Department: {}", row.department);
    let _ = writeln!(body, "Date of Assessment: {}", row.assessment_date);
    let _ = writeln!(
        body,
        "Evaluator: {} ({})",
        row.evaluator_username, row.evaluator_role
    );
    let _ = writeln!(body);
    let _ = writeln!(body, "Assessment Details for {}:", level.tag());

    let params = role_of_stored(&row.evaluator_role)
        .map(|role| role.parameters())
        .unwrap_or(&[]);
    let block = row.level(level);
    for slot in 0..COURSES_PER_LEVEL {
        let course = &block.courses[slot];
        let _ = writeln!(body);
        let _ = writeln!(body, "Course :{}:", slot + 1);
        for &param in params {
            match course.scores.get(&param) {
                Some(value) => {
                    let _ = writeln!(body, "  {}: {}", param.label(), value);
                }
                None => {
                    let _ = writeln!(body, "  {}: N/A", param.label());
                }
            }
        }
        let name = if course.name.is_empty() { "N/A" } else { &course.name };
        let _ = writeln!(body, "  Course Name: {}", name);
        let _ = writeln!(body, "  TOTAL: {}", course.total);
        let _ = writeln!(body, "  AVERAGE: {:.2}", course.average);
        let status = course.status.map(|s| s.as_str()).unwrap_or("NOT RECORDED");
        let _ = writeln!(body, "  STATUS: {}", status);
    }
    let _ = writeln!(body);
    let outcome = block.outcome.map(|o| o.as_str()).unwrap_or("NOT RECORDED");
    let _ = writeln!(body, "{} Status: {}", level.tag(), outcome);
    if level == Level::Three && !row.manager_referral.is_empty() {
        let _ = writeln!(body, "Manager Referral: {}", row.manager_referral);
    }
    let reminder = if block.reminder.is_empty() { "None" } else { &block.reminder };
    let _ = writeln!(body, "Reminder: {}", reminder);

    let subject = format!(
        "Score Card for Trainer {} - {} - {}",
        row.trainer_id,
        level.tag(),
        row.assessment_date
    );
    message(recipient, subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CourseStatus, EvaluatorRole, LevelOutcome, Parameter};

    fn row() -> AssessmentRow {
        let mut row = AssessmentRow {
            trainer_id: "TR001".to_string(),
            trainer_name: "Asha Rao".to_string(),
            department: "Coding".to_string(),
            assessment_date: "2026-08-07".to_string(),
            evaluator_username: "alice".to_string(),
            evaluator_role: EvaluatorRole::Technical.display().to_string(),
            ..Default::default()
        };
        let block = row.level_mut(Level::One);
        block.courses[0].name = "Robotics Basics".to_string();
        block.courses[0].status = Some(CourseStatus::Cleared);
        block.courses[0].scores.insert(Parameter::StemKnowledge, 4);
        block.courses[0].total = 4;
        block.courses[0].average = 4.0 / 6.0;
        block.outcome = Some(LevelOutcome::Qualified);
        row
    }

    #[test]
    fn deliverability_is_just_the_at_sign_check() {
        assert!(is_deliverable("a@b"));
        assert!(!is_deliverable("nobody"));
    }

    #[test]
    fn mailto_percent_encodes_subject_and_body() {
        let link = mailto_link("a@b.com", "Score Card & More", "line one\nline two");
        assert!(link.starts_with("mailto:a%40b%2Ecom?subject="));
        assert!(link.contains("Score%20Card%20%26%20More"));
        assert!(link.contains("line%20one%0Aline%20two"));
        assert!(!link.contains(' '));
    }

    #[test]
    fn reminder_lists_every_course_slot() {
        let msg = reminder("a@b.com", &row(), Level::One, "bring the lesson plan");
        assert!(msg.subject.contains("TR001"));
        assert!(msg.body.contains("Course :1: Robotics Basics (CLEARED)"));
        assert!(msg.body.contains("Course :10: N/A (NOT RECORDED)"));
        assert!(msg.body.contains("bring the lesson plan"));
    }

    #[test]
    fn score_card_shows_the_roles_parameters_only() {
        let msg = score_card("a@b.com", &row(), Level::One);
        assert!(msg.body.contains("Has Knowledge of STEM (5): 4"));
        assert!(msg.body.contains("Language Fluency (5): N/A"));
        assert!(!msg.body.contains("Time Based Activity"));
        assert!(msg.body.contains("LEVEL #1 Status: QUALIFIED"));
    }
}
