use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const COURSES_PER_LEVEL: usize = 10;

/// One of the three sequential certification stages a trainer progresses
/// through. Serialized on the wire as its number (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Level {
    One,
    Two,
    Three,
}

impl Level {
    pub fn all() -> [Level; 3] {
        [Level::One, Level::Two, Level::Three]
    }

    pub fn number(self) -> u8 {
        match self {
            Level::One => 1,
            Level::Two => 2,
            Level::Three => 3,
        }
    }

    pub fn index(self) -> usize {
        (self.number() - 1) as usize
    }

    pub fn previous(self) -> Option<Level> {
        match self {
            Level::One => None,
            Level::Two => Some(Level::One),
            Level::Three => Some(Level::Two),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Level::One => "LEVEL #1",
            Level::Two => "LEVEL #2",
            Level::Three => "LEVEL #3",
        }
    }

    /// Minimum level average (percent) for a QUALIFIED outcome to stand.
    pub fn qualifying_average(self) -> f64 {
        match self {
            Level::One => 75.0,
            Level::Two => 80.0,
            Level::Three => 90.0,
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.number()
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(n: u8) -> Result<Level, String> {
        match n {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("level must be 1..=3, got {}", other)),
        }
    }
}

/// An evaluation parameter scored for a single course. The maximum score is 5
/// for every parameter except STEM-activity integration, which runs to 10.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    StemKnowledge,
    StemIntegration,
    StemCurrency,
    CourseOutline,
    LanguageFluency,
    LessonPreparation,
    TimeBasedActivity,
    StudentEngagement,
    PleasingLook,
    PoisedConfident,
    VoiceModulation,
}

impl Parameter {
    pub fn all() -> [Parameter; 11] {
        [
            Parameter::StemKnowledge,
            Parameter::StemIntegration,
            Parameter::StemCurrency,
            Parameter::CourseOutline,
            Parameter::LanguageFluency,
            Parameter::LessonPreparation,
            Parameter::TimeBasedActivity,
            Parameter::StudentEngagement,
            Parameter::PleasingLook,
            Parameter::PoisedConfident,
            Parameter::VoiceModulation,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Parameter::StemKnowledge => "Has Knowledge of STEM (5)",
            Parameter::StemIntegration => "Ability to integrate STEM With related activities (10)",
            Parameter::StemCurrency => "Discusses Up-to-date information related to STEM (5)",
            Parameter::CourseOutline => "Provides Course Outline (5)",
            Parameter::LanguageFluency => "Language Fluency (5)",
            Parameter::LessonPreparation => "Preparation with Lesson Plan / Practicals (5)",
            Parameter::TimeBasedActivity => "Time Based Activity (5)",
            Parameter::StudentEngagement => "Student Engagement Ideas (5)",
            Parameter::PleasingLook => "Pleasing Look (5)",
            Parameter::PoisedConfident => "Poised & Confident (5)",
            Parameter::VoiceModulation => "Well Modulated Voice (5)",
        }
    }

    pub fn max(self) -> u32 {
        match self {
            Parameter::StemIntegration => 10,
            _ => 5,
        }
    }
}

/// Each evaluator role scores a disjoint parameter subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluatorRole {
    Technical,
    SchoolOperations,
}

impl EvaluatorRole {
    pub fn parameters(self) -> &'static [Parameter] {
        match self {
            EvaluatorRole::Technical => &[
                Parameter::StemKnowledge,
                Parameter::StemIntegration,
                Parameter::StemCurrency,
                Parameter::CourseOutline,
                Parameter::LanguageFluency,
                Parameter::LessonPreparation,
            ],
            EvaluatorRole::SchoolOperations => &[
                Parameter::TimeBasedActivity,
                Parameter::StudentEngagement,
                Parameter::PleasingLook,
                Parameter::PoisedConfident,
                Parameter::VoiceModulation,
            ],
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            EvaluatorRole::Technical => "Technical Evaluator",
            EvaluatorRole::SchoolOperations => "School Operations Evaluator",
        }
    }
}

/// Stored role strings are matched loosely: anything containing "technical"
/// counts as the technical side, anything containing "school" as school
/// operations. Rows written by older tools spell the role several ways.
pub fn role_of_stored(stored: &str) -> Option<EvaluatorRole> {
    let lower = stored.to_ascii_lowercase();
    if lower.contains("technical") {
        Some(EvaluatorRole::Technical)
    } else if lower.contains("school") {
        Some(EvaluatorRole::SchoolOperations)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseStatus {
    Cleared,
    Redo,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Cleared => "CLEARED",
            CourseStatus::Redo => "REDO",
        }
    }

    pub fn parse(s: &str) -> Option<CourseStatus> {
        match s.trim() {
            "CLEARED" => Some(CourseStatus::Cleared),
            "REDO" => Some(CourseStatus::Redo),
            _ => None,
        }
    }
}

impl Default for CourseStatus {
    fn default() -> Self {
        CourseStatus::Redo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelOutcome {
    Qualified,
    NotQualified,
}

impl LevelOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            LevelOutcome::Qualified => "QUALIFIED",
            LevelOutcome::NotQualified => "NOT QUALIFIED",
        }
    }

    pub fn parse(s: &str) -> Option<LevelOutcome> {
        match s.trim() {
            "QUALIFIED" => Some(LevelOutcome::Qualified),
            "NOT QUALIFIED" => Some(LevelOutcome::NotQualified),
            _ => None,
        }
    }
}

/// One scored course inside a persisted assessment row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<Parameter, u32>,
    pub total: u32,
    pub average: f64,
    pub status: Option<CourseStatus>,
    pub remarks: String,
    pub attempts: u32,
}

/// Per-level slice of an assessment row: ten courses plus the aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelBlock {
    pub courses: [CourseResult; COURSES_PER_LEVEL],
    pub total: u32,
    pub average: f64,
    pub outcome: Option<LevelOutcome>,
    pub reminder: String,
    pub score_card_sent: bool,
}

impl Default for LevelBlock {
    fn default() -> Self {
        LevelBlock {
            courses: std::array::from_fn(|_| CourseResult::default()),
            total: 0,
            average: 0.0,
            outcome: None,
            reminder: String::new(),
            score_card_sent: false,
        }
    }
}

/// One row of the record store: a single evaluator's submission event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRow {
    pub trainer_id: String,
    pub trainer_name: String,
    pub department: String,
    pub branch: String,
    pub assessment_date: String,
    pub evaluator_username: String,
    pub evaluator_role: String,
    pub manager_referral: String,
    pub levels: [LevelBlock; 3],
}

impl AssessmentRow {
    pub fn level(&self, level: Level) -> &LevelBlock {
        &self.levels[level.index()]
    }

    pub fn level_mut(&mut self, level: Level) -> &mut LevelBlock {
        &mut self.levels[level.index()]
    }
}

/// One evaluator's in-flight submission, passed through the engine explicitly
/// and persisted only on save.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDraft {
    pub trainer_id: String,
    #[serde(default)]
    pub evaluator_username: String,
    pub role: EvaluatorRole,
    pub level: Level,
    pub courses: Vec<CourseDraft>,
    pub proposed: LevelOutcome,
    #[serde(default)]
    pub manager_referral: String,
    #[serde(default)]
    pub reminder: String,
    #[serde(default)]
    pub score_card_sent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub scores: BTreeMap<Parameter, u32>,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: String,
    pub message: String,
}

impl EngineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        EngineError {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Shape and bounds checks for an incoming draft. Missing parameters are
/// allowed (they score 0); out-of-range scores are not.
pub fn check_draft(draft: &SubmissionDraft) -> Result<(), EngineError> {
    if draft.trainer_id.trim().is_empty() {
        return Err(EngineError::new("validation_failed", "trainer id is required"));
    }
    if draft.courses.len() != COURSES_PER_LEVEL {
        return Err(EngineError::new(
            "validation_failed",
            format!(
                "a submission carries exactly {} courses, got {}",
                COURSES_PER_LEVEL,
                draft.courses.len()
            ),
        ));
    }
    for (slot, course) in draft.courses.iter().enumerate() {
        for (&param, &value) in &course.scores {
            if value > param.max() {
                return Err(EngineError::new(
                    "validation_failed",
                    format!(
                        "Course :{} scores {} at {} but the maximum is {}",
                        slot + 1,
                        value,
                        param.label(),
                        param.max()
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseScore {
    pub total: u32,
    /// Raw mean over the role's parameter set.
    pub average: f64,
    /// Same total expressed against the role's maximum, 0..=100.
    pub percent: f64,
}

/// Sums the role's parameter set; a parameter with no recorded score counts 0.
pub fn score_course(scores: &BTreeMap<Parameter, u32>, role: EvaluatorRole) -> CourseScore {
    let params = role.parameters();
    let total: u32 = params.iter().map(|p| scores.get(p).copied().unwrap_or(0)).sum();
    let max_total: u32 = params.iter().map(|&p| p.max()).sum();
    let average = f64::from(total) / params.len() as f64;
    let percent = if max_total > 0 {
        100.0 * f64::from(total) / f64::from(max_total)
    } else {
        0.0
    };
    CourseScore {
        total,
        average,
        percent,
    }
}

/// What the trainer's history says about one level's qualification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelReview {
    pub qualified: bool,
    pub has_technical: bool,
    pub has_operations: bool,
    pub distinct_evaluators: usize,
}

pub fn level_review(history: &[AssessmentRow], level: Level) -> LevelReview {
    let mut has_technical = false;
    let mut has_operations = false;
    let mut evaluators: BTreeSet<&str> = BTreeSet::new();

    for row in history {
        if row.level(level).outcome != Some(LevelOutcome::Qualified) {
            continue;
        }
        match role_of_stored(&row.evaluator_role) {
            Some(EvaluatorRole::Technical) => has_technical = true,
            Some(EvaluatorRole::SchoolOperations) => has_operations = true,
            None => {}
        }
        if !row.evaluator_username.is_empty() {
            evaluators.insert(row.evaluator_username.as_str());
        }
    }

    LevelReview {
        qualified: has_technical && has_operations,
        has_technical,
        has_operations,
        distinct_evaluators: evaluators.len(),
    }
}

/// Latest recorded status for one course slot, scanning history newest-first.
pub fn latest_course_status(
    history: &[AssessmentRow],
    level: Level,
    slot: usize,
) -> Option<CourseStatus> {
    history
        .iter()
        .rev()
        .find_map(|row| row.level(level).courses[slot].status)
}

/// Level 1 is always open. A later level opens only once every one of the
/// previous level's ten course slots was last recorded CLEARED.
pub fn is_level_unlocked(history: &[AssessmentRow], level: Level) -> bool {
    let Some(previous) = level.previous() else {
        return true;
    };
    (0..COURSES_PER_LEVEL)
        .all(|slot| latest_course_status(history, previous, slot) == Some(CourseStatus::Cleared))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelGate {
    Locked,
    UnlockedPending,
    QualifiedPartial,
    QualifiedFull,
}

/// Full qualification is sticky: once both roles have signed off it is never
/// reported as anything less, locked or not.
pub fn gate_state(history: &[AssessmentRow], level: Level) -> LevelGate {
    let review = level_review(history, level);
    if review.qualified && review.distinct_evaluators >= 2 {
        return LevelGate::QualifiedFull;
    }
    if !is_level_unlocked(history, level) {
        return LevelGate::Locked;
    }
    if review.distinct_evaluators >= 1 {
        LevelGate::QualifiedPartial
    } else {
        LevelGate::UnlockedPending
    }
}

pub fn gate_states(history: &[AssessmentRow]) -> [LevelGate; 3] {
    Level::all().map(|level| gate_state(history, level))
}

/// Why a proposed QUALIFIED outcome was downgraded. These are business
/// outcomes, not errors; callers surface them as warnings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "code")]
pub enum Downgrade {
    CoursesIncomplete,
    AverageBelowThreshold { required: f64, actual: f64 },
    MissingManagerReferral,
}

impl Downgrade {
    pub fn message(&self, level: Level) -> String {
        match self {
            Downgrade::CoursesIncomplete => format!(
                "{} requires all {} courses named and passed",
                level.tag(),
                COURSES_PER_LEVEL
            ),
            Downgrade::AverageBelowThreshold { required, actual } => format!(
                "{} average {:.1}% is below the required {:.0}%",
                level.tag(),
                actual,
                required
            ),
            Downgrade::MissingManagerReferral => {
                format!("{} requires a manager referral", level.tag())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validated {
    pub outcome: LevelOutcome,
    pub level_total: u32,
    pub level_average: f64,
    pub level_percent: f64,
    #[serde(skip)]
    pub warnings: Vec<Downgrade>,
}

/// Applies the qualification criteria to a draft. A proposed QUALIFIED is
/// adjudicated only once two or more distinct evaluators have already
/// submitted QUALIFIED rows at the level; with fewer, the proposal passes
/// through unchanged. Every unmet condition is reported, not just the first.
pub fn validate_submission(draft: &SubmissionDraft, history: &[AssessmentRow]) -> Validated {
    let scores: Vec<CourseScore> = draft
        .courses
        .iter()
        .map(|course| score_course(&course.scores, draft.role))
        .collect();
    let level_total: u32 = scores.iter().map(|s| s.total).sum();
    let count = draft.courses.len().max(1) as f64;
    let level_average = scores.iter().map(|s| s.average).sum::<f64>() / count;
    let level_percent = scores.iter().map(|s| s.percent).sum::<f64>() / count;

    let mut outcome = draft.proposed;
    let mut warnings = Vec::new();

    let review = level_review(history, draft.level);
    if draft.proposed == LevelOutcome::Qualified && review.distinct_evaluators >= 2 {
        let all_filled = draft
            .courses
            .iter()
            .all(|course| !course.name.trim().is_empty() && course.passed);
        if !all_filled {
            warnings.push(Downgrade::CoursesIncomplete);
        }
        let required = draft.level.qualifying_average();
        if level_percent < required {
            warnings.push(Downgrade::AverageBelowThreshold {
                required,
                actual: level_percent,
            });
        }
        if draft.level == Level::Three && draft.manager_referral.trim().is_empty() {
            warnings.push(Downgrade::MissingManagerReferral);
        }
        if !warnings.is_empty() {
            outcome = LevelOutcome::NotQualified;
        }
    }

    Validated {
        outcome,
        level_total,
        level_average,
        level_percent,
        warnings,
    }
}

/// Attempt counter carried forward from the latest row that recorded the slot.
pub fn prior_attempts(history: &[AssessmentRow], level: Level, slot: usize) -> u32 {
    history
        .iter()
        .rev()
        .find_map(|row| {
            let course = &row.level(level).courses[slot];
            course.status.map(|_| course.attempts)
        })
        .unwrap_or(0)
}

/// Assembles the persistable row for one submission. The row is the
/// evaluator's cumulative card for this trainer: it starts from their latest
/// stored row so earlier levels carry forward, and only the submitted level's
/// block is rebuilt. Totals and averages are recomputed from the raw
/// parameter scores; a REDO status bumps the course's attempt counter,
/// CLEARED leaves it alone.
pub fn build_row(
    draft: &SubmissionDraft,
    outcome: LevelOutcome,
    history: &[AssessmentRow],
    today: NaiveDate,
    trainer_name: &str,
    department: &str,
    branch: &str,
) -> AssessmentRow {
    let mut row = history
        .iter()
        .rev()
        .find(|row| row.evaluator_username == draft.evaluator_username)
        .cloned()
        .unwrap_or_default();
    row.trainer_id = draft.trainer_id.trim().to_string();
    row.trainer_name = trainer_name.to_string();
    row.department = department.to_string();
    row.branch = branch.to_string();
    row.assessment_date = today.format("%Y-%m-%d").to_string();
    row.evaluator_username = draft.evaluator_username.clone();
    row.evaluator_role = draft.role.display().to_string();
    if draft.level == Level::Three {
        row.manager_referral = draft.manager_referral.trim().to_string();
    }

    let role_params = draft.role.parameters();
    let block = row.level_mut(draft.level);
    let mut total_sum = 0u32;
    let mut average_sum = 0.0f64;
    for (slot, course) in draft.courses.iter().enumerate() {
        let score = score_course(&course.scores, draft.role);
        let previous = prior_attempts(history, draft.level, slot);
        let attempts = match course.status {
            CourseStatus::Redo => previous + 1,
            CourseStatus::Cleared => previous,
        };
        let scores: BTreeMap<Parameter, u32> = course
            .scores
            .iter()
            .filter(|(param, _)| role_params.contains(*param))
            .map(|(&param, &value)| (param, value))
            .collect();
        total_sum += score.total;
        average_sum += score.average;
        block.courses[slot] = CourseResult {
            name: course.name.trim().to_string(),
            scores,
            total: score.total,
            average: score.average,
            status: Some(course.status),
            remarks: course.remarks.clone(),
            attempts,
        };
    }
    block.total = total_sum;
    block.average = average_sum / draft.courses.len().max(1) as f64;
    block.outcome = Some(outcome);
    block.reminder = draft.reminder.clone();
    block.score_card_sent = draft.score_card_sent;

    row
}
