//! Report rendering: the wide CSV text export and the paginated PDF
//! documents. PDFs are plain line listings with a moving y-cursor; a new page
//! starts whenever the cursor runs out of room.

use anyhow::anyhow;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::directory::TrainerRecord;
use crate::engine::{role_of_stored, AssessmentRow, Level, COURSES_PER_LEVEL};
use crate::roster::EvaluatorAccount;
use crate::store;
use crate::schema;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TOP_MM: f32 = 280.0;
const BOTTOM_MM: f32 = 16.0;
const LINE_STEP_MM: f32 = 6.0;
const FONT_SIZE: f32 = 10.0;

/// Renders rows to CSV text. Rendering the same rows twice yields
/// byte-identical output.
pub fn to_csv_text(rows: &[AssessmentRow]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema::header().iter())?;
    for row in rows {
        writer.write_record(store::record_from_row(row).iter())?;
    }
    writer.flush()?;
    let bytes = writer.into_inner().map_err(|e| anyhow!("{e}"))?;
    Ok(String::from_utf8(bytes)?)
}

struct LineSink {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    y: f32,
}

impl LineSink {
    fn new(title: &str) -> anyhow::Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("{e}"))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(LineSink {
            doc,
            layer,
            font,
            y: TOP_MM,
        })
    }

    fn line(&mut self, text: &str) {
        if self.y < BOTTOM_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_MM;
        }
        self.layer
            .use_text(text, FONT_SIZE, Mm(MARGIN_MM), Mm(self.y), &self.font);
        self.y -= LINE_STEP_MM;
    }

    fn blank(&mut self) {
        self.y -= LINE_STEP_MM;
    }

    fn finish(self) -> anyhow::Result<Vec<u8>> {
        self.doc.save_to_bytes().map_err(|e| anyhow!("{e}"))
    }
}

/// Per-trainer assessment report: one summary block per stored row, then the
/// full per-course detail of the most recent row.
pub fn trainer_document(rows: &[AssessmentRow], generated_on: &str) -> anyhow::Result<Vec<u8>> {
    let mut sink = LineSink::new("Trainer Assessment Report")?;
    sink.line("Trainer Assessment Report");
    sink.line(&format!("Generated on: {}", generated_on));
    if let Some(first) = rows.first() {
        sink.line(&format!(
            "Trainer: {} (ID: {})",
            first.trainer_name, first.trainer_id
        ));
    }
    sink.blank();
    sink.line("Assessment Records");

    for row in rows {
        sink.blank();
        sink.line(&format!("Date of Assessment: {}", row.assessment_date));
        sink.line(&format!(
            "Evaluator: {} ({})",
            row.evaluator_username, row.evaluator_role
        ));
        for level in Level::all() {
            let block = row.level(level);
            let outcome = block.outcome.map(|o| o.as_str()).unwrap_or("N/A");
            sink.line(&format!(
                "{}: TOTAL {}  AVERAGE {:.2}  STATUS {}",
                level.tag(),
                block.total,
                block.average,
                outcome
            ));
        }
        if !row.manager_referral.is_empty() {
            sink.line(&format!("Manager Referral: {}", row.manager_referral));
        }
    }

    if let Some(last) = rows.last() {
        let params = role_of_stored(&last.evaluator_role)
            .map(|role| role.parameters())
            .unwrap_or(&[]);
        for level in Level::all() {
            sink.blank();
            sink.line(&format!("{} Courses", level.tag()));
            let block = last.level(level);
            for slot in 0..COURSES_PER_LEVEL {
                let course = &block.courses[slot];
                let name = if course.name.is_empty() { "N/A" } else { &course.name };
                sink.line(&format!("Course :{}: {}", slot + 1, name));
                for &param in params {
                    let value = course
                        .scores
                        .get(&param)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "N/A".to_string());
                    sink.line(&format!("  {}: {}", param.label(), value));
                }
                sink.line(&format!("  TOTAL: {}", course.total));
                sink.line(&format!("  AVERAGE: {:.2}", course.average));
                let status = course.status.map(|s| s.as_str()).unwrap_or("N/A");
                sink.line(&format!("  STATUS: {}", status));
                if !course.remarks.is_empty() {
                    sink.line(&format!("  REMARKS: {}", course.remarks));
                }
                if course.attempts > 0 {
                    sink.line(&format!("  ATTEMPTS: {}", course.attempts));
                }
            }
        }
    }

    sink.finish()
}

/// Administrator overview: the evaluator roster followed by the trainer
/// directory.
pub fn overview_document(
    evaluators: &[EvaluatorAccount],
    trainers: &[TrainerRecord],
    generated_on: &str,
) -> anyhow::Result<Vec<u8>> {
    let mut sink = LineSink::new("Evaluator and Trainer Report")?;
    sink.line("Evaluator and Trainer Report");
    sink.line(&format!("Generated on: {}", generated_on));
    sink.blank();
    sink.line("Evaluators");
    sink.line("Username  Full Name  Email  Role  Created At");
    for account in evaluators {
        sink.line(&format!(
            "{}  {}  {}  {}  {}",
            account.username, account.full_name, account.email, account.role, account.created_at
        ));
    }
    sink.blank();
    sink.line("Trainers");
    sink.line("Trainer ID  Trainer Name  Branch  Department");
    for trainer in trainers {
        sink.line(&format!(
            "{}  {}  {}  {}",
            trainer.trainer_id, trainer.name, trainer.branch, trainer.department
        ));
    }
    sink.finish()
}
