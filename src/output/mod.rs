//! Helpers for rendering command reports for the terminal or as JSON

use crate::batch::{BatchReport, RecordOutcome, RecordStatus};
use crate::combine::CombineReport;
use crate::pdf::PdfReport;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;

/// Combined structured and human-readable representation of a report
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Structured JSON representation suitable for downstream consumers
    pub json: Value,
    /// Human-readable lines for terminal presentation
    pub human: Vec<String>,
}

impl Rendered {
    /// Print to stdout, as pretty JSON when `json` is set.
    pub fn print(&self, json: bool) -> crate::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
        } else {
            for line in &self.human {
                println!("{line}");
            }
        }
        Ok(())
    }
}

/// Status line for one record, as printed while a batch runs.
pub fn outcome_line(outcome: &RecordOutcome) -> String {
    match &outcome.status {
        RecordStatus::Saved {
            path,
            warning: None,
        } => format!("✅ Saved: {}", path.display()),
        RecordStatus::Saved {
            path,
            warning: Some(warning),
        } => format!("⚠️ Saved: {} ({warning})", path.display()),
        RecordStatus::Failed { reason } => {
            format!("❌ Failed: {} (line {}): {reason}", display_name(&outcome.name), outcome.line)
        }
    }
}

/// Render a finished batch. Per-record lines are left out when `streamed`,
/// since they were already printed by [`outcome_line`].
pub fn render_batch(report: &BatchReport, streamed: bool) -> Rendered {
    let mut human = Vec::new();
    if !streamed {
        human.extend(report.outcomes.iter().map(outcome_line));
    }
    human.push(format!(
        "{} of {} documents saved to {} ({} with image warnings, {} failed)",
        report.saved(),
        report.outcomes.len(),
        report.output_dir.display(),
        report.warnings(),
        report.failed()
    ));

    Rendered {
        json: to_value(report),
        human,
    }
}

/// Render the result of combining a folder.
pub fn render_combine(report: &CombineReport) -> Rendered {
    let mut human: Vec<String> = report
        .skipped
        .iter()
        .map(|s| format!("⚠️ Skipped {}: {}", s.path.display(), s.reason))
        .collect();
    human.push(format!(
        "✅ Combined {} documents into {}",
        report.combined.len(),
        report.output.display()
    ));

    Rendered {
        json: to_value(report),
        human,
    }
}

/// Render the result of a PDF conversion run.
pub fn render_pdf(report: &PdfReport) -> Rendered {
    let mut human: Vec<String> = report
        .converted
        .iter()
        .map(|pdf| format!("✅ Converted: {}", pdf.display()))
        .collect();
    human.extend(
        report
            .failed
            .iter()
            .map(|f| format!("❌ Failed: {}: {}", f.path.display(), f.reason)),
    );
    human.push(format!(
        "✅ All conversions completed. PDFs saved in '{}'",
        report.output_dir.display()
    ));

    Rendered {
        json: to_value(report),
        human,
    }
}

/// Render a saved QR image.
pub fn render_qr(path: &Path, style: &str, content: &str) -> Rendered {
    Rendered {
        json: json!({
            "path": path,
            "style": style,
            "content": content,
        }),
        human: vec![format!("✅ QR code saved as {}", path.display())],
    }
}

/// Render a fatal error.
pub fn render_error(message: &str) -> Rendered {
    Rendered {
        json: json!({ "error": message }),
        human: vec![format!("❌ {message}")],
    }
}

fn to_value<T: Serialize>(report: &T) -> Value {
    serde_json::to_value(report).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "(unnamed)" } else { name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::SkippedFile;
    use std::path::PathBuf;

    fn outcome(name: &str, status: RecordStatus) -> RecordOutcome {
        RecordOutcome {
            index: 1,
            line: 2,
            name: name.into(),
            status,
        }
    }

    #[test]
    fn outcome_lines_carry_status_prefix() {
        let saved = outcome(
            "rose",
            RecordStatus::Saved {
                path: PathBuf::from("out/rose.docx"),
                warning: None,
            },
        );
        let warned = outcome(
            "lily",
            RecordStatus::Saved {
                path: PathBuf::from("out/lily.docx"),
                warning: Some("image fetch failed: HTTP 404".into()),
            },
        );
        let failed = outcome(
            "",
            RecordStatus::Failed {
                reason: "disk full".into(),
            },
        );

        assert_eq!(outcome_line(&saved), "✅ Saved: out/rose.docx");
        assert!(outcome_line(&warned).starts_with("⚠️ Saved: out/lily.docx"));
        assert_eq!(outcome_line(&failed), "❌ Failed: (unnamed) (line 2): disk full");
    }

    #[test]
    fn batch_summary_counts() {
        let report = BatchReport {
            output_dir: PathBuf::from("monographs"),
            outcomes: vec![outcome(
                "rose",
                RecordStatus::Saved {
                    path: PathBuf::from("monographs/rose.docx"),
                    warning: None,
                },
            )],
        };

        let streamed = render_batch(&report, true);
        assert_eq!(streamed.human.len(), 1);
        assert!(streamed.human[0].starts_with("1 of 1 documents saved to monographs"));
        assert_eq!(render_batch(&report, false).human.len(), 2);
        assert_eq!(streamed.json["outcomes"][0]["name"], "rose");
    }

    #[test]
    fn combine_lists_skipped_first() {
        let report = CombineReport {
            output: PathBuf::from("combined.docx"),
            combined: vec![PathBuf::from("a.docx")],
            skipped: vec![SkippedFile {
                path: PathBuf::from("b.docx"),
                reason: "bad zip".into(),
            }],
        };
        let rendered = render_combine(&report);
        assert_eq!(
            rendered.human,
            [
                "⚠️ Skipped b.docx: bad zip",
                "✅ Combined 1 documents into combined.docx"
            ]
        );
        assert_eq!(rendered.json["skipped"][0]["reason"], "bad zip");
    }

    #[test]
    fn errors_render_both_ways() {
        let rendered = render_error("CSV must have a column named 'url'");
        assert_eq!(rendered.json["error"], "CSV must have a column named 'url'");
        assert!(rendered.human[0].starts_with("❌ "));
    }
}
