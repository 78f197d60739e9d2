//! Concatenate a folder of documents into one

use crate::document;
use crate::error::{Error, Result};
use docx_rs::{BreakType, Docx, Paragraph, Run};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the combined document
pub const DEFAULT_OUTPUT: &str = "combined.docx";

/// A document left out of the combined output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    /// File that could not be read
    pub path: PathBuf,
    /// Parse or read error
    pub reason: String,
}

/// What [`combine_folder`] produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombineReport {
    /// The combined document
    pub output: PathBuf,
    /// Inputs included, in order
    pub combined: Vec<PathBuf>,
    /// Inputs that failed to parse
    pub skipped: Vec<SkippedFile>,
}

/// Combine every `.docx` in `folder`, sorted by name, into `output`, with a
/// page break before each appended document.
///
/// Headers, footers and styles come from the first readable document.
/// Documents that fail to parse are skipped and listed in the report.
pub fn combine_folder(folder: &Path, output: &Path) -> Result<CombineReport> {
    let output_id = fs::canonicalize(output).ok();
    let files: Vec<PathBuf> = document::list_docx(folder)?
        .into_iter()
        .filter(|path| output_id.is_none() || fs::canonicalize(path).ok() != output_id)
        .collect();
    if files.is_empty() {
        return Err(Error::Input(format!(
            "No .docx files found in {}",
            folder.display()
        )));
    }

    let mut master: Option<Docx> = None;
    let mut combined = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        let docx = match document::open(&path) {
            Ok(docx) => docx,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        master = Some(match master {
            None => docx,
            Some(master) => append(master, docx),
        });
        tracing::debug!(path = %path.display(), "Appended document");
        combined.push(path);
    }

    let master = master.ok_or_else(|| {
        Error::Input(format!(
            "None of the documents in {} could be read",
            folder.display()
        ))
    })?;
    document::save(master, output)?;
    tracing::info!(
        output = %output.display(),
        documents = combined.len(),
        skipped = skipped.len(),
        "Combined documents"
    );

    Ok(CombineReport {
        output: output.to_path_buf(),
        combined,
        skipped,
    })
}

/// Append `next`'s body to `master` after a page break.
fn append(master: Docx, next: Docx) -> Docx {
    let mut master =
        master.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
    master.document.children.extend(next.document.children);
    master
}
