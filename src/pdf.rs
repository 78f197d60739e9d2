//! Batch DOCX to PDF conversion through a headless office suite
//!
//! Rendering is delegated to an external converter (LibreOffice's `soffice`
//! by default), run once per file.

use crate::document;
use crate::error::{Error, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A file the converter could not handle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionFailure {
    /// Source document
    pub path: PathBuf,
    /// Converter error or exit status with its stderr
    pub reason: String,
}

/// What [`PdfConverter::convert_folder`] did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfReport {
    /// Folder the PDFs were written to
    pub output_dir: PathBuf,
    /// PDFs produced, in input order
    pub converted: Vec<PathBuf>,
    /// Documents that failed
    pub failed: Vec<ConversionFailure>,
}

/// Runs `<program> --headless --convert-to pdf --outdir <dir> <file>`
#[derive(Debug, Clone)]
pub struct PdfConverter {
    program: String,
}

impl PdfConverter {
    /// Use `program` as the converter executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed for one file.
    pub fn args(&self, file: &Path, output_dir: &Path) -> Vec<OsString> {
        vec![
            "--headless".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            output_dir.as_os_str().to_owned(),
            file.as_os_str().to_owned(),
        ]
    }

    /// Convert one document; returns the expected PDF path.
    pub async fn convert_file(&self, file: &Path, output_dir: &Path) -> Result<PathBuf> {
        let output = Command::new(&self.program)
            .args(self.args(file, output_dir))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Pdf(format!("Cannot run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Pdf(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stem = file.file_stem().unwrap_or(file.as_os_str());
        let mut pdf = output_dir.join(stem);
        pdf.set_extension("pdf");
        Ok(pdf)
    }

    /// Convert every `.docx` in `input_dir` into `output_dir`, creating it if
    /// needed. Each file's failure is recorded and the rest still run.
    pub async fn convert_folder(&self, input_dir: &Path, output_dir: &Path) -> Result<PdfReport> {
        let files = document::list_docx(input_dir)?;
        fs::create_dir_all(output_dir).map_err(|e| {
            Error::Write(format!(
                "Cannot create output directory {}: {e}",
                output_dir.display()
            ))
        })?;
        if files.is_empty() {
            tracing::warn!(input = %input_dir.display(), "No documents to convert");
        }

        let mut converted = Vec::new();
        let mut failed = Vec::new();
        for file in files {
            tracing::debug!(file = %file.display(), converter = %self.program, "Converting");
            match self.convert_file(&file, output_dir).await {
                Ok(pdf) => {
                    tracing::info!(file = %file.display(), pdf = %pdf.display(), "Converted");
                    converted.push(pdf);
                }
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "Conversion failed");
                    failed.push(ConversionFailure {
                        path: file,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(PdfReport {
            output_dir: output_dir.to_path_buf(),
            converted,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(dir: &Path) {
        for name in ["b.docx", "a.docx", "~$a.docx", "readme.md"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
    }

    #[test]
    fn arguments_follow_soffice_convention() {
        let converter = PdfConverter::new("soffice");
        let args = converter.args(Path::new("docs/rose.docx"), Path::new("final"));
        assert_eq!(
            args,
            ["--headless", "--convert-to", "pdf", "--outdir", "final", "docs/rose.docx"]
                .map(OsString::from)
        );
    }

    #[tokio::test]
    async fn missing_converter_fails_each_file_not_the_run() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("docs");
        fs::create_dir(&input).unwrap();
        seed(&input);
        let output = root.path().join("final");

        let report = PdfConverter::new("qrdoc-no-such-converter")
            .convert_folder(&input, &output)
            .await
            .unwrap();
        assert!(output.is_dir());
        assert!(report.converted.is_empty());
        let failed: Vec<_> = report.failed.iter().map(|f| f.path.clone()).collect();
        assert_eq!(failed, [input.join("a.docx"), input.join("b.docx")]);
    }

    #[tokio::test]
    async fn missing_input_folder_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let err = PdfConverter::new("soffice")
            .convert_folder(&root.path().join("nope"), &root.path().join("final"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn converter_exit_status_decides_success() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("docs");
        fs::create_dir(&input).unwrap();
        seed(&input);
        let output = root.path().join("final");

        // Stand-in converter: writes `<outdir>/<stem>.pdf`, fails for `b`.
        let script = root.path().join("fake-soffice");
        fs::write(
            &script,
            "#!/bin/sh\nstem=$(basename \"$6\" .docx)\n[ \"$stem\" = b ] && { echo broken >&2; exit 3; }\necho pdf > \"$5/$stem.pdf\"\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let report = PdfConverter::new(script.to_string_lossy())
            .convert_folder(&input, &output)
            .await
            .unwrap();
        assert_eq!(report.converted, [output.join("a.pdf")]);
        assert!(output.join("a.pdf").is_file());
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("broken"));
    }
}
