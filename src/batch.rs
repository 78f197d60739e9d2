//! Per-record document generation
//!
//! The driver walks records strictly in order. Each record gets its own
//! template instance, its own asset lookup and its own output file; a failure
//! in one record is written into the report and the loop moves on.

use crate::assets::{AssetOutcome, AssetResolver};
use crate::config::BatchOptions;
use crate::document;
use crate::error::Result;
use crate::naming;
use crate::records::{Record, RecordSet};
use crate::template::{ImageSlot, PlaceholderStyle, Template, TemplateFiller, mentions_any};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which template token receives an image and which column feeds it
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBinding {
    /// Token name in the template, e.g. `image` for `{image}`
    pub key: String,
    /// Columns tried in order (case-insensitive) for the image reference
    pub columns: Vec<String>,
}

/// How a batch names, fills and places its outputs
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    /// Output directory (or its base name when `unique_dir` is set)
    pub output_dir: PathBuf,
    /// Suffix the directory name instead of reusing an existing one
    pub unique_dir: bool,
    /// Columns tried in order for each record's file name
    pub name_columns: Vec<String>,
    /// Columns that must exist besides the name column
    pub required_columns: Vec<String>,
    /// Columns never substituted as text
    pub excluded_columns: Vec<String>,
    /// Token syntax in the template
    pub placeholder_style: PlaceholderStyle,
    /// Image token, if the template gets one
    pub image: Option<ImageBinding>,
    /// Inserted image width
    pub image_width_mm: f32,
}

impl BatchSettings {
    /// Monograph filling: `{column}` tokens, an `{image}` token fed by the
    /// `image` (or `url`) column and a fresh `monographs`, `monographs1`, ... folder per run.
    pub fn monographs(options: &BatchOptions) -> Self {
        Self {
            output_dir: options.output_dir.clone(),
            unique_dir: options.unique_dir,
            name_columns: vec!["filename".into(), "name".into()],
            required_columns: Vec::new(),
            excluded_columns: Vec::new(),
            placeholder_style: options.placeholder_style,
            image: Some(ImageBinding {
                key: "image".into(),
                columns: vec!["image".into(), "url".into()],
            }),
            image_width_mm: options.image_width_mm,
        }
    }

    /// QR merging: `{{column}}` tokens, a `{{qrcode}}` token rendered from
    /// the `url` column, one file per `name` in `output_dir`.
    pub fn qr_merge(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            unique_dir: false,
            name_columns: vec!["name".into()],
            required_columns: vec!["url".into()],
            excluded_columns: vec!["name".into(), "url".into()],
            placeholder_style: PlaceholderStyle::Double,
            image: Some(ImageBinding {
                key: "qrcode".into(),
                columns: vec!["url".into()],
            }),
            image_width_mm: 40.0,
        }
    }

    fn filler(&self) -> TemplateFiller {
        let filler = TemplateFiller::new(self.placeholder_style, self.image_width_mm)
            .with_excluded(self.excluded_columns.iter().cloned());
        match &self.image {
            Some(binding) => filler.with_image_key(binding.key.clone()),
            None => filler,
        }
    }
}

/// Result of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    /// Document written, possibly with an image fallback in it
    Saved {
        /// Where the document went
        path: PathBuf,
        /// Asset problem that left fallback text in the document
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    /// Nothing written for this record
    Failed {
        /// Why
        reason: String,
    },
}

/// One record's entry in a [`BatchReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    /// 1-based position among the data rows
    pub index: usize,
    /// CSV line the row came from
    pub line: u64,
    /// Value of the name column
    pub name: String,
    /// What happened
    #[serde(flatten)]
    pub status: RecordStatus,
}

impl RecordOutcome {
    /// Whether a file was written
    pub fn is_saved(&self) -> bool {
        matches!(self.status, RecordStatus::Saved { .. })
    }
}

/// Everything a batch run did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Directory the documents were written to
    pub output_dir: PathBuf,
    /// One entry per record, in input order
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    /// Records that produced a file
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    /// Records that produced a file with fallback text in place of the image
    pub fn warnings(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.status, RecordStatus::Saved { warning: Some(_), .. }))
            .count()
    }

    /// Records that produced nothing
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}

/// Drives a template over a record set
pub struct BatchDriver {
    settings: BatchSettings,
    resolver: Option<Box<dyn AssetResolver>>,
}

impl BatchDriver {
    /// Driver without an asset resolver; image tokens resolve to nothing.
    pub fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            resolver: None,
        }
    }

    /// Resolve image references with `resolver`.
    pub fn with_resolver(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Run the whole batch.
    pub async fn run(&self, template: &Template, records: &RecordSet) -> Result<BatchReport> {
        self.run_with(template, records, |_| {}).await
    }

    /// Run the whole batch, calling `on_outcome` as each record finishes.
    ///
    /// Only input problems (missing columns) and an uncreatable output
    /// directory fail the run; everything per-record lands in the report.
    pub async fn run_with<F>(
        &self,
        template: &Template,
        records: &RecordSet,
        mut on_outcome: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&RecordOutcome),
    {
        let settings = &self.settings;
        let name_candidates: Vec<&str> = settings.name_columns.iter().map(String::as_str).collect();
        let name_column = records.require_column(&name_candidates)?;
        for required in &settings.required_columns {
            records.require_column(&[required.as_str()])?;
        }

        let filler = settings.filler();
        let image_plan = self.image_plan(template, records, &filler)?;

        let output_dir = naming::prepare_dir(&settings.output_dir, settings.unique_dir)?;
        tracing::info!(
            template = %template.path().display(),
            records = records.len(),
            columns = ?records.headers(),
            output_dir = %output_dir.display(),
            "Starting batch"
        );

        let mut outcomes = Vec::with_capacity(records.len());
        for (index, record) in records.records().iter().enumerate() {
            let name = record.get(&name_column).unwrap_or_default().to_string();
            let status = match record.problem() {
                Some(problem) => {
                    tracing::warn!(record = index + 1, %problem, "Skipping malformed row");
                    RecordStatus::Failed {
                        reason: problem.to_string(),
                    }
                }
                None => {
                    self.process(template, &filler, image_plan.as_ref(), record, &name, &output_dir)
                        .await
                }
            };
            let outcome = RecordOutcome {
                index: index + 1,
                line: record.line(),
                name,
                status,
            };
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        let report = BatchReport {
            output_dir,
            outcomes,
        };
        tracing::info!(
            saved = report.saved(),
            warnings = report.warnings(),
            failed = report.failed(),
            "Batch finished"
        );
        Ok(report)
    }

    /// Decide once whether images are placed at all: the template must hold
    /// the image token and a resolver must be attached.
    fn image_plan(
        &self,
        template: &Template,
        records: &RecordSet,
        filler: &TemplateFiller,
    ) -> Result<Option<ImagePlan<'_>>> {
        let (Some(binding), Some(resolver)) = (&self.settings.image, &self.resolver) else {
            return Ok(None);
        };
        let tokens = filler.image_tokens().unwrap_or_default();
        if !mentions_any(&template.instantiate()?, &tokens) {
            tracing::debug!(key = %binding.key, "Template has no image token");
            return Ok(None);
        }

        let candidates: Vec<&str> = binding.columns.iter().map(String::as_str).collect();
        let column = records.column(&candidates).map(str::to_string);
        if column.is_none() {
            tracing::warn!(columns = ?binding.columns, "No image column; images will be left as fallbacks");
        }
        Ok(Some(ImagePlan {
            tokens,
            column,
            resolver: &**resolver,
        }))
    }

    async fn process(
        &self,
        template: &Template,
        filler: &TemplateFiller,
        image_plan: Option<&ImagePlan<'_>>,
        record: &Record,
        name: &str,
        output_dir: &Path,
    ) -> RecordStatus {
        let mut docx = match template.instantiate() {
            Ok(docx) => docx,
            Err(e) => return RecordStatus::Failed { reason: e.to_string() },
        };

        let asset: Option<AssetOutcome> = match image_plan {
            Some(plan) => Some(plan.resolve(record).await),
            None => None,
        };
        let slot = match (image_plan, &asset) {
            (Some(plan), Some(outcome)) => Some(ImageSlot {
                tokens: plan.tokens.clone(),
                outcome,
            }),
            _ => None,
        };
        let summary = filler.fill(&mut docx, record, slot.as_ref());

        let warning = match &asset {
            Some(Err(e)) => {
                tracing::warn!(record = %name, error = %e, "Image not embedded");
                Some(e.to_string())
            }
            _ => None,
        };

        let path = naming::next_free_file(output_dir, name);
        match document::save(docx, &path) {
            Ok(()) => {
                tracing::info!(
                    record = %name,
                    path = %path.display(),
                    replacements = summary.replacements,
                    images = summary.images,
                    "Saved document"
                );
                RecordStatus::Saved { path, warning }
            }
            Err(e) => {
                tracing::error!(record = %name, error = %e, "Failed to save document");
                RecordStatus::Failed { reason: e.to_string() }
            }
        }
    }
}

struct ImagePlan<'a> {
    tokens: Vec<String>,
    column: Option<String>,
    resolver: &'a dyn AssetResolver,
}

impl ImagePlan<'_> {
    async fn resolve(&self, record: &Record) -> AssetOutcome {
        let reference = self
            .column
            .as_deref()
            .and_then(|column| record.get(column))
            .unwrap_or_default();
        tracing::debug!(kind = self.resolver.kind(), %reference, "Resolving image");
        self.resolver.resolve(reference).await
    }
}
