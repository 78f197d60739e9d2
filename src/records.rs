//! CSV row source
//!
//! Every row becomes a [`Record`]: the row's cells paired with the header
//! names, in column order, kept as the text the CSV holds.

use crate::error::{Error, Result};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One CSV row keyed by column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: Vec<(String, String)>,
    problem: Option<String>,
}

impl Record {
    /// Build a record from `(column, value)` pairs.
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            line: 0,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            problem: None,
        }
    }

    /// Source line in the CSV (1-based, header is line 1); 0 when built by hand.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Value of `column`, matched exactly.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Why the row cannot be used, when its width differs from the header's.
    pub fn problem(&self) -> Option<&str> {
        self.problem.as_deref()
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// All rows of a CSV file plus its header
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    headers: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    /// Read and parse a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Input(format!("Cannot read CSV {}: {e}", path.display())))?;
        Self::from_reader(file).map_err(|e| match e {
            Error::Input(msg) => Error::Input(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse CSV text from any reader.
    ///
    /// A row whose width differs from the header's is kept with a
    /// [`Record::problem`] so the batch can report it and move on.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(Error::Input("CSV has no header row".to_string()));
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let problem = (row.len() != headers.len()).then(|| {
                format!(
                    "CSV line {line}: expected {} fields, found {}",
                    headers.len(),
                    row.len()
                )
            });
            if let Some(problem) = &problem {
                tracing::warn!(%problem, "Malformed CSV row");
            }
            let fields = headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect();
            records.push(Record {
                line,
                fields,
                problem,
            });
        }

        tracing::debug!(columns = headers.len(), rows = records.len(), "Parsed CSV");
        Ok(Self { headers, records })
    }

    /// Column names in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Parsed rows in file order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the file had no data rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First header equal (ignoring case) to one of `candidates`, tried in order.
    pub fn column(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .find(|h| h.eq_ignore_ascii_case(candidate))
                .map(String::as_str)
        })
    }

    /// Like [`RecordSet::column`], but a missing column is an input error.
    pub fn require_column(&self, candidates: &[&str]) -> Result<String> {
        self.column(candidates).map(str::to_string).ok_or_else(|| {
            let wanted = candidates
                .iter()
                .map(|c| format!("'{c}'"))
                .collect::<Vec<_>>()
                .join(" or ");
            Error::Input(format!("CSV must have a column named {wanted}"))
        })
    }
}
