//! Placeholder substitution in DOCX templates
//!
//! A [`Template`] holds the template file's bytes and hands out a freshly
//! parsed document per record, so nothing filled for one row can leak into
//! the next. [`TemplateFiller`] rewrites `{column}` (or `{{column}}`) tokens
//! in body paragraphs and table cells, and swaps the image token for an
//! inline picture or a fallback string.

use crate::assets::AssetOutcome;
use crate::document;
use crate::error::{Error, Result};
use crate::records::Record;
use docx_rs::{Docx, Paragraph, ParagraphChild, Pic, Run, RunChild};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Token syntax around column names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `{column}`
    #[default]
    Single,
    /// `{{column}}` or `{{ column }}`
    Double,
}

impl PlaceholderStyle {
    /// Every literal spelling of the token for `name`.
    pub fn tokens(self, name: &str) -> Vec<String> {
        match self {
            PlaceholderStyle::Single => vec![format!("{{{name}}}")],
            PlaceholderStyle::Double => {
                vec![format!("{{{{{name}}}}}"), format!("{{{{ {name} }}}}")]
            }
        }
    }
}

/// A template file loaded once and instantiated per record
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Template {
    /// Read the template and check that it parses.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            Error::Input(format!("Cannot read template {}: {e}", path.display()))
        })?;
        let template = Self::from_bytes(path, bytes)?;
        tracing::debug!(path = %path.display(), "Loaded template");
        Ok(template)
    }

    /// Wrap DOCX bytes; `path` is only used in messages.
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = path.into();
        document::parse(&bytes).map_err(|e| {
            Error::Input(format!("Template {} is not a valid DOCX: {e}", path.display()))
        })?;
        Ok(Self { path, bytes })
    }

    /// Where the template came from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh, independent copy of the template document.
    pub fn instantiate(&self) -> Result<Docx> {
        document::parse(&self.bytes)
    }
}

/// Whether any paragraph of `docx` contains one of `tokens`.
pub fn mentions_any(docx: &Docx, tokens: &[String]) -> bool {
    let mut found = false;
    document::for_each_paragraph(docx, &mut |p| {
        if !found {
            let text = document::paragraph_text(p);
            found = tokens.iter().any(|token| text.contains(token.as_str()));
        }
    });
    found
}

/// Image to place where the image token appears
#[derive(Debug)]
pub struct ImageSlot<'a> {
    /// Literal token spellings to look for
    pub tokens: Vec<String>,
    /// Resolved image or the reason it failed
    pub outcome: &'a AssetOutcome,
}

/// What a fill changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillSummary {
    /// Text tokens replaced, counted once per paragraph and column
    pub replacements: usize,
    /// Inline images inserted
    pub images: usize,
    /// Fallback strings written in place of images
    pub fallbacks: Vec<&'static str>,
}

/// Substitutes record values into a template document
#[derive(Debug, Clone)]
pub struct TemplateFiller {
    style: PlaceholderStyle,
    image_key: Option<String>,
    excluded: Vec<String>,
    image_width_mm: f32,
}

impl TemplateFiller {
    /// Filler for `style` tokens; images are inserted `image_width_mm` wide.
    pub fn new(style: PlaceholderStyle, image_width_mm: f32) -> Self {
        Self {
            style,
            image_key: None,
            excluded: Vec::new(),
            image_width_mm,
        }
    }

    /// Reserve `key` as the image token; a record column of that name is never
    /// substituted as text.
    pub fn with_image_key(mut self, key: impl Into<String>) -> Self {
        self.image_key = Some(key.into());
        self
    }

    /// Columns that are never substituted.
    pub fn with_excluded<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Token spellings for the image key, if one is reserved.
    pub fn image_tokens(&self) -> Option<Vec<String>> {
        self.image_key.as_deref().map(|key| self.style.tokens(key))
    }

    /// Replace every token in `docx` with `record`'s values and place `image`.
    pub fn fill(&self, docx: &mut Docx, record: &Record, image: Option<&ImageSlot<'_>>) -> FillSummary {
        let substitutions: Vec<(Vec<String>, String)> = record
            .iter()
            .filter(|(column, _)| !self.is_reserved(column))
            .map(|(column, value)| (self.style.tokens(column), document::escape_text(value)))
            .collect();

        let mut summary = FillSummary::default();
        document::for_each_paragraph_mut(docx, &mut |paragraph| {
            if let Some(slot) = image {
                if self.place_image(paragraph, slot, &mut summary) {
                    return;
                }
            }
            for (tokens, value) in &substitutions {
                for token in tokens {
                    if replace_in_paragraph(paragraph, token, value) {
                        summary.replacements += 1;
                    }
                }
            }
        });
        summary
    }

    fn is_reserved(&self, column: &str) -> bool {
        let is_image = self
            .image_key
            .as_deref()
            .is_some_and(|key| key.eq_ignore_ascii_case(column));
        is_image || self.excluded.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Clear a paragraph holding the image token and put the picture (or its
    /// fallback text) in its place. Returns whether the paragraph was taken.
    fn place_image(&self, paragraph: &mut Paragraph, slot: &ImageSlot<'_>, summary: &mut FillSummary) -> bool {
        let text = document::paragraph_text(paragraph);
        if !slot.tokens.iter().any(|token| text.contains(token.as_str())) {
            return false;
        }

        paragraph
            .children
            .retain(|child| !matches!(child, ParagraphChild::Run(_)));

        let run = match slot.outcome {
            Ok(asset) => {
                let (width, height) = asset.extent_emu(self.image_width_mm);
                summary.images += 1;
                Run::new().add_image(Pic::new(&asset.png).size(width, height))
            }
            Err(err) => {
                summary.fallbacks.push(err.placeholder());
                Run::new().add_text(err.placeholder())
            }
        };
        paragraph.children.push(ParagraphChild::Run(Box::new(run)));
        true
    }
}

/// Replace `token` with `value` (already escaped) in one paragraph.
///
/// Tokens inside a single run are replaced in place so the run keeps its
/// formatting; a token split across runs collapses the paragraph's text into
/// its first text node.
fn replace_in_paragraph(paragraph: &mut Paragraph, token: &str, value: &str) -> bool {
    if !document::paragraph_text(paragraph).contains(token) {
        return false;
    }

    for text in text_nodes(paragraph) {
        if text.text.contains(token) {
            text.text = text.text.replace(token, value);
            text.preserve_space = true;
        }
    }

    let joined = document::paragraph_text(paragraph);
    if joined.contains(token) {
        let collapsed = joined.replace(token, value);
        let mut first = true;
        for text in text_nodes(paragraph) {
            text.text = if first { collapsed.clone() } else { String::new() };
            text.preserve_space = true;
            first = false;
        }
    }
    true
}

fn text_nodes(paragraph: &mut Paragraph) -> impl Iterator<Item = &mut docx_rs::Text> {
    paragraph.children.iter_mut().flat_map(|child| match child {
        ParagraphChild::Run(run) => run
            .children
            .iter_mut()
            .filter_map(|c| match c {
                RunChild::Text(text) => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Asset;
    use crate::error::AssetError;
    use docx_rs::{Table, TableCell, TableRow};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn template_doc() -> Docx {
        Docx::new()
            .add_paragraph(para("Common name: {name}"))
            .add_paragraph(para("{image}"))
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new().add_paragraph(para("Family")),
                TableCell::new().add_paragraph(para("{family} / {name}")),
            ])]))
            .add_paragraph(para("Unrelated {{name}} stays"))
    }

    fn record() -> Record {
        Record::new([("name", "Rose"), ("family", "Rosaceae"), ("image", "rose.png")])
    }

    fn asset() -> Asset {
        let mut buf = Vec::new();
        RgbImage::from_pixel(20, 10, Rgb([255, 0, 0]))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        Asset::from_bytes(&buf).unwrap()
    }

    fn filler() -> TemplateFiller {
        TemplateFiller::new(PlaceholderStyle::Single, 38.1).with_image_key("image")
    }

    #[test]
    fn double_style_accepts_inner_spaces() {
        assert_eq!(
            PlaceholderStyle::Double.tokens("qrcode"),
            ["{{qrcode}}", "{{ qrcode }}"]
        );
        assert_eq!(PlaceholderStyle::Single.tokens("name"), ["{name}"]);
    }

    #[test]
    fn text_tokens_replaced_everywhere_else_untouched() {
        let mut docx = Docx::new()
            .add_paragraph(para("Common name: {name}"))
            .add_paragraph(para("No tokens here"))
            .add_table(Table::new(vec![TableRow::new(vec![TableCell::new()
                .add_paragraph(para("{family} / {name}"))])]));
        let summary = filler().fill(&mut docx, &record(), None);

        assert_eq!(
            document::paragraph_texts(&docx),
            ["Common name: Rose", "No tokens here", "Rosaceae / Rose"]
        );
        assert_eq!(summary.replacements, 3);
        assert_eq!(document::image_count(&docx), 0);
    }

    #[test]
    fn resolved_image_replaces_token() {
        let mut docx = template_doc();
        let outcome: AssetOutcome = Ok(asset());
        let slot = ImageSlot {
            tokens: PlaceholderStyle::Single.tokens("image"),
            outcome: &outcome,
        };
        let summary = filler().fill(&mut docx, &record(), Some(&slot));

        assert_eq!(summary.images, 1);
        assert!(summary.fallbacks.is_empty());
        assert_eq!(document::image_count(&docx), 1);
        let texts = document::paragraph_texts(&docx);
        assert!(texts.iter().all(|t| !t.contains("{image}")));
        // Single-brace filling leaves double-brace text alone apart from the inner token.
        assert_eq!(texts.last().unwrap(), "Unrelated {Rose} stays");
    }

    #[test]
    fn failed_image_writes_fallback_text() {
        let mut docx = template_doc();
        let outcome: AssetOutcome = Err(AssetError::FetchFailed("HTTP 404".into()));
        let slot = ImageSlot {
            tokens: PlaceholderStyle::Single.tokens("image"),
            outcome: &outcome,
        };
        let summary = filler().fill(&mut docx, &record(), Some(&slot));

        assert_eq!(summary.fallbacks, ["[Image fetch failed]"]);
        assert_eq!(document::image_count(&docx), 0);
        assert!(
            document::paragraph_texts(&docx)
                .iter()
                .any(|t| t == "[Image fetch failed]")
        );
    }

    #[test]
    fn image_column_is_never_text() {
        let mut docx = Docx::new().add_paragraph(para("{image}"));
        filler().fill(&mut docx, &record(), None);
        assert_eq!(document::paragraph_texts(&docx), ["{image}"]);
    }

    #[test]
    fn split_token_collapses_into_first_run() {
        let mut docx = Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Dear {na").bold())
                .add_run(Run::new().add_text("me},")),
        );
        filler().fill(&mut docx, &record(), None);
        assert_eq!(document::paragraph_texts(&docx), ["Dear Rose,"]);
    }

    #[test]
    fn token_inside_one_run_keeps_other_runs() {
        let mut docx = Docx::new().add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Name: ").bold())
                .add_run(Run::new().add_text("{name}")),
        );
        filler().fill(&mut docx, &record(), None);

        let texts: Vec<String> = match &docx.document.children[0] {
            docx_rs::DocumentChild::Paragraph(p) => p
                .children
                .iter()
                .filter_map(|c| match c {
                    ParagraphChild::Run(run) => Some(
                        run.children
                            .iter()
                            .filter_map(|rc| match rc {
                                RunChild::Text(t) => Some(t.text.clone()),
                                _ => None,
                            })
                            .collect::<String>(),
                    ),
                    _ => None,
                })
                .collect(),
            _ => panic!("expected paragraph"),
        };
        assert_eq!(texts, ["Name: ", "Rose"]);
    }

    #[test]
    fn excluded_columns_stay_as_tokens() {
        let mut docx = Docx::new().add_paragraph(para("{{name}} {{ family }}"));
        let filler = TemplateFiller::new(PlaceholderStyle::Double, 40.0)
            .with_image_key("qrcode")
            .with_excluded(["name"]);
        filler.fill(&mut docx, &record(), None);
        assert_eq!(document::paragraph_texts(&docx), ["{{name}} Rosaceae"]);
    }

    #[test]
    fn values_are_escaped_for_xml() {
        let mut docx = Docx::new().add_paragraph(para("{name}"));
        let record = Record::new([("name", "Salt & Pepper")]);
        filler().fill(&mut docx, &record, None);
        assert_eq!(document::paragraph_texts(&docx), ["Salt &amp; Pepper"]);
    }

    #[test]
    fn instantiations_are_independent() {
        let bytes = document::to_bytes(template_doc()).unwrap();
        let template = Template::from_bytes("memory.docx", bytes).unwrap();

        let mut first = template.instantiate().unwrap();
        filler().fill(&mut first, &record(), None);
        let second = template.instantiate().unwrap();

        let image_tokens = filler().image_tokens().unwrap();
        assert!(mentions_any(&second, &image_tokens));
        assert!(
            document::paragraph_texts(&second)
                .iter()
                .any(|t| t.contains("{name}"))
        );
    }

    #[test]
    fn invalid_template_is_input_error() {
        let err = Template::from_bytes("bad.docx", b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
