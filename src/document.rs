//! DOCX loading, saving and traversal helpers over `docx-rs`

use crate::error::{Error, Result};
use docx_rs::{
    Docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

/// Parse DOCX bytes.
///
/// The reader hands back run text unescaped while the writer emits it as-is,
/// so body text is re-escaped here to match what `Run::add_text` stores.
pub fn parse(bytes: &[u8]) -> Result<Docx> {
    let mut docx = docx_rs::read_docx(bytes).map_err(|e| Error::Docx(format!("{e:?}")))?;
    escape_stored_text(&mut docx);
    Ok(docx)
}

fn escape_stored_text(docx: &mut Docx) {
    for_each_paragraph_mut(docx, &mut |paragraph| {
        for child in paragraph.children.iter_mut() {
            if let ParagraphChild::Run(run) = child {
                for run_child in run.children.iter_mut() {
                    if let RunChild::Text(text) = run_child {
                        text.text = escape_text(&text.text);
                    }
                }
            }
        }
    });
}

/// Read and parse a DOCX file; an unreadable or malformed file is an input error.
pub fn open(path: &Path) -> Result<Docx> {
    let bytes = fs::read(path)
        .map_err(|e| Error::Input(format!("Cannot read {}: {e}", path.display())))?;
    parse(&bytes).map_err(|e| Error::Input(format!("{}: {e}", path.display())))
}

/// Pack a document into DOCX bytes.
pub fn to_bytes(docx: Docx) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| Error::Docx(format!("Failed to pack document: {e}")))?;
    Ok(buf.into_inner())
}

/// Pack a document and write it to `path`.
pub fn save(docx: Docx, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::Write(format!("Cannot create {}: {e}", path.display())))?;
    docx.build()
        .pack(BufWriter::new(file))
        .map_err(|e| Error::Write(format!("Cannot write {}: {e}", path.display())))
}

/// `.docx` files directly inside `dir`, sorted by name, Office lock files
/// (`~$...`) skipped.
pub fn list_docx(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::Input(format!("Cannot read folder {}: {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_docx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        let is_lock = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if is_docx && !is_lock && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Visit every paragraph in the body, including paragraphs inside
/// (nested) table cells, in document order.
pub fn for_each_paragraph_mut(docx: &mut Docx, f: &mut dyn FnMut(&mut Paragraph)) {
    for child in docx.document.children.iter_mut() {
        match child {
            DocumentChild::Paragraph(paragraph) => f(paragraph),
            DocumentChild::Table(table) => walk_table_mut(table, f),
            _ => {}
        }
    }
}

fn walk_table_mut(table: &mut Table, f: &mut dyn FnMut(&mut Paragraph)) {
    for row in table.rows.iter_mut() {
        let TableChild::TableRow(row) = row;
        for cell in row.cells.iter_mut() {
            let TableRowChild::TableCell(cell) = cell;
            for content in cell.children.iter_mut() {
                match content {
                    TableCellContent::Paragraph(paragraph) => f(paragraph),
                    TableCellContent::Table(inner) => walk_table_mut(inner, f),
                    _ => {}
                }
            }
        }
    }
}

/// Read-only counterpart of [`for_each_paragraph_mut`].
pub fn for_each_paragraph(docx: &Docx, f: &mut dyn FnMut(&Paragraph)) {
    for child in docx.document.children.iter() {
        match child {
            DocumentChild::Paragraph(paragraph) => f(paragraph),
            DocumentChild::Table(table) => walk_table(table, f),
            _ => {}
        }
    }
}

fn walk_table(table: &Table, f: &mut dyn FnMut(&Paragraph)) {
    for row in table.rows.iter() {
        let TableChild::TableRow(row) = row;
        for cell in row.cells.iter() {
            let TableRowChild::TableCell(cell) = cell;
            for content in cell.children.iter() {
                match content {
                    TableCellContent::Paragraph(paragraph) => f(paragraph),
                    TableCellContent::Table(inner) => walk_table(inner, f),
                    _ => {}
                }
            }
        }
    }
}

/// Concatenated text of a paragraph's runs, as stored (XML-escaped).
pub fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// Text of every paragraph in document order.
pub fn paragraph_texts(docx: &Docx) -> Vec<String> {
    let mut texts = Vec::new();
    for_each_paragraph(docx, &mut |p| texts.push(paragraph_text(p)));
    texts
}

/// Number of inline drawings (embedded images) in the body.
pub fn image_count(docx: &Docx) -> usize {
    let mut count = 0;
    for_each_paragraph(docx, &mut |p| {
        for child in &p.children {
            if let ParagraphChild::Run(run) = child {
                count += run
                    .children
                    .iter()
                    .filter(|c| matches!(c, RunChild::Drawing(_)))
                    .count();
            }
        }
    });
    count
}

/// Escape text the way `docx-rs` stores run text.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Run, TableCell, TableRow};

    fn sample() -> Docx {
        let inner = Table::new(vec![TableRow::new(vec![
            TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("deep"))),
        ])]);
        Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Hello"))
                    .add_run(Run::new().add_text("World")),
            )
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("cell"))),
                TableCell::new().add_table(inner),
            ])]))
    }

    #[test]
    fn walks_body_and_nested_tables_in_order() {
        assert_eq!(paragraph_texts(&sample()), ["HelloWorld", "cell", "deep"]);
    }

    #[test]
    fn packed_document_parses_back() {
        let bytes = to_bytes(sample()).unwrap();
        let docx = parse(&bytes).unwrap();
        let texts = paragraph_texts(&docx);
        assert!(texts.contains(&"HelloWorld".to_string()));
        assert!(texts.contains(&"deep".to_string()));
    }

    #[test]
    fn reserved_characters_survive_a_round_trip() {
        let docx = Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("R&D <lab>")))
            .add_table(Table::new(vec![TableRow::new(vec![TableCell::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Terms & Conditions")))])]));

        let once = parse(&to_bytes(docx).unwrap()).unwrap();
        assert_eq!(
            paragraph_texts(&once),
            ["R&amp;D &lt;lab&gt;", "Terms &amp; Conditions"]
        );
        // Writing the parsed tree again must still produce readable XML.
        let twice = parse(&to_bytes(once).unwrap()).unwrap();
        assert_eq!(
            paragraph_texts(&twice),
            ["R&amp;D &lt;lab&gt;", "Terms &amp; Conditions"]
        );
    }

    #[test]
    fn garbage_is_not_a_document() {
        assert!(matches!(parse(b"not a zip"), Err(Error::Docx(_))));
    }

    #[test]
    fn listing_skips_lock_files_and_other_types() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.docx", "a.DOCX", "~$a.docx", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.docx")).unwrap();

        let names: Vec<_> = list_docx(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.DOCX", "b.docx"]);
    }

    #[test]
    fn escape_matches_xml_entities() {
        assert_eq!(escape_text("A & B <c>"), "A &amp; B &lt;c&gt;");
    }
}
