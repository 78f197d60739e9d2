//! Collision-free output paths
//!
//! Nothing here is locked; callers are expected to pick a name and write it
//! before asking for the next one.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "docx";
const FALLBACK_STEM: &str = "document";

/// First of `base`, `base1`, `base2`, ... that does not exist yet.
pub fn next_free_dir(base: &Path) -> PathBuf {
    // `monographs/` and `monographs` name the same directory.
    let base: PathBuf = base.components().collect();
    if !base.exists() {
        return base;
    }

    let mut counter = 1u32;
    loop {
        let mut name = OsString::from(base.as_os_str());
        name.push(counter.to_string());
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Create the output directory, suffixing the name when `unique` and it
/// already exists.
pub fn prepare_dir(base: &Path, unique: bool) -> Result<PathBuf> {
    let dir = if unique {
        next_free_dir(base)
    } else {
        base.to_path_buf()
    };
    fs::create_dir_all(&dir).map_err(|e| {
        Error::Write(format!("Cannot create output directory {}: {e}", dir.display()))
    })?;
    tracing::debug!(dir = %dir.display(), "Output directory ready");
    Ok(dir)
}

/// Make a record-supplied name safe to use as a single path component.
///
/// Separators become `_`, surrounding whitespace is dropped and a `.docx`
/// extension is added when missing.
pub fn sanitize_file_name(desired: &str) -> String {
    let cleaned: String = desired
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = match cleaned.as_str() {
        "" | "." | ".." => FALLBACK_STEM.to_string(),
        _ => cleaned,
    };

    let has_extension = Path::new(&cleaned)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DEFAULT_EXTENSION));
    if has_extension {
        cleaned
    } else {
        format!("{cleaned}.{DEFAULT_EXTENSION}")
    }
}

/// A path in `dir` for `desired` that does not exist yet: `name.docx`, then
/// `name(1).docx`, `name(2).docx`, ...
///
/// Calling it again without writing returns the same path.
pub fn next_free_file(dir: &Path, desired: &str) -> PathBuf {
    let file_name = sanitize_file_name(desired);
    let first = dir.join(&file_name);
    if !first.exists() {
        return first;
    }

    let path = Path::new(&file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}({counter}).{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_suffix_counts_up() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("monographs");

        assert_eq!(next_free_dir(&base), base);
        fs::create_dir(&base).unwrap();
        assert_eq!(next_free_dir(&base), root.path().join("monographs1"));
        fs::create_dir(root.path().join("monographs1")).unwrap();
        assert_eq!(next_free_dir(&base), root.path().join("monographs2"));
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("out")).unwrap();
        let with_slash = PathBuf::from(format!("{}/out/", root.path().display()));
        assert_eq!(next_free_dir(&with_slash), root.path().join("out1"));
    }

    #[test]
    fn prepare_dir_reuses_when_not_unique() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("docs");
        assert_eq!(prepare_dir(&base, false).unwrap(), base);
        assert_eq!(prepare_dir(&base, false).unwrap(), base);
        assert_eq!(prepare_dir(&base, true).unwrap(), root.path().join("docs1"));
        assert!(root.path().join("docs1").is_dir());
    }

    #[test]
    fn file_suffix_is_idempotent_until_written() {
        let dir = tempfile::tempdir().unwrap();
        let first = next_free_file(dir.path(), "rose");
        assert_eq!(first, dir.path().join("rose.docx"));
        fs::write(&first, b"x").unwrap();

        let second = next_free_file(dir.path(), "rose");
        assert_eq!(second, dir.path().join("rose(1).docx"));
        assert_eq!(next_free_file(dir.path(), "rose.docx"), second);
        fs::write(&second, b"x").unwrap();

        assert_eq!(next_free_file(dir.path(), "rose"), dir.path().join("rose(2).docx"));
    }

    #[test]
    fn names_cannot_escape_the_directory() {
        assert_eq!(sanitize_file_name("../etc/passwd"), ".._etc_passwd.docx");
        assert_eq!(sanitize_file_name("a\\b"), "a_b.docx");
        assert_eq!(sanitize_file_name("  "), "document.docx");
        assert_eq!(sanitize_file_name(".."), "document.docx");
        assert_eq!(sanitize_file_name("Report.DOCX"), "Report.DOCX");
        assert_eq!(sanitize_file_name("v1.2"), "v1.2.docx");
    }
}
