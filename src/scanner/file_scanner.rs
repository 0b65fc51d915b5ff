//! Discovery of candidate PDF documents

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect all PDF files from a directory
///
/// # Arguments
/// * `dir` - Directory to scan
/// * `recursive` - Whether to scan subdirectories recursively
///
/// # Returns
/// PDF file paths sorted by path, so menu numbering is stable between runs
pub fn collect_pdf_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut pdf_files = Vec::new();

    if recursive {
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() && is_pdf(entry.path()) {
                pdf_files.push(entry.path().to_path_buf());
            }
        }
    } else {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() && is_pdf(&entry.path()) {
                pdf_files.push(entry.path());
            }
        }
    }

    pdf_files.sort();
    Ok(pdf_files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_collect_pdf_files_non_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let pdf_path = temp_dir.path().join("test.pdf");
        File::create(&pdf_path).unwrap();
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        let files = collect_pdf_files(temp_dir.path(), false).unwrap();
        assert_eq!(files, vec![pdf_path]);
    }

    #[test]
    fn test_collect_pdf_files_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let subdir = temp_dir.path().join("subdir");
        fs::create_dir(&subdir).unwrap();

        let pdf1 = temp_dir.path().join("test1.pdf");
        let pdf2 = subdir.join("test2.pdf");
        File::create(&pdf1).unwrap();
        File::create(&pdf2).unwrap();

        let files = collect_pdf_files(temp_dir.path(), true).unwrap();
        assert_eq!(files.len(), 2);

        let flat = collect_pdf_files(temp_dir.path(), false).unwrap();
        assert_eq!(flat, vec![pdf1]);
    }

    #[test]
    fn test_extension_is_case_insensitive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let upper = temp_dir.path().join("b_SCAN.PDF");
        let lower = temp_dir.path().join("a_invoice.pdf");
        File::create(&upper).unwrap();
        File::create(&lower).unwrap();

        let files = collect_pdf_files(temp_dir.path(), false).unwrap();
        assert_eq!(files, vec![lower, upper]);
    }
}
