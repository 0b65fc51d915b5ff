//! Report writing for batch validation

use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::validator::ValidationResult;

/// Outcome of validating one document in a batch
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub path: PathBuf,
    /// Validation result, or the error message when extraction failed
    pub outcome: std::result::Result<ValidationResult, String>,
}

impl BatchEntry {
    pub fn is_match(&self) -> bool {
        matches!(&self.outcome, Ok(result) if result.is_match())
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(&self.outcome, Ok(result) if !result.is_match())
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Context printed in the report header
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    pub reference: &'a str,
    pub tolerance: u32,
}

/// Write batch validation results to a file
///
/// # Arguments
/// * `output_path` - Path to output file
/// * `header` - Active reference and tolerance used
/// * `entries` - One entry per validated document
pub fn write_report(output_path: &Path, header: &ReportHeader<'_>, entries: &[BatchEntry]) -> Result<()> {
    let mut file = File::create(output_path)?;

    let now = std::time::SystemTime::now();
    writeln!(file, "PDF Fingerprint Validation Report")?;
    writeln!(file, "=================================")?;
    writeln!(file, "Generated: {:?}", now)?;
    writeln!(file, "Reference: {}", header.reference)?;
    writeln!(file, "Position tolerance: {} px", header.tolerance)?;
    writeln!(file)?;

    let matched = entries.iter().filter(|e| e.is_match()).count();
    let mismatched = entries.iter().filter(|e| e.is_mismatch()).count();
    let failed = entries.iter().filter(|e| e.is_failure()).count();

    writeln!(file, "Summary Statistics:")?;
    writeln!(file, "-------------------")?;
    writeln!(file, "  Total documents: {}", entries.len())?;
    writeln!(file, "  Matching: {}", matched)?;
    writeln!(file, "  Mismatched: {}", mismatched)?;
    writeln!(file, "  Failed to extract: {}", failed)?;

    if !entries.is_empty() {
        let match_pct = (matched as f64 / entries.len() as f64) * 100.0;
        writeln!(file, "  Match rate: {:.2}%", match_pct)?;
    }
    writeln!(file)?;

    if mismatched > 0 {
        writeln!(file, "Mismatched Documents:")?;
        writeln!(file, "---------------------")?;
        for entry in entries.iter().filter(|e| e.is_mismatch()) {
            writeln!(file, "  {}", format_entry(entry))?;
        }
        writeln!(file)?;
    }

    if failed > 0 {
        writeln!(file, "Extraction Failures:")?;
        writeln!(file, "--------------------")?;
        for entry in entries.iter().filter(|e| e.is_failure()) {
            writeln!(file, "  {}", format_entry(entry))?;
        }
        writeln!(file)?;
    }

    writeln!(file, "Matching Documents:")?;
    writeln!(file, "-------------------")?;
    for entry in entries.iter().filter(|e| e.is_match()) {
        writeln!(file, "  {}", entry.path.display())?;
    }

    Ok(())
}

/// One-line rendering of a batch entry, shared by the report and the console summary
pub fn format_entry(entry: &BatchEntry) -> String {
    match &entry.outcome {
        Ok(result) if result.is_match() => format!("MATCH: {}", entry.path.display()),
        Ok(result) => format!("MISMATCH: {} ({})", entry.path.display(), result),
        Err(message) => format!("ERROR: {} ({})", entry.path.display(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn result(text: bool, barcode: bool, position: bool) -> ValidationResult {
        ValidationResult {
            text_match: text,
            barcode_match: barcode,
            position_match: position,
        }
    }

    fn entries() -> Vec<BatchEntry> {
        vec![
            BatchEntry {
                path: PathBuf::from("/scans/good.pdf"),
                outcome: Ok(result(true, true, true)),
            },
            BatchEntry {
                path: PathBuf::from("/scans/shifted.pdf"),
                outcome: Ok(result(true, true, false)),
            },
            BatchEntry {
                path: PathBuf::from("/scans/broken.pdf"),
                outcome: Err("document could not be opened".to_string()),
            },
        ]
    }

    #[test]
    fn test_write_report() {
        let temp_file = NamedTempFile::new().unwrap();
        let header = ReportHeader {
            reference: "reference.json",
            tolerance: 5,
        };

        write_report(temp_file.path(), &header, &entries()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Reference: reference.json"));
        assert!(content.contains("Total documents: 3"));
        assert!(content.contains("Matching: 1"));
        assert!(content.contains("Mismatched: 1"));
        assert!(content.contains("Failed to extract: 1"));
        assert!(content.contains(
            "MISMATCH: /scans/shifted.pdf (Text: true, Barcodes: true, Positions: false)"
        ));
        assert!(content.contains("ERROR: /scans/broken.pdf (document could not be opened)"));
    }

    #[test]
    fn test_format_entry_match() {
        let entry = &entries()[0];
        assert_eq!(format_entry(entry), "MATCH: /scans/good.pdf");
    }
}
