//! Batch validation reports

pub mod report_writer;

pub use report_writer::{format_entry, write_report, BatchEntry, ReportHeader};
