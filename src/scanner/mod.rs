//! Document discovery

pub mod file_scanner;

pub use file_scanner::collect_pdf_files;
