use anyhow::{anyhow, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use pdf_fingerprint_rs::backend::{LazyPdfiumLoader, MultiFormatDetector};
use pdf_fingerprint_rs::prelude::*;

#[derive(Parser)]
#[command(name = "pdf_fingerprint_rs")]
#[command(about = "Verify PDF documents against a golden reference fingerprint", long_about = None)]
struct Cli {
    /// Directory containing the PDF documents to choose from
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Scan directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the reference records
    #[arg(long)]
    reference_dir: Option<PathBuf>,

    /// File name for a newly created reference
    #[arg(long)]
    reference_name: Option<String>,

    /// Maximum per-axis barcode position deviation in pixels
    #[arg(short, long)]
    tolerance: Option<u32>,

    /// Active reference selection: name_order or modified_time
    #[arg(long)]
    selection: Option<SelectionRule>,

    /// Rasterization resolution in DPI
    #[arg(long)]
    dpi: Option<f32>,

    /// Directory containing the PDFium shared library
    #[arg(long)]
    pdfium_dir: Option<PathBuf>,

    /// Document to process instead of choosing from a list
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Delete existing references without prompting
    #[arg(long, conflicts_with = "keep_references")]
    delete_references: bool,

    /// Keep existing references and validate without prompting
    #[arg(long)]
    keep_references: bool,

    /// Validate every PDF in the directory against the reference (no prompts)
    #[arg(long)]
    batch: bool,

    /// Batch report filename
    #[arg(short, long, default_value = "fingerprint_report.txt")]
    output: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

type AppSession<'a> = Session<'a, LazyPdfiumLoader, MultiFormatDetector>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let store = config.reference_store();
    let loader = LazyPdfiumLoader::new(cli.pdfium_dir.clone(), config.render_scale());

    println!("PDF Fingerprint Validator");
    println!("Reference directory: {}", store.dir().display());
    println!();

    let session = staged(Session::open(&store, &loader, Extractor::new(MultiFormatDetector::new())))?
        .with_reference_name(config.reference_name.clone())
        .with_tolerance(config.tolerance);

    if cli.batch {
        return run_batch(&cli, &store, &loader, session);
    }

    run_interactive(&cli, &store, &loader, session)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Configuration file (if any) overridden by command-line flags
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => staged(EngineConfig::from_file(path))?,
        None => EngineConfig::default(),
    };

    if let Some(dir) = &cli.reference_dir {
        config.reference_dir = dir.clone();
    }
    if let Some(name) = &cli.reference_name {
        config.reference_name = name.clone();
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(selection) = cli.selection {
        config.selection = selection;
    }
    if let Some(dpi) = cli.dpi {
        config.render_dpi = dpi;
    }

    Ok(config)
}

/// Bind PDFium up front so a missing library is reported before any prompt
fn ensure_extraction(loader: &LazyPdfiumLoader) -> Result<()> {
    loader
        .loader()
        .map(|_| ())
        .map_err(|err| anyhow!("Extraction setup failed: {err}"))
}

/// Attach the failing stage to an engine error
fn staged<T>(result: pdf_fingerprint_rs::Result<T>) -> Result<T> {
    result.map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("{stage} failed"))
    })
}

fn run_interactive(
    cli: &Cli,
    store: &ReferenceStore,
    loader: &LazyPdfiumLoader,
    mut session: AppSession<'_>,
) -> Result<()> {
    let state = session.state();

    let choice = match state {
        SessionState::ReferenceExists => {
            let name = staged(store.latest_name())?.unwrap_or_default();
            println!("ℹ️  Reference found: {}", name);
            let choice = operator_choice(cli)?;
            if choice.is_none() {
                println!("\nℹ️  Answer not recognized, keeping the reference.");
            }
            choice
        }
        SessionState::NoReference => {
            println!("⚠️  No reference found. Validation is impossible without one.");
            None
        }
    };

    let action = decide(state, choice);

    let document = if action.needs_document() {
        ensure_extraction(loader)?;
        let purpose = match action {
            SessionAction::CreateReference => "create the reference",
            _ => "validate",
        };
        match choose_document(cli, purpose)? {
            Some(path) => Some(path),
            None => return Ok(()),
        }
    } else {
        None
    };

    match staged(session.execute(action, document.as_deref()))? {
        SessionOutcome::ReferenceCreated { path, fingerprint } => {
            println!("\n✅ Reference saved: {}", path.display());
            println!(
                "   {} text line(s), {} barcode(s)",
                fingerprint.text().len(),
                fingerprint.barcodes().len()
            );
        }
        SessionOutcome::ReferencesDeleted(count) => {
            println!("\n🗑️  Deleted {} reference(s)", count);
        }
        SessionOutcome::Validated(result) => {
            let verdict = if result.is_match() { "✅ MATCH" } else { "❌ MISMATCH" };
            println!("\n{} - {}", verdict, result);
        }
    }

    Ok(())
}

/// Delete/keep answer from flags, or from the prompt
fn operator_choice(cli: &Cli) -> Result<Option<OperatorChoice>> {
    if cli.delete_references {
        return Ok(Some(OperatorChoice::DeleteReferences));
    }
    if cli.keep_references {
        return Ok(Some(OperatorChoice::KeepReference));
    }

    let answer = prompt("Delete the reference (1) or keep it (2)? Enter 1 or 2: ")?;
    Ok(OperatorChoice::from_answer(&answer))
}

/// Document from `--document`, or picked from a numbered list
fn choose_document(cli: &Cli, purpose: &str) -> Result<Option<PathBuf>> {
    if let Some(document) = &cli.document {
        return Ok(Some(document.clone()));
    }

    let pdf_files = collect_pdf_files(&cli.directory, cli.recursive)
        .with_context(|| format!("Failed to list PDF files in {}", cli.directory.display()))?;

    if pdf_files.is_empty() {
        println!(
            "No PDF files found in {}. Add files and run again.",
            cli.directory.display()
        );
        return Ok(None);
    }

    println!("\nSelect a PDF to {}:", purpose);
    for (idx, path) in pdf_files.iter().enumerate() {
        let name = path.strip_prefix(&cli.directory).unwrap_or(path);
        println!("{}. {}", idx + 1, name.display());
    }

    let answer = prompt("\nEnter file number: ")?;
    let selected = answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| pdf_files.get(idx));

    match selected {
        Some(path) => Ok(Some(path.clone())),
        None => {
            println!("\n❌ Invalid input: expected a number between 1 and {}.", pdf_files.len());
            Ok(None)
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read from stdin")?;
    Ok(answer)
}

fn run_batch(
    cli: &Cli,
    store: &ReferenceStore,
    loader: &LazyPdfiumLoader,
    mut session: AppSession<'_>,
) -> Result<()> {
    if session.state() == SessionState::NoReference {
        return staged(Err(FingerprintError::NoReferenceAvailable));
    }
    ensure_extraction(loader)?;
    let reference_name = staged(store.latest_name())?.unwrap_or_default();

    // Stop after the current document on Ctrl-C
    let shutdown_requested = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown_requested.clone();
    ctrlc::set_handler(move || {
        eprintln!("\n⚠️  Shutdown requested. Finishing current document...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Error setting Ctrl-C handler")?;

    let documents = collect_pdf_files(&cli.directory, cli.recursive)
        .with_context(|| format!("Failed to list PDF files in {}", cli.directory.display()))?;

    if documents.is_empty() {
        println!("No PDF files found in the specified directory.");
        return Ok(());
    }
    println!("Validating {} PDF file(s) against {}\n", documents.len(), reference_name);

    let progress = ProgressBar::new(documents.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut entries = Vec::with_capacity(documents.len());
    for path in documents {
        if shutdown_requested.load(Ordering::SeqCst) {
            break;
        }
        progress.set_message(
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let outcome = session
            .validate_candidate(&path)
            .map_err(|err| format!("{} failed: {}", err.stage(), err));
        entries.push(BatchEntry { path, outcome });
        progress.inc(1);
    }

    let interrupted = shutdown_requested.load(Ordering::SeqCst);
    if interrupted {
        progress.abandon_with_message("Interrupted");
    } else {
        progress.finish_with_message("Validation complete!");
    }
    println!();

    for entry in &entries {
        println!("{}", format_entry(entry));
    }

    let header = ReportHeader {
        reference: &reference_name,
        tolerance: session.tolerance(),
    };
    write_report(&cli.output, &header, &entries)
        .with_context(|| format!("Failed to write report {}", cli.output.display()))?;

    let matched = entries.iter().filter(|e| e.is_match()).count();
    println!();
    println!("==================================================");
    println!("BATCH VALIDATION {}", if interrupted { "INTERRUPTED" } else { "COMPLETE" });
    println!("==================================================");
    println!("Matching: {}/{}", matched, entries.len());
    println!("Detailed report saved to: {:?}", cli.output);

    Ok(())
}
