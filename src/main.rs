use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use invoice_stamp::{ARCHIVE_FILE_NAME, FieldRegistry, FontSet};

/// Fill a PDF invoice template once per spreadsheet row and bundle the results
/// into a single ZIP.
#[derive(Parser)]
#[command(name = "invoice-stamp", version)]
struct Cli {
    /// Single-page PDF the values are stamped onto
    #[arg(short, long)]
    template: PathBuf,

    /// Invoice rows (.xlsx: first sheet, first row is the header; or .json)
    #[arg(short, long)]
    rows: PathBuf,

    /// JSON field layout; defaults to the built-in tax invoice layout
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// TrueType font for regular fields (default: Helvetica)
    #[arg(long)]
    font: Option<PathBuf>,

    /// TrueType font for emphasised fields (default: same as --font)
    #[arg(long, requires = "font")]
    bold_font: Option<PathBuf>,

    /// Archive path, or a directory to write Invoices.zip into
    #[arg(short, long, default_value = ARCHIVE_FILE_NAME)]
    output: PathBuf,

    /// Log per-row progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<(), invoice_stamp::Error> {
    let registry = match &cli.layout {
        Some(path) => FieldRegistry::load(path)?,
        None => FieldRegistry::standard(),
    };
    let fonts = match &cli.font {
        Some(regular) => FontSet::load(regular, cli.bold_font.as_deref())?,
        None => FontSet::standard(),
    };
    let output = if cli.output.is_dir() {
        cli.output.join(ARCHIVE_FILE_NAME)
    } else {
        cli.output.clone()
    };

    match invoice_stamp::generate_invoices(&cli.rows, &cli.template, &registry, &fonts, &output)? {
        Some(entries) => {
            println!("Wrote {} invoices to {}", entries.len(), output.display());
        }
        None => println!("No invoice rows in {}; nothing written", cli.rows.display()),
    }
    Ok(())
}
