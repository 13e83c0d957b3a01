//! ncert-extract CLI - textbook PDF to line-oriented text

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use ncert_extract::{
    CleanupOptions, ExtractOptions, ExtractionReport, Language, PageSelection, PdfDocument,
    Pipeline,
};

#[derive(Parser)]
#[command(name = "ncert-extract")]
#[command(version)]
#[command(
    about = "Extract bilingual (English/Hindi) textbook PDFs to clean line-oriented text",
    long_about = None
)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output text file (defaults to FILE with a .txt extension)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    extract: ExtractArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every PDF in a directory
    Batch {
        /// Directory containing PDF files
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Flags shared by single-file and batch extraction.
#[derive(Args, Clone)]
struct ExtractArgs {
    /// Textbook language: en or hi
    #[arg(short, long, env = "NCERT_LANG", default_value = "en")]
    lang: Language,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<PageSelection>,

    /// Skip table detection
    #[arg(long)]
    no_tables: bool,

    /// Keep words split by a line-end hyphen
    #[arg(long)]
    no_dehyphenate: bool,

    /// Keep page numbers and running headers/footers
    #[arg(long)]
    keep_boilerplate: bool,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,
}

impl ExtractArgs {
    fn options(&self) -> ExtractOptions {
        let cleanup = CleanupOptions::default()
            .with_hyphenation(!self.no_dehyphenate)
            .with_boilerplate_removal(!self.keep_boilerplate);

        ExtractOptions::new()
            .with_language(self.lang)
            .with_pages(self.pages.clone().unwrap_or_default())
            .with_tables(!self.no_tables)
            .with_cleanup(cleanup)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Batch {
            input,
            output,
            extract,
        }) => cmd_batch(&input, &output, &extract),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if let Some(input) = cli.input {
                cmd_extract(&input, cli.output.as_deref(), &cli.extract)
            } else {
                println!("{}", "Usage: ncert-extract <FILE> [OUTPUT] --lang <en|hi>".yellow());
                println!("       ncert-extract --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    args: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input));
    let pipeline = Pipeline::new(args.options())?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] page {pos}/{len}")?
            .progress_chars("#>-"),
    );

    let mut processed = 0u64;
    let report = pipeline.extract_file_with_progress(input, &output, |_, total| {
        processed += 1;
        pb.set_length(total as u64);
        pb.set_position(processed);
    })?;
    pb.finish_and_clear();

    print_report(&report);
    println!("{} {}", "Saved to".green(), output.display());
    write_report_json(&report, args.report_json.as_deref())?;

    Ok(())
}

fn cmd_batch(
    input: &Path,
    output_dir: &Path,
    args: &ExtractArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = list_pdfs(input)?;
    if files.is_empty() {
        println!("{} no PDF files in {}", "Nothing to do:".yellow(), input.display());
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;
    let pipeline = Pipeline::new(args.options())?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for file in &files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        pb.set_message(name.to_string());

        let output = output_dir.join(output_name(file));
        match pipeline.extract_file(file, &output) {
            Ok(report) => reports.push(report),
            Err(e) => {
                log::warn!("{}: {}", file.display(), e);
                failures.push((file.clone(), e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let tables: usize = reports.iter().map(|r| r.tables_found).sum();
    let pages: usize = reports.iter().map(|r| r.pages_processed).sum();
    let warnings: usize = reports.iter().map(|r| r.warnings.len()).sum();

    println!("{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}/{}", "Documents".bold(), reports.len(), files.len());
    println!("{}: {}", "Pages".bold(), pages);
    println!("{}: {}", "Tables".bold(), tables);
    println!("{}: {}", "Page warnings".bold(), warnings);
    if let Some(degraded) = reports.iter().find_map(|r| r.degraded.first()) {
        println!("{}: {}", "Degraded".yellow().bold(), degraded.capability);
    }
    for (file, error) in &failures {
        println!("  {} {}: {}", "✗".red(), file.display(), error);
    }
    println!("{} {}", "Output:".green(), output_dir.display());

    if let Some(path) = args.report_json.as_deref() {
        fs::write(path, serde_json::to_string_pretty(&reports)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    use ncert_extract::TextSource;

    let pdf = PdfDocument::open(input)?;
    let metadata = pdf.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), pdf.page_count());

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "ncert-extract".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Textbook PDF extraction for English/Hindi parallel corpora");
    println!();
    println!("License: MIT");
}

fn print_report(report: &ExtractionReport) {
    println!("{}", "Extraction Report".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for line in report.to_string().lines() {
        let highlighted = if line.starts_with("Degraded") && !report.degraded.is_empty() {
            line.yellow().to_string()
        } else if line.starts_with("Warnings") {
            line.yellow().to_string()
        } else {
            line.to_string()
        };
        println!("{highlighted}");
    }
}

fn write_report_json(
    report: &ExtractionReport,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        fs::write(path, serde_json::to_string_pretty(report)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }
    Ok(())
}

/// `book.pdf` -> `book.txt`, next to the input.
fn default_output(input: &Path) -> PathBuf {
    input.with_extension("txt")
}

/// `dir/book.pdf` -> `book.txt`.
fn output_name(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    PathBuf::from(stem).with_extension("txt")
}

/// PDF files directly inside `dir`, sorted by name.
fn list_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        assert_eq!(
            default_output(Path::new("books/jesc101.pdf")),
            PathBuf::from("books/jesc101.txt")
        );
        assert_eq!(
            output_name(Path::new("books/hesc101.PDF")),
            PathBuf::from("hesc101.txt")
        );
    }

    #[test]
    fn test_list_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = list_pdfs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_args_map_to_options() {
        let cli = Cli::parse_from([
            "ncert-extract",
            "book.pdf",
            "--lang",
            "hi",
            "--pages",
            "2-4",
            "--no-tables",
            "--keep-boilerplate",
        ]);
        let options = cli.extract.options();
        assert_eq!(options.language, Language::Hindi);
        assert_eq!(options.pages, PageSelection::Range(2..=4));
        assert!(!options.detect_tables);
        assert!(!options.cleanup.remove_page_numbers);
        assert!(options.cleanup.fix_hyphenation);
    }

    #[test]
    fn test_batch_subcommand() {
        let cli = Cli::parse_from(["ncert-extract", "batch", "pdfs", "-o", "out", "--lang", "en"]);
        match cli.command {
            Some(Commands::Batch { input, output, extract }) => {
                assert_eq!(input, PathBuf::from("pdfs"));
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(extract.lang, Language::English);
            }
            _ => panic!("expected batch"),
        }
    }
}
