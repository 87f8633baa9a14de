use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use doc2xlsx::{Doc2XlsxError, PipelineBuilder, RunReport, DEFAULT_MARKDOWN_PATH};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "doc2xlsx",
    version,
    about = "Convert a document to Markdown and write its tables to an Excel workbook"
)]
struct Cli {
    /// Input document (pdf, docx, html, xlsx, md, txt, ...).
    input_file: PathBuf,

    /// Markdown output path.
    #[arg(default_value = DEFAULT_MARKDOWN_PATH)]
    output_markdown_file: PathBuf,

    /// Workbook output path. Defaults to the Markdown path with a .xlsx extension.
    output_spreadsheet_file: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Print the run report as JSON on success.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing(&cli);
    install_panic_hook();

    match panic::catch_unwind(AssertUnwindSafe(|| run(&cli))) {
        Ok(Ok(report)) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize run report: {}", e);
                        return ExitCode::from(1);
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("{}", e.chain());
            ExitCode::from(1)
        }
        // 詳細はパニックフックで出力済み
        Err(_) => ExitCode::from(1),
    }
}

fn run(cli: &Cli) -> Result<RunReport, Doc2XlsxError> {
    let mut builder = PipelineBuilder::new().with_markdown_path(&cli.output_markdown_file);
    if let Some(path) = &cli.output_spreadsheet_file {
        builder = builder.with_workbook_path(path);
    }
    let pipeline = builder.build()?;

    let report = pipeline.run(&cli.input_file)?;
    info!(
        "Conversion complete: {} -> {} ({} tables)",
        report.input.display(),
        report.workbook_path.display(),
        report.table_count
    );
    Ok(report)
}

/// `RUST_LOG`が設定されていればそれを優先する
fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("doc2xlsx={}", level)));

    // JSON出力時はstdoutをレポート専用にする
    if cli.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stdout)
            .without_time()
            .init();
    }
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        error!("Panic occurred: {}\n{}", info, backtrace);
    }));
}
