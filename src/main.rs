use ig_checker_lib::{logger, BatchReport, ConfigArgs, Orchestrator, ProgressUpdate};

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, Subcommand};
use log::{error, info};

/// Checks whether Instagram usernames point at existing profiles.
#[derive(Parser, Debug)]
#[command(name = "ig-checker", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check pasted text made of artist lines followed by "@username" lines
    Text {
        /// File holding the text (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Check the "ig user" column of a CSV or spreadsheet file
    Upload {
        file: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_path = logger::init(&config.output_dir);
    info!("Starting Instagram Profile Checker...");
    let orchestrator = Orchestrator::new(config, log_path);

    let print_progress = |update: &ProgressUpdate<'_>| {
        println!("[{}/{}] {:<30} | {}", update.processed, update.total, update.username, update.status);
    };

    let result = match cli.command {
        Commands::Text { file } => match read_text(file) {
            Ok(text) => orchestrator.run_text(&text, print_progress).await,
            Err(e) => Err(e.into()),
        },
        Commands::Upload { file } => orchestrator.run_upload(file.as_deref(), print_progress).await,
    };

    match result {
        Ok(report) => {
            print_report(&report, &orchestrator);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_text(file: Option<PathBuf>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn print_report(report: &BatchReport, orchestrator: &Orchestrator) {
    if let Some(stats) = &report.load_stats {
        println!(
            "\nRows: {} valid, {} empty, {} errors",
            stats.valid_count, stats.empty_count, stats.error_count
        );
    }

    println!("\nSummary\n{}", report.results.summary);
    println!("\nAll Results\n{}", report.results.all);
    println!("\nInvalid Results\n{}", report.results.invalid);
    println!("\nValid Results\n{}", report.results.valid);
    println!("\nCSV:  {}", report.csv_path.display());
    println!("Text: {}", report.text_path.display());
    if let Some(log_path) = orchestrator.log_path() {
        println!("Log:  {}", log_path.display());
    }
}
