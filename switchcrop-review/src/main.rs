//! switchcrop - interactive batch crop review
//!
//! Uploads recordings to the analysis backend, shows the detected interval,
//! lets the user adjust one shared crop interval against each file's
//! spectrogram and submits the batch for cropping.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use switchcrop_common::events::EventBus;
use switchcrop_common::human_time::{format_bytes, format_interval, format_seconds};
use switchcrop_review::config::ConfigOverrides;
use switchcrop_review::logging;
use switchcrop_review::models::{Bound, EditIntent, Intent, NavigateIntent, SubmitIntent};
use switchcrop_review::services::{
    BatchCoordinator, Delivery, HttpBackend, ReviewSummary, TerminalSurface,
};
use switchcrop_review::{Outcome, ReviewError, ReviewSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

type Session = ReviewSession<HttpBackend, TerminalSurface<std::io::Stdout>>;

/// Command-line arguments for switchcrop
#[derive(Parser, Debug)]
#[command(name = "switchcrop")]
#[command(about = "Review detected intervals and batch-crop audio recordings")]
#[command(version)]
struct Args {
    /// Base URL of the analysis backend
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Config file (default: platform config dir, or SWITCHCROP_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for downloaded archives
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Audio files to review
    files: Vec<PathBuf>,
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Intent(Intent),
    Stage(Vec<PathBuf>),
    Show,
    Download,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  start <seconds>    set interval start
  end <seconds>      set interval end
  click <seconds>    move the bound nearest to this time
  next | prev        move through the file list (wraps)
  select <key>       jump to a file by its server key
  show               redraw the current spectrogram
  submit             crop every file with the current interval
  download           save the finished archive
  stage <files...>   choose files again after a restart
  upload             upload the staged files
  proceed            start editing after reviewing the summary
  restart            start over after completion or failure
  help | quit";

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(String::new());
    };
    let rest: Vec<&str> = words.collect();

    let seconds = |rest: &[&str]| -> std::result::Result<f64, String> {
        match rest {
            [value] => value
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number of seconds", value)),
            _ => Err(format!("usage: {} <seconds>", verb)),
        }
    };

    let command = match verb {
        "start" => Command::Intent(Intent::Edit(EditIntent::Set {
            bound: Bound::Start,
            value: seconds(&rest)?,
        })),
        "end" => Command::Intent(Intent::Edit(EditIntent::Set {
            bound: Bound::End,
            value: seconds(&rest)?,
        })),
        "click" => Command::Intent(Intent::Edit(EditIntent::Click {
            time: seconds(&rest)?,
        })),
        "next" | "n" => Command::Intent(NavigateIntent::Next.into()),
        "prev" | "p" => Command::Intent(NavigateIntent::Previous.into()),
        "select" => match rest.as_slice() {
            [key] => Command::Intent(NavigateIntent::Select(key.to_string()).into()),
            _ => return Err("usage: select <key>".to_string()),
        },
        "submit" => Command::Intent(SubmitIntent::Batch.into()),
        "upload" => Command::Intent(SubmitIntent::Upload.into()),
        "proceed" => Command::Intent(SubmitIntent::Proceed.into()),
        "restart" => Command::Intent(Intent::Restart),
        "stage" => Command::Stage(rest.iter().map(PathBuf::from).collect()),
        "show" => Command::Show,
        "download" => Command::Download,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = logging::load_config_with(
        logging::bootstrap_subscriber(args.log_level.as_deref()),
        args.config.as_deref(),
        ConfigOverrides {
            backend_url: args.backend_url.clone(),
            output_dir: args.output_dir.clone(),
            log_level: args.log_level.clone(),
        },
    )
    .context("Failed to load configuration")?;

    logging::init_tracing(&config.logging).context("Failed to initialize logging")?;
    info!("Starting switchcrop {}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", config.backend_url);

    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .context("Invalid backend URL")?;
    let coordinator = BatchCoordinator::new(
        backend,
        TerminalSurface::new(std::io::stdout()),
        config.params(),
        EventBus::new(100),
    );
    let mut session = ReviewSession::new(coordinator);

    if !args.files.is_empty() {
        run_pipeline(&mut session, &args.files).await;
    } else {
        println!("No files given. Use 'stage <files...>' then 'upload'.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&session);
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) if message.is_empty() => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Show => report(session.show().await.map(Outcome::Proceeded), &session),
            Command::Download => match session.download(&config.output_dir).await {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => println!("Download failed: {}", e.user_message()),
            },
            Command::Stage(paths) => match session.stage(&paths).await {
                Ok(report) => print_staging(&report),
                Err(e) => println!("{}", e.user_message()),
            },
            Command::Intent(intent) => {
                let outcome = session.dispatch(intent).await;
                report(outcome, &session);
            }
        }
    }

    info!("Session ended in state {}", session.state());
    Ok(())
}

/// Stage, upload, summarize and enter Editing; stops at the first failure
async fn run_pipeline(session: &mut Session, files: &[PathBuf]) {
    match session.stage(files).await {
        Ok(report) => print_staging(&report),
        Err(e) => {
            println!("{}", e.user_message());
            return;
        }
    }

    println!("Uploading...");
    match session.dispatch(SubmitIntent::Upload.into()).await {
        Ok(outcome) => report(Ok(outcome), session),
        Err(e) => return report(Err(e), session),
    }

    let outcome = session.dispatch(SubmitIntent::Proceed.into()).await;
    report(outcome, session);
}

fn print_prompt(session: &Session) {
    let coordinator = session.coordinator();
    let position = match coordinator.catalog().current() {
        Some(file) => format!(
            " {}/{} {}",
            coordinator.catalog().current_index() + 1,
            coordinator.catalog().len(),
            file.filename
        ),
        None => String::new(),
    };
    let interval = coordinator.interval();
    println!(
        "[{}{}] {}",
        session.state(),
        position,
        format_interval(interval.start, interval.end)
    );
}

fn print_staging(report: &switchcrop_review::models::StagingReport) {
    for skipped in &report.skipped {
        println!("  skipped {} ({})", skipped.path.display(), skipped.reason);
    }
    println!(
        "Staged {} file(s), {}",
        report.accepted.len(),
        format_bytes(report.total_bytes())
    );
}

fn print_summary(summary: &ReviewSummary) {
    println!(
        "Analyzed {} of {} file(s). Weighted average: {}",
        summary.files.len(),
        summary.total_files,
        format_interval(summary.weighted_average.start, summary.weighted_average.end)
    );
    for detection in &summary.files {
        println!(
            "  {:<32} {:>9}  {}",
            detection.filename,
            format_seconds(detection.duration),
            format_interval(detection.detected_start, detection.detected_end)
        );
    }
}

fn report(outcome: std::result::Result<Outcome, ReviewError>, session: &Session) {
    match outcome {
        Ok(Outcome::IntervalChanged(applied)) => {
            if applied.deflected {
                println!("(moved the other bound to keep start before end)");
            }
        }
        Ok(Outcome::Selected { file, delivery }) => {
            println!("Selected {} ({})", file.filename, file.unique_filename);
            print_delivery(&delivery);
        }
        Ok(Outcome::Uploaded(summary)) => print_summary(&summary),
        Ok(Outcome::Proceeded(delivery)) => print_delivery(&delivery),
        Ok(Outcome::BatchCompleted(outcome)) => {
            println!(
                "Batch complete: {} processed, {} failed. Use 'download' to save {}.",
                outcome.processed_files, outcome.failed_files, outcome.download.filename
            );
        }
        Ok(Outcome::Restarted) => println!("Back to staging. Use 'stage <files...>'."),
        Ok(Outcome::Ignored) => {}
        Err(e) => match session.coordinator().failure_message() {
            Some(message) if e.is_fatal() => {
                println!("Failed: {}", message);
                println!("Use 'restart' to start over.");
            }
            _ => println!("{}", e.user_message()),
        },
    }
}

fn print_delivery(delivery: &Delivery) {
    if let Delivery::Discarded { unique_filename } = delivery {
        println!("(dropped late spectrogram for {})", unique_filename);
    }
}
