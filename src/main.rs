//! CLI entry point for `mailexport`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use clap::Parser;

use mailexport::client::eml::EmlStore;
use mailexport::config::{self, Config};
use mailexport::model::criteria::FilterCriteria;
use mailexport::model::result::ExportResult;
use mailexport::model::settings::{ExportMode, ExportSettings};
use mailexport::pipeline;

#[derive(Parser)]
#[command(
    name = "mailexport",
    version,
    about = "Export email attachments, messages or markdown from a mail store",
    after_help = "Output layout: <OUTPUT>/<sender>/<subject>/<YYYY-MM-DD>/[duplicates/]<file>"
)]
struct Cli {
    /// Root directory of the exported tree
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Directory of .eml files to export from (subdirectories are folders)
    #[arg(short, long, value_name = "DIR", env = "MAILEXPORT_SOURCE")]
    source: Option<PathBuf>,

    /// Only messages received on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    start_date: Option<NaiveDate>,

    /// Only messages received on or before this date, whole day included
    #[arg(long, value_name = "DATE")]
    end_date: Option<NaiveDate>,

    /// Sender address to include (repeatable, case-insensitive)
    #[arg(long = "sender", value_name = "EMAIL")]
    senders: Vec<String>,

    /// Keyword the subject must contain (repeatable, all must match)
    #[arg(long = "subject-keyword", value_name = "WORD")]
    subject_keywords: Vec<String>,

    /// Keyword the body must contain (repeatable, all must match)
    #[arg(long = "body-keyword", value_name = "WORD")]
    body_keywords: Vec<String>,

    /// Only messages with attachments
    #[arg(long)]
    with_attachments: bool,

    /// Only messages without attachments
    #[arg(long)]
    without_attachments: bool,

    /// Folder below the inbox, e.g. "Inbox/Projects/2024"
    #[arg(long, value_name = "PATH")]
    folder: Option<String>,

    /// Stop after this many messages
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Messages fetched per batch [default: from config, 200]
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Log what would be written without touching the filesystem
    #[arg(long)]
    dry_run: bool,

    /// Subfolder for duplicate attachments [default: from config, "duplicates"]
    #[arg(long, value_name = "NAME")]
    duplicates_subfolder: Option<String>,

    /// Digest used for duplicate detection [default: from config, sha256]
    #[arg(long, value_name = "ALGO")]
    hash_algorithm: Option<String>,

    /// Also save attachments that look inline (e.g. signature images)
    #[arg(long)]
    include_inline: bool,

    /// Save whole messages in the store's native format
    #[arg(long)]
    export_mail: bool,

    /// Save attachments plus a markdown rendition of each message
    #[arg(long)]
    export_markdown: bool,

    /// Maximum length of the subject folder name [default: from config, 80]
    #[arg(long, value_name = "N")]
    subject_sanitize_length: Option<usize>,

    /// Write the log to this file instead of the default location
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => config.general.log_level.as_str(),
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    setup_logging(log_level, cli.log_file.as_deref(), &config);

    let source_dir = cli
        .source
        .clone()
        .or_else(|| config.source.mail_root.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No mail source given. Use --source or set [source] mail_root")
        })?;

    let criteria = build_criteria(&cli);
    criteria.validate()?;
    let settings = build_settings(&cli, &config)?;

    let store = EmlStore::open(&source_dir)?;
    tracing::info!(
        source = %source_dir.display(),
        output = %settings.output_dir.display(),
        mode = ?settings.mode,
        "Export requested"
    );

    let start = Instant::now();
    match pipeline::run(&store, &criteria, &settings) {
        Ok(result) => {
            report(&result, start.elapsed(), &settings, cli.json)?;
            Ok(())
        }
        Err(aborted) => {
            report(&aborted.partial, start.elapsed(), &settings, cli.json)?;
            Err(aborted.error.into())
        }
    }
}

fn build_criteria(cli: &Cli) -> FilterCriteria {
    FilterCriteria {
        senders: cli.senders.clone(),
        subject_keywords: cli.subject_keywords.clone(),
        body_keywords: cli.body_keywords.clone(),
        with_attachments: cli.with_attachments,
        without_attachments: cli.without_attachments,
        folder_path: cli.folder.clone(),
        ..Default::default()
    }
    .with_date_range(cli.start_date, cli.end_date)
}

/// Merge CLI flags over the configuration file.
fn build_settings(cli: &Cli, config: &Config) -> anyhow::Result<ExportSettings> {
    let mut settings = ExportSettings::from_config(&cli.output, config);
    settings.mode = ExportMode::from_flags(cli.export_mail, cli.export_markdown)?;
    settings.dry_run = cli.dry_run;
    settings.limit = cli.limit;
    settings.include_inline |= cli.include_inline;
    if let Some(n) = cli.batch_size {
        settings.batch_size = n;
    }
    if let Some(name) = &cli.duplicates_subfolder {
        settings.duplicates_subfolder = name.clone();
    }
    if let Some(algo) = &cli.hash_algorithm {
        settings.hash_algorithm = algo.clone();
    }
    if let Some(n) = cli.subject_sanitize_length {
        settings.subject_sanitize_length = n;
    }
    Ok(settings)
}

/// Set up tracing with stderr output and file logging.
fn setup_logging(level: &str, log_file: Option<&Path>, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::log_file_path(config));
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "mailexport.log".into());

    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, file_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn report(
    result: &ExportResult,
    elapsed: std::time::Duration,
    settings: &ExportSettings,
    json: bool,
) -> anyhow::Result<()> {
    for error in &result.errors {
        tracing::warn!(%error, "Item failed");
    }
    if json {
        print_summary_json(result, elapsed, settings)
    } else {
        print_summary_table(result, elapsed, settings);
        Ok(())
    }
}

/// Print the run summary in a human-readable table.
fn print_summary_table(
    result: &ExportResult,
    elapsed: std::time::Duration,
    settings: &ExportSettings,
) {
    use humansize::{format_size, BINARY};

    println!();
    if settings.dry_run {
        println!("  Dry run: nothing was written");
    }
    println!("  {:<22} {}", "Output", settings.output_dir.display());
    println!("  {:<22} {}", "Messages processed", result.messages_processed);
    println!("  {:<22} {}", "Messages matched", result.messages_matched);
    println!("  {:<22} {}", "Attachments saved", result.attachments_saved);
    println!("  {:<22} {}", "Duplicates found", result.duplicates_found);
    println!("  {:<22} {}", "Files exported", result.files_exported);
    println!(
        "  {:<22} {}",
        "Bytes saved",
        format_size(result.bytes_saved, BINARY)
    );
    println!("  {:<22} {}", "Errors", result.errors.len());
    if !result.warnings.is_empty() {
        println!("  {:<22} {}", "Warnings", result.warnings.len());
    }
    println!("  {:<22} {:.2?}", "Elapsed", elapsed);
    println!();
}

/// Print the run summary as JSON.
fn print_summary_json(
    result: &ExportResult,
    elapsed: std::time::Duration,
    settings: &ExportSettings,
) -> anyhow::Result<()> {
    let summary = serde_json::json!({
        "output": settings.output_dir.to_string_lossy(),
        "dry_run": settings.dry_run,
        "elapsed_ms": elapsed.as_millis(),
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
