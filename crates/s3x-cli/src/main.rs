//! 🚀 s3x-cli: the front door, the bouncer, the maître d' of s3x.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Parses flags, sets up logging, loads config, wires Ctrl-C to the cancel
//! token, runs one search, and prints what it found. The real work happens
//! in the library. Like a manager. 🦆
//!
//! Exit codes: 0 found (or didn't) without drama, 2 bad request, 130 cancelled
//! by Ctrl-C, 1 for everything else.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL};
use s3x::{CancellationToken, SearchError, SearchOutcome, SearchRequest};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_INVALID_REQUEST: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

/// 🔎 grep for buckets. Finds objects whose content contains a pattern.
#[derive(Debug, Parser)]
#[command(name = "s3x", version, about)]
struct Args {
    /// 🪣 Bucket to search
    #[arg(long, env = "S3X_BUCKET")]
    bucket: String,

    /// 🎯 Exact byte pattern to look for
    #[arg(long)]
    pattern: String,

    /// 🌎 Region the bucket lives in
    #[arg(long, env = "AWS_REGION")]
    region: String,

    /// 🔢 Stop paging once at least this many matches are in
    #[arg(long, default_value_t = 10)]
    result_count: usize,

    /// ⏱️ Only objects modified at or after this epoch second (0 = no lower bound)
    #[arg(long, default_value_t = 0)]
    start: i64,

    /// ⏱️ Only objects modified at or before this epoch second (0 = no upper bound)
    #[arg(long, default_value_t = 0)]
    end: i64,

    /// 🔧 Config file; skipped quietly if it isn't there
    #[arg(long, default_value = "s3x.toml")]
    config: PathBuf,

    /// 📄 Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// 📊 Draw a progress display on stderr
    #[arg(long)]
    progress: bool,
}

impl Args {
    fn request(&self) -> SearchRequest {
        SearchRequest {
            bucket: self.bucket.clone(),
            pattern: self.pattern.clone(),
            result_count: self.result_count,
            region: self.region.clone(),
            start_time: self.start,
            end_time: self.end,
        }
    }
}

/// 🕰️ Epoch seconds, for humans.
fn format_timestamp(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

/// 🍽️ One row per match, comfy as ever.
fn render_table(outcome: &SearchOutcome) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["key", "size (bytes)", "last modified"]);
    for object in &outcome.objects {
        table.add_row(vec![
            Cell::new(&object.key),
            Cell::new(object.size).set_alignment(CellAlignment::Right),
            Cell::new(format_timestamp(object.last_modified)),
        ]);
    }
    table
}

fn print_outcome(outcome: &SearchOutcome, as_json: bool) -> Result<()> {
    if as_json {
        let rendered = serde_json::to_string_pretty(outcome)
            .context("💀 the results refused to become JSON")?;
        println!("{}", rendered);
    } else {
        println!("{}", render_table(outcome));
    }
    Ok(())
}

/// 🕵️ Does anything in the error chain smell like "nobody is listening on that port"?
fn looks_like_connection_trouble(err: &SearchError) -> bool {
    let mut cause: Option<&dyn std::error::Error> = err.source();
    while let Some(current) = cause {
        let text = current.to_string();
        if text.contains("dispatch failure")
            || text.contains("connection refused")
            || text.contains("Connection refused")
            || text.contains("dns error")
        {
            return true;
        }
        cause = current.source();
    }
    false
}

fn report(err: &SearchError) {
    error!("💀 error: {}", err);
    // -- 🧅 peel the onion of sadness, one layer at a time
    let mut cause = err.source();
    while let Some(current) = cause {
        error!("⚠️  cause: {}", current);
        cause = current.source();
    }
    if looks_like_connection_trouble(err) {
        error!(
            "🔧 hint: the object store isn't reachable. If you point at a local emulator \
             via `[store.S3] endpoint_url`, check that it is actually running. ☕"
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 📡 println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            error!("💀 {:#}", err);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    // 🔒 a missing config file is fine, an unreadable path is not
    let config_file = args.config.as_path();
    let config_file = match config_file.try_exists().with_context(|| {
        format!(
            "💀 could not check whether config file '{}' exists. Permissions? Cosmic rays?",
            config_file.display()
        )
    })? {
        true => Some(config_file),
        false => None,
    };
    let mut app_config = s3x::load_config(config_file)
        .context("💀 couldn't load the config. Check the TOML and any S3X_* env vars.")?;
    if args.progress {
        app_config.runtime.show_progress = true;
    }

    // 🛑 Ctrl-C pulls the plug, the search hands back whatever it had
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, wrapping up with what we have...");
            on_ctrl_c.cancel();
        }
    });

    let outcome = match s3x::run(&app_config, args.request(), cancel).await {
        Ok(outcome) => outcome,
        Err(err) => {
            report(&err);
            let code = if err.is_validation() {
                EXIT_INVALID_REQUEST
            } else {
                EXIT_FAILURE
            };
            return Ok(ExitCode::from(code));
        }
    };

    print_outcome(&outcome, args.json)?;
    info!(
        "📊 {} page(s), {} listed, {} fetched, {} failed, {} matched",
        outcome.stats.pages,
        outcome.stats.listed,
        outcome.stats.fetched,
        outcome.stats.failed_fetches,
        outcome.stats.matched
    );

    if outcome.cancelled {
        warn!("⚠️ search was cancelled, the results above are partial");
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }
    Ok(ExitCode::SUCCESS)
}
