//! CLI entry point for the group archiver.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use archiver_core::{
    ArchiveOptions, Archiver, FamilyOutcome, FsStore, GroupsClient, Session, SessionCookie,
};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

use cli::Args;

/// Log file written into the group folder unless `--no-log-file` is given.
const LOG_FILE_NAME: &str = "archive.log";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let no_color = args.no_color || std::env::var_os("NO_COLOR").is_some();

    let group_dir = args.output.join(&args.group);
    fs::create_dir_all(&group_dir)
        .with_context(|| format!("cannot create {}", group_dir.display()))?;
    let log_file = if args.no_log_file {
        None
    } else {
        Some(group_dir.join(LOG_FILE_NAME))
    };
    init_tracing(default_level, no_color, log_file.as_deref())?;

    // Args carries cookie values, so only the non-secret parts are logged.
    debug!(
        families = ?args.families(),
        messages = ?args.message_range(),
        delay_ms = args.delay.as_millis(),
        max_retries = args.max_retries,
        "CLI arguments parsed"
    );
    info!(group = %args.group, output = %group_dir.display(), "group archiver starting");

    let session = build_session(&args);
    let client = GroupsClient::new(session)?;
    let options = ArchiveOptions {
        families: args.families(),
        messages: args.message_range(),
        skip_existing: args.skip_existing,
    };
    let archiver = Archiver::new(client, Arc::new(FsStore::new(&group_dir)), options);

    let report = archiver.run().await;
    for (family, outcome) in report.aborted() {
        if let FamilyOutcome::Aborted {
            reason,
            inaccessible,
            ..
        } = outcome
        {
            if *inaccessible {
                error!(%family, %reason, "not archived, check cookies and group membership");
            } else {
                warn!(%family, %reason, "archived partially");
            }
        }
    }

    let stats = archiver.stats();
    info!(
        artifacts = stats.artifacts_written(),
        bytes = stats.bytes_written(),
        skipped_items = stats.items_skipped(),
        rejected_assets = stats.assets_rejected(),
        completed = stats.families_completed(),
        aborted = stats.families_aborted(),
        skipped_families = stats.families_skipped(),
        "Archive complete"
    );

    Ok(())
}

/// Installs the stderr subscriber and, when `log_file` is set, a plain-text
/// copy of the same events appended to that file.
fn init_tracing(default_level: &str, no_color: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color),
        )
        .with(file_layer)
        .try_init();
    Ok(())
}

fn build_session(args: &Args) -> Session {
    let mut session = Session::new(args.group.clone())
        .with_min_delay(args.delay)
        .with_max_retries(args.max_retries)
        .with_request_timeout(Duration::from_secs(args.timeout));

    let cookies = [
        ("T", &args.cookie_t),
        ("Y", &args.cookie_y),
        ("EuConsent", &args.cookie_e),
    ];
    for (name, value) in cookies {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            session = session.with_cookie(SessionCookie::new(name, value));
        }
    }
    if session.cookies().is_empty() {
        warn!("no cookies supplied, only public content will be archived");
    }

    if let Some(user_agent) = &args.user_agent {
        session = session.with_header("User-Agent", user_agent.clone());
    }
    if let Some(path) = &args.ca_bundle {
        session = session.with_ca_bundle(path.clone());
    }
    session
}
