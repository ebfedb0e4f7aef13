//! CLI argument definitions using clap derive macros.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use archiver_core::api::constants::DEFAULT_MAX_RETRIES;
use archiver_core::{MessageRange, ResourceFamily};
use clap::Parser;

/// Longest accepted minimum delay between requests.
const MAX_DELAY_SECS: f64 = 60.0;

/// Archive a group's messages, files, photos and more.
///
/// By default every section is archived. Passing any section flag limits the
/// run to the sections named.
#[derive(Parser, Debug)]
#[command(name = "group-archiver")]
#[command(author, version, about)]
pub struct Args {
    /// Name of the group to archive
    pub group: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output (also honors NO_COLOR)
    #[arg(long)]
    pub no_color: bool,

    // ==================== Authentication ====================
    /// T authentication cookie
    #[arg(long = "cookie-t", value_name = "VALUE", help_heading = "Authentication")]
    pub cookie_t: Option<String>,

    /// Y authentication cookie
    #[arg(long = "cookie-y", value_name = "VALUE", help_heading = "Authentication")]
    pub cookie_y: Option<String>,

    /// EuConsent cookie, required in the EU
    #[arg(long = "cookie-e", value_name = "VALUE", help_heading = "Authentication")]
    pub cookie_e: Option<String>,

    // ==================== What to archive ====================
    /// Archive email and the attachments of each message
    #[arg(short, long, help_heading = "What to archive")]
    pub email: bool,

    /// Archive the attachment list
    #[arg(short = 't', long, help_heading = "What to archive")]
    pub attachments: bool,

    /// Archive files
    #[arg(short, long, help_heading = "What to archive")]
    pub files: bool,

    /// Archive photo albums
    #[arg(short = 'i', long, help_heading = "What to archive")]
    pub photos: bool,

    /// Archive database tables
    #[arg(short, long, help_heading = "What to archive")]
    pub database: bool,

    /// Archive links
    #[arg(short, long, help_heading = "What to archive")]
    pub links: bool,

    /// Archive calendar events
    #[arg(short, long, help_heading = "What to archive")]
    pub calendar: bool,

    /// Archive polls
    #[arg(short, long, help_heading = "What to archive")]
    pub polls: bool,

    /// Archive general information about the group
    #[arg(short, long, help_heading = "What to archive")]
    pub about: bool,

    /// Archive the member list
    #[arg(short, long, help_heading = "What to archive")]
    pub members: bool,

    // ==================== Message range ====================
    /// First message id to fetch (skips the message index; defaults to 1 when --stop is given)
    #[arg(long, help_heading = "Message range")]
    pub start: Option<u64>,

    /// Last message id to fetch, inclusive (defaults to the newest message)
    #[arg(long, help_heading = "Message range")]
    pub stop: Option<u64>,

    /// Fetch these message ids (space separated)
    #[arg(long, num_args = 1.., value_name = "ID", help_heading = "Message range")]
    pub ids: Vec<u64>,

    // ==================== Requests ====================
    /// Override the User-Agent header
    #[arg(long, help_heading = "Requests")]
    pub user_agent: Option<String>,

    /// Minimum delay between requests in seconds (0-60)
    #[arg(long, default_value = "0.2", value_parser = parse_delay, help_heading = "Requests")]
    pub delay: Duration,

    /// Maximum attempts per request (1-50)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..=50), help_heading = "Requests")]
    pub max_retries: u32,

    /// Per-request timeout in seconds (1-300)
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=300), help_heading = "Requests")]
    pub timeout: u64,

    /// PEM bundle of CA certificates to trust instead of the system roots
    #[arg(long, value_name = "PATH", help_heading = "Requests")]
    pub ca_bundle: Option<PathBuf>,

    // ==================== Output ====================
    /// Directory the group folder is created in
    #[arg(short, long, default_value = ".", help_heading = "Output")]
    pub output: PathBuf,

    /// Skip sections a previous run completed
    #[arg(long, help_heading = "Output")]
    pub skip_existing: bool,

    /// Do not write archive.log into the group folder
    #[arg(long, help_heading = "Output")]
    pub no_log_file: bool,
}

impl Args {
    /// Sections selected on the command line; all of them when none was named.
    #[must_use]
    pub fn families(&self) -> BTreeSet<ResourceFamily> {
        let flags = [
            (self.email, ResourceFamily::Email),
            (self.files, ResourceFamily::Files),
            (self.photos, ResourceFamily::Photos),
            (self.database, ResourceFamily::Databases),
            (self.links, ResourceFamily::Links),
            (self.calendar, ResourceFamily::Calendar),
            (self.about, ResourceFamily::About),
            (self.polls, ResourceFamily::Polls),
            (self.attachments, ResourceFamily::Attachments),
            (self.members, ResourceFamily::Members),
        ];
        let selected: BTreeSet<ResourceFamily> = flags
            .into_iter()
            .filter_map(|(on, family)| on.then_some(family))
            .collect();
        if selected.is_empty() {
            ResourceFamily::ALL.into_iter().collect()
        } else {
            selected
        }
    }

    #[must_use]
    pub fn message_range(&self) -> MessageRange {
        MessageRange {
            ids: self.ids.clone(),
            start: self.start,
            stop: self.stop,
        }
    }
}

fn parse_delay(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
        return Err(format!("delay must be between 0 and {MAX_DELAY_SECS} seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["group-archiver", "mygroup"]).unwrap();
        assert_eq!(args.group, "mygroup");
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.max_retries, 10);
        assert_eq!(args.delay, Duration::from_millis(200));
        assert_eq!(args.output, PathBuf::from("."));
        assert!(args.cookie_t.is_none());
    }

    #[test]
    fn test_cli_group_is_required() {
        let err = Args::try_parse_from(["group-archiver"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["group-archiver", "g", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["group-archiver", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["group-archiver", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    // ==================== Family Selection Tests ====================

    #[test]
    fn test_cli_no_family_flags_selects_all() {
        let args = Args::try_parse_from(["group-archiver", "g"]).unwrap();
        assert_eq!(args.families().len(), ResourceFamily::ALL.len());
    }

    #[test]
    fn test_cli_family_flags_limit_selection() {
        let args = Args::try_parse_from(["group-archiver", "g", "-e", "-i", "--polls"]).unwrap();
        let families: Vec<_> = args.families().into_iter().collect();
        assert_eq!(
            families,
            vec![
                ResourceFamily::Email,
                ResourceFamily::Photos,
                ResourceFamily::Polls
            ]
        );
    }

    #[test]
    fn test_cli_message_range_flags() {
        let args = Args::try_parse_from([
            "group-archiver",
            "g",
            "--start",
            "5",
            "--ids",
            "1",
            "2",
            "--stop",
            "9",
        ])
        .unwrap();
        let range = args.message_range();
        assert_eq!(range.start, Some(5));
        assert_eq!(range.stop, Some(9));
        assert_eq!(range.ids, vec![1, 2]);
    }

    // ==================== Request Option Tests ====================

    #[test]
    fn test_cli_max_retries_range() {
        assert!(Args::try_parse_from(["group-archiver", "g", "-r", "1"]).is_ok());
        assert!(Args::try_parse_from(["group-archiver", "g", "-r", "50"]).is_ok());
        let err = Args::try_parse_from(["group-archiver", "g", "-r", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let err = Args::try_parse_from(["group-archiver", "g", "-r", "51"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_delay_fractional_seconds() {
        let args = Args::try_parse_from(["group-archiver", "g", "--delay", "1.5"]).unwrap();
        assert_eq!(args.delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_cli_delay_out_of_range_rejected() {
        for bad in ["--delay=-1", "--delay=61", "--delay=soon"] {
            let err = Args::try_parse_from(["group-archiver", "g", bad]).unwrap_err();
            assert_eq!(
                err.kind(),
                clap::error::ErrorKind::ValueValidation,
                "delay {bad}"
            );
        }
    }

    #[test]
    fn test_cli_cookies_and_user_agent() {
        let args = Args::try_parse_from([
            "group-archiver",
            "g",
            "--cookie-t",
            "tval",
            "--cookie-y",
            "yval",
            "--user-agent",
            "Mozilla/5.0",
        ])
        .unwrap();
        assert_eq!(args.cookie_t.as_deref(), Some("tval"));
        assert_eq!(args.cookie_y.as_deref(), Some("yval"));
        assert_eq!(args.user_agent.as_deref(), Some("Mozilla/5.0"));
    }
}
