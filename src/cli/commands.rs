//! CLI subcommand definitions
//!
//! Query parameters (sort field, group mode, filter values) are plain strings:
//! unknown values degrade to defaults with a warning instead of failing.

use clap::{Args, Subcommand};

/// Main CLI commands
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Add a notification to the tray
    Add(AddArgs),
    /// List notifications
    #[command(alias = "ls")]
    List(ListArgs),
    /// Dismiss a notification by ID
    Dismiss {
        /// Notification ID
        id: String,
    },
    /// Dismiss every active notification
    #[command(alias = "clear")]
    DismissAll,
    /// Dismiss active notifications raised from a session, window or pane
    DismissBy(OriginArgs),
    /// Mark a notification as read
    MarkRead {
        /// Notification ID
        id: String,
    },
    /// Mark a notification as unread
    MarkUnread {
        /// Notification ID
        id: String,
    },
    /// Delete dismissed notifications older than N days
    Cleanup {
        /// Age threshold in days; 0 removes every dismissed notification
        #[arg(long, value_name = "N")]
        days: Option<u32>,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Show active count and per-group counts
    Status {
        /// Group counts by: session, window, pane, level, message
        #[arg(short, long, value_name = "MODE", default_value = "level")]
        group_by: String,
    },
    /// Import the TSV store into the SQLite database in the same state dir
    Migrate {
        /// Parse and report without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Default, Args)]
pub(crate) struct OriginArgs {
    /// Session ID (e.g. $1)
    #[arg(long, value_name = "ID")]
    pub(crate) session: Option<String>,
    /// Window ID (e.g. @2)
    #[arg(long, value_name = "ID")]
    pub(crate) window: Option<String>,
    /// Pane ID (e.g. %3)
    #[arg(long, value_name = "ID")]
    pub(crate) pane: Option<String>,
}

impl OriginArgs {
    pub(crate) fn is_empty(&self) -> bool {
        [&self.session, &self.window, &self.pane]
            .iter()
            .all(|v| v.as_deref().is_none_or(str::is_empty))
    }
}

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Message text
    #[arg(required = true, num_args = 1..)]
    pub(crate) message: Vec<String>,

    /// Severity: info, warning, error, critical
    #[arg(short, long, default_value = "info")]
    pub(crate) level: String,

    #[command(flatten)]
    pub(crate) origin: OriginArgs,

    /// Opaque creation marker of the origin pane
    #[arg(long, value_name = "MARKER")]
    pub(crate) pane_created: Option<String>,

    /// Creation timestamp (RFC3339); defaults to now
    #[arg(long, value_name = "RFC3339")]
    pub(crate) timestamp: Option<String>,

    /// Do not ask tmux for the current pane
    #[arg(long, alias = "no-associate")]
    pub(crate) no_context: bool,
}

#[derive(Debug, Default, Args)]
pub(crate) struct ListArgs {
    /// State filter: active (default), dismissed, all
    #[arg(long, default_value = "active")]
    pub(crate) state: String,

    /// Level filter
    #[arg(long)]
    pub(crate) level: Option<String>,

    #[command(flatten)]
    pub(crate) origin: OriginArgs,

    /// Only notifications created at least N days ago
    #[arg(long, value_name = "N")]
    pub(crate) older_than: Option<u32>,

    /// Only notifications created within the last N days
    #[arg(long, value_name = "N")]
    pub(crate) newer_than: Option<u32>,

    /// Read filter: read, unread
    #[arg(long, value_name = "READ")]
    pub(crate) filter: Option<String>,

    /// Substring search over message, origin and level
    #[arg(long, value_name = "TEXT")]
    pub(crate) search: Option<String>,

    /// Case-insensitive search and text sorting
    #[arg(short = 'i', long)]
    pub(crate) ignore_case: bool,

    /// Sort field: id, timestamp, state, level, session, message, read_status
    #[arg(long, value_name = "FIELD")]
    pub(crate) sort: Option<String>,

    /// Sort order: asc, desc
    #[arg(long, value_name = "ORDER")]
    pub(crate) order: Option<String>,

    /// Unread notifications first, whatever the sort order
    #[arg(long)]
    pub(crate) unread_first: bool,

    /// Group by: none, session, window, pane, level, message
    #[arg(short, long, value_name = "MODE")]
    pub(crate) group_by: Option<String>,

    /// Only print per-group counts (requires --group-by)
    #[arg(long)]
    pub(crate) group_count: bool,

    /// Collapse duplicate notifications
    #[arg(long)]
    pub(crate) dedup: bool,

    /// Dedup criteria: message, message_level
    #[arg(long, value_name = "CRITERIA")]
    pub(crate) dedup_criteria: Option<String>,

    /// Only collapse duplicates within this window (30s, 5m, 2h, 1d)
    #[arg(long, value_name = "DURATION")]
    pub(crate) dedup_window: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_args_empty() {
        assert!(OriginArgs::default().is_empty());
        let origin = OriginArgs {
            session: Some(String::new()),
            ..OriginArgs::default()
        };
        assert!(origin.is_empty());
        let origin = OriginArgs {
            pane: Some("%1".to_string()),
            ..OriginArgs::default()
        };
        assert!(!origin.is_empty());
    }
}
