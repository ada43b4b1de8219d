//! CLI argument definitions
//!
//! Global CLI options and configuration merging logic.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Config, resolve_backend};
use crate::storage::Backend;

use super::commands::Commands;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq)]
pub(crate) enum ColorMode {
    /// Auto-detect based on terminal (default)
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Parser)]
#[command(name = "intray")]
#[command(about = "Notification in-tray for tmux panes", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub(crate) json: bool,

    /// Storage backend: tsv, sqlite
    #[arg(long, global = true, value_name = "BACKEND")]
    pub(crate) backend: Option<String>,

    /// Directory holding the notification store
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) state_dir: Option<PathBuf>,

    /// How long to wait for the storage lock
    #[arg(long, global = true, value_name = "MS")]
    pub(crate) lock_timeout_ms: Option<u64>,

    /// How long to wait for tmux to report the current pane
    #[arg(long, global = true, value_name = "MS")]
    pub(crate) context_timeout_ms: Option<u64>,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorMode,

    /// Disable colored output (shorthand for --color=never)
    #[arg(long, global = true)]
    pub(crate) no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub(crate) debug: bool,
}

impl Cli {
    /// Merge config file values into CLI (CLI args take precedence)
    pub(crate) fn with_config(mut self, config: &Config) -> Self {
        if !self.no_color && config.no_color {
            self.no_color = true;
        }
        if !self.debug && config.debug {
            self.debug = true;
        }

        if self.backend.is_none() {
            self.backend = config.storage_backend.clone();
        }
        if self.state_dir.is_none() {
            self.state_dir = config.state_dir.clone();
        }
        if self.lock_timeout_ms.is_none() {
            self.lock_timeout_ms = Some(config.lock_timeout_ms());
        }
        if self.context_timeout_ms.is_none() {
            self.context_timeout_ms = Some(config.context_timeout_ms());
        }

        match &mut self.command {
            Commands::Add(add) => {
                if !config.auto_context() {
                    add.no_context = true;
                }
            }
            Commands::List(list) => {
                if list.sort.is_none() {
                    list.sort = config.list.sort.clone();
                }
                if list.order.is_none() {
                    list.order = config.list.order.clone();
                }
                if list.group_by.is_none() {
                    list.group_by = config.list.group_by.clone();
                }
                if !list.unread_first && config.list.unread_first {
                    list.unread_first = true;
                }
            }
            Commands::Cleanup { days, .. } => {
                if days.is_none() {
                    *days = Some(config.cleanup_days());
                }
            }
            _ => {}
        }

        self
    }

    pub(crate) fn backend(&self) -> Backend {
        resolve_backend(self.backend.as_deref())
    }

    pub(crate) fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }
}
