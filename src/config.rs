use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::consts::{BACKEND_ENV, DEFAULT_CONTEXT_TIMEOUT_MS, DEFAULT_LOCK_TIMEOUT_MS, STATE_DIR_ENV};
use crate::core::{DedupCriteria, DedupOptions};
use crate::storage::Backend;
use crate::utils::parse_duration;

/// Retention used by `cleanup` when `--days` is not given
pub(crate) const DEFAULT_CLEANUP_DAYS: u32 = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListConfig {
    pub(crate) sort: Option<String>,
    pub(crate) order: Option<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) unread_first: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DedupConfig {
    pub(crate) criteria: Option<String>,
    /// Duration string: `30s`, `5m`, `2h`, `1d` or bare seconds
    pub(crate) window: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) state_dir: Option<PathBuf>,
    pub(crate) storage_backend: Option<String>,
    pub(crate) lock_timeout_ms: Option<u64>,
    pub(crate) context_timeout_ms: Option<u64>,
    pub(crate) auto_context: Option<bool>,
    pub(crate) cleanup_days: Option<u32>,
    pub(crate) debug: bool,
    pub(crate) no_color: bool,
    pub(crate) list: ListConfig,
    pub(crate) dedup: DedupConfig,

    /// File the values came from, if any
    #[serde(skip)]
    pub(crate) source: Option<PathBuf>,
    /// Problems found while loading; logged once logging is up
    #[serde(skip)]
    pub(crate) warnings: Vec<String>,
}

impl Config {
    /// Load the first readable config file, then apply environment overrides.
    pub(crate) fn load() -> Self {
        let mut config = Self::load_from(&Self::get_config_paths());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_from(paths: &[PathBuf]) -> Self {
        let mut warnings = Vec::new();
        for path in paths {
            if path.exists()
                && let Ok(content) = fs::read_to_string(path)
            {
                match Self::parse(&content, path) {
                    Ok(mut config) => {
                        config.warnings.append(&mut warnings);
                        return config;
                    }
                    Err(e) => warnings.push(e),
                }
            }
        }

        Self {
            warnings,
            ..Self::default()
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self, String> {
        let mut config = toml::from_str::<Config>(content)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// `INTRAY_STATE_DIR` and `INTRAY_BACKEND` win over the file.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(STATE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(backend) = lookup(BACKEND_ENV).filter(|v| !v.is_empty()) {
            self.storage_backend = Some(backend);
        }
    }

    /// Report where config came from and anything that was ignored.
    pub(crate) fn log_outcome(&self) {
        if let Some(path) = &self.source {
            log::debug!("event=config_loaded path={}", path.display());
        }
        for warning in &self.warnings {
            log::warn!("event=config_ignored reason=\"{warning}\"");
        }
    }

    pub(crate) fn backend(&self) -> Backend {
        resolve_backend(self.storage_backend.as_deref())
    }

    pub(crate) fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms.unwrap_or(DEFAULT_LOCK_TIMEOUT_MS)
    }

    pub(crate) fn context_timeout_ms(&self) -> u64 {
        self.context_timeout_ms.unwrap_or(DEFAULT_CONTEXT_TIMEOUT_MS)
    }

    pub(crate) fn auto_context(&self) -> bool {
        self.auto_context.unwrap_or(true)
    }

    pub(crate) fn cleanup_days(&self) -> u32 {
        self.cleanup_days.unwrap_or(DEFAULT_CLEANUP_DAYS)
    }

    /// `[dedup]` section as engine options; bad values fall back to defaults.
    pub(crate) fn dedup_options(&self) -> DedupOptions {
        let criteria = match self.dedup.criteria.as_deref() {
            None => DedupCriteria::default(),
            Some(raw) => DedupCriteria::parse(raw).unwrap_or_else(|| {
                log::warn!("event=config_fallback key=dedup.criteria value={raw} default=message");
                DedupCriteria::default()
            }),
        };
        let window = self.dedup.window.as_deref().and_then(|raw| {
            parse_duration(raw)
                .inspect_err(|e| {
                    log::warn!("event=config_fallback key=dedup.window value={raw} error=\"{e}\"");
                })
                .ok()
        });
        DedupOptions { criteria, window }
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/intray/config.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("intray").join("config.toml"));
        }

        // 2. Platform config dir (macOS: ~/Library/Application Support/intray/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_path = config_dir.join("intray").join("config.toml");
            if !paths.contains(&platform_path) {
                paths.push(platform_path);
            }
        }

        // 3. Home directory: ~/.intray.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".intray.toml"));
        }

        paths
    }
}

/// Unknown names log a warning and select the default backend.
pub(crate) fn resolve_backend(raw: Option<&str>) -> Backend {
    match raw {
        None => Backend::default(),
        Some(name) => Backend::parse(name).unwrap_or_else(|| {
            log::warn!(
                "event=backend_fallback value={name} default={}",
                Backend::default()
            );
            Backend::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_paths() {
        let paths = Config::get_config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("intray")));
    }

    #[test]
    fn parses_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "config.toml",
            r#"
state_dir = "/tmp/tray"
storage_backend = "sqlite"
lock_timeout_ms = 250
auto_context = false
cleanup_days = 7
debug = true

[list]
sort = "level"
order = "asc"
group_by = "session"
unread_first = true

[dedup]
criteria = "message_level"
window = "5m"
"#,
        );
        let config = Config::load_from(&[path.clone()]);
        assert_eq!(config.source, Some(path));
        assert!(config.warnings.is_empty());
        assert_eq!(config.state_dir, Some(PathBuf::from("/tmp/tray")));
        assert_eq!(config.backend(), Backend::Sqlite);
        assert_eq!(config.lock_timeout_ms(), 250);
        assert_eq!(config.context_timeout_ms(), DEFAULT_CONTEXT_TIMEOUT_MS);
        assert!(!config.auto_context());
        assert_eq!(config.cleanup_days(), 7);
        assert!(config.debug);
        assert_eq!(config.list.sort.as_deref(), Some("level"));
        assert!(config.list.unread_first);
        let dedup = config.dedup_options();
        assert_eq!(dedup.criteria, DedupCriteria::MessageLevel);
        assert_eq!(dedup.window, Some(Duration::minutes(5)));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&[dir.path().join("absent.toml")]);
        assert!(config.source.is_none());
        assert_eq!(config.backend(), Backend::Tsv);
        assert_eq!(config.lock_timeout_ms(), DEFAULT_LOCK_TIMEOUT_MS);
        assert!(config.auto_context());
        assert_eq!(config.cleanup_days(), DEFAULT_CLEANUP_DAYS);
    }

    #[test]
    fn unparsable_file_falls_through_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_config(dir.path(), "bad.toml", "lock_timeout_ms = \"soon\"");
        let good = write_config(dir.path(), "good.toml", "no_color = true");
        let config = Config::load_from(&[bad, good.clone()]);
        assert_eq!(config.source, Some(good));
        assert!(config.no_color);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config {
            state_dir: Some(PathBuf::from("/from/file")),
            storage_backend: Some("tsv".to_string()),
            ..Config::default()
        };
        config.apply_env(|key| match key {
            STATE_DIR_ENV => Some("/from/env".to_string()),
            BACKEND_ENV => Some("sqlite".to_string()),
            _ => None,
        });
        assert_eq!(config.state_dir, Some(PathBuf::from("/from/env")));
        assert_eq!(config.backend(), Backend::Sqlite);
    }

    #[test]
    fn empty_env_is_ignored() {
        let mut config = Config {
            state_dir: Some(PathBuf::from("/from/file")),
            ..Config::default()
        };
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.state_dir, Some(PathBuf::from("/from/file")));
    }

    #[test]
    fn bad_values_fall_back() {
        let config = Config {
            storage_backend: Some("postgres".to_string()),
            dedup: DedupConfig {
                criteria: Some("fuzzy".to_string()),
                window: Some("soon".to_string()),
            },
            ..Config::default()
        };
        assert_eq!(config.backend(), Backend::Tsv);
        assert_eq!(config.dedup_options(), DedupOptions::default());
    }
}
