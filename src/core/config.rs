//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::paginate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::Project;

/// Default database file inside `.ims/`
pub const DEFAULT_DATABASE: &str = "ims.db";

/// IMS configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Database connection: a path, `sqlite://<path>`, or `sqlite::memory:`
    pub database: Option<String>,

    /// Directory holding source workbooks
    pub data_dir: Option<String>,

    /// Default workbook for `ims import all`
    pub workbook: Option<String>,

    /// Stock at or below this counts as low
    pub low_stock_threshold: Option<f64>,

    pub default_page_size: Option<usize>,

    pub max_page_size: Option<usize>,

    /// tracing filter directive, e.g. `info` or `ims=debug`
    pub log_level: Option<String>,

    /// `text` (default) or `json`
    pub log_format: Option<String>,
}

/// Where the documents live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    File(PathBuf),
    Memory,
}

impl DatabaseTarget {
    /// Parse a connection string; relative paths resolve against `base`
    pub fn parse(raw: &str, base: &Path) -> Self {
        let raw = raw.trim();
        if raw == "sqlite::memory:" || raw == ":memory:" {
            return DatabaseTarget::Memory;
        }
        let path = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);
        let path = PathBuf::from(path);
        if path.is_absolute() {
            DatabaseTarget::File(path)
        } else {
            DatabaseTarget::File(base.join(path))
        }
    }
}

impl std::fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::File(p) => write!(f, "{}", p.display()),
            DatabaseTarget::Memory => write!(f, "sqlite::memory:"),
        }
    }
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        match Project::discover() {
            Ok(project) => Self::load_for(Some(&project)),
            Err(_) => Self::load_for(None),
        }
    }

    /// Load configuration for a known project (or none)
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/ims/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.ims/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(db) = get("IMS_DATABASE").filter(|v| !v.trim().is_empty()) {
            self.database = Some(db);
        }
        if let Some(dir) = get("IMS_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(dir);
        }
        if let Some(level) = get("IMS_LOG").filter(|v| !v.trim().is_empty()) {
            self.log_level = Some(level);
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ims")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.workbook.is_some() {
            self.workbook = other.workbook;
        }
        if other.low_stock_threshold.is_some() {
            self.low_stock_threshold = other.low_stock_threshold;
        }
        if other.default_page_size.is_some() {
            self.default_page_size = other.default_page_size;
        }
        if other.max_page_size.is_some() {
            self.max_page_size = other.max_page_size;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.log_format.is_some() {
            self.log_format = other.log_format;
        }
    }

    /// Resolve the database target. A CLI override wins over every layer.
    /// `None` when there is neither a project nor a database setting;
    /// memory is only used when asked for with `sqlite::memory:`.
    pub fn database_target(
        &self,
        project: Option<&Project>,
        cli_override: Option<&str>,
    ) -> Option<DatabaseTarget> {
        let base = project
            .map(|p| p.ims_dir())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        match cli_override.or(self.database.as_deref()) {
            Some(raw) => Some(DatabaseTarget::parse(raw, &base)),
            None => project.map(|p| DatabaseTarget::File(p.ims_dir().join(DEFAULT_DATABASE))),
        }
    }

    pub fn low_stock_threshold(&self) -> f64 {
        self.low_stock_threshold.unwrap_or(10.0)
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, self.max_page_size())
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
            .unwrap_or(MAX_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }

    /// Data directory, resolved against the project root
    pub fn data_dir(&self, project: Option<&Project>) -> Option<PathBuf> {
        let raw = self.data_dir.as_deref()?;
        let path = PathBuf::from(raw);
        match project {
            Some(p) if path.is_relative() => Some(p.root().join(path)),
            _ => Some(path),
        }
    }
}
