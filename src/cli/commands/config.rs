//! `ims config` command - Configuration management
//!
//! Provides commands to view and modify IMS configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::{discover_project, require_project};
use crate::cli::GlobalOpts;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path(PathArgs),

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,

    /// Show only project-level config
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global (user) config
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., database, low_stock_threshold)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Show only project config path
    #[arg(long = "project-only")]
    pub project_only: bool,

    /// Show only global config path
    #[arg(long = "global-only")]
    pub global_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Text,
    Number,
    Count,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, KeyKind, &str)] = &[
    (
        "database",
        KeyKind::Text,
        "Database path, sqlite://<path>, or sqlite::memory:",
    ),
    ("data_dir", KeyKind::Text, "Directory holding source workbooks"),
    ("workbook", KeyKind::Text, "Default workbook for `ims import all`"),
    (
        "low_stock_threshold",
        KeyKind::Number,
        "Stock at or below this counts as low",
    ),
    ("default_page_size", KeyKind::Count, "Rows per page when none is given"),
    ("max_page_size", KeyKind::Count, "Largest page size accepted"),
    ("log_level", KeyKind::Text, "Log filter, e.g. info or ims=debug"),
    ("log_format", KeyKind::Text, "Log format: text or json"),
];

fn key_kind(key: &str) -> Result<KeyKind> {
    VALID_KEYS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, kind, _)| *kind)
        .ok_or_else(|| {
            miette::miette!(
                help = "run `ims config keys` to list valid keys",
                "Unknown config key '{}'",
                key
            )
        })
}

/// Parse a command-line value into the YAML shape the key expects
fn typed_value(key: &str, raw: &str) -> Result<serde_yml::Value> {
    let raw = raw.trim();
    match key_kind(key)? {
        KeyKind::Text => {
            if key == "log_format" && !matches!(raw, "text" | "json") {
                return Err(miette::miette!("log_format must be 'text' or 'json'"));
            }
            Ok(serde_yml::Value::String(raw.to_string()))
        }
        KeyKind::Number => {
            let n: f64 = raw
                .parse()
                .map_err(|_| miette::miette!("{} must be a number, got '{}'", key, raw))?;
            if !n.is_finite() || n < 0.0 {
                return Err(miette::miette!("{} must be zero or more", key));
            }
            Ok(serde_yml::Value::from(n))
        }
        KeyKind::Count => {
            let n: u64 = raw
                .parse()
                .map_err(|_| miette::miette!("{} must be a whole number, got '{}'", key, raw))?;
            if n == 0 {
                return Err(miette::miette!("{} must be at least 1", key));
            }
            Ok(serde_yml::Value::from(n))
        }
    }
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path(args) => run_path(args, global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = discover_project(global);
    let config = Config::load_for(project.as_ref());

    // If a specific key is requested, show just that value
    if let Some(key) = &args.key {
        key_kind(key)?;
        match get_config_value(&config, key) {
            Some(v) => println!("{}", v),
            None => return Err(miette::miette!("Key '{}' is not set", key)),
        }
        return Ok(());
    }

    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    if args.project_only {
        show_config_file("Project config:", project_config_path(global)?)?;
    } else if args.global_only {
        show_config_file("Global config:", global_config_path()?)?;
    } else {
        println!("{}", style("Effective Configuration").bold().underlined());
        println!();

        for (key, _, _) in VALID_KEYS {
            print_config_value(key, get_config_value(&config, key).as_deref());
        }
        println!();
        println!(
            "  {}: {}",
            style("database (resolved)").cyan(),
            config
                .database_target(project.as_ref(), global.database.as_deref())
                .map_or_else(
                    || style("(none: run `ims init`)".to_string()).dim(),
                    |t| style(t.to_string()).yellow()
                )
        );

        println!();
        println!("{}", style("Config Sources (in priority order):").dim());
        println!("  1. --database flag");
        println!("  2. Environment variables (IMS_DATABASE, IMS_DATA_DIR, IMS_LOG)");
        println!("  3. Project config (.ims/config.yaml)");
        println!("  4. Global config (~/.config/ims/config.yaml)");
    }

    Ok(())
}

fn load_mapping(path: &Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: serde_yml::Value =
        serde_yml::from_str(&content).unwrap_or(serde_yml::Value::Mapping(Default::default()));
    // An empty file parses as null
    Ok(if parsed.is_null() {
        serde_yml::Value::Mapping(Default::default())
    } else {
        parsed
    })
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let value = typed_value(&args.key, &args.value)?;
    let config_path = if args.global {
        global_config_path()?
    } else {
        project_config_path(global)?
    };

    let mut config_map = load_mapping(&config_path)?;
    match &mut config_map {
        serde_yml::Value::Mapping(map) => {
            map.insert(serde_yml::Value::String(args.key.clone()), value);
        }
        _ => {
            return Err(miette::miette!(
                "{} is not a YAML mapping",
                config_path.display()
            ))
        }
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(args.value.trim()).yellow(),
        scope
    );

    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = if args.global {
        global_config_path()?
    } else {
        project_config_path(global)?
    };

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = load_mapping(&config_path)?;
    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(&serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };
    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );

    Ok(())
}

fn run_path(args: PathArgs, global: &GlobalOpts) -> Result<()> {
    if args.project_only && args.global_only {
        return Err(miette::miette!(
            "Cannot specify both --project-only and --global-only"
        ));
    }

    if args.project_only {
        println!("{}", project_config_path(global)?.display());
    } else if args.global_only {
        println!("{}", global_config_path()?.display());
    } else {
        let global_path = global_config_path()?;

        println!("{}", style("Configuration file paths:").bold());
        println!();
        println!("  {} {}", style("Global:").cyan(), global_path.display());
        print_exists(global_path.exists(), 9);

        println!();
        match discover_project(global) {
            Some(project) => {
                let path = project.config_path();
                println!("  {} {}", style("Project:").cyan(), path.display());
                print_exists(path.exists(), 10);
            }
            None => println!(
                "  {} {}",
                style("Project:").cyan(),
                style("(not in an IMS project)").dim()
            ),
        }
    }

    Ok(())
}

fn print_exists(exists: bool, indent: usize) {
    let pad = " ".repeat(indent);
    if exists {
        println!("{}{}", pad, style("(exists)").green());
    } else {
        println!("{}{}", pad, style("(not created)").dim());
    }
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, _, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'ims config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

fn global_config_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn project_config_path(global: &GlobalOpts) -> Result<PathBuf> {
    Ok(require_project(global)?.config_path())
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "database" => config.database.clone(),
        "data_dir" => config.data_dir.clone(),
        "workbook" => config.workbook.clone(),
        "low_stock_threshold" => config.low_stock_threshold.map(|v| v.to_string()),
        "default_page_size" => config.default_page_size.map(|v| v.to_string()),
        "max_page_size" => config.max_page_size.map(|v| v.to_string()),
        "log_level" => config.log_level.clone(),
        "log_format" => config.log_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn show_config_file(label: &str, path: PathBuf) -> Result<()> {
    println!("{} {}", style(label).bold(), style(path.display()).dim());
    println!();

    if path.exists() {
        let content = fs::read_to_string(&path).into_diagnostic()?;
        print!("{}", content);
    } else {
        println!("{}", style("(not created)").dim());
    }

    Ok(())
}
