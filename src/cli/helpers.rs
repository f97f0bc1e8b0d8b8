//! Shared helper functions for CLI commands
//!
//! Project discovery, store opening, and small text utilities used across
//! command modules.

use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::cli::GlobalOpts;
use crate::core::collection::Collection;
use crate::core::project::Project;
use crate::core::store::{Document, DocumentStore};
use crate::core::Config;

/// Find the project named by `--project`, or the one enclosing the
/// current directory. `None` when there is none.
pub fn discover_project(global: &GlobalOpts) -> Option<Project> {
    let found = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    found.ok()
}

/// Like [`discover_project`] but a missing project is an error
pub fn require_project(global: &GlobalOpts) -> Result<Project> {
    discover_project(global).ok_or_else(|| {
        miette::miette!(
            help = "run `ims init` first or pass --project",
            "not inside an IMS project (no .ims/ directory found)"
        )
    })
}

/// Everything a data command needs: project, merged config, open store
pub struct StoreContext {
    pub project: Option<Project>,
    pub config: Config,
    pub store: DocumentStore,
}

impl StoreContext {
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = discover_project(global);
        let config = Config::load_for(project.as_ref());
        let target = config
            .database_target(project.as_ref(), global.database.as_deref())
            .ok_or_else(|| {
                miette::miette!(
                    help = "run `ims init` first, pass --project, or set --database",
                    "not inside an IMS project and no database configured"
                )
            })?;
        tracing::debug!(database = %target, "opening store");
        let store = DocumentStore::open(&target)?;
        Ok(Self {
            project,
            config,
            store,
        })
    }
}

/// Parse a `--params`/`--data` style JSON argument; absent means `{}`
pub fn parse_json_arg(raw: Option<&str>) -> Result<Value> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => serde_json::from_str(s).into_diagnostic(),
        None => Ok(Value::Object(Default::default())),
    }
}

/// clap value parser for collection names, aliases, and sheet names
pub fn parse_collection(s: &str) -> std::result::Result<Collection, String> {
    s.parse()
}

/// Build a document from `--data` JSON plus `field=value` pairs. Values
/// that parse as JSON scalars (`12`, `null`, `true`) keep that type; the
/// rest are strings.
pub fn build_document(data: Option<&str>, sets: &[String]) -> Result<Document> {
    let mut doc = match parse_json_arg(data)? {
        Value::Object(map) => map,
        other => {
            return Err(miette::miette!(
                "--data must be a JSON object, got {}",
                other
            ))
        }
    };
    for pair in sets {
        let (field, raw) = pair
            .split_once('=')
            .ok_or_else(|| miette::miette!("expected field=value, got '{}'", pair))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(miette::miette!("empty field name in '{}'", pair));
        }
        let value = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
            _ => Value::from(raw.trim()),
        };
        doc.insert(field.to_string(), value);
    }
    Ok(doc)
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Counts characters rather than bytes so CJK names never split.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
