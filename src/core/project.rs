//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Workspace marker directory
pub const IMS_DIR: &str = ".ims";

/// Represents an IMS workspace
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .ims/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(IMS_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(IMS_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::create_layout(root)
    }

    /// Initialize even if .ims/ exists; rewrites the default config
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_layout(root)
    }

    fn create_layout(root: PathBuf) -> Result<Self, ProjectError> {
        let project = Self { root };
        for dir in [project.ims_dir(), project.default_data_dir(), project.exports_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        }
        std::fs::write(project.config_path(), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(project.ims_dir().join(".gitignore"), "*.db\n*.db-wal\n*.db-shm\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# IMS Project Configuration

# Document database: a path (relative to .ims/), sqlite://<path>, or sqlite::memory:
# database: ims.db

# Directory scanned by `ims status` for source workbooks
data_dir: data

# Workbook used by `ims import all` when no file is given
# workbook: data/inventory.xlsx

# Stock at or below this is reported as low_stock
low_stock_threshold: 10

# Pagination for list commands and reports
# default_page_size: 50
# max_page_size: 500

# Logging (overridden by IMS_LOG); log_format: text | json
# log_level: warn
# log_format: text
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .ims configuration directory
    pub fn ims_dir(&self) -> PathBuf {
        self.root.join(IMS_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.ims_dir().join("config.yaml")
    }

    /// Source workbook directory created by `init`
    pub fn default_data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Where exported reports are written by default
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Spreadsheet and CSV files under a directory
    pub fn iter_source_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(dir)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                !name.starts_with("~$")
                    && e.path()
                        .extension()
                        .and_then(|x| x.to_str())
                        .is_some_and(|x| {
                            matches!(
                                x.to_lowercase().as_str(),
                                "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" | "csv"
                            )
                        })
            })
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an IMS project (searched from {searched_from:?}). Run 'ims init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("IMS project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.ims_dir().is_dir());
        assert!(project.config_path().exists());
        assert!(project.default_data_dir().is_dir());
        assert!(project.exports_dir().is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
        assert!(Project::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_project_discover_finds_ims_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_ims_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_iter_source_files_filters_extensions() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("a.xlsx"), b"").unwrap();
        std::fs::write(tmp.path().join("b.CSV"), b"").unwrap();
        std::fs::write(tmp.path().join("~$a.xlsx"), b"").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"").unwrap();

        let mut names: Vec<_> = Project::iter_source_files(tmp.path())
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.xlsx", "b.CSV"]);
    }
}
