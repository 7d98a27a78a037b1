//! On-disk layout of cluster assets and plan file persistence.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use super::Plan;
use crate::files::{self, FileError};

/// File name of the plan inside a cluster directory.
pub const PLAN_FILE_NAME: &str = "kismatic-cluster.yaml";

/// Errors raised while reading or writing a plan file.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum PlanFileError {
    /// Raised when the plan file cannot be read or written.
    #[error("plan file {path}: {message}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the plan file is not a valid plan document.
    #[error("could not parse plan file {path}: {message}")]
    Parse {
        /// Path that failed to parse.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
    /// Raised when a plan cannot be rendered as YAML.
    #[error("could not encode plan for {path}: {message}")]
    Encode {
        /// Destination path.
        path: Utf8PathBuf,
        /// Encoder error message.
        message: String,
    },
}

impl From<FileError> for PlanFileError {
    fn from(err: FileError) -> Self {
        Self::Io {
            path: err.path,
            message: err.message,
        }
    }
}

/// Reads and writes a single plan file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilePlanner {
    path: Utf8PathBuf,
}

impl FilePlanner {
    /// Creates a planner for the plan file at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the plan file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns `true` when the plan file exists.
    ///
    /// # Errors
    ///
    /// Returns [`PlanFileError::Io`] when the existence check fails.
    pub fn exists(&self) -> Result<bool, PlanFileError> {
        Ok(files::path_exists(&self.path)?)
    }

    /// Reads and parses the plan file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanFileError::Io`] when the file cannot be read and
    /// [`PlanFileError::Parse`] when its contents are not a plan.
    pub fn read(&self) -> Result<Plan, PlanFileError> {
        let contents = files::read_to_string(&self.path)?;
        serde_yaml::from_str(&contents).map_err(|err| PlanFileError::Parse {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    /// Writes `plan`, creating the cluster directory when needed.
    ///
    /// # Errors
    ///
    /// Returns [`PlanFileError::Encode`] or [`PlanFileError::Io`].
    pub fn write(&self, plan: &Plan) -> Result<(), PlanFileError> {
        let rendered = serde_yaml::to_string(plan).map_err(|err| PlanFileError::Encode {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        files::write(&self.path, rendered)?;
        Ok(())
    }
}

/// Directory layout of the assets root.
///
/// Each cluster owns `<assets>/<name>/`, which holds the plan file, the
/// provider state and the SSH key pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterLayout {
    assets_dir: Utf8PathBuf,
}

impl ClusterLayout {
    /// Creates a layout rooted at `assets_dir`.
    #[must_use]
    pub fn new(assets_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Root directory holding every cluster.
    #[must_use]
    pub fn assets_dir(&self) -> &Utf8Path {
        &self.assets_dir
    }

    /// Directory owned by cluster `name`.
    #[must_use]
    pub fn cluster_dir(&self, name: &str) -> Utf8PathBuf {
        self.assets_dir.join(name)
    }

    /// Path of the plan file for cluster `name`.
    #[must_use]
    pub fn plan_file(&self, name: &str) -> Utf8PathBuf {
        self.cluster_dir(name).join(PLAN_FILE_NAME)
    }

    /// Planner for cluster `name`.
    #[must_use]
    pub fn planner(&self, name: &str) -> FilePlanner {
        FilePlanner::new(self.plan_file(name))
    }

    /// Names of the cluster directories present under the assets root.
    ///
    /// # Errors
    ///
    /// Returns [`PlanFileError::Io`] when the assets root cannot be listed.
    pub fn cluster_names(&self) -> Result<Vec<String>, PlanFileError> {
        Ok(files::list_dirs(&self.assets_dir)?)
    }

    /// Removes the directory owned by cluster `name`.
    ///
    /// Returns `false` when there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns [`PlanFileError::Io`] when removal fails.
    pub fn remove_cluster_dir(&self, name: &str) -> Result<bool, PlanFileError> {
        Ok(files::remove_dir_all(&self.cluster_dir(name))?)
    }
}
