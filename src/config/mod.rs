//! Configuration loading via `ortho-config`.
//!
//! [`ProvisionConfig`] merges defaults, `clusterform.toml` and
//! `CLUSTERFORM_*` environment variables, then hands out the layout, store
//! location and orchestrator settings the workflows need.

use std::env;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::plan::ClusterLayout;
use crate::provider::ProviderRegistry;
use crate::provision::OrchestratorSettings;

/// Default Terraform executable.
pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";
/// Default `ssh-keygen` executable.
pub const DEFAULT_SSH_KEYGEN_BIN: &str = "ssh-keygen";
/// Default directory holding provider configurations.
pub const DEFAULT_PROVIDERS_DIR: &str = "providers";
/// Default assets root holding one directory per cluster.
pub const DEFAULT_ASSETS_DIR: &str = "clusters";
/// Default state store file name inside the assets root.
pub const DEFAULT_STORE_FILE: &str = "clusterStates.db";

/// Tool settings derived from defaults, configuration files and environment
/// variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CLUSTERFORM",
    discovery(
        app_name = "clusterform",
        env_var = "CLUSTERFORM_CONFIG_PATH",
        config_file_name = "clusterform.toml",
        dotfile_name = ".clusterform.toml",
        project_file_name = "clusterform.toml"
    )
)]
pub struct ProvisionConfig {
    /// Path to the `terraform` executable.
    #[ortho_config(default = DEFAULT_TERRAFORM_BIN.to_owned())]
    pub terraform_bin: String,
    /// Path to the `ssh-keygen` executable.
    #[ortho_config(default = DEFAULT_SSH_KEYGEN_BIN.to_owned())]
    pub ssh_keygen_bin: String,
    /// Directory holding one sub-directory per provider.
    #[ortho_config(default = DEFAULT_PROVIDERS_DIR.to_owned())]
    pub providers_dir: String,
    /// Assets root holding one directory per cluster.
    #[ortho_config(default = DEFAULT_ASSETS_DIR.to_owned())]
    pub assets_dir: String,
    /// State store file name, relative to the assets root.
    #[ortho_config(default = DEFAULT_STORE_FILE.to_owned())]
    pub store_file: String,
    /// Owner recorded on provisioned resources. Falls back to `$USER`.
    pub cluster_owner: Option<String>,
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Raised when a configured directory cannot be made absolute.
    #[error("could not resolve configured path {path}: {message}")]
    Path {
        /// Configured path.
        path: String,
        /// Underlying error message.
        message: String,
    },
}

struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

const fn field(
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
) -> FieldMetadata {
    FieldMetadata {
        description,
        env_var,
        toml_key,
    }
}

const OWNER_FIELD: FieldMetadata =
    field("cluster owner", "CLUSTERFORM_CLUSTER_OWNER", "cluster_owner");

impl ProvisionConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to clusterform.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without parsing CLI arguments. Values merge
    /// defaults, configuration files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("clusterform")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Rejects blank values with a message naming the environment variable
    /// and TOML key that set them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for the first blank field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (
                &self.terraform_bin,
                field("Terraform binary", "CLUSTERFORM_TERRAFORM_BIN", "terraform_bin"),
            ),
            (
                &self.ssh_keygen_bin,
                field(
                    "ssh-keygen binary",
                    "CLUSTERFORM_SSH_KEYGEN_BIN",
                    "ssh_keygen_bin",
                ),
            ),
            (
                &self.providers_dir,
                field(
                    "providers directory",
                    "CLUSTERFORM_PROVIDERS_DIR",
                    "providers_dir",
                ),
            ),
            (
                &self.assets_dir,
                field("assets directory", "CLUSTERFORM_ASSETS_DIR", "assets_dir"),
            ),
            (
                &self.store_file,
                field("state store file", "CLUSTERFORM_STORE_FILE", "store_file"),
            ),
        ];
        for (value, metadata) in &required {
            Self::require_field(value, metadata)?;
        }
        if let Some(owner) = &self.cluster_owner {
            Self::require_field(owner, &OWNER_FIELD)?;
        }
        Ok(())
    }

    /// Directory layout rooted at the assets directory.
    #[must_use]
    pub fn layout(&self) -> ClusterLayout {
        ClusterLayout::new(&self.assets_dir)
    }

    /// Location of the cluster state store.
    #[must_use]
    pub fn store_path(&self) -> Utf8PathBuf {
        Utf8Path::new(&self.assets_dir).join(&self.store_file)
    }

    /// Registry over the configured providers directory.
    #[must_use]
    pub fn registry(&self) -> ProviderRegistry {
        ProviderRegistry::new(&self.providers_dir)
    }

    /// Owner recorded on provisioned resources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when neither the configuration
    /// nor `$USER` names an owner.
    pub fn owner(&self) -> Result<String, ConfigError> {
        let owner = self
            .cluster_owner
            .clone()
            .unwrap_or_else(|| env::var("USER").unwrap_or_default());
        Self::require_field(&owner, &OWNER_FIELD)?;
        Ok(owner)
    }

    /// Settings for a [`crate::ProvisionOrchestrator`].
    ///
    /// Directories are made absolute because Terraform runs inside the
    /// per-cluster state directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails, when no owner can be
    /// determined, or when a directory cannot be resolved.
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings, ConfigError> {
        self.validate()?;
        Ok(OrchestratorSettings {
            terraform_bin: self.terraform_bin.clone(),
            providers_dir: absolute(&self.providers_dir)?,
            state_dir: absolute(&self.assets_dir)?,
            cluster_owner: self.owner()?,
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }
}

fn absolute(path: &str) -> Result<Utf8PathBuf, ConfigError> {
    let resolved = std::path::absolute(path).map_err(|err| ConfigError::Path {
        path: path.to_owned(),
        message: err.to_string(),
    })?;
    Utf8PathBuf::from_path_buf(resolved).map_err(|non_utf8: PathBuf| ConfigError::Path {
        path: path.to_owned(),
        message: format!("{} is not valid UTF-8", non_utf8.display()),
    })
}
