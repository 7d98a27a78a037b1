//! Infrastructure provider registry and secret resolution.
//!
//! Providers live as directories under a providers root; each holds the
//! Terraform configuration plus a `provider.yaml` descriptor naming the
//! environment variables it needs and the options it accepts.

mod secrets;

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::{self, FileError};

pub use secrets::{EnvironmentSecrets, SecretsError, SecretsProvider};

/// File name of the descriptor inside a provider directory.
pub const DESCRIPTOR_FILE_NAME: &str = "provider.yaml";

/// Errors raised while resolving a provider.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ProviderError {
    /// Raised when no provider directory exists for the requested name.
    #[error("provider {provider:?} is not supported (no directory at {dir})")]
    Unsupported {
        /// Requested provider name.
        provider: String,
        /// Directory that was expected to exist.
        dir: Utf8PathBuf,
    },
    /// Raised when the providers root or a descriptor cannot be read.
    #[error("could not read provider data at {path}: {message}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when a descriptor is not valid YAML.
    #[error("could not parse provider descriptor {path}: {message}")]
    Descriptor {
        /// Descriptor path.
        path: Utf8PathBuf,
        /// Parser error message.
        message: String,
    },
    /// Raised when the plan sets an option the provider does not accept.
    #[error("provider {provider} does not support option {option:?}")]
    UnsupportedOption {
        /// Provider name.
        provider: String,
        /// Offending option key.
        option: String,
    },
}

impl From<FileError> for ProviderError {
    fn from(err: FileError) -> Self {
        Self::Io {
            path: err.path,
            message: err.message,
        }
    }
}

/// Capabilities declared by a provider.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProviderDescriptor {
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Provider variable name to the environment variable that supplies it.
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    /// Option keys accepted in the plan's provisioner section.
    ///
    /// An empty list accepts any option.
    #[serde(default)]
    pub supported_options: Vec<String>,
}

impl ProviderDescriptor {
    /// Rejects options the descriptor does not list.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnsupportedOption`] for the first unknown key.
    pub fn validate_options(
        &self,
        provider: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<(), ProviderError> {
        if self.supported_options.is_empty() {
            return Ok(());
        }
        match options
            .keys()
            .find(|key| !self.supported_options.contains(key))
        {
            Some(option) => Err(ProviderError::UnsupportedOption {
                provider: provider.to_owned(),
                option: option.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Provider resolved from the registry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedProvider {
    /// Provider name.
    pub name: String,
    /// Directory holding the provider's Terraform configuration.
    pub dir: Utf8PathBuf,
    /// Parsed descriptor.
    pub descriptor: ProviderDescriptor,
}

/// Lookup of providers under a root directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderRegistry {
    providers_dir: Utf8PathBuf,
}

impl ProviderRegistry {
    /// Creates a registry over `providers_dir`.
    #[must_use]
    pub fn new(providers_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            providers_dir: providers_dir.into(),
        }
    }

    /// Root directory scanned for providers.
    #[must_use]
    pub fn providers_dir(&self) -> &Utf8Path {
        &self.providers_dir
    }

    /// Names of the available providers, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Io`] when the root cannot be listed.
    pub fn available(&self) -> Result<Vec<String>, ProviderError> {
        Ok(files::list_dirs(&self.providers_dir)?)
    }

    /// Locates provider `name` and reads its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unsupported`] when the provider directory is
    /// missing, or a read/parse error for its descriptor.
    pub fn resolve(&self, name: &str) -> Result<ResolvedProvider, ProviderError> {
        let dir = self.providers_dir.join(name);
        if name.trim().is_empty() || !files::path_exists(&dir)? {
            return Err(ProviderError::Unsupported {
                provider: name.to_owned(),
                dir,
            });
        }
        let path = dir.join(DESCRIPTOR_FILE_NAME);
        let contents = files::read_to_string(&path)?;
        let descriptor =
            serde_yaml::from_str(&contents).map_err(|err| ProviderError::Descriptor {
                path: path.clone(),
                message: err.to_string(),
            })?;
        Ok(ResolvedProvider {
            name: name.to_owned(),
            dir,
            descriptor,
        })
    }
}
