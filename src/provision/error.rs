//! Error types for the provisioning orchestrator.

use camino::Utf8PathBuf;
use thiserror::Error;

use super::keys::KeyError;
use crate::files::FileError;
use crate::plan::Role;
use crate::provider::{ProviderError, SecretsError};
use crate::terraform::{OutputError, TerraformError};

/// Errors raised while provisioning or destroying infrastructure.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised when the provider or its options are invalid.
    #[error("provider configuration error: {0}")]
    Provider(#[from] ProviderError),
    /// Raised when the cluster state directory or an input file cannot be
    /// written.
    #[error("could not write {path}: {message}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when provider inputs cannot be serialised.
    #[error("could not encode terraform variables for {path}: {message}")]
    Encode {
        /// Destination file.
        path: Utf8PathBuf,
        /// Encoder error message.
        message: String,
    },
    /// Raised when SSH key material is inconsistent or cannot be created.
    #[error(transparent)]
    Keys(#[from] KeyError),
    /// Raised when required provider credentials are missing.
    #[error("could not get secrets required for provisioning infrastructure: {0}")]
    Secrets(#[from] SecretsError),
    /// Raised when a Terraform phase fails.
    #[error(transparent)]
    Terraform(#[from] TerraformError),
    /// Raised when the execution plan would destroy resources.
    #[error(
        "destruction of resources detected when not issuing a destroy; \
         re-run with --allow-destruction if this is intended"
    )]
    DestructionDetected,
    /// Raised when an output variable cannot be read.
    #[error(transparent)]
    Output(#[from] OutputError),
    /// Raised when public IPs and hostnames disagree in number.
    #[error(
        "{role} nodes: the number of public IPs ({public}) does not match the number of hostnames ({hosts})"
    )]
    HostCountMismatch {
        /// Role being reconciled.
        role: Role,
        /// Number of public IPs reported.
        public: usize,
        /// Number of hostnames reported.
        hosts: usize,
    },
    /// Raised when private IPs are reported but do not match the public ones.
    #[error(
        "{role} nodes: the number of public IPs ({public}) does not match the number of private IPs ({private})"
    )]
    PrivateIpCountMismatch {
        /// Role being reconciled.
        role: Role,
        /// Number of public IPs reported.
        public: usize,
        /// Number of private IPs reported.
        private: usize,
    },
    /// Raised when a load balancer output does not hold exactly one value.
    #[error("expected a single value for output variable {name:?}, got {count}")]
    LoadBalancer {
        /// Output variable name.
        name: String,
        /// Number of values reported.
        count: usize,
    },
    /// Raised when tearing down infrastructure fails.
    #[error("error destroying infrastructure with terraform")]
    Destroy(#[source] Box<ProvisionError>),
}

impl From<FileError> for ProvisionError {
    fn from(err: FileError) -> Self {
        Self::Io {
            path: err.path,
            message: err.message,
        }
    }
}
