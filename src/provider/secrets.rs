//! Resolution of the credentials a provider needs.

use std::collections::{BTreeMap, BTreeSet};
use std::env;

use thiserror::Error;

/// Errors raised while resolving provider secrets.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SecretsError {
    /// Raised when required environment variables are unset or empty.
    #[error("missing required environment variables: {}", names.join(", "))]
    Missing {
        /// Every missing variable name, sorted.
        names: Vec<String>,
    },
}

/// Source of the environment handed to the provider tool.
pub trait SecretsProvider {
    /// Resolves the environment variables declared in `expected`, whose
    /// values name the variables to look up.
    ///
    /// # Errors
    ///
    /// Returns [`SecretsError::Missing`] listing every unresolved name.
    fn environment_variables(
        &self,
        cluster_name: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, SecretsError>;
}

/// Reads secrets from the process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentSecrets;

impl SecretsProvider for EnvironmentSecrets {
    fn environment_variables(
        &self,
        _cluster_name: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, SecretsError> {
        let names: BTreeSet<&str> = expected.values().map(String::as_str).collect();
        let mut resolved = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match env::var(name) {
                Ok(value) if !value.is_empty() => resolved.push((name.to_owned(), value)),
                _ => missing.push(name.to_owned()),
            }
        }
        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(SecretsError::Missing { names: missing })
        }
    }
}
