//! SSH key pair management for provisioned clusters.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::info;

use crate::exec::{CommandRunner, CommandSpec, ExecError};
use crate::files::{self, FileError};

/// Errors raised while resolving a cluster key pair.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum KeyError {
    /// Raised when only the public half of the pair exists.
    #[error(
        "found an existing public key at {public}, but not the corresponding private key at \
         {private}; recover the private key or delete the public key"
    )]
    MissingPrivate {
        /// Public key path.
        public: Utf8PathBuf,
        /// Expected private key path.
        private: Utf8PathBuf,
    },
    /// Raised when only the private half of the pair exists.
    #[error(
        "found an existing private key at {private}, but not the corresponding public key at \
         {public}; recover the public key or delete the private key"
    )]
    MissingPublic {
        /// Expected public key path.
        public: Utf8PathBuf,
        /// Private key path.
        private: Utf8PathBuf,
    },
    /// Raised when key files cannot be inspected or moved.
    #[error("key file {path}: {message}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying error message.
        message: String,
    },
    /// Raised when the key generator cannot be started.
    #[error("error generating SSH key pair: {0}")]
    Exec(#[from] ExecError),
    /// Raised when the key generator exits unsuccessfully.
    #[error("error generating SSH key pair (status {status}): {output}")]
    Generate {
        /// Exit status text.
        status: String,
        /// Output captured from the generator.
        output: String,
    },
}

impl From<FileError> for KeyError {
    fn from(err: FileError) -> Self {
        Self::Io {
            path: err.path,
            message: err.message,
        }
    }
}

/// Locations of a cluster's key pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPairPaths {
    /// Public key path, `<cluster>-ssh.pub`.
    pub public: Utf8PathBuf,
    /// Private key path, `<cluster>-ssh.pem`.
    pub private: Utf8PathBuf,
}

impl KeyPairPaths {
    /// Paths of the key pair for `cluster` inside `state_dir`.
    #[must_use]
    pub fn for_cluster(state_dir: &Utf8Path, cluster: &str) -> Self {
        Self {
            public: state_dir.join(format!("{cluster}-ssh.pub")),
            private: state_dir.join(format!("{cluster}-ssh.pem")),
        }
    }
}

/// Capability that creates a new key pair.
pub trait KeyGenerator {
    /// Writes a fresh key pair to `paths`, tagging it with `comment`.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] when the pair cannot be created.
    fn generate(&self, paths: &KeyPairPaths, comment: &str) -> Result<(), KeyError>;
}

/// Generates RSA key pairs with the system `ssh-keygen`.
#[derive(Clone, Debug)]
pub struct SshKeygen<R> {
    binary: String,
    runner: R,
}

impl<R> SshKeygen<R> {
    /// Creates a generator that runs `binary` through `runner`.
    pub fn new(binary: impl Into<String>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }
}

impl<R: CommandRunner> KeyGenerator for SshKeygen<R> {
    fn generate(&self, paths: &KeyPairPaths, comment: &str) -> Result<(), KeyError> {
        let command = CommandSpec::new(self.binary.as_str())
            .args(["-q", "-t", "rsa", "-b", "4096", "-m", "PEM", "-N", "", "-C"])
            .arg(comment)
            .arg("-f")
            .arg(paths.private.as_str());
        let output = self.runner.run(&command, &mut io::sink())?;
        if !output.is_success() {
            return Err(KeyError::Generate {
                status: output.status_text(),
                output: format!("{}{}", output.stdout, output.stderr),
            });
        }
        // ssh-keygen always names the public half `<private>.pub`.
        let generated_public = Utf8PathBuf::from(format!("{}.pub", paths.private));
        files::rename_in_place(&generated_public, &paths.public)?;
        Ok(())
    }
}

/// Whether a key pair was reused or freshly generated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyPairStatus {
    /// Both halves already existed.
    Reused,
    /// A new pair was generated.
    Generated,
}

/// Reuses the key pair at `paths` or generates one when neither half exists.
///
/// # Errors
///
/// Returns [`KeyError::MissingPrivate`] or [`KeyError::MissingPublic`] when
/// exactly one half exists, and propagates generator failures.
pub fn ensure_key_pair<G: KeyGenerator + ?Sized>(
    generator: &G,
    paths: &KeyPairPaths,
    comment: &str,
) -> Result<KeyPairStatus, KeyError> {
    let public_exists = files::path_exists(&paths.public)?;
    let private_exists = files::path_exists(&paths.private)?;
    match (public_exists, private_exists) {
        (true, true) => Ok(KeyPairStatus::Reused),
        (true, false) => Err(KeyError::MissingPrivate {
            public: paths.public.clone(),
            private: paths.private.clone(),
        }),
        (false, true) => Err(KeyError::MissingPublic {
            public: paths.public.clone(),
            private: paths.private.clone(),
        }),
        (false, false) => {
            info!(private = %paths.private, "generating SSH key pair");
            generator.generate(paths, comment)?;
            Ok(KeyPairStatus::Generated)
        }
    }
}
