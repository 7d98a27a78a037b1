//! Invocation of the Terraform binary for a single cluster.
//!
//! A [`Terraform`] session binds the binary, the command runner, the
//! per-cluster state directory and the environment handed to the tool, so
//! every phase of a provisioning run executes with identical context.

mod output;

use std::io::Write;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::exec::{CommandRunner, CommandSpec, ExecError, TeeWriter};

pub use output::{OutputError, OutputVariable, OutputVariableReader};

/// Environment variable telling Terraform it runs unattended.
pub const AUTOMATION_ENV: &str = "TF_IN_AUTOMATION";
const AUTOMATION_VALUE: &str = "True";

/// Errors raised by a Terraform invocation.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TerraformError {
    /// Raised when Terraform cannot be started or its output relayed.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// Raised when Terraform exits unsuccessfully.
    #[error("terraform {subcommand} exited with status {status}:\n{output}")]
    Failed {
        /// Terraform subcommand that failed.
        subcommand: String,
        /// Exit status text.
        status: String,
        /// Combined output captured from the run.
        output: String,
    },
}

/// Terraform bound to one cluster's state directory.
#[derive(Debug)]
pub struct Terraform<'a, R> {
    binary: &'a str,
    runner: &'a R,
    work_dir: Utf8PathBuf,
    env: Vec<(String, String)>,
}

impl<'a, R: CommandRunner> Terraform<'a, R> {
    /// Creates a session that runs `binary` inside `work_dir` with the given
    /// extra environment. [`AUTOMATION_ENV`] is always set.
    #[must_use]
    pub fn new(
        binary: &'a str,
        runner: &'a R,
        work_dir: impl Into<Utf8PathBuf>,
        secrets: Vec<(String, String)>,
    ) -> Self {
        let mut env = Vec::with_capacity(secrets.len() + 1);
        env.push((String::from(AUTOMATION_ENV), String::from(AUTOMATION_VALUE)));
        env.extend(secrets);
        Self {
            binary,
            runner,
            work_dir: work_dir.into(),
            env,
        }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        CommandSpec::new(self.binary)
            .args(args)
            .current_dir(self.work_dir.clone())
            .envs(self.env.iter().cloned())
    }

    /// Runs one Terraform subcommand, streaming its output to `out` and
    /// returning the captured combined output.
    ///
    /// # Errors
    ///
    /// Returns [`TerraformError::Failed`] with the captured output when the
    /// tool exits unsuccessfully.
    pub fn run(&self, args: &[&str], out: &mut dyn Write) -> Result<String, TerraformError> {
        let subcommand = args.first().copied().unwrap_or_default();
        let command = self.command(args.iter().copied());
        info!(subcommand, dir = %self.work_dir, "running terraform");
        debug!(command = %command.command_line(), "terraform command line");

        let mut tee = TeeWriter::new(out, Vec::new());
        let result = self.runner.run(&command, &mut tee)?;
        let (_, captured) = tee.into_inner();
        let combined = String::from_utf8_lossy(&captured).into_owned();
        if result.is_success() {
            Ok(combined)
        } else {
            Err(TerraformError::Failed {
                subcommand: subcommand.to_owned(),
                status: result.status_text(),
                output: combined,
            })
        }
    }

    /// Runs a subcommand without forwarding its output anywhere.
    pub(crate) fn run_quiet(
        &self,
        args: &[&str],
    ) -> Result<crate::exec::CommandOutput, TerraformError> {
        let command = self.command(args.iter().copied());
        debug!(command = %command.command_line(), "terraform query");
        Ok(self.runner.run(&command, &mut std::io::sink())?)
    }

    /// Reader for the session's output variables.
    #[must_use]
    pub const fn outputs(&self) -> OutputVariableReader<'_, 'a, R> {
        OutputVariableReader::new(self)
    }
}
