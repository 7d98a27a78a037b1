//! Command description, captured output and the runner abstraction.

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::Write;
use std::process::Command;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while starting or supervising a child process.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ExecError {
    /// Raised when the program cannot be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Error message returned by the operating system.
        message: String,
    },
    /// Raised when the child's output cannot be read or forwarded.
    #[error("i/o failure while running {program}: {message}")]
    Io {
        /// Program whose output was being handled.
        program: String,
        /// Underlying error message.
        message: String,
    },
}

/// Description of a single child process invocation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandSpec {
    /// Program to execute, resolved through `PATH` when not absolute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Working directory for the child; inherits the caller's when unset.
    pub current_dir: Option<Utf8PathBuf>,
    /// Additional environment variables layered over the inherited ones.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Starts a description for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<OsString>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory for the child.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Adds environment variables for the child.
    #[must_use]
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Renders the program and arguments as a shell-escaped command line.
    ///
    /// Environment values are omitted because they commonly carry
    /// credentials.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut rendered = vec![shell_escape::unix::escape(Cow::Borrowed(self.program.as_str()))];
        rendered.extend(
            self.args
                .iter()
                .map(|arg| shell_escape::unix::escape(arg.to_string_lossy())),
        );
        rendered.join(" ")
    }

    pub(super) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command.envs(self.env.iter().map(|(key, value)| (key, value)));
        command
    }
}

/// Result of running an external command.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Describes the exit status for error messages.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `command`, forwarding its output to `sink` and returning the
    /// captured streams once the child exits.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// [`CommandOutput::is_success`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the command cannot be started and
    /// [`ExecError::Io`] if its output cannot be read or forwarded.
    fn run(&self, command: &CommandSpec, sink: &mut dyn Write)
    -> Result<CommandOutput, ExecError>;
}
