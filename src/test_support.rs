//! Test support utilities shared across unit and integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::Utf8PathBuf;

use crate::exec::{CommandOutput, CommandRunner, CommandSpec, ExecError};
use crate::files;
use crate::plan::Node;
use crate::provider::{SecretsError, SecretsProvider};
use crate::provision::{KeyError, KeyGenerator, KeyPairPaths};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Scripted stdout and stderr are also written to the sink, so callers that
/// tee output see the same text a real process would have produced.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Working directory requested for the child.
    pub current_dir: Option<Utf8PathBuf>,
    /// Extra environment requested for the child.
    pub env: Vec<(String, String)>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Looks up an environment variable passed to the child.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Returns the recorded invocations rendered by
    /// [`CommandInvocation::command_string`].
    #[must_use]
    pub fn command_strings(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(CommandInvocation::command_string)
            .collect()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status with stdout text.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        command: &CommandSpec,
        sink: &mut dyn Write,
    ) -> Result<CommandOutput, ExecError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: command.program.clone(),
            args: command.args.clone(),
            current_dir: command.current_dir.clone(),
            env: command.env.clone(),
        });
        let output = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ExecError::Spawn {
                program: command.program.clone(),
                message: String::from("no scripted response available"),
            })?;
        sink.write_all(output.stdout.as_bytes())
            .and_then(|()| sink.write_all(output.stderr.as_bytes()))
            .map_err(|err| ExecError::Io {
                program: command.program.clone(),
                message: err.to_string(),
            })?;
        Ok(output)
    }
}

/// Secrets provider backed by a fixed map.
#[derive(Clone, Debug, Default)]
pub struct StaticSecrets {
    values: BTreeMap<String, String>,
}

impl StaticSecrets {
    /// Creates a provider that knows the given variables.
    #[must_use]
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        }
    }
}

impl SecretsProvider for StaticSecrets {
    fn environment_variables(
        &self,
        _cluster_name: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, SecretsError> {
        let names: BTreeSet<&String> = expected.values().collect();
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.values.contains_key(name.as_str()))
            .map(|name| (*name).clone())
            .collect();
        if !missing.is_empty() {
            return Err(SecretsError::Missing { names: missing });
        }
        Ok(names
            .into_iter()
            .filter_map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect())
    }
}

/// Key generator that writes placeholder key files and counts its calls.
#[derive(Clone, Debug, Default)]
pub struct FakeKeyGenerator {
    calls: Rc<Cell<usize>>,
}

impl FakeKeyGenerator {
    /// Number of key pairs generated so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl KeyGenerator for FakeKeyGenerator {
    fn generate(&self, paths: &KeyPairPaths, comment: &str) -> Result<(), KeyError> {
        self.calls.set(self.calls.get() + 1);
        files::write(&paths.private, format!("fake private key for {comment}\n"))?;
        files::write(&paths.public, format!("ssh-rsa AAAAFAKE {comment}\n"))?;
        Ok(())
    }
}

/// Builds a node with only its IP set.
#[must_use]
pub fn node(ip: &str) -> Node {
    Node {
        ip: ip.to_owned(),
        ..Node::default()
    }
}

/// Builds a node with one label.
#[must_use]
pub fn labelled_node(ip: &str, key: &str, value: &str) -> Node {
    let mut labelled = node(ip);
    labelled.labels.insert(key.to_owned(), value.to_owned());
    labelled
}

/// Renders the JSON document `terraform output -json` prints for a list.
#[must_use]
pub fn output_json(values: &[&str]) -> String {
    let rendered = values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{\"sensitive\":false,\"type\":\"list\",\"value\":[{rendered}]}}")
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    #[must_use]
    pub fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let changes: Vec<(&str, Option<&str>)> =
            pairs.iter().map(|(key, value)| (*key, Some(*value))).collect();
        Self::apply(&changes)
    }

    /// Sets (`Some`) or removes (`None`) environment variables while holding
    /// a global mutex.
    #[must_use]
    pub fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                changes.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard"
        );

        let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
