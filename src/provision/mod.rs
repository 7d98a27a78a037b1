//! Provisioning orchestration.
//!
//! [`ProvisionOrchestrator`] takes a plan through the whole infrastructure
//! lifecycle: it validates the provider, prepares SSH keys and variable
//! files, runs `terraform init`, `plan` and `apply`, and finally folds the
//! reported machines back into a copy of the plan.
//!
//! The caller's plan is never modified. A destructive execution plan stops
//! the run before `apply` unless destruction was explicitly allowed.

mod error;
mod guard;
mod keys;
mod reconcile;
mod vars;

use std::io::Write;

use camino::Utf8PathBuf;
use tracing::{info, warn};

use crate::exec::CommandRunner;
use crate::files;
use crate::plan::Plan;
use crate::provider::{ProviderRegistry, SecretsProvider};
use crate::terraform::Terraform;

pub use error::ProvisionError;
pub use guard::plan_destroys_nothing;
pub use keys::{KeyError, KeyGenerator, KeyPairPaths, KeyPairStatus, SshKeygen, ensure_key_pair};
pub use vars::{PROVIDER_VARS_FILE, TOOL_VARS_FILE, TerraformVariables, write_inputs};

/// Options for a provisioning run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProvisionOpts {
    /// Apply even when the execution plan destroys resources.
    pub allow_destruction: bool,
}

/// Fixed inputs shared by every orchestrator run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrchestratorSettings {
    /// Terraform binary to execute.
    pub terraform_bin: String,
    /// Root directory holding provider configurations.
    pub providers_dir: Utf8PathBuf,
    /// Root directory holding per-cluster state directories.
    pub state_dir: Utf8PathBuf,
    /// Owner recorded on provisioned resources.
    pub cluster_owner: String,
    /// Version string passed to providers.
    pub tool_version: String,
}

/// Drives Terraform for a cluster plan.
#[derive(Debug)]
pub struct ProvisionOrchestrator<R, S, K> {
    settings: OrchestratorSettings,
    registry: ProviderRegistry,
    runner: R,
    secrets: S,
    keys: K,
}

impl<R, S, K> ProvisionOrchestrator<R, S, K>
where
    R: CommandRunner,
    S: SecretsProvider,
    K: KeyGenerator,
{
    /// Creates an orchestrator.
    pub fn new(settings: OrchestratorSettings, runner: R, secrets: S, keys: K) -> Self {
        let registry = ProviderRegistry::new(settings.providers_dir.clone());
        Self {
            settings,
            registry,
            runner,
            secrets,
            keys,
        }
    }

    /// Creates or updates the infrastructure for `plan` and returns the plan
    /// populated with the provisioned nodes.
    ///
    /// Tool output is streamed to `out` as it is produced.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisionError`] describing the first failing step. No
    /// step is retried and nothing is rolled back.
    pub fn provision(
        &self,
        plan: &Plan,
        opts: ProvisionOpts,
        out: &mut dyn Write,
    ) -> Result<Plan, ProvisionError> {
        let cluster = plan.cluster.name.as_str();
        let provider = self.registry.resolve(&plan.provisioner.provider)?;
        provider
            .descriptor
            .validate_options(&provider.name, &plan.provisioner.options)?;

        let state_dir = self.settings.state_dir.join(cluster);
        files::create_dir_all(&state_dir)?;

        let key_pair = KeyPairPaths::for_cluster(&state_dir, cluster);
        let key_status = ensure_key_pair(&self.keys, &key_pair, cluster)?;
        info!(cluster, ?key_status, "SSH key pair ready");
        let mut working = plan.clone();
        working.cluster.ssh.ssh_key = key_pair.private.to_string();

        let variables = TerraformVariables::new(
            &working,
            &self.settings.tool_version,
            &self.settings.cluster_owner,
            &key_pair,
        );
        write_inputs(&state_dir, &variables, &working.provisioner.options)?;

        let secrets = self
            .secrets
            .environment_variables(cluster, &provider.descriptor.environment_variables)?;
        let terraform = Terraform::new(
            &self.settings.terraform_bin,
            &self.runner,
            state_dir,
            secrets,
        );
        let provider_dir = provider.dir.as_str();

        terraform.run(&["init", provider_dir], out)?;
        let out_flag = format!("-out={cluster}");
        let planned = terraform.run(&["plan", &out_flag, provider_dir], out)?;
        if !plan_destroys_nothing(&planned) {
            if !opts.allow_destruction {
                warn!(cluster, "execution plan destroys resources; refusing to apply");
                return Err(ProvisionError::DestructionDetected);
            }
            warn!(cluster, "execution plan destroys resources; destruction allowed");
        }
        terraform.run(&["apply", "-input=false", cluster], out)?;

        let populated = reconcile::populate_plan(&terraform.outputs(), working)?;
        info!(cluster, "infrastructure provisioned");
        Ok(populated)
    }

    /// Tears down the infrastructure of `cluster` using `provider`.
    ///
    /// # Errors
    ///
    /// Every failure is reported as [`ProvisionError::Destroy`], with the
    /// cause available through [`std::error::Error::source`].
    pub fn destroy(
        &self,
        provider: &str,
        cluster: &str,
        out: &mut dyn Write,
    ) -> Result<(), ProvisionError> {
        self.try_destroy(provider, cluster, out)
            .map_err(|err| ProvisionError::Destroy(Box::new(err)))
    }

    fn try_destroy(
        &self,
        provider: &str,
        cluster: &str,
        out: &mut dyn Write,
    ) -> Result<(), ProvisionError> {
        let resolved = self.registry.resolve(provider)?;
        let secrets = self
            .secrets
            .environment_variables(cluster, &resolved.descriptor.environment_variables)?;
        let terraform = Terraform::new(
            &self.settings.terraform_bin,
            &self.runner,
            self.settings.state_dir.join(cluster),
            secrets,
        );
        terraform.run(&["destroy", "-force"], out)?;
        info!(cluster, "infrastructure destroyed");
        Ok(())
    }
}
