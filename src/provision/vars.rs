//! Variable files handed to Terraform.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::Serialize;

use super::ProvisionError;
use super::keys::KeyPairPaths;
use crate::files;
use crate::plan::Plan;

/// Tool-level variables file.
pub const TOOL_VARS_FILE: &str = "terraform.tfvars.json";
/// Provider options file, loaded automatically by Terraform.
pub const PROVIDER_VARS_FILE: &str = "provider.auto.tfvars.json";

/// Cluster-wide variables every provider receives.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TerraformVariables<'a> {
    /// Version of this tool.
    pub clusterform_version: &'a str,
    /// Owner tag applied to created resources.
    pub cluster_owner: &'a str,
    /// Cluster name.
    pub cluster_name: &'a str,
    /// Number of master nodes.
    pub master_count: u32,
    /// Number of etcd nodes.
    pub etcd_count: u32,
    /// Number of worker nodes.
    pub worker_count: u32,
    /// Number of ingress nodes.
    pub ingress_count: u32,
    /// Number of storage nodes.
    pub storage_count: u32,
    /// Path of the private SSH key.
    pub private_ssh_key_path: &'a str,
    /// Path of the public SSH key.
    pub public_ssh_key_path: &'a str,
}

impl<'a> TerraformVariables<'a> {
    /// Collects the variables for `plan`.
    #[must_use]
    pub fn new(
        plan: &'a Plan,
        version: &'a str,
        owner: &'a str,
        keys: &'a KeyPairPaths,
    ) -> Self {
        Self {
            clusterform_version: version,
            cluster_owner: owner,
            cluster_name: plan.cluster.name.as_str(),
            master_count: plan.master.expected_count,
            etcd_count: plan.etcd.expected_count,
            worker_count: plan.worker.expected_count,
            ingress_count: plan.ingress.expected_count,
            storage_count: plan.storage.expected_count,
            private_ssh_key_path: keys.private.as_str(),
            public_ssh_key_path: keys.public.as_str(),
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Utf8Path, value: &T) -> Result<(), ProvisionError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| ProvisionError::Encode {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    files::write(path, rendered)?;
    Ok(())
}

/// Writes both variables files into `state_dir`.
///
/// # Errors
///
/// Returns [`ProvisionError::Encode`] or [`ProvisionError::Io`].
pub fn write_inputs(
    state_dir: &Utf8Path,
    variables: &TerraformVariables<'_>,
    options: &BTreeMap<String, String>,
) -> Result<(), ProvisionError> {
    write_json(&state_dir.join(TOOL_VARS_FILE), variables)?;
    write_json(&state_dir.join(PROVIDER_VARS_FILE), options)
}
