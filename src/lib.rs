//! Core library for the clusterform provisioning tool.
//!
//! The crate turns a declarative cluster plan into machines by driving
//! Terraform through a fixed init → plan → apply lifecycle, folds the
//! reported inventory back into the plan without losing operator-set node
//! metadata, and records each cluster's desired and observed state in a
//! file-backed store.

pub mod config;
pub mod exec;
mod files;
pub mod plan;
pub mod provider;
pub mod provision;
pub mod store;
pub mod terraform;
#[cfg(test)]
mod test_support;
pub mod workflow;

pub use config::{ConfigError, ProvisionConfig};
pub use exec::{
    CommandOutput, CommandRunner, CommandSpec, ExecError, StreamingCommandRunner,
    TeeWriter,
};
pub use plan::{
    ClusterLayout, FilePlanner, KubeletOptions, MasterNodeGroup, Node, NodeGroup, Plan,
    PlanFileError, PlanTemplate, Provisioner, Role, merge,
};
pub use provider::{
    EnvironmentSecrets, ProviderDescriptor, ProviderError, ProviderRegistry, SecretsError,
    SecretsProvider,
};
pub use provision::{
    KeyError, KeyGenerator, KeyPairPaths, OrchestratorSettings, ProvisionError, ProvisionOpts,
    ProvisionOrchestrator, SshKeygen,
};
pub use store::{ClusterRecord, ClusterState, ClusterStateStore, StoreError};
pub use terraform::{OutputError, OutputVariable, OutputVariableReader, TerraformError};
pub use workflow::{ClusterListing, ClusterWorkflow, PlanRequest, WorkflowError, write_listing};
