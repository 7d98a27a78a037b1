//! Cluster lifecycle workflows behind the command-line interface.
//!
//! Each workflow combines the plan files under the assets root with the
//! cluster state store. Provisioning and teardown delegate the
//! infrastructure work to a [`ProvisionOrchestrator`].

mod listing;

use std::collections::BTreeMap;
use std::io::Write;

use thiserror::Error;
use tracing::{info, warn};

use crate::exec::CommandRunner;
use crate::plan::{ClusterLayout, Plan, PlanFileError, PlanTemplate};
use crate::provider::{ProviderError, ProviderRegistry, SecretsProvider};
use crate::provision::{KeyGenerator, ProvisionError, ProvisionOpts, ProvisionOrchestrator};
use crate::store::{ClusterRecord, ClusterState, ClusterStateStore, StoreError};

pub use listing::{ClusterListing, write_listing};

/// Errors raised by the cluster workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Raised when a cluster name is unusable as a directory name.
    #[error("invalid cluster name {name:?}: names must be non-empty and must not contain path separators")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
    /// Raised when the named cluster is unknown.
    #[error("cluster with name {name:?} not found")]
    NotFound {
        /// Requested cluster name.
        name: String,
    },
    /// Raised when planning a cluster whose name is taken.
    #[error("cluster with name {name:?} already exists")]
    AlreadyExists {
        /// Requested cluster name.
        name: String,
    },
    /// Raised when a required role has no nodes.
    #[error("the number of {role} nodes must be greater than zero")]
    MissingNodes {
        /// Role name.
        role: &'static str,
    },
    /// Raised when the requested provider is not installed.
    #[error("provider {provider:?} is not available; available providers: {}", available.join(", "))]
    ProviderUnavailable {
        /// Requested provider.
        provider: String,
        /// Installed providers.
        available: Vec<String>,
    },
    /// Raised when provisioning a cluster without a provider.
    #[error("cluster {name:?} has no infrastructure provider configured")]
    NotManaged {
        /// Cluster name.
        name: String,
    },
    /// Raised when the master load balancer address is unset.
    #[error("cluster {name:?} has no master load balancer address")]
    MissingAddress {
        /// Cluster name.
        name: String,
    },
    /// Raised when the provider registry cannot be read.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Raised when a plan file cannot be read or written.
    #[error(transparent)]
    PlanFile(#[from] PlanFileError),
    /// Raised when the state store fails.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Raised when provisioning or teardown fails.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Raised when provisioning failed and the failure could not be recorded.
    #[error("{provision}: {persist}")]
    ProvisionNotRecorded {
        /// Provisioning failure.
        provision: Box<ProvisionError>,
        /// Store failure while recording it.
        persist: Box<StoreError>,
    },
}

/// Parameters of a new cluster plan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlanRequest {
    /// Cluster name.
    pub name: String,
    /// Provider that will create the machines; `None` for hand-managed
    /// machines.
    pub provider: Option<String>,
    /// Provider options to record.
    pub options: BTreeMap<String, String>,
    /// Number of etcd nodes, at least one.
    pub etcd_nodes: u32,
    /// Number of master nodes, at least one.
    pub master_nodes: u32,
    /// Number of worker nodes, at least one.
    pub worker_nodes: u32,
    /// Number of ingress nodes.
    pub ingress_nodes: u32,
    /// Number of storage nodes.
    pub storage_nodes: u32,
}

impl PlanRequest {
    fn validate(&self) -> Result<(), WorkflowError> {
        validate_name(&self.name)?;
        for (role, count) in [
            ("etcd", self.etcd_nodes),
            ("master", self.master_nodes),
            ("worker", self.worker_nodes),
        ] {
            if count == 0 {
                return Err(WorkflowError::MissingNodes { role });
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), WorkflowError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(WorkflowError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// Workflows over one assets root and its state store.
#[derive(Debug)]
pub struct ClusterWorkflow<'a> {
    layout: &'a ClusterLayout,
    store: &'a ClusterStateStore,
}

impl<'a> ClusterWorkflow<'a> {
    /// Creates workflows over `layout` and `store`.
    #[must_use]
    pub const fn new(layout: &'a ClusterLayout, store: &'a ClusterStateStore) -> Self {
        Self { layout, store }
    }

    /// Returns `true` when the store or the assets root knows cluster `name`.
    ///
    /// # Errors
    ///
    /// Returns store or plan file errors raised by the lookups.
    pub fn exists(&self, name: &str) -> Result<bool, WorkflowError> {
        if self.store.get(name)?.is_some() {
            return Ok(true);
        }
        Ok(self.layout.planner(name).exists()?)
    }

    fn require(&self, name: &str) -> Result<(), WorkflowError> {
        validate_name(name)?;
        if self.exists(name)? {
            Ok(())
        } else {
            Err(WorkflowError::NotFound {
                name: name.to_owned(),
            })
        }
    }

    /// Writes a new plan file and records the cluster as planned.
    ///
    /// # Errors
    ///
    /// Fails when the name is taken or invalid, when a required role has no
    /// nodes, when the provider is not installed, or when persisting fails.
    pub fn plan(
        &self,
        registry: &ProviderRegistry,
        request: PlanRequest,
    ) -> Result<Plan, WorkflowError> {
        request.validate()?;
        if self.exists(&request.name)? {
            return Err(WorkflowError::AlreadyExists { name: request.name });
        }
        if let Some(provider) = request.provider.as_deref() {
            let available = registry.available()?;
            if !available.iter().any(|known| known == provider) {
                return Err(WorkflowError::ProviderUnavailable {
                    provider: provider.to_owned(),
                    available,
                });
            }
        }

        let name = request.name.clone();
        let plan = PlanTemplate {
            cluster_name: request.name,
            provider: request.provider,
            options: request.options,
            etcd_nodes: request.etcd_nodes,
            master_nodes: request.master_nodes,
            worker_nodes: request.worker_nodes,
            ingress_nodes: request.ingress_nodes,
            storage_nodes: request.storage_nodes,
        }
        .into_plan();
        let planner = self.layout.planner(&name);
        planner.write(&plan)?;

        let state = if plan.provisioner.is_managed() {
            ClusterState::Planned
        } else {
            ClusterState::Unmanaged
        };
        self.store.put(&name, &ClusterRecord::new(plan.clone(), state))?;
        info!(cluster = %name, %state, plan_file = %planner.path(), "cluster planned");
        Ok(plan)
    }

    /// Provisions the infrastructure of cluster `name`.
    ///
    /// On success the populated plan is written back to the plan file and
    /// the cluster is recorded as provisioned. On failure the attempted plan
    /// is recorded with a failed current state.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Provision`] for provisioning failures and
    /// [`WorkflowError::ProvisionNotRecorded`] when the failure could not be
    /// stored either.
    pub fn provision<R, S, K>(
        &self,
        orchestrator: &ProvisionOrchestrator<R, S, K>,
        name: &str,
        opts: ProvisionOpts,
        out: &mut dyn Write,
    ) -> Result<Plan, WorkflowError>
    where
        R: CommandRunner,
        S: SecretsProvider,
        K: KeyGenerator,
    {
        self.require(name)?;
        let planner = self.layout.planner(name);
        let plan = planner.read()?;
        if !plan.provisioner.is_managed() {
            return Err(WorkflowError::NotManaged {
                name: name.to_owned(),
            });
        }

        match orchestrator.provision(&plan, opts, out) {
            Ok(provisioned) => {
                planner.write(&provisioned)?;
                self.store.put(
                    name,
                    &ClusterRecord::new(provisioned.clone(), ClusterState::Provisioned),
                )?;
                info!(cluster = name, "cluster provisioned");
                Ok(provisioned)
            }
            Err(provision) => {
                warn!(cluster = name, error = %provision, "provisioning failed");
                let record = ClusterRecord::new(plan, ClusterState::Provisioned)
                    .with_current_state(ClusterState::ProvisionFailed);
                match self.store.put(name, &record) {
                    Ok(()) => Err(WorkflowError::Provision(provision)),
                    Err(persist) => Err(WorkflowError::ProvisionNotRecorded {
                        provision: Box::new(provision),
                        persist: Box::new(persist),
                    }),
                }
            }
        }
    }

    /// Destroys the infrastructure of cluster `name`, then forgets it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Provision`] when teardown fails; the cluster
    /// is kept in that case.
    pub fn destroy<R, S, K>(
        &self,
        orchestrator: &ProvisionOrchestrator<R, S, K>,
        name: &str,
        out: &mut dyn Write,
    ) -> Result<(), WorkflowError>
    where
        R: CommandRunner,
        S: SecretsProvider,
        K: KeyGenerator,
    {
        self.require(name)?;
        let plan = self.layout.planner(name).read()?;
        orchestrator.destroy(&plan.provisioner.provider, &plan.cluster.name, out)?;
        self.forget(name)
    }

    /// Forgets cluster `name` without touching its infrastructure.
    ///
    /// # Errors
    ///
    /// Fails when the cluster is unknown or removal fails.
    pub fn remove(&self, name: &str) -> Result<(), WorkflowError> {
        self.require(name)?;
        self.forget(name)
    }

    fn forget(&self, name: &str) -> Result<(), WorkflowError> {
        self.store.delete(name)?;
        let removed = self.layout.remove_cluster_dir(name)?;
        info!(cluster = name, removed_dir = removed, "cluster removed");
        Ok(())
    }

    /// Lists the clusters found under the assets root with their states.
    ///
    /// Directories without a store record are included only when `verbose`.
    ///
    /// # Errors
    ///
    /// Returns store or directory listing errors.
    pub fn list(&self, verbose: bool) -> Result<Vec<ClusterListing>, WorkflowError> {
        let records = self.store.get_all()?;
        let listings = self
            .layout
            .cluster_names()?
            .into_iter()
            .filter_map(|name| {
                let record = records.get(&name);
                (record.is_some() || verbose).then(|| ClusterListing {
                    current_state: record.map(|r| r.status.current_state),
                    desired_state: record.map(|r| r.spec.desired_state),
                    name,
                })
            })
            .collect();
        Ok(listings)
    }

    /// Returns the master load balancer address of cluster `name`.
    ///
    /// # Errors
    ///
    /// Fails when the cluster is unknown or the address is unset.
    pub fn address(&self, name: &str) -> Result<String, WorkflowError> {
        self.require(name)?;
        let plan = self.layout.planner(name).read()?;
        let address = plan.master.load_balanced_fqdn;
        if address.trim().is_empty() {
            return Err(WorkflowError::MissingAddress {
                name: name.to_owned(),
            });
        }
        Ok(address)
    }
}
