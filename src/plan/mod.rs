//! Typed model of a cluster plan and the helpers that persist it.
//!
//! A plan names the cluster, selects an infrastructure provider and lists the
//! node inventory per role. Only the parts the provisioning flow touches are
//! typed; any other top-level keys are carried through unchanged so add-on
//! configuration written by other tools survives a read/write cycle.

mod file;
mod merge;
mod template;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use file::{ClusterLayout, FilePlanner, PlanFileError};
pub use merge::merge;
pub use template::PlanTemplate;

/// Node roles that make up a cluster.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    /// Kubernetes control plane nodes.
    Master,
    /// Nodes running the etcd key-value store.
    Etcd,
    /// Workload nodes.
    Worker,
    /// Nodes that terminate ingress traffic.
    Ingress,
    /// Nodes that provide cluster storage.
    Storage,
}

impl Role {
    /// All roles, in the order they are reconciled after provisioning.
    pub const ALL: [Self; 5] = [
        Self::Master,
        Self::Etcd,
        Self::Worker,
        Self::Ingress,
        Self::Storage,
    ];

    /// Lower-case role name used in output variable names and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Etcd => "etcd",
            Self::Worker => "worker",
            Self::Ingress => "ingress",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of a cluster.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Plan {
    /// Cluster identity and SSH access.
    pub cluster: Cluster,
    /// Infrastructure provider selection.
    #[serde(default)]
    pub provisioner: Provisioner,
    /// etcd node group.
    #[serde(default)]
    pub etcd: NodeGroup,
    /// Master node group, including its load balancer address.
    #[serde(default)]
    pub master: MasterNodeGroup,
    /// Worker node group.
    #[serde(default)]
    pub worker: NodeGroup,
    /// Optional ingress node group.
    #[serde(default, skip_serializing_if = "NodeGroup::is_empty")]
    pub ingress: NodeGroup,
    /// Optional storage node group.
    #[serde(default, skip_serializing_if = "NodeGroup::is_empty")]
    pub storage: NodeGroup,
    /// Top-level sections this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Plan {
    /// Returns a copy of the node group for `role`.
    ///
    /// The master group is returned without its load balancer fields.
    #[must_use]
    pub fn node_group(&self, role: Role) -> NodeGroup {
        match role {
            Role::Master => self.master.node_group(),
            Role::Etcd => self.etcd.clone(),
            Role::Worker => self.worker.clone(),
            Role::Ingress => self.ingress.clone(),
            Role::Storage => self.storage.clone(),
        }
    }

    /// Replaces the node group for `role`, keeping master load balancer
    /// fields intact.
    pub fn set_node_group(&mut self, role: Role, group: NodeGroup) {
        match role {
            Role::Master => self.master.replace_group(group),
            Role::Etcd => self.etcd = group,
            Role::Worker => self.worker = group,
            Role::Ingress => self.ingress = group,
            Role::Storage => self.storage = group,
        }
    }

    /// Expected node count for `role`.
    #[must_use]
    pub const fn expected_count(&self, role: Role) -> u32 {
        match role {
            Role::Master => self.master.expected_count,
            Role::Etcd => self.etcd.expected_count,
            Role::Worker => self.worker.expected_count,
            Role::Ingress => self.ingress.expected_count,
            Role::Storage => self.storage.expected_count,
        }
    }
}

/// Cluster identity.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cluster {
    /// Unique cluster name.
    pub name: String,
    /// SSH settings used to reach the nodes.
    #[serde(default)]
    pub ssh: SshConfig,
}

/// SSH access settings for cluster nodes.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SshConfig {
    /// Remote user.
    #[serde(default)]
    pub user: String,
    /// Path to the private key.
    #[serde(default)]
    pub ssh_key: String,
    /// Remote SSH port.
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
}

const fn default_ssh_port() -> u16 {
    22
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            ssh_key: String::new(),
            ssh_port: default_ssh_port(),
        }
    }
}

/// Provider selection for infrastructure provisioning.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Provisioner {
    /// Provider name; empty for clusters whose machines are managed by hand.
    #[serde(default)]
    pub provider: String,
    /// Provider options passed through to the provider unchanged.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl Provisioner {
    /// Returns `true` when a provider is selected.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        !self.provider.trim().is_empty()
    }
}

/// Nodes of a single role.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeGroup {
    /// Number of nodes the role should have.
    #[serde(default)]
    pub expected_count: u32,
    /// Known nodes, in inventory order.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl NodeGroup {
    /// Returns `true` when the group expects no nodes and lists none.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.expected_count == 0 && self.nodes.is_empty()
    }
}

/// Master node group with the address of its load balancer.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MasterNodeGroup {
    /// Number of master nodes the cluster should have.
    #[serde(default)]
    pub expected_count: u32,
    /// Known master nodes.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Fully qualified name of the master load balancer.
    #[serde(default)]
    pub load_balanced_fqdn: String,
    /// Short name of the master load balancer.
    #[serde(default)]
    pub load_balanced_short_name: String,
}

impl MasterNodeGroup {
    fn node_group(&self) -> NodeGroup {
        NodeGroup {
            expected_count: self.expected_count,
            nodes: self.nodes.clone(),
        }
    }

    fn replace_group(&mut self, group: NodeGroup) {
        self.expected_count = group.expected_count;
        self.nodes = group.nodes;
    }
}

/// A single machine in the inventory. The IP address is its identity.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Node {
    /// Hostname.
    #[serde(default)]
    pub host: String,
    /// Public IP address.
    #[serde(default)]
    pub ip: String,
    /// Private IP address, if the provider reports one.
    #[serde(default, rename = "internalip", skip_serializing_if = "String::is_empty")]
    pub internal_ip: String,
    /// Operator-assigned node labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Per-node kubelet settings.
    #[serde(default, skip_serializing_if = "KubeletOptions::is_empty")]
    pub kubelet: KubeletOptions,
}

/// Kubelet flag overrides for a node.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct KubeletOptions {
    /// Flag name to value overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_overrides: BTreeMap<String, String>,
}

impl KubeletOptions {
    /// Returns `true` when no overrides are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.option_overrides.is_empty()
    }
}

#[cfg(test)]
mod tests;
