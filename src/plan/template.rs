//! Construction of a fresh plan from node counts.

use std::collections::BTreeMap;

use super::{Cluster, MasterNodeGroup, Node, NodeGroup, Plan, Provisioner, SshConfig};

const DEFAULT_SSH_USER: &str = "clusteruser";

/// Inputs for a new plan.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlanTemplate {
    /// Name of the cluster.
    pub cluster_name: String,
    /// Provider that will create the machines, if any.
    pub provider: Option<String>,
    /// Provider options to record in the plan.
    pub options: BTreeMap<String, String>,
    /// Number of etcd nodes.
    pub etcd_nodes: u32,
    /// Number of master nodes.
    pub master_nodes: u32,
    /// Number of worker nodes.
    pub worker_nodes: u32,
    /// Number of ingress nodes.
    pub ingress_nodes: u32,
    /// Number of storage nodes.
    pub storage_nodes: u32,
}

impl PlanTemplate {
    /// Builds the plan.
    ///
    /// Provider-managed plans start with empty inventories that provisioning
    /// fills in. Plans without a provider get one blank node entry per
    /// expected node for the operator to complete.
    #[must_use]
    pub fn into_plan(self) -> Plan {
        let provider = self.provider.unwrap_or_default();
        let placeholders = provider.trim().is_empty();
        let group = |count: u32| NodeGroup {
            expected_count: count,
            nodes: if placeholders {
                (0..count).map(|_| Node::default()).collect()
            } else {
                Vec::new()
            },
        };
        let master = group(self.master_nodes);

        Plan {
            cluster: Cluster {
                name: self.cluster_name,
                ssh: SshConfig {
                    user: String::from(DEFAULT_SSH_USER),
                    ..SshConfig::default()
                },
            },
            provisioner: Provisioner {
                provider,
                options: self.options,
            },
            etcd: group(self.etcd_nodes),
            master: MasterNodeGroup {
                expected_count: master.expected_count,
                nodes: master.nodes,
                ..MasterNodeGroup::default()
            },
            worker: group(self.worker_nodes),
            ingress: group(self.ingress_nodes),
            storage: group(self.storage_nodes),
            extra: BTreeMap::new(),
        }
    }
}
