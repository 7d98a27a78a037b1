//! Folding Terraform's reported inventory back into a plan.

use tracing::debug;

use super::ProvisionError;
use crate::exec::CommandRunner;
use crate::plan::{Node, NodeGroup, Plan, Role, merge};
use crate::terraform::OutputVariableReader;

/// Per-role inventory reported by the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ObservedNodes {
    public_ips: Vec<String>,
    private_ips: Vec<String>,
    hosts: Vec<String>,
}

impl ObservedNodes {
    fn read<R: CommandRunner>(
        reader: &OutputVariableReader<'_, '_, R>,
        role: Role,
    ) -> Result<Self, ProvisionError> {
        let observed = Self {
            public_ips: reader.read_string_slice(&format!("{role}_pub_ips"))?,
            private_ips: reader.read_string_slice(&format!("{role}_priv_ips"))?,
            hosts: reader.read_string_slice(&format!("{role}_hosts"))?,
        };
        observed.validate(role)?;
        Ok(observed)
    }

    fn validate(&self, role: Role) -> Result<(), ProvisionError> {
        let public = self.public_ips.len();
        if public != self.hosts.len() {
            return Err(ProvisionError::HostCountMismatch {
                role,
                public,
                hosts: self.hosts.len(),
            });
        }
        if !self.private_ips.is_empty() && public != self.private_ips.len() {
            return Err(ProvisionError::PrivateIpCountMismatch {
                role,
                public,
                private: self.private_ips.len(),
            });
        }
        Ok(())
    }

    /// Builds a group sized by what was observed.
    fn into_node_group(self) -> NodeGroup {
        let mut private_ips = self.private_ips.into_iter();
        let nodes: Vec<Node> = self
            .public_ips
            .into_iter()
            .zip(self.hosts)
            .map(|(ip, host)| Node {
                host,
                ip,
                internal_ip: private_ips.next().unwrap_or_default(),
                ..Node::default()
            })
            .collect();
        NodeGroup {
            expected_count: u32::try_from(nodes.len()).unwrap_or(u32::MAX),
            nodes,
        }
    }
}

fn read_load_balancer<R: CommandRunner>(
    reader: &OutputVariableReader<'_, '_, R>,
    name: &str,
) -> Result<String, ProvisionError> {
    let variable = format!("{name}_lb");
    let values = reader.read_string_slice(&variable)?;
    match <[String; 1]>::try_from(values) {
        Ok([address]) => Ok(address),
        Err(values) => Err(ProvisionError::LoadBalancer {
            name: variable,
            count: values.len(),
        }),
    }
}

/// Returns `plan` updated with the inventory Terraform reports.
///
/// Roles expecting no nodes are skipped. The first failure aborts the whole
/// reconciliation; callers keep their own copy of the plan.
pub(crate) fn populate_plan<R: CommandRunner>(
    reader: &OutputVariableReader<'_, '_, R>,
    mut plan: Plan,
) -> Result<Plan, ProvisionError> {
    for role in Role::ALL {
        if plan.expected_count(role) == 0 {
            debug!(%role, "skipping role with no expected nodes");
            continue;
        }
        let observed = ObservedNodes::read(reader, role)?.into_node_group();
        debug!(%role, nodes = observed.nodes.len(), "merging observed inventory");
        let merged = merge(observed, &plan.node_group(role));
        plan.set_node_group(role, merged);
        if role == Role::Master {
            let address = read_load_balancer(reader, role.as_str())?;
            plan.master.load_balanced_short_name.clone_from(&address);
            plan.master.load_balanced_fqdn = address;
        }
    }
    Ok(plan)
}
