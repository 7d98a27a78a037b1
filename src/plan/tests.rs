//! Unit tests for the plan model, merging and plan files.

use super::*;
use crate::test_support::{labelled_node, node};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn group(nodes: Vec<Node>) -> NodeGroup {
    NodeGroup {
        expected_count: u32::try_from(nodes.len()).expect("node count fits in u32"),
        nodes,
    }
}

fn ips(group: &NodeGroup) -> Vec<&str> {
    group.nodes.iter().map(|n| n.ip.as_str()).collect()
}

#[rstest]
fn merge_overwrites_observed_fields_and_keeps_metadata() {
    let mut old_node = labelled_node("10.0.0.1", "zone", "a");
    old_node.host = String::from("stale-host");
    old_node
        .kubelet
        .option_overrides
        .insert(String::from("max-pods"), String::from("50"));
    let old = group(vec![old_node]);
    let mut observed = node("10.0.0.1");
    observed.host = String::from("fresh-host");
    observed.internal_ip = String::from("192.168.0.1");

    let merged = merge(group(vec![observed]), &old);

    let [only] = merged.nodes.as_slice() else {
        panic!("expected one node, got {:?}", merged.nodes);
    };
    assert_eq!(only.host, "fresh-host");
    assert_eq!(only.internal_ip, "192.168.0.1");
    assert_eq!(only.labels.get("zone").map(String::as_str), Some("a"));
    assert_eq!(
        only.kubelet.option_overrides.get("max-pods").map(String::as_str),
        Some("50")
    );
}

#[rstest]
fn merge_scale_up_keeps_new_nodes_unlabelled() {
    let old = group(vec![
        labelled_node("10.0.0.1", "role", "one"),
        labelled_node("10.0.0.2", "role", "two"),
    ]);
    let new = group(vec![
        node("10.0.0.1"),
        node("10.0.0.2"),
        node("10.0.0.3"),
        node("10.0.0.4"),
    ]);

    let merged = merge(new, &old);

    assert_eq!(merged.expected_count, 4);
    assert_eq!(ips(&merged), ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
    let labels: Vec<_> = merged
        .nodes
        .iter()
        .map(|n| n.labels.get("role").cloned())
        .collect();
    assert_eq!(
        labels,
        [Some(String::from("one")), Some(String::from("two")), None, None]
    );
}

#[rstest]
fn merge_scale_down_drops_missing_nodes() {
    let old = group(vec![
        labelled_node("10.0.0.1", "n", "1"),
        labelled_node("10.0.0.2", "n", "2"),
        labelled_node("10.0.0.3", "n", "3"),
        labelled_node("10.0.0.4", "n", "4"),
    ]);
    let new = group(vec![node("10.0.0.1"), node("10.0.0.2"), node("10.0.0.4")]);

    let merged = merge(new, &old);

    assert_eq!(merged.expected_count, 3);
    assert_eq!(ips(&merged), ["10.0.0.1", "10.0.0.2", "10.0.0.4"]);
    let labels: Vec<_> = merged
        .nodes
        .iter()
        .filter_map(|n| n.labels.get("n").map(String::as_str))
        .collect();
    assert_eq!(labels, ["1", "2", "4"]);
}

#[rstest]
fn merge_from_empty_inventory_returns_new_group() {
    let new = group(vec![node("10.0.0.1"), node("10.0.0.2")]);

    let merged = merge(new.clone(), &NodeGroup::default());

    assert_eq!(merged, new);
}

#[rstest]
fn merge_prefers_first_duplicate_in_old_inventory() {
    let old = group(vec![
        labelled_node("10.0.0.1", "pick", "first"),
        labelled_node("10.0.0.1", "pick", "second"),
    ]);

    let merged = merge(group(vec![node("10.0.0.1")]), &old);

    let [only] = merged.nodes.as_slice() else {
        panic!("expected one node");
    };
    assert_eq!(only.labels.get("pick").map(String::as_str), Some("first"));
}

#[rstest]
fn merge_keeps_metadata_of_unmatched_new_nodes() {
    let observed = labelled_node("10.0.0.9", "origin", "observed");

    let merged = merge(group(vec![observed.clone()]), &group(vec![node("10.0.0.1")]));

    assert_eq!(merged.nodes, vec![observed]);
}

#[rstest]
fn merge_uses_new_expected_count_even_when_inconsistent() {
    let new = NodeGroup {
        expected_count: 7,
        nodes: vec![node("10.0.0.1")],
    };

    let merged = merge(new, &group(vec![node("10.0.0.1"), node("10.0.0.2")]));

    assert_eq!(merged.expected_count, 7);
    assert_eq!(merged.nodes.len(), 1);
}

const PLAN_YAML: &str = r"
cluster:
  name: demo
  ssh:
    user: ops
    ssh_key: /keys/demo.pem
    ssh_port: 2222
provisioner:
  provider: aws
  options:
    region: us-east-1
etcd:
  expected_count: 1
  nodes:
  - host: etcd-1
    ip: 10.0.0.1
    internalip: 192.168.0.1
    labels:
      zone: a
master:
  expected_count: 1
  nodes: []
  load_balanced_fqdn: lb.example.com
  load_balanced_short_name: lb
worker:
  expected_count: 2
  nodes: []
add_ons:
  dashboard:
    disable: true
docker:
  storage:
    direct_lvm_block_device:
      path: /dev/sdb
";

#[rstest]
fn plan_parses_typed_sections_and_keeps_unknown_ones() {
    let plan: Plan = serde_yaml::from_str(PLAN_YAML).expect("plan parses");

    assert_eq!(plan.cluster.name, "demo");
    assert_eq!(plan.cluster.ssh.ssh_port, 2222);
    assert_eq!(plan.provisioner.provider, "aws");
    assert_eq!(plan.master.load_balanced_fqdn, "lb.example.com");
    assert_eq!(plan.etcd.nodes.first().map(|n| n.internal_ip.as_str()), Some("192.168.0.1"));
    assert_eq!(plan.expected_count(Role::Ingress), 0);
    assert!(plan.extra.contains_key("add_ons"));
    assert!(plan.extra.contains_key("docker"));

    let rendered = serde_yaml::to_string(&plan).expect("plan renders");
    let reparsed: Plan = serde_yaml::from_str(&rendered).expect("rendered plan parses");
    assert_eq!(reparsed, plan);
    assert!(!rendered.contains("ingress"), "empty optional groups are omitted: {rendered}");
}

#[rstest]
fn plan_defaults_missing_ssh_port() {
    let plan: Plan = serde_yaml::from_str("cluster:\n  name: bare\n").expect("plan parses");

    assert_eq!(plan.cluster.ssh.ssh_port, 22);
    assert!(!plan.provisioner.is_managed());
}

#[rstest]
fn set_node_group_preserves_master_load_balancer() {
    let mut plan: Plan = serde_yaml::from_str(PLAN_YAML).expect("plan parses");

    plan.set_node_group(Role::Master, group(vec![node("10.0.1.1")]));

    assert_eq!(plan.master.load_balanced_fqdn, "lb.example.com");
    assert_eq!(plan.node_group(Role::Master).nodes, vec![node("10.0.1.1")]);
    assert_eq!(plan.expected_count(Role::Master), 1);
}

#[rstest]
#[case::managed(Some("aws"), 0)]
#[case::unmanaged(None, 3)]
fn template_populates_placeholders_only_without_provider(
    #[case] provider: Option<&str>,
    #[case] expected_worker_entries: usize,
) {
    let plan = PlanTemplate {
        cluster_name: String::from("demo"),
        provider: provider.map(String::from),
        etcd_nodes: 1,
        master_nodes: 1,
        worker_nodes: 3,
        ..PlanTemplate::default()
    }
    .into_plan();

    assert_eq!(plan.cluster.name, "demo");
    assert_eq!(plan.worker.expected_count, 3);
    assert_eq!(plan.worker.nodes.len(), expected_worker_entries);
    assert_eq!(plan.provisioner.is_managed(), provider.is_some());
}

struct Assets {
    _tmp: TempDir,
    layout: ClusterLayout,
}

#[fixture]
fn assets() -> Assets {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().join("clusters")).expect("utf8 path");
    Assets {
        _tmp: tmp,
        layout: ClusterLayout::new(root),
    }
}

#[rstest]
fn file_planner_round_trips_plan(assets: Assets) {
    let planner = assets.layout.planner("demo");
    let plan: Plan = serde_yaml::from_str(PLAN_YAML).expect("plan parses");

    assert!(!planner.exists().expect("exists check"));
    planner.write(&plan).expect("write plan");

    assert!(planner.exists().expect("exists check"));
    assert_eq!(planner.read().expect("read plan"), plan);
    assert!(planner.path().ends_with("demo/kismatic-cluster.yaml"));
}

#[rstest]
fn file_planner_reports_parse_errors(assets: Assets) {
    let planner = assets.layout.planner("broken");
    crate::files::write(planner.path(), "cluster: 42")
        .unwrap_or_else(|err| panic!("seed: {}", err.message));

    let err = planner.read().expect_err("invalid plan should fail");

    assert!(matches!(err, PlanFileError::Parse { .. }), "got {err:?}");
}

#[rstest]
fn file_planner_reports_missing_file(assets: Assets) {
    let err = assets
        .layout
        .planner("absent")
        .read()
        .expect_err("missing plan should fail");

    assert!(matches!(err, PlanFileError::Io { .. }), "got {err:?}");
}

#[rstest]
fn layout_lists_and_removes_cluster_directories(assets: Assets) {
    let plan = Plan::default();
    assets.layout.planner("b").write(&plan).expect("write b");
    assets.layout.planner("a").write(&plan).expect("write a");

    assert_eq!(assets.layout.cluster_names().expect("list"), ["a", "b"]);
    assert!(assets.layout.remove_cluster_dir("a").expect("remove"));
    assert_eq!(assets.layout.cluster_names().expect("list"), ["b"]);
}
