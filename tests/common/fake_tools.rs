//! Stand-in `terraform` and `ssh-keygen` executables for CLI tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::TempDir;

/// Environment variable holding the fake provider's credential.
pub const TOKEN_ENV: &str = "FAKECLOUD_TOKEN";

const TERRAFORM_SCRIPT: &str = r#"#!/bin/sh
[ "$TF_IN_AUTOMATION" = "True" ] || { echo "TF_IN_AUTOMATION not set" >&2; exit 3; }
[ -n "$FAKECLOUD_TOKEN" ] || { echo "credential missing" >&2; exit 4; }
list() { printf '{"sensitive":false,"type":"list","value":[%s]}\n' "$1"; }
case "$1" in
  init) echo "Terraform has been successfully initialized!" ;;
  plan)
    if [ -f destroy-next ]; then
      echo "Plan: 0 to add, 0 to change, 2 to destroy."
    else
      echo "Plan: 3 to add, 0 to change, 0 to destroy."
    fi ;;
  apply) echo "Apply complete! Resources: 3 added, 0 changed, 0 destroyed." ;;
  output)
    case "$3" in
      master_pub_ips) list '"10.0.1.1"' ;;
      master_hosts) list '"master-1"' ;;
      master_lb) list '"lb.fake.example"' ;;
      etcd_pub_ips) list '"10.0.0.1"' ;;
      etcd_hosts) list '"etcd-1"' ;;
      worker_pub_ips) list '"10.0.2.1"' ;;
      worker_hosts) list '"worker-1"' ;;
      *) list '' ;;
    esac ;;
  destroy) echo "Destroy complete! Resources: 3 destroyed." ;;
  *) echo "unexpected arguments: $*" >&2; exit 1 ;;
esac
"#;

const SSH_KEYGEN_SCRIPT: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  [ "$1" = "-f" ] && out="$2"
  shift
done
echo "fake private key" > "$out"
echo "ssh-rsa AAAAFAKE clusterform" > "$out.pub"
"#;

const DESCRIPTOR: &str = "description: fake cloud\nenvironment_variables:\n  token: FAKECLOUD_TOKEN\nsupported_options:\n  - region\n";

/// Temporary working directory with fake tools and one provider installed.
pub struct FakeWorkspace {
    _tmp: TempDir,
    /// Root of the workspace; used as the CLI's working directory.
    pub root: Utf8PathBuf,
    /// Path to the fake `terraform`.
    pub terraform: Utf8PathBuf,
    /// Path to the fake `ssh-keygen`.
    pub ssh_keygen: Utf8PathBuf,
}

impl FakeWorkspace {
    /// Creates the workspace.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));
        let dir = Dir::open_ambient_dir(&root, ambient_authority())
            .unwrap_or_else(|err| panic!("open temp dir: {err}"));
        dir.create_dir_all("bin")
            .and_then(|()| dir.create_dir_all("providers/fakecloud"))
            .and_then(|()| dir.write("providers/fakecloud/provider.yaml", DESCRIPTOR))
            .and_then(|()| dir.write("bin/terraform", TERRAFORM_SCRIPT))
            .and_then(|()| dir.write("bin/ssh-keygen", SSH_KEYGEN_SCRIPT))
            .unwrap_or_else(|err| panic!("seed workspace: {err}"));
        let terraform = root.join("bin/terraform");
        let ssh_keygen = root.join("bin/ssh-keygen");
        make_executable(&terraform);
        make_executable(&ssh_keygen);
        Self {
            _tmp: tmp,
            root,
            terraform,
            ssh_keygen,
        }
    }

    /// Returns `true` when `relative` exists below the workspace root.
    pub fn has(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    /// Creates an empty marker file below the workspace root.
    pub fn touch(&self, relative: &str) {
        fs::write(self.root.join(relative), "").unwrap_or_else(|err| panic!("touch: {err}"));
    }
}

fn make_executable(path: &Utf8Path) {
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|err| panic!("chmod {path}: {err}"));
}
