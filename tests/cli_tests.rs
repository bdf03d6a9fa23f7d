use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ADDRESS: &str = "cosmos1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu";

/// A temporary home holding a filesystem store and a config pointing at it
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(binary: &str, node: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        std::fs::create_dir(&store).unwrap();
        let config = format!(
            r#"
user = "alice"
keyring_backend = "test"

[store]
backend = "fs"
path = "{store}"

[timeouts]
delete_secs = 5
poll_interval_ms = 10

[[keys]]
name = "val"
address = "{ADDRESS}"
local_name = "val-multi"

[[chains]]
name = "cosmoshub"
id = "cosmoshub-4"
binary = "{binary}"
prefix = "cosmos"
node = "{node}"
denom = "uatom"
"#,
            store = store.display()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        std::fs::write(dir.path().join("tx.json"), br#"{"body":{"messages":[]}}"#).unwrap();
        Self { dir }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("store")
    }

    fn tx_file(&self) -> PathBuf {
        self.dir.path().join("tx.json")
    }

    fn cosign(&self) -> Command {
        let mut cmd = Command::cargo_bin("cosign").unwrap();
        cmd.arg("--config")
            .arg(self.dir.path().join("config.toml"))
            .env_remove("RUST_LOG");
        cmd
    }

    fn push(&self, extra: &[&str]) -> assert_cmd::assert::Assert {
        self.cosign()
            .args(["tx", "push"])
            .arg(self.tx_file())
            .args(["cosmoshub", "val"])
            .args(extra)
            .assert()
    }
}

fn stored(store: &Path, path: &str) -> bool {
    store.join(path).exists()
}

#[test]
fn test_help() {
    Command::cargo_bin("cosign")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("multisig"));
}

#[test]
fn test_raw_bech32_needs_no_config() {
    Command::cargo_bin("cosign")
        .unwrap()
        .args(["raw", "bech32", ADDRESS, "osmo"])
        .assert()
        .success()
        .stdout("osmo1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5helwsw\n");
}

#[test]
fn test_missing_config_file() {
    Command::cargo_bin("cosign")
        .unwrap()
        .args(["--config", "/nonexistent/cosign.toml", "list", "--all"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn test_force_and_additional_conflict() {
    let ws = Workspace::new("gaiad", "");
    ws.push(&["-a", "5", "-s", "12", "-f", "-x"])
        .code(3)
        .stderr(predicate::str::contains("conflicting inputs"));
    assert!(!stored(&ws.store(), "cosmoshub"));
}

#[test]
fn test_push_without_numbers_or_node_is_a_warning() {
    let ws = Workspace::new("gaiad", "");
    ws.push(&[])
        .success()
        .stderr(predicate::str::contains("warning"));
    assert!(!stored(&ws.store(), "cosmoshub/val/0/unsigned"));
}

#[test]
fn test_push_list_delete() {
    let ws = Workspace::new("gaiad", "");
    ws.push(&["-a", "5", "-s", "12", "-i", "weekly rewards"])
        .success()
        .stdout(predicate::str::contains("published cosmoshub/val/0"));
    assert!(stored(&ws.store(), "cosmoshub/val/0/unsigned"));
    assert!(stored(&ws.store(), "cosmoshub/val/0/signdata"));

    ws.push(&["-a", "5", "-s", "12"]).code(4);
    ws.push(&["-a", "5", "-s", "13", "-x"])
        .success()
        .stdout(predicate::str::contains("published cosmoshub/val/1"));

    ws.cosign()
        .args(["list", "cosmoshub", "val"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cosmoshub/val/0  ready  signatures: 0"))
        .stdout(predicate::str::contains("cosmoshub/val/1  ready  signatures: 0"));

    // version 1 cannot go out while version 0 is pending
    ws.cosign()
        .args(["broadcast", "cosmoshub", "val", "-i", "1", "-n", "http://localhost:26657"])
        .assert()
        .code(7);

    ws.cosign()
        .args(["delete", "cosmoshub", "val"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted cosmoshub/val/0/unsigned"));
    assert!(!stored(&ws.store(), "cosmoshub/val/0"));
    assert!(stored(&ws.store(), "cosmoshub/val/1/unsigned"));

    ws.cosign()
        .args(["delete", "cosmoshub", "val"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to delete"));
}

#[test]
fn test_config_show_redacts_secrets() {
    let ws = Workspace::new("gaiad", "");
    ws.cosign()
        .args(["config", "show"])
        .env("COSIGN_AWS__SECRET_ACCESS_KEY", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("cosmoshub-4"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[cfg(unix)]
mod lifecycle {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const FAKE_CHAIN: &str = r#"#!/bin/sh
case "$1 $2" in
  "tx sign") printf 'signature-of-%s' "$7" ;;
  "tx multisign") printf '{"signed":true}' ;;
  "tx broadcast") printf 'code: 0\ntxhash: ABC123\n' ;;
  query*) printf '{"account":{"@type":"/cosmos.auth.v1beta1.BaseAccount","account_number":"9","sequence":"4"}}' ;;
  *) echo "unexpected: $*" >&2; exit 1 ;;
esac
"#;

    fn fake_chain(dir: &Path) -> PathBuf {
        let path = dir.join("fakechaind");
        std::fs::write(&path, FAKE_CHAIN).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn test_publish_sign_broadcast() {
        let bin_dir = TempDir::new().unwrap();
        let binary = fake_chain(bin_dir.path());
        let ws = Workspace::new(&binary.display().to_string(), "http://localhost:26657");

        // account and sequence come from the node
        ws.push(&[])
            .success()
            .stdout(predicate::str::contains("account 9, sequence 4"));

        ws.cosign()
            .args(["sign", "cosmoshub", "val", "--from", "ledger-a", "-y"])
            .assert()
            .success();
        assert_eq!(
            std::fs::read(ws.store().join("cosmoshub/val/0/alice")).unwrap(),
            b"signature-of-ledger-a"
        );

        ws.cosign()
            .args(["broadcast", "cosmoshub", "val"])
            .assert()
            .code(8)
            .stderr(predicate::str::contains("requires 2, got 1"));

        ws.cosign()
            .args(["sign", "cosmoshub", "val", "--from", "ledger-b", "--as", "bob", "-y"])
            .assert()
            .success();

        ws.cosign()
            .args(["broadcast", "cosmoshub", "val"])
            .assert()
            .success()
            .stdout(predicate::str::contains("code: 0"))
            .stdout(predicate::str::contains("txhash: ABC123"));
        assert!(!stored(&ws.store(), "cosmoshub/val/0"));
    }
}
