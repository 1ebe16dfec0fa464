//! Integration tests for the vpn-editor CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a vpn-editor command isolated from the host configuration
fn vpn_editor(info_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vpn-editor").unwrap();
    cmd.env_remove("NETCTL_VPN_PLUGIN_DIR")
        .env_remove("NETCTL_VPN_INFO_DIR")
        .env_remove("RUST_LOG")
        .arg("--info-dir")
        .arg(info_dir.path())
        .arg("--plugin-dir")
        .arg(info_dir.path().join("lib"));
    cmd
}

fn info_dir_with_openvpn() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("openvpn.toml"),
        r#"
name = "openvpn"
service = "org.freedesktop.NetworkManager.openvpn"
plugin = "libvpn-openvpn-editor.so"
aliases = ["openvpn"]
"#,
    )
    .unwrap();
    dir
}

#[test]
fn test_help_command() {
    Command::cargo_bin("vpn-editor")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("VPN editor plugins"))
        .stdout(predicate::str::contains("service-info"));
}

#[test]
fn test_list_empty_directory() {
    let dir = TempDir::new().unwrap();
    vpn_editor(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No VPN plugins found"));
}

#[test]
fn test_list_descriptions() {
    let dir = info_dir_with_openvpn();
    vpn_editor(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("openvpn"))
        .stdout(predicate::str::contains("libvpn-openvpn-editor.so"));
}

#[test]
fn test_list_json() {
    let dir = info_dir_with_openvpn();
    let output = vpn_editor(&dir).arg("--json").arg("list").output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let plugins = value.as_array().unwrap();
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0]["service"], "org.freedesktop.NetworkManager.openvpn");
    assert_eq!(plugins[0]["aliases"][0], "openvpn");
}

#[test]
fn test_show_unknown_plugin() {
    let dir = info_dir_with_openvpn();
    vpn_editor(&dir)
        .arg("show")
        .arg("wireguard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("VPN plugin 'wireguard' not found"));
}

#[test]
fn test_show_missing_library() {
    let dir = info_dir_with_openvpn();
    vpn_editor(&dir)
        .arg("show")
        .arg("openvpn")
        .assert()
        .failure()
        .stderr(predicate::str::contains("plugin file not found"));
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("vpn-editor.toml");
    fs::write(&config, "[paths\n").unwrap();
    vpn_editor(&dir)
        .arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
