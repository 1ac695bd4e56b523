use assert_cmd::Command;

#[test]
fn help_lists_commands() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("treeaudit"));
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for name in ["audit", "scan", "prompt"] {
        assert!(text.contains(name), "missing command {name}");
    }
}

#[test]
fn invalid_log_level_is_usage_error() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(assert_cmd::cargo_bin!("treeaudit"));
    cmd.arg("--log-level")
        .arg("loud")
        .arg("scan")
        .arg(temp.path());
    cmd.assert().failure().code(2);
}
