use std::fs;
use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn companion_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_cybercompanion").expect("cybercompanion test binary not built")
}

#[test]
fn help_mentions_name() {
    let output = Command::new(companion_bin())
        .arg("--help")
        .output()
        .expect("run cybercompanion --help");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("CyberCompanion"));
}

#[test]
fn list_scripts_prints_builtin_lines() {
    let output = Command::new(companion_bin())
        .arg("--list-scripts")
        .output()
        .expect("run cybercompanion --list-scripts");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("[idle]"));
    assert!(combined.contains("[panic]"));
}

#[test]
fn list_scripts_reads_content_pack() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scripts.yaml"),
        "idle_events:\n  - id: pack_hello\n    text: hello from the pack\npanic_events:\n  - id: pack_run\n    text: bye\n",
    )
    .unwrap();
    let output = Command::new(companion_bin())
        .arg("--list-scripts")
        .arg("--content-dir")
        .arg(dir.path())
        .output()
        .expect("run cybercompanion --list-scripts --content-dir");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("pack_hello"));
}

#[test]
fn invalid_idle_threshold_is_rejected() {
    let output = Command::new(companion_bin())
        .args(["--idle-threshold-secs", "0", "--list-scripts"])
        .output()
        .expect("run cybercompanion with a bad threshold");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--idle-threshold-secs"));
}
