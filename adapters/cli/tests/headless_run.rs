use std::{fs, path::PathBuf, process::Command};

const SCENARIO: &str = r#"
[session]
width = 10
height = 5
route = [{ x = 0.0, y = 2.0 }, { x = 9.0, y = 2.0 }]
wave_size = 2

[script]
towers = [{ column = 4, row = 0 }, { column = 4, row = 4 }]
waves = 1
"#;

#[test]
fn scripted_scenario_reports_its_outcome() {
    let path = scenario_path("scripted");
    fs::write(&path, SCENARIO).expect("write scenario");

    let output = Command::new(env!("CARGO_BIN_EXE_detour-defence"))
        .arg("--config")
        .arg(&path)
        .args(["--ticks", "400", "--step-ms", "16"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run detour-defence");
    let _ = fs::remove_file(&path);

    assert!(output.status.success(), "runner exited with {}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("wave 1 |"), "unexpected output: {stdout}");
    assert!(stdout.contains("towers 2 placed, 0 rejected"), "unexpected output: {stdout}");
    assert!(stdout.contains("agents still active: 0"), "unexpected output: {stdout}");
}

#[test]
fn invalid_scenario_fails_with_context() {
    let path = scenario_path("invalid");
    fs::write(&path, "[session]\nwave_size = 0\n").expect("write scenario");

    let output = Command::new(env!("CARGO_BIN_EXE_detour-defence"))
        .arg("--config")
        .arg(&path)
        .output()
        .expect("failed to run detour-defence");
    let _ = fs::remove_file(&path);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid session configuration"), "unexpected stderr: {stderr}");
}

fn scenario_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "detour-defence-{name}-{}.toml",
        std::process::id()
    ))
}
