use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pagetrim_lib::error::ErrorCategory;
use pagetrim_lib::PagetrimOutput;
use tempfile::TempDir;

fn bin_path() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_pagetrim")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("target")
                .join("debug")
                .join(if cfg!(windows) { "pagetrim.exe" } else { "pagetrim" })
        })
}

/// Runs the binary with `HOME` pointed at `home` so a developer's central
/// config never leaks into the test.
fn run(home: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("run pagetrim")
}

fn parse_error(stdout: &[u8]) -> (String, ErrorCategory) {
    match serde_json::from_slice::<PagetrimOutput>(stdout).expect("error payload should be valid JSON")
    {
        PagetrimOutput::Error(err) => (err.message, err.error.category),
        other => panic!("expected error output, got {other:?}"),
    }
}

#[test]
fn missing_url_is_a_usage_error() {
    let home = TempDir::new().expect("tempdir");
    let output = run(home.path(), &["snapshot"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--url"));
}

#[test]
fn unknown_subcommand_fails() {
    let home = TempDir::new().expect("tempdir");
    let output = run(home.path(), &["compare", "--url", "https://example.com"]);
    assert!(!output.status.success());
}

#[test]
fn unreadable_config_returns_fatal_json_error() {
    let home = TempDir::new().expect("tempdir");
    let cfg_path = home.path().join("pagetrim.toml");
    std::fs::write(&cfg_path, "viewport = \"wide\"\n").expect("write config");

    let output = run(
        home.path(),
        &[
            "report",
            "--url",
            "https://example.com",
            "--config",
            cfg_path.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let (message, category) = parse_error(&output.stdout);
    assert_eq!(category, ErrorCategory::Config);
    assert!(message.contains("Failed to read config"), "{message}");
}

#[test]
fn invalid_config_values_are_rejected() {
    let home = TempDir::new().expect("tempdir");
    let cfg_path = home.path().join("pagetrim.toml");
    std::fs::write(&cfg_path, "device_scale_factor = -1.0\n").expect("write config");

    let output = run(
        home.path(),
        &[
            "report",
            "--url",
            "https://example.com",
            "--config",
            cfg_path.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let (message, _) = parse_error(&output.stdout);
    assert!(message.contains("Invalid config"), "{message}");
}

#[test]
fn central_config_is_picked_up_from_home() {
    let home = TempDir::new().expect("tempdir");
    let central = home.path().join(".config").join("pagetrim");
    std::fs::create_dir_all(&central).expect("create config dir");
    std::fs::write(central.join("config.toml"), "[timeouts]\nprocess = \"0s\"\n")
        .expect("write config");

    let output = run(home.path(), &["report", "--url", "https://example.com"]);

    assert_eq!(output.status.code(), Some(2));
    let (message, category) = parse_error(&output.stdout);
    assert_eq!(category, ErrorCategory::Config);
    assert!(message.contains("timeouts.process"), "{message}");
}

#[test]
fn zero_timeout_flag_is_fatal() {
    let home = TempDir::new().expect("tempdir");
    let output = run(
        home.path(),
        &["report", "--url", "https://example.com", "--nav-timeout", "0"],
    );

    assert_eq!(output.status.code(), Some(2));
    let (message, _) = parse_error(&output.stdout);
    assert!(message.contains("timeouts.navigation"), "{message}");
}

#[test]
fn non_http_url_is_fatal() {
    let home = TempDir::new().expect("tempdir");
    let out_dir = home.path().join("out");
    let output = run(
        home.path(),
        &[
            "snapshot",
            "--url",
            "file:///etc/hosts",
            "--output-dir",
            out_dir.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let (message, category) = parse_error(&output.stdout);
    assert_eq!(category, ErrorCategory::Config);
    assert!(message.contains("http"), "{message}");
    assert!(!out_dir.exists(), "nothing should be written before the URL is accepted");
}

#[test]
fn missing_node_command_is_a_browser_error_with_hint() {
    let home = TempDir::new().expect("tempdir");
    let cfg_path = home.path().join("pagetrim.toml");
    std::fs::write(&cfg_path, "node_command = \"pagetrim-missing-node-binary\"\n")
        .expect("write config");

    let output = run(
        home.path(),
        &[
            "report",
            "--url",
            "https://example.com",
            "--config",
            cfg_path.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(value["mode"], "error");
    assert_eq!(value["error"]["category"], "browser");
    let hint = value["error"]["remediation"].as_str().unwrap_or_default();
    assert!(hint.to_ascii_lowercase().contains("node"), "{hint}");
}

#[test]
fn pretty_errors_stay_json_when_piped() {
    let home = TempDir::new().expect("tempdir");
    let output = run(
        home.path(),
        &["report", "--url", "ftp://example.com", "--format", "pretty"],
    );

    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("pretty output should be JSON off a tty");
    assert_eq!(value["mode"], "error");
}

#[test]
fn error_output_can_be_written_to_a_file() {
    let home = TempDir::new().expect("tempdir");
    let out_file = home.path().join("result.json");
    let output = run(
        home.path(),
        &[
            "report",
            "--url",
            "mailto:someone@example.com",
            "-o",
            out_file.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let written = std::fs::read(&out_file).expect("error output file");
    let (_, category) = parse_error(&written);
    assert_eq!(category, ErrorCategory::Config);
}
