//! End-to-end tests for the `juvy` binary.

use juvy_rs_test_utils::{app_schema, server_schema, write_file};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with a clean environment plus `env`.
fn juvy(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_juvy"));
    command.env_clear().args(args);
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("run juvy")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_schema(dir: &Path, schema: serde_json::Value) -> String {
    let path = dir.join("schema.json5");
    write_file(&path, &schema.to_string());
    path.display().to_string()
}

#[test]
fn check_accepts_defaults() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), server_schema());

    let output = juvy(&["check", "--schema", &schema], &[]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "configuration is valid");
}

#[test]
fn check_rejects_out_of_range_port_argument() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), server_schema());

    let output = juvy(&["check", "--schema", &schema, "--", "--port=70000"], &[]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("port: ports must be within range 0 - 65535: value was 70000"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn strict_check_rejects_undeclared_document_paths() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), server_schema());
    let config = temp.path().join("config.json5");
    write_file(&config, "{ extra: true }");
    let config = config.display().to_string();

    let warn = juvy(&["check", "--schema", &schema, "--config", &config], &[]);
    assert!(warn.status.success());
    assert!(stderr(&warn).contains("Warning: configuration param 'extra' not declared"));

    let strict = juvy(
        &["check", "--schema", &schema, "--config", &config, "--strict"],
        &[],
    );
    assert!(!strict.status.success());
    assert!(stderr(&strict).contains("configuration param 'extra' not declared in the schema"));
}

#[test]
fn get_applies_env_then_argument_overlays() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), server_schema());

    let from_env = juvy(&["get", "--schema", &schema, "port"], &[("PORT", "8080")]);
    assert_eq!(stdout(&from_env), "8080");

    let from_arg = juvy(
        &["get", "--schema", &schema, "port", "--", "--port=9090"],
        &[("PORT", "8080")],
    );
    assert_eq!(stdout(&from_arg), "9090");
}

#[test]
fn show_redacts_sensitive_values() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), app_schema());

    let output = juvy(
        &["show", "--schema", &schema],
        &[("DB_PASSWORD", "hunter2")],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let shown: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(shown["db"]["password"], "[Sensitive]");
    assert_eq!(shown["server"]["port"], 3000);
    assert!(!stdout(&output).contains("hunter2"));
}

#[test]
fn get_refuses_sensitive_values() {
    let temp = TempDir::new().expect("tmp");
    let schema = write_schema(temp.path(), app_schema());

    let output = juvy(&["get", "--schema", &schema, "db.password"], &[]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("is sensitive"));
}

#[test]
fn schema_reads_fragment_directories() {
    let temp = TempDir::new().expect("tmp");
    write_file(
        &temp.path().join("server/index.json5"),
        "{ port: { default: 3000, format: 'port', env: 'PORT' } }",
    );

    let path = temp.path().display().to_string();
    let output = juvy(&["schema", "--schema", &path], &[]);
    assert!(output.status.success(), "{}", stderr(&output));
    let exported: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json");
    assert_eq!(
        exported["_juvyProperties"]["server"]["_juvyProperties"]["port"]["env"],
        "PORT"
    );
}
