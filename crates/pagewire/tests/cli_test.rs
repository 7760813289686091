//! Integration tests for the `pagewire` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and the lint / eval / run / config commands against temp files.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `pagewire` binary with env isolation.
///
/// Clears all `PAGEWIRE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn pagewire_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pagewire");
    cmd.env("HOME", "/tmp/pagewire-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/pagewire-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("PAGEWIRE_CONFIG")
        .env_remove("PAGEWIRE_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

const FLAG_RULES: &str = r#"
[[rules]]
on = "onChange"
condition = "${n} > 0"
actions = [{ type = "set_var", key = "flag", value = "1" }]

[[rules]]
on = "onEnterPage"
actions = [{ type = "navigate", path = "/welcome" }]
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = pagewire_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    pagewire_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("lint")
            .and(predicate::str::contains("eval"))
            .and(predicate::str::contains("run")),
    );
}

#[test]
fn test_version_flag() {
    pagewire_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pagewire"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    pagewire_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Eval ────────────────────────────────────────────────────────────

#[test]
fn test_eval_true_with_seeded_store() {
    pagewire_cmd()
        .args(["eval", "${n} > 3", "--set", "n=5", "-o", "plain"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_eval_equality_follows_store_value() {
    pagewire_cmd()
        .args(["eval", "${x} == 5", "--set", "x=five", "-o", "plain"])
        .assert()
        .success()
        .stdout("false\n");
    pagewire_cmd()
        .args(["eval", "${x} == 5", "--set", "x=5", "-o", "plain"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_eval_missing_key_is_false() {
    pagewire_cmd()
        .args(["eval", "${missing} == 1", "-o", "plain"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_eval_json_includes_diagnostics() {
    pagewire_cmd()
        .args(["eval", "${n} ~ 1", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"result\": false")
                .and(predicate::str::contains("\"severity\": \"error\"")),
        );
}

#[test]
fn test_eval_color_flag_controls_ansi_codes() {
    pagewire_cmd()
        .args(["eval", "${n} > 3", "--set", "n=5", "--color", "always"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").and(predicate::str::contains("true")));
    pagewire_cmd()
        .args(["eval", "${n} > 3", "--set", "n=5", "--color", "never"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_eval_rejects_bad_assignment() {
    pagewire_cmd()
        .args(["eval", "${n} > 1", "--set", "oops"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("KEY=VALUE"));
}

// ── Lint ────────────────────────────────────────────────────────────

#[test]
fn test_lint_clean_file() {
    let dir = TempDir::new().unwrap();
    let rules = write(&dir, "rules.toml", FLAG_RULES);
    pagewire_cmd()
        .args(["lint", path_arg(&rules)])
        .assert()
        .success()
        .stderr(predicate::str::contains("2 rule(s), 0 error(s)"));
}

#[test]
fn test_lint_reports_errors_with_exit_code() {
    let dir = TempDir::new().unwrap();
    let rules = write(
        &dir,
        "rules.json",
        r#"{"rules": [{"on": "onChange", "condition": "${n} ~ 3", "actions": []}]}"#,
    );
    let output = pagewire_cmd()
        .args(["lint", path_arg(&rules), "-o", "plain"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("error"), "{text}");
    assert!(text.contains("no actions"), "{text}");
}

#[test]
fn test_lint_unparsable_file_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let rules = write(&dir, "rules.toml", "[[rules]]\non = 3\n");
    pagewire_cmd()
        .args(["lint", path_arg(&rules)])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Could not parse rule file"));
}

// ── Run ─────────────────────────────────────────────────────────────

#[test]
fn test_run_applies_rules_in_order() {
    let dir = TempDir::new().unwrap();
    let rules = write(&dir, "rules.toml", FLAG_RULES);
    pagewire_cmd()
        .args([
            "run",
            path_arg(&rules),
            "--no-config",
            "--set",
            "n=5",
            "--emit",
            "onChange",
            "--emit",
            "onEnterPage@home",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"flag\": \"1\"")
                .and(predicate::str::contains("\"call\": \"navigate\""))
                .and(predicate::str::contains("/welcome")),
        );
}

#[test]
fn test_run_color_flag_styles_section_titles() {
    let dir = TempDir::new().unwrap();
    let rules = write(&dir, "rules.toml", FLAG_RULES);
    let run = |color: &str| {
        pagewire_cmd()
            .args(["run", path_arg(&rules), "--no-config", "--set", "n=5"])
            .args(["--emit", "onChange", "--color", color])
            .output()
            .unwrap()
    };

    let colored = run("always");
    assert!(colored.status.success());
    assert!(String::from_utf8_lossy(&colored.stdout).contains("\u{1b}["));

    let plain = run("never");
    assert!(plain.status.success());
    let text = String::from_utf8_lossy(&plain.stdout);
    assert!(text.contains("State"), "{text}");
    assert!(!text.contains("\u{1b}["), "{text}");
}

#[test]
fn test_run_negative_leaves_flag_unset() {
    let dir = TempDir::new().unwrap();
    let rules = write(&dir, "rules.toml", FLAG_RULES);
    pagewire_cmd()
        .args([
            "run",
            path_arg(&rules),
            "--no-config",
            "--set",
            "n=-1",
            "--emit",
            "onChange",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("flag").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_loads_http_source_from_config() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a\nb\nc\n"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "config.toml",
        &format!(
            r#"
[[sources]]
id = "news"
kind = "http"
url = "{}/news.txt"

[[bindings]]
component = "home.news"
source = "news"
refresh = {{ policy = "on-enter-page" }}
"#,
            server.uri()
        ),
    );
    let rules = write(
        &dir,
        "rules.toml",
        r#"
[[rules]]
on = "onLoadSuccess"
condition = "${home.news.count} == 3"
actions = [{ type = "show_banner", text = "three stories" }]
"#,
    );

    let output = pagewire_cmd()
        .args([
            "--config",
            path_arg(&config),
            "run",
            path_arg(&rules),
            "--emit",
            "onEnterPage@home",
            "--wait",
            "5s",
            "-o",
            "json",
        ])
        .output()
        .unwrap();
    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("\"home.news.status\": \"success\""), "{text}");
    assert!(text.contains("three stories"), "{text}");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    pagewire_cmd()
        .args(["config", "path", "--config", "/tmp/somewhere/pagewire.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/somewhere/pagewire.toml"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    pagewire_cmd()
        .args(["--config", path_arg(&path), "config", "init"])
        .assert()
        .success();
    assert!(path.exists());

    pagewire_cmd()
        .args(["--config", path_arg(&path), "config", "init"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));

    pagewire_cmd()
        .args(["--config", path_arg(&path), "config", "init", "--yes"])
        .assert()
        .success();
}

#[test]
fn test_config_show_masks_tokens() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "config.toml",
        r#"
[[sources]]
id = "feed"
kind = "http"
url = "https://example.com/feed.txt"
token = "s3cret"
"#,
    );
    pagewire_cmd()
        .args(["--config", path_arg(&config), "config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("********").and(predicate::str::contains("s3cret").not()),
        );
}
