use assert_cmd::Command;
use predicates::prelude::*;

fn auditor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_iam-policy-auditor"))
}

#[test]
fn help_lists_the_scan_flags() {
    auditor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--key"))
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("--redact"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--region"));
}

#[test]
fn missing_api_key_is_a_usage_error() {
    auditor()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--key"));
}

#[test]
fn redact_flag_rejects_non_boolean_values() {
    auditor()
        .args(["--key", "test-key", "--redact", "maybe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn version_flag_works() {
    auditor().arg("--version").assert().success();
}
