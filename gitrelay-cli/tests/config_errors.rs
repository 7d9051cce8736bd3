//! Binary-level behavior around configuration: a clean environment must
//! produce a fatal, descriptive startup error instead of entering the loop.

use assert_cmd::Command;
use predicates::prelude::*;

use gitrelay_core::config;

const ALL_VARS: &[&str] = &[
    config::ENV_BUCKET,
    config::ENV_PRIVATE_KEY_PATH,
    config::ENV_PRIVATE_KEY_PASSPHRASE,
    config::ENV_GITLAB_BASE_URL,
    config::ENV_GITLAB_USERNAME,
    config::ENV_GITLAB_TOKEN,
    config::ENV_SLEEP_SECONDS,
    config::ENV_WORKDIR,
    config::ENV_METRICS_PORT,
    config::ENV_SHARD_ID,
    config::ENV_CA_CERT_PATH,
];

fn gitrelay() -> Command {
    let mut cmd = Command::cargo_bin("gitrelay").expect("binary");
    for var in ALL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn once_without_environment_fails_with_missing_variable() {
    gitrelay()
        .arg("once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing environment variable"));
}

#[test]
fn run_without_environment_fails_before_polling() {
    gitrelay()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing environment variable"));
}

#[test]
fn invalid_sleep_value_is_reported_by_name() {
    gitrelay()
        .arg("once")
        .env(config::ENV_BUCKET, "bundles")
        .env(config::ENV_PRIVATE_KEY_PATH, "/keys/identity.txt")
        .env(config::ENV_PRIVATE_KEY_PASSPHRASE, "pw")
        .env(config::ENV_GITLAB_BASE_URL, "https://gitlab.example.com")
        .env(config::ENV_GITLAB_USERNAME, "bot")
        .env(config::ENV_GITLAB_TOKEN, "token")
        .env(config::ENV_SLEEP_SECONDS, "five minutes")
        .assert()
        .failure()
        .stderr(predicate::str::contains(config::ENV_SLEEP_SECONDS));
}

#[test]
fn help_lists_both_modes() {
    gitrelay()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("once")));
}
