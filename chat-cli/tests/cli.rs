//! End-to-end tests for the chatsync binary (mock transport only).

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn chatsync() -> Command {
    let mut cmd = Command::cargo_bin("chatsync").unwrap();
    cmd.env_remove("CHATSYNC_TOKEN").env_remove("CHATSYNC_USER");
    cmd
}

#[test]
fn help_lists_commands() {
    chatsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn show_prints_demo_conversation_oldest_first() {
    chatsync()
        .args(["--mock", "show", "17"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conversation 17 (3 messages)"))
        .stdout(predicate::str::is_match("(?s)Dinner tonight\\?.*Sure, 7pm\\?.*See you there").unwrap())
        .stdout(predicate::str::contains("you: Sure, 7pm?"));
}

#[test]
fn send_reports_confirmed_id() {
    chatsync()
        .args(["--mock", "send", "17", "on my way"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sent message srv-1 to conversation 17"));
}

#[test]
fn blank_send_fails() {
    chatsync()
        .args(["--mock", "send", "17", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message is empty"));
}

#[test]
fn watch_exits_after_rounds() {
    chatsync()
        .args(["--mock", "watch", "17", "--interval", "0", "--rounds", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("See you there."));
}

#[test]
fn missing_token_is_reported() {
    chatsync()
        .args(["--user", "me", "show", "17"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CHATSYNC_TOKEN"));
}

#[test]
fn token_can_come_from_environment() {
    // Nothing listens on port 1, so the load fails after settings resolve
    chatsync()
        .env("CHATSYNC_TOKEN", "t")
        .env("CHATSYNC_USER", "me")
        .args(["--base-url", "http://127.0.0.1:1", "show", "17"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backend unavailable"));
}

#[test]
fn invalid_config_file_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "page_size = 0").unwrap();

    chatsync()
        .arg("--config")
        .arg(file.path())
        .args(["--mock", "show", "17"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
