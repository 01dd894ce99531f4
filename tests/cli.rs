use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join(".gitignore"), "target/\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"hello\");\n}\n").unwrap();
    fs::write(root.join("src/util.py"), "def add(a, b):\n    return a + b\n").unwrap();
    fs::create_dir_all(root.join("target")).unwrap();
    fs::write(root.join("target/out.rs"), "generated").unwrap();
    dir
}

fn sensei(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sensei").unwrap();
    cmd.arg("--config")
        .arg(config_dir.join("absent.toml"))
        .env_remove("OPENAI_API_KEY");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("sensei")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ask questions about your codebase"));
}

#[test]
fn test_tokens_lists_files_and_count() {
    let dir = project();

    sensei(dir.path())
        .arg("tokens")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("src/main.rs"))
        .stdout(predicate::str::contains("src/util.py"))
        .stdout(predicate::str::contains("target/out.rs").not())
        .stdout(predicate::str::contains("Base token count"));
}

#[test]
fn test_tokens_pattern() {
    let dir = project();

    sensei(dir.path())
        .arg("tokens")
        .arg(dir.path())
        .arg(dir.path().join("src"))
        .arg("*.py")
        .assert()
        .success()
        .stdout(predicate::str::contains("util.py"))
        .stdout(predicate::str::contains("main.rs").not());
}

#[test]
fn test_tokens_rejects_unknown_model() {
    let dir = project();
    let config = dir.path().join("sensei.toml");
    fs::write(&config, "[model]\nname = \"my-local-model\"\n").unwrap();

    Command::cargo_bin("sensei")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("tokens")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("my-local-model"));
}

#[test]
fn test_config_show() {
    let dir = tempfile::tempdir().unwrap();

    sensei(dir.path())
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[budget]"))
        .stdout(predicate::str::contains("max_context_tokens = 4096"));
}

#[test]
fn test_ask_without_api_key() {
    let dir = project();

    sensei(dir.path())
        .args(["ask", "What does main print?", "--dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_fine_tune_prepare() {
    let dir = project();
    let output = dir.path().join("models/train.jsonl");

    sensei(dir.path())
        .args(["fine-tune", "prepare"])
        .arg(dir.path())
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("What is in the file src/main.rs?"));
}
