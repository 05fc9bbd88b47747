//! End-to-end tests for the `weave` binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn document(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/documents")
        .join(name)
}

/// A `weave` command running inside a fresh temporary directory.
fn weave_in(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.current_dir(dir.path()).arg("--no-color");
    cmd
}

#[test]
fn tangle_writes_file_chunks_to_out() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("hello.lit"))
        .assert()
        .success()
        .stderr(predicate::str::contains("wrote 1 file(s)"));

    let written = fs::read_to_string(dir.path().join("out/hello_world.py")).unwrap();
    assert_eq!(
        written,
        "print(\"HELLO1\")\nprint(\"HELLO2\")\nprint(\"HELLO3\")\n"
    );
    assert!(!dir.path().join("out/say hello world").exists());
}

#[test]
fn tangle_is_the_default_subcommand() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.current_dir(dir.path())
        .arg(document("hello.lit"))
        .assert()
        .success();
    assert!(dir.path().join("out/hello_world.py").is_file());
}

#[test]
fn references_cross_input_files() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("split_main.lit"))
        .arg(document("split_lib.lit"))
        .arg("-o")
        .arg("gen")
        .assert()
        .success();

    let written = fs::read_to_string(dir.path().join("gen/pkg/app.py")).unwrap();
    assert_eq!(written, "def main():\n    print(\"hi\")\n");
}

#[test]
fn undefined_reference_fails_with_name() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("split_main.lit"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined chunk `greeting`"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn cycle_is_reported_instead_of_hanging() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("cycle.lit"))
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reference cycle detected: a -> b -> a"));
}

#[test]
fn check_writes_nothing() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .args(["tangle", "--check"])
        .arg(document("hello.lit"))
        .assert()
        .success()
        .stderr(predicate::str::contains("ok: 2 chunk(s) resolved, 1 file(s)"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn dump_prints_resolved_chunk() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .args(["tangle", "--dump", "hello_world.py"])
        .arg(document("hello.lit"))
        .assert()
        .success()
        .stdout("print(\"HELLO1\")\nprint(\"HELLO2\")\nprint(\"HELLO3\")\n");
}

#[test]
fn list_chunks_marks_files() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .args(["tangle", "--list-chunks"])
        .arg(document("hello.lit"))
        .assert()
        .success()
        .stdout(predicate::str::contains("<<hello_world.py>> 1 line(s) (file)"))
        .stdout(predicate::str::contains("<<say hello world>> 3 line(s)"));
}

#[test]
fn dry_run_lists_paths() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .args(["tangle", "--dry-run", "-o", "build"])
        .arg(document("hello.lit"))
        .assert()
        .success()
        .stdout(predicate::str::contains("hello_world.py"));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn config_file_sets_out_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("weave.toml"), "out_dir = \"generated\"\n").unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("hello.lit"))
        .assert()
        .success();
    assert!(dir.path().join("generated/hello_world.py").is_file());
}

#[test]
fn invalid_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("weave.toml"), "redefine = \"sometimes\"\n").unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(document("hello.lit"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid weave config"));
}

#[test]
fn missing_input_is_an_error() {
    let dir = TempDir::new().unwrap();
    weave_in(&dir)
        .args(["tangle", "does-not-exist.lit"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read 'does-not-exist.lit'"));
}

#[test]
fn unterminated_fragment_warns_but_succeeds() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("doc.lit");
    fs::write(&src, "<<ok.txt>>=\nfine\n@\n<<broken>>=\nnever closed\n").unwrap();
    weave_in(&dir)
        .arg("tangle")
        .arg(&src)
        .assert()
        .success()
        .stderr(predicate::str::contains("unterminated chunk `broken`"));
    assert_eq!(
        fs::read_to_string(dir.path().join("out/ok.txt")).unwrap(),
        "fine\n"
    );
}

#[test]
fn document_without_fragments_warns() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("notes.lit");
    fs::write(&src, "Only prose here, <<nothing>> to tangle.\n").unwrap();
    weave_in(&dir)
        .env_remove("RUST_LOG")
        .arg("tangle")
        .arg(&src)
        .assert()
        .success()
        .stderr(predicate::str::contains("no chunk fragments found"));
}

#[test]
fn test_subcommand_runs_fixtures() {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/weave");
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.args(["--no-color", "test"])
        .arg(&fixtures)
        .assert()
        .success()
        .stderr(predicate::str::contains("test result: ok. 8 passed, 0 failed"));
}

#[test]
fn test_subcommand_filters_categories() {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/weave");
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.args(["--no-color", "test", "-c", "errors"])
        .arg(&fixtures)
        .assert()
        .success()
        .stderr(predicate::str::contains("3 passed, 0 failed"));
}
