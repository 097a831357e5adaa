//! Integration tests for the bfpeep binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn bfpeep() -> Command {
    Command::cargo_bin("bfpeep").unwrap()
}

fn write_program(dir: &TempDir, code: &str) -> PathBuf {
    let path = dir.path().join("program.bf");
    fs::write(&path, code).unwrap();
    path
}

#[test]
fn runs_program_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "++++++++[>++++++++<-]>+.+.");
    bfpeep().arg(&path).assert().success().stdout("AB");
}

#[test]
fn reads_stdin() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, ",[.,]");
    bfpeep()
        .arg(&path)
        .args(["--eof", "zero"])
        .write_stdin("echo")
        .assert()
        .success()
        .stdout("echo");
}

#[test]
fn writes_instruction_dump() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "+++[->>+<<]>>.");
    let listing = dir.path().join("listing.txt");
    bfpeep()
        .arg(&path)
        .arg("--dump")
        .arg(&listing)
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&listing).unwrap(),
        "ADD_CL\t3\nADD\t2\t1\nSTORE\t0\nADD_DP\t2\nOUT\t\n"
    );
}

#[test]
fn no_optimize_keeps_loops() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "[-]");
    let listing = dir.path().join("listing.txt");
    bfpeep()
        .arg(&path)
        .arg("--no-optimize")
        .arg("-d")
        .arg(&listing)
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&listing).unwrap(),
        "BZ\t3\nADD_CL\t-1\nBNZ\t1\n"
    );
}

#[test]
fn reports_time_on_stderr() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "+");
    bfpeep()
        .arg(&path)
        .arg("--time")
        .assert()
        .success()
        .stderr(predicate::str::contains("Total Time:"));
}

#[test]
fn unbalanced_program_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "+[>+");
    bfpeep()
        .arg(&path)
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("unmatched '['"));
}

#[test]
fn tape_underflow_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "<+");
    bfpeep()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of bounds at instruction 1"));
}

#[test]
fn eof_fail_policy() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, ",");
    bfpeep()
        .arg(&path)
        .args(["--eof", "fail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("input exhausted"));
}

#[test]
fn missing_file_fails() {
    let dir = TempDir::new().unwrap();
    bfpeep()
        .arg(dir.path().join("absent.bf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn empty_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_program(&dir, "");
    bfpeep()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty source"));
}

#[test]
fn hello_world_demo() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/hello.bf");
    bfpeep()
        .arg(&path)
        .arg("--flush")
        .assert()
        .success()
        .stdout("Hello World!\n");
}
