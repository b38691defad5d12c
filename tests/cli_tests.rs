mod common;

use std::fs;
use std::process::Command;

use common::*;
use fieldlink::classfile::ClassFile;

fn fieldlink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fieldlink"));
    command.env_remove("FIELDLINK_REWRITE_STATIC").env_remove("FIELDLINK_VERIFY");
    command
}

fn indirect_calls(class: &ClassFile) -> usize {
    class.methods.iter().filter_map(|m| m.code()).map(|c| c.indirect_call_count()).sum()
}

#[test]
fn rewrite_dir_mirrors_the_tree() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::create_dir_all(input.path().join("p")).unwrap();
    fs::write(input.path().join("p/Counter.class"), counter_class().bytes()).unwrap();
    fs::write(input.path().join("p/Plain.class"), plain_class().bytes()).unwrap();
    fs::write(input.path().join("p/notes.txt"), "not a class").unwrap();

    let status = fieldlink()
        .arg("rewrite-dir")
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .status()
        .unwrap();
    assert!(status.success());

    let counter = ClassFile::decode(&fs::read(output.path().join("p/Counter.class")).unwrap()).unwrap();
    assert_eq!(indirect_calls(&counter), 6);
    assert_eq!(fs::read(output.path().join("p/Plain.class")).unwrap(), plain_class().bytes());
    assert!(!output.path().join("p/notes.txt").exists());
}

#[test]
fn rewrite_respects_no_static() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.class");
    let output = dir.path().join("out/Counter.class");
    fs::write(&input, counter_class().bytes()).unwrap();

    let status = fieldlink()
        .args(["--no-static", "rewrite"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());
    let class = ClassFile::decode(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(indirect_calls(&class), 3);
}

#[test]
fn dump_marks_call_sites() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.class");
    fs::write(&input, fieldlink::rewrite(&counter_class().bytes()).unwrap()).unwrap();

    let out = fieldlink().arg("dump").arg(&input).output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8(out.stdout).unwrap();
    assert!(text.starts_with("class p/Counter (version 52.0)"));
    assert!(text.contains("getter$$count"));
    assert!(text.contains("setter$$total"));
}

#[test]
fn bad_input_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Broken.class");
    fs::write(&input, b"\xCA\xFE\xBA\xBE\x00").unwrap();
    let out = fieldlink().arg("rewrite").arg(&input).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Broken.class"));
}
