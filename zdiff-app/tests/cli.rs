use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const CIRCLE_R5: &str = concat!(
    "0\nSECTION\n2\nENTITIES\n",
    "0\nCIRCLE\n5\nA1\n8\nGEOM\n10\n0.0\n20\n0.0\n40\n5.0\n",
    "0\nENDSEC\n0\nEOF\n",
);

const CIRCLE_R7: &str = concat!(
    "0\nSECTION\n2\nENTITIES\n",
    "0\nCIRCLE\n5\nB1\n8\nGEOM\n10\n0.0\n20\n0.0\n40\n7.0\n",
    "0\nENDSEC\n0\nEOF\n",
);

const TEXT_ROT_0: &str = concat!(
    "0\nSECTION\n2\nENTITIES\n",
    "0\nTEXT\n5\nA2\n8\nANNOT\n10\n1.0\n20\n1.0\n40\n2.5\n50\n0.0\n1\nROOM-101\n",
    "0\nENDSEC\n0\nEOF\n",
);

const TEXT_ROT_45: &str = concat!(
    "0\nSECTION\n2\nENTITIES\n",
    "0\nTEXT\n5\nB2\n8\nANNOT\n10\n1.0\n20\n1.0\n40\n2.5\n50\n45.0\n1\nROOM-101\n",
    "0\nENDSEC\n0\nEOF\n",
);

fn write_fixture(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("写入测试文件");
    path
}

fn zdiff() -> Command {
    Command::cargo_bin("zdiff").expect("二进制存在")
}

#[test]
fn identical_files_exit_zero() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", CIRCLE_R5);
    let b = write_fixture(dir.path(), "b.dxf", CIRCLE_R5);

    zdiff()
        .args(["compare"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout(predicate::str::contains("未检测到差异"));
}

#[test]
fn changed_radius_exits_one_and_names_attribute() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", CIRCLE_R5);
    let b = write_fixture(dir.path(), "b.dxf", CIRCLE_R7);

    zdiff()
        .args(["compare"])
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("radius"));
}

#[test]
fn missing_file_exits_two() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", CIRCLE_R5);

    zdiff()
        .args(["compare"])
        .arg(&a)
        .arg(dir.path().join("missing.dxf"))
        .assert()
        .code(2);
}

#[test]
fn json_output_is_machine_readable() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", CIRCLE_R5);
    let b = write_fixture(dir.path(), "b.dxf", CIRCLE_R7);

    let output = zdiff()
        .args(["compare", "--json"])
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value =
        serde_json::from_slice(&output).expect("stdout 应为合法 JSON");
    assert_eq!(value["mode"], "compare");
    assert_eq!(value["total_changes"], 1);
}

#[test]
fn ignore_rotation_suppresses_rotation_only_change() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", TEXT_ROT_0);
    let b = write_fixture(dir.path(), "b.dxf", TEXT_ROT_45);

    zdiff()
        .args(["compare"])
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1);

    zdiff()
        .args(["compare", "--ignore-rotation"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success();
}

#[test]
fn orientation_mode_reports_rotation_delta() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", TEXT_ROT_0);
    let b = write_fixture(dir.path(), "b.dxf", TEXT_ROT_45);

    zdiff()
        .args(["orientation"])
        .arg(&a)
        .arg(&b)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("45.00"));
}

#[test]
fn batch_pairs_files_by_suffix() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    write_fixture(dir.path(), "plan_old.dxf", CIRCLE_R5);
    write_fixture(dir.path(), "plan_new.dxf", CIRCLE_R7);

    zdiff()
        .args(["batch"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("===== plan ====="))
        .stdout(predicate::str::contains("批量汇总：1 对文件"));
}

#[test]
fn batch_writes_output_file_when_requested() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    write_fixture(dir.path(), "plan_old.dxf", CIRCLE_R5);
    write_fixture(dir.path(), "plan_new.dxf", CIRCLE_R5);
    let output = dir.path().join("report.txt");

    zdiff()
        .args(["batch"])
        .arg(dir.path())
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    let written = fs::read_to_string(&output).expect("汇总文件存在");
    assert!(written.contains("批量汇总"));
}

#[test]
fn tolerance_flag_widens_match() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let a = write_fixture(dir.path(), "a.dxf", CIRCLE_R5);
    let b = write_fixture(dir.path(), "b.dxf", CIRCLE_R7);

    // 半径差 2.0，把数值容差放大到 5.0 后不再视为差异
    zdiff()
        .args(["compare", "--numeric-tolerance", "5.0"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success();
}
