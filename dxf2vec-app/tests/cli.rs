use std::fs;
use std::path::Path;

use assert_cmd::Command;
use dxf2vec_io::VecReader;
use predicates::prelude::*;

const LINES: &str = "0\nSECTION\n2\nHEADER\n9\n$INSUNITS\n70\n4\n0\nENDSEC\n\
0\nSECTION\n2\nENTITIES\n\
0\nLINE\n8\n0\n10\n50\n20\n0\n11\n60\n21\n0\n\
0\nLINE\n8\n0\n10\n0\n20\n0\n11\n10\n21\n0\n\
0\nENDSEC\n0\nEOF\n";

fn dxf2vec(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dxf2vec").expect("binary exists");
    cmd.current_dir(workdir).env_remove("DXF2VEC_CONFIG");
    cmd
}

#[test]
fn help_lists_options() {
    let dir = tempfile::tempdir().expect("create temp dir");
    dxf2vec(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--outfile"))
        .stdout(predicate::str::contains("--start"))
        .stdout(predicate::str::contains("--relative"));
}

#[test]
fn converts_file_into_directory() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();

    dxf2vec(dir.path())
        .args(["lines.dxf", "-t", "out", "-e", "0.01"])
        .assert()
        .success();

    let file = VecReader::new()
        .load(&dir.path().join("out").join("lines.vec"))
        .expect("读取输出");
    assert_eq!(file.unit_code, 4);
    assert_eq!(file.records.len(), 2);
    assert_eq!(file.records[0].points[0].x, 0.0);
}

#[test]
fn start_point_changes_order() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();

    dxf2vec(dir.path())
        .args(["lines.dxf", "-o", "ordered.vec", "--start", "60,0,0"])
        .assert()
        .success();

    let file = VecReader::new()
        .load(&dir.path().join("ordered.vec"))
        .expect("读取输出");
    assert_eq!(file.records[0].points[0].x, 60.0);
    assert_eq!(file.records[0].points[1].x, 50.0);
}

#[test]
fn missing_input_fails_with_message() {
    let dir = tempfile::tempdir().expect("create temp dir");
    dxf2vec(dir.path())
        .arg("absent.dxf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.dxf"));
}

#[test]
fn non_dxf_only_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    dxf2vec(dir.path())
        .arg("notes.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("没有可转换的 DXF 输入文件"));
}

#[test]
fn malformed_start_point_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    dxf2vec(dir.path())
        .args(["a.dxf", "--start", "1,2"])
        .assert()
        .code(2);
}

#[test]
fn explicit_config_must_exist() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();
    dxf2vec(dir.path())
        .args(["lines.dxf", "--config", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn discovered_config_supplies_defaults() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config").join("default.toml"),
        "[conversion]\npaper_scale = 0.25\n\n[output]\ndirectory = \"vec\"\n",
    )
    .unwrap();

    dxf2vec(dir.path()).arg("lines.dxf").assert().success();

    let file = VecReader::new()
        .load(&dir.path().join("vec").join("lines.vec"))
        .expect("读取输出");
    assert_eq!(file.paper_scale, 0.25);
}

#[test]
fn non_positive_relative_epsilon_is_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();
    dxf2vec(dir.path())
        .args(["lines.dxf", "--relative", "-e", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("命令行参数无效"));
    assert!(!dir.path().join("lines.vec").exists());
}

#[test]
fn zero_epsilon_is_clamped_not_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();
    dxf2vec(dir.path())
        .args(["lines.dxf", "-e", "0"])
        .assert()
        .success();
    assert!(dir.path().join("lines.vec").exists());
}

#[test]
fn broken_discovered_config_is_reported_on_stderr() {
    let dir = tempfile::tempdir().expect("create temp dir");
    fs::write(dir.path().join("lines.dxf"), LINES).unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config").join("default.toml"),
        "[conversion]\nepsilon = \"fine\"\n",
    )
    .unwrap();

    dxf2vec(dir.path())
        .arg("lines.dxf")
        .assert()
        .success()
        .stderr(predicate::str::contains("加载默认配置失败"));
    assert!(dir.path().join("lines.vec").exists());
}
