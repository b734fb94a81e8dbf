use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_flat_model(dir: &Path) {
    let mut body = String::from("cellsize 1\n");
    for _ in 0..5 {
        body.push_str("0 0 0 0 0\n");
    }
    fs::write(dir.join("flat.txt"), body).unwrap();
}

fn write_scenario(dir: &Path, name: &str, extra: serde_json::Value) {
    let mut scenario = json!({
        "model": "flat.txt",
        "max_slope": 35.0,
        "start": [0.0, 0.0],
        "end": [4.0, 4.0],
        "coordinate_system": "row_col",
        "start_heading": 0.0,
    });
    if let (Some(base), Some(extra)) = (scenario.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    fs::write(dir.join(name), serde_json::to_string_pretty(&scenario).unwrap()).unwrap();
}

#[test]
fn solve_writes_json_output() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(dir.path(), "site.json", json!({}));
    let out = dir.path().join("traverse.json");

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "solve",
        dir.path().join("site.json").to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Traverse written"));

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(doc["path"].as_array().unwrap().len(), 5);
    assert_eq!(doc["path"][0], json!([0, 0]));
    assert_eq!(doc["path"][4], json!([4, 4]));
    assert_eq!(doc["alpha"], json!(1.0));
    assert!(doc["energy_j"].as_f64().unwrap() > 0.0);
}

#[test]
fn solve_emits_csv_to_stdout() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(dir.path(), "site.json", json!({}));

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "solve",
        dir.path().join("site.json").to_str().unwrap(),
        "--format",
        "csv",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains(
        "is_station,row,col,elevation_m,distance_m,energy_j,duration_s",
    ));
}

#[test]
fn solve_no_path_exits_2() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    // Ring of obstacles around the target.
    let ring: Vec<[u64; 2]> =
        vec![[3, 3], [3, 4], [4, 3]];
    write_scenario(dir.path(), "blocked.json", json!({"obstacles_list": ring}));

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["solve", dir.path().join("blocked.json").to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no path"));
}

#[test]
fn solve_blocked_endpoint_exits_3() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(
        dir.path(),
        "pinned.json",
        json!({"obstacles_list": [[0, 0]]}),
    );

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["solve", dir.path().join("pinned.json").to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not passable"));
}

#[test]
fn solve_missing_scenario_exits_1() {
    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["solve", "definitely-absent.json"]).assert().code(1);
}

#[test]
fn solve_with_manifest_records_run_and_shows_it() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(dir.path(), "site.json", json!({}));
    let out = dir.path().join("traverse.json");

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "solve",
        dir.path().join("site.json").to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--manifest",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Recorded run manifest"));

    let manifest = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("traverse-run-"))
        })
        .expect("manifest written next to the output");

    // The manifest carries the solve inputs and traverse metrics.
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(doc["model"], json!("flat.txt"));
    assert_eq!(doc["objective"], json!("energy"));
    assert_eq!(doc["alpha"], json!(1.0));
    assert_eq!(doc["cells"], json!(5));
    assert!(doc["energy_j"].as_f64().unwrap() > 0.0);

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["runs", "show", manifest.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("flat.txt"))
        .stdout(predicate::str::contains("energy objective"))
        .stdout(predicate::str::contains("5 cells"));
}

#[test]
fn runs_show_missing_manifest_exits_1() {
    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["runs", "show", "absent-manifest.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reading manifest"));
}

#[test]
fn scenario_validate_accepts_good_file() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(dir.path(), "site.json", json!({}));

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "scenario",
        "validate",
        dir.path().join("site.json").to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Scenario OK"));
}

#[test]
fn scenario_validate_rejects_bad_slope() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());
    write_scenario(dir.path(), "bad.json", json!({"max_slope": 120.0}));

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "scenario",
        "validate",
        dir.path().join("bad.json").to_str().unwrap(),
    ])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("max_slope"));
}

#[test]
fn grid_stats_reports_counts() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());

    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args([
        "grid",
        "stats",
        dir.path().join("flat.txt").to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Passable      : 25"))
    .stdout(predicate::str::contains("Islands       : 1"));
}

#[test]
fn grid_stats_json_output() {
    let dir = tempdir().unwrap();
    write_flat_model(dir.path());

    let mut cmd = Command::cargo_bin("trax").unwrap();
    let output = cmd
        .args([
            "grid",
            "stats",
            dir.path().join("flat.txt").to_str().unwrap(),
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["passable_cells"], json!(25));
    assert_eq!(doc["components"], json!(1));
}

#[test]
fn completions_generate() {
    let mut cmd = Command::cargo_bin("trax").unwrap();
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trax"));
}
