use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;

fn ebsd_match() -> Command {
    Command::cargo_bin("ebsd-match").expect("binary built")
}

/// 2x2 scan, one phase, Phi in degrees per pixel.
fn write_scan(path: &Path, phi: [[f64; 2]; 2]) {
    let doc = json!({
        "euler_phi1": [[0.0, 0.0], [0.0, 0.0]],
        "euler_phi": phi,
        "euler_phi2": [[0.0, 0.0], [0.0, 0.0]],
        "image_quality": [[10.0, 20.0], [30.0, 40.0]],
        "phase_index": [[1, 1], [1, 1]],
        "phase_names": ["", "Nickel"],
    });
    fs::write(path, doc.to_string()).unwrap();
}

fn write_run(dir: &Path, symmetry: &str) -> std::path::PathBuf {
    write_scan(&dir.join("ref.json"), [[0.0, 20.0], [40.0, 60.0]]);
    write_scan(&dir.join("def.json"), [[1.0, 21.0], [75.0, 60.5]]);
    fs::write(
        dir.join("details.csv"),
        "x_step,0.5\ny_step,0.5\nNumber of References,4\n,\"d1.tif,1\"\n,\"d2.tif,2\"\n,\"d3.tif,3\"\n,\"d4.tif,4\"\n",
    )
    .unwrap();

    let config = json!({
        "reference_scan": dir.join("ref.json"),
        "target_scan": dir.join("def.json"),
        "project_details": dir.join("details.csv"),
        "output_path": dir.join("report.csv"),
        "report_json_path": dir.join("report.json"),
        "angle_threshold_deg": 2.0,
        "symmetry": { "default": symmetry },
    });
    let path = dir.join("run.json");
    fs::write(&path, config.to_string()).unwrap();
    path
}

#[test]
fn groups_lists_all_crystal_systems() {
    ebsd_match()
        .arg("groups")
        .assert()
        .success()
        .stdout(predicate::str::contains("cubic"))
        .stdout(predicate::str::contains("O     24"))
        .stdout(predicate::str::contains("triclinic"));
}

#[test]
fn match_writes_csv_and_json_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_run(dir.path(), "cubic");

    ebsd_match()
        .args(["--log-level", "off", "match", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("matched 3 of 4 patterns"));

    let csv = fs::read_to_string(dir.path().join("report.csv")).unwrap();
    assert!(csv.starts_with("# angle_threshold: 2.0\n"));
    assert!(csv.contains("# no_matched_patterns: \"d3.tif\""));
    assert!(csv.contains("d2.tif,0th_x50y0.tif,2,2,20.0,1.0,Nickel"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["matches"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["unmatched"], json!(["d3.tif"]));
}

#[test]
fn threshold_override_changes_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_run(dir.path(), "cubic");

    ebsd_match()
        .args(["--log-level", "off", "match", "--threshold", "0.75", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("matched 1 of 4 patterns"));
}

#[test]
fn reference_dir_resolves_existing_images() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_run(dir.path(), "cubic");
    let images = dir.path().join("0th");
    fs::create_dir(&images).unwrap();
    for name in ["0th_x0y0.tif", "0th_x50y0.tif", "0th_x0y50.tif", "0th_x50y50.tif"] {
        fs::write(images.join(name), b"").unwrap();
    }

    ebsd_match()
        .args(["--log-level", "info", "match", "--config"])
        .arg(&config)
        .arg("--reference-dir")
        .arg(&images)
        .assert()
        .success()
        .stderr(predicate::str::contains("d4.tif -> 0th_x50y50.tif"));
}

#[test]
fn log_level_falls_back_to_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_run(dir.path(), "cubic");
    let images = dir.path().join("0th");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("0th_x50y50.tif"), b"").unwrap();

    ebsd_match()
        .env("EBSD_MATCH_LOG", "error")
        .args(["match", "--config"])
        .arg(&config)
        .arg("--reference-dir")
        .arg(&images)
        .assert()
        .success()
        .stderr(predicate::str::contains("->").not());

    ebsd_match()
        .env("EBSD_MATCH_LOG", "error")
        .args(["--log-level", "info", "match", "--config"])
        .arg(&config)
        .arg("--reference-dir")
        .arg(&images)
        .assert()
        .success()
        .stderr(predicate::str::contains("d4.tif -> 0th_x50y50.tif"));
}

#[test]
fn unsupported_symmetry_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_run(dir.path(), "quasicrystal");

    ebsd_match()
        .args(["--log-level", "off", "match", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unsupported crystal symmetry 'quasicrystal'",
        ));
    assert!(!dir.path().join("report.csv").exists());
}

#[test]
fn missing_config_is_an_error() {
    ebsd_match()
        .args(["match", "--config", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}
