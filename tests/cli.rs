use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn getfw() -> Command {
    Command::cargo_bin("getfw").unwrap()
}

/// Build a fake mounted Windows image containing every catalogued firmware
/// package, each file seeded with distinct content.
fn fake_windows_root() -> TempDir {
    let temp = TempDir::new().unwrap();
    let repo = temp
        .path()
        .join("Windows/System32/DriverStore/FileRepository");

    for package in getfw::CATALOG {
        let pkg_dir = repo.join(format!("{}.inf_arm64_0123456789abcdef", package.prefix));
        for file in package.files {
            let path = pkg_dir.join(file.source);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, format!("firmware:{}:{}", package.name, file.source)).unwrap();
        }
    }

    temp
}

fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir(root);
    files.sort();
    files
}

fn walkdir(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(walkdir(&path));
        } else {
            out.push(path);
        }
    }
    out
}

#[test]
fn extracts_full_catalog() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();

    // Files land at their documented normalized paths, byte-identical.
    let bt = out_dir.join("qca/crbtfw21.tlv");
    assert!(bt.exists());
    assert_eq!(
        fs::read_to_string(&bt).unwrap(),
        "firmware:bluetooth:crbtfw21.tlv"
    );

    let mcfg = out_dir.join("qcom/msft/surface/pro-x-sq2/modem_pr/mcfg/configs/mcfg_sw/oem_sw.txt");
    assert!(mcfg.exists());
    assert_eq!(fs::read_to_string(&mcfg).unwrap(), "firmware:mcfg:MCFG/MCFG.1");

    assert!(out_dir.join("ath10k/WCN3990/hw1.0/boards/bdwlan.b58").exists());
    assert!(out_dir.join("qca/crnv01.bin").exists());
    assert!(out_dir.join(".getfw/extraction_report.json").exists());
}

#[test]
fn rerun_rebuilds_identical_tree() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("-q")
        .assert()
        .success();
    let first = collect_files(&out_dir)
        .iter()
        .filter(|p| !p.starts_with(out_dir.join(".getfw")))
        .map(|p| (p.clone(), fs::read(p).unwrap_or_default()))
        .collect::<Vec<_>>();

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("-q")
        .assert()
        .success();

    for (path, content) in first {
        assert_eq!(fs::read(&path).unwrap_or_default(), content, "{:?}", path);
    }
}

#[test]
fn missing_package_fails_by_default() {
    let source = fake_windows_root();
    let repo = source
        .path()
        .join("Windows/System32/DriverStore/FileRepository");
    fs::remove_dir_all(repo.join("qcbtfmuart8180.inf_arm64_0123456789abcdef")).unwrap();

    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("bluetooth"));

    // Fail-fast: the output tree is never created.
    assert!(!out_dir.exists());
}

#[test]
fn missing_package_warn_policy_extracts_the_rest() {
    let source = fake_windows_root();
    let repo = source
        .path()
        .join("Windows/System32/DriverStore/FileRepository");
    fs::remove_dir_all(repo.join("qcbtfmuart8180.inf_arm64_0123456789abcdef")).unwrap();

    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--missing")
        .arg("warn")
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("OMITTED: bluetooth"));

    assert!(!out_dir.join("qca").exists());
    assert!(out_dir
        .join("qcom/msft/surface/pro-x-sq2/wlanmdsp.mbn")
        .exists());
}

#[test]
fn invalid_source_root_is_rejected() {
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg("/no/such/windows/root")
        .arg("-o")
        .arg(&out_dir)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid Windows source root"));

    assert!(!out_dir.exists());
}

#[test]
fn directory_without_driver_store_is_rejected() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(out.path().join("firmware"))
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Windows root"));
}

#[test]
fn dry_run_writes_nothing() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--dry-run")
        .arg("-v")
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success()
        .stdout(predicate::str::contains("qca/crbtfw21.tlv"));

    assert!(!out_dir.exists());
}

#[test]
fn dry_run_json_output_is_machine_readable() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    let output = getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--dry-run")
        .arg("--output-format")
        .arg("json")
        .output()
        .unwrap();

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut saw_plan_entry = false;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let value: serde_json::Value =
            serde_json::from_str(line).unwrap_or_else(|e| panic!("bad JSON line {:?}: {}", line, e));
        if value["type"] == "plan_entry" {
            saw_plan_entry = true;
        }
    }
    assert!(saw_plan_entry);
}

#[test]
fn skip_list_omits_packages_silently() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--skip")
        .arg("mcfg,bluetooth")
        .arg("-q")
        .assert()
        .success();

    assert!(!out_dir.join("qca").exists());
    assert!(!out_dir
        .join("qcom/msft/surface/pro-x-sq2/modem_pr")
        .exists());
    assert!(out_dir
        .join("qcom/msft/surface/pro-x-sq2/qcadsp8180.mbn")
        .exists());
}

#[test]
fn unknown_skip_name_is_a_config_error() {
    let source = fake_windows_root();

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("--skip")
        .arg("not-a-package")
        .assert()
        .failure()
        .stderr(predicate::str::contains("skip list"));
}

#[test]
fn list_prints_catalog() {
    getfw()
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("bluetooth"))
        .stdout(predicate::str::contains("wlan/ath10k/board"))
        .stdout(predicate::str::contains("qcbtfmuart8180"));
}

#[test]
fn generate_config_writes_sample() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("getfw.toml");

    getfw()
        .arg("--generate-config")
        .arg("-c")
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[output]"));
    assert!(content.contains("[policy]"));
    assert!(content.lines().any(|l| l.starts_with('#')));
}

#[test]
fn no_report_flag_keeps_tree_clean() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    getfw()
        .arg("-w")
        .arg(source.path())
        .arg("-o")
        .arg(&out_dir)
        .arg("--no-report")
        .arg("-q")
        .assert()
        .success();

    assert!(!out_dir.join(".getfw").exists());
    assert!(out_dir.join("qca/crbtfw21.tlv").exists());
}

#[test]
fn config_file_supplies_windows_root() {
    let source = fake_windows_root();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("firmware");

    let config_path = out.path().join("getfw.toml");
    fs::write(
        &config_path,
        format!(
            "[source]\nwindows_root = {:?}\n\n[output]\ndirectory = {:?}\npreserve_mtimes = true\ngenerate_report = false\n",
            source.path(),
            out_dir,
        ),
    )
    .unwrap();

    getfw()
        .arg("-c")
        .arg(&config_path)
        .arg("-q")
        .assert()
        .success();

    assert!(out_dir.join("qca/crbtfw21.tlv").exists());
}
