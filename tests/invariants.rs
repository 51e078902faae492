//! Contract Invariant Tests
//!
//! These tests verify the guarantees the gateware build relies on.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::NaiveDate;
use hwver_core::{
    BuildDate, GenerateError, Generator, GeneratorConfig, Git, HashField, PackageTemplate,
    SourceControl, VcsError,
};

/// In-memory stand-in for a checked-out switch HDL tree
struct FakeVcs {
    toplevel: Option<PathBuf>,
    head: Option<String>,
    deps: HashMap<PathBuf, String>,
}

impl FakeVcs {
    fn new(toplevel: &Path) -> Self {
        let mut deps = HashMap::new();
        deps.insert(PathBuf::from("ip_cores/general-cores"), "def5678".to_string());
        deps.insert(PathBuf::from("ip_cores/wr-cores"), "9998888".to_string());
        Self {
            toplevel: Some(toplevel.to_path_buf()),
            head: Some("abc1234".to_string()),
            deps,
        }
    }
}

impl SourceControl for FakeVcs {
    fn toplevel(&self) -> Result<PathBuf, VcsError> {
        self.toplevel
            .clone()
            .ok_or_else(|| VcsError::NotAWorkingTree("fatal: not a git repository".to_string()))
    }

    fn head_hash(&self, _toplevel: &Path) -> Result<Option<String>, VcsError> {
        Ok(self.head.clone())
    }

    fn dependency_hash(&self, _toplevel: &Path, path: &Path) -> Result<Option<String>, VcsError> {
        Ok(self.deps.get(path).cloned())
    }
}

fn create_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("modules/wrsw_hwiu")).unwrap();
    dir
}

fn package_path(dir: &Path) -> PathBuf {
    dir.join("modules/wrsw_hwiu/gw_ver_pkg.vhd")
}

fn nov_5_2024() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 5).unwrap()
}

#[test]
fn invariant_scenario_constants_in_order() {
    let dir = create_tree();
    let generator = Generator::new(GeneratorConfig::default(), FakeVcs::new(dir.path()));

    let report = generator.generate(nov_5_2024()).unwrap();
    assert!(report.changed);

    let text = fs::read_to_string(package_path(dir.path())).unwrap();
    let constants: Vec<_> = text.lines().filter(|l| l.starts_with("constant")).collect();
    assert_eq!(constants.len(), 4);
    for (line, value) in constants.iter().zip(["050b1800", "0abc1234", "0def5678", "09998888"]) {
        assert!(line.contains("std_logic_vector(31 downto 0)"));
        assert!(line.ends_with(&format!("x\"{}\";", value)), "{line}");
    }
    assert!(text.starts_with("library ieee;\nuse ieee.std_logic_1164.all;\n"));
    assert!(text.ends_with("end package;\n"));
}

#[test]
fn invariant_same_day_same_commits_identical_output() {
    let dir = create_tree();
    let generator = Generator::new(GeneratorConfig::default(), FakeVcs::new(dir.path()));

    let first = generator.generate(nov_5_2024()).unwrap();
    let bytes1 = fs::read(package_path(dir.path())).unwrap();
    let second = generator.generate(nov_5_2024()).unwrap();
    let bytes2 = fs::read(package_path(dir.path())).unwrap();

    assert_eq!(bytes1, bytes2);
    assert_eq!(first.digest, second.digest);
    assert!(!second.changed);

    let next_day = generator.generate(NaiveDate::from_ymd_opt(2024, 11, 6).unwrap()).unwrap();
    assert!(next_day.changed);
    assert_ne!(next_day.digest, first.digest);
}

#[test]
fn invariant_build_date_decodes() {
    let date = BuildDate::from_hex("050b1800").unwrap();
    assert_eq!((date.day, date.month, date.year), (5, 11, 24));
    assert_eq!(BuildDate::from_date(nov_5_2024()).pack(), (5 << 24) | (11 << 16) | (24 << 8));
}

#[test]
fn invariant_hash_fields_always_eight_chars() {
    for abbrev in ["a", "abc1234", "abcd1234", "abcdef0123456789"] {
        let field = HashField::from_abbrev(abbrev).unwrap();
        assert_eq!(field.as_str().len(), 8);
    }
    assert_eq!(HashField::from_abbrev("1").unwrap().as_str(), "00000001");
}

#[test]
fn invariant_missing_dependency_degrades() {
    let dir = create_tree();
    let mut vcs = FakeVcs::new(dir.path());
    vcs.deps.remove(Path::new("ip_cores/general-cores"));
    let generator = Generator::new(GeneratorConfig::default(), vcs);

    let report = generator.generate(nov_5_2024()).unwrap();
    assert!(report.record.gencores_hash.is_unknown());
    assert_eq!(report.record.wrcores_hash.as_str(), "09998888");
    assert!(report.validation.valid);
    assert_eq!(report.validation.warnings().count(), 1);

    let text = fs::read_to_string(package_path(dir.path())).unwrap();
    assert!(text.contains("c_gencores_ver : std_logic_vector(31 downto 0) := x\"00000000\";"));
    assert_eq!(text.lines().filter(|l| l.starts_with("constant")).count(), 4);
}

#[test]
fn invariant_garbage_dependency_output_is_unknown() {
    let dir = create_tree();
    let mut vcs = FakeVcs::new(dir.path());
    vcs.deps.insert(PathBuf::from("ip_cores/wr-cores"), "rror: pa".to_string());
    let generator = Generator::new(GeneratorConfig::default(), vcs);

    let record = generator.collect(nov_5_2024()).unwrap();
    assert!(record.wrcores_hash.is_unknown());
}

#[test]
fn invariant_outside_working_tree_fails_without_writing() {
    let dir = create_tree();
    let path = package_path(dir.path());
    fs::write(&path, "previous\n").unwrap();

    let mut vcs = FakeVcs::new(dir.path());
    vcs.toplevel = None;
    let generator = Generator::new(GeneratorConfig::default(), vcs);

    let err = generator.generate(nov_5_2024()).unwrap_err();
    assert!(matches!(err, GenerateError::Environment(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "previous\n");
}

#[test]
fn invariant_real_git_outside_tree_fails() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(GeneratorConfig::default(), Git::new(dir.path()));

    let err = generator.generate(nov_5_2024()).unwrap_err();
    assert!(matches!(err, GenerateError::Environment(_)));
    assert!(!package_path(dir.path()).exists());
}

#[test]
fn invariant_strict_rejection_keeps_previous_file() {
    let dir = create_tree();
    let path = package_path(dir.path());
    fs::write(&path, "previous\n").unwrap();

    let mut vcs = FakeVcs::new(dir.path());
    vcs.deps.clear();
    let config = GeneratorConfig { strict: true, ..Default::default() };
    let generator = Generator::new(config, vcs);

    let err = generator.generate(nov_5_2024()).unwrap_err();
    assert!(matches!(err, GenerateError::Validation(_)));
    assert!(err.to_string().contains("dependency_revision"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "previous\n");
}

#[test]
fn invariant_prepare_applies_strict_policy() {
    let dir = create_tree();
    let mut vcs = FakeVcs::new(dir.path());
    vcs.deps.clear();
    let config = GeneratorConfig { strict: true, ..Default::default() };
    let generator = Generator::new(config, vcs);

    let err = generator.prepare(nov_5_2024()).unwrap_err();
    assert!(matches!(err, GenerateError::Validation(_)));
    assert!(!package_path(dir.path()).exists());
}

#[test]
fn invariant_prepare_matches_written_package() {
    let dir = create_tree();
    let generator = Generator::new(GeneratorConfig::default(), FakeVcs::new(dir.path()));

    let prepared = generator.prepare(nov_5_2024()).unwrap();
    assert!(!prepared.path.exists());
    let report = generator.generate(nov_5_2024()).unwrap();
    assert_eq!(fs::read_to_string(&report.path).unwrap(), prepared.text);
    assert_eq!(report.record, prepared.record);
}

#[test]
fn invariant_unwritable_output_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(GeneratorConfig::default(), FakeVcs::new(dir.path()));

    let err = generator.generate(nov_5_2024()).unwrap_err();
    assert!(matches!(err, GenerateError::Io { .. }));
    assert!(!package_path(dir.path()).exists());
}

#[test]
fn invariant_generated_package_reads_back() {
    let dir = create_tree();
    let generator = Generator::new(GeneratorConfig::default(), FakeVcs::new(dir.path()));
    let report = generator.generate(nov_5_2024()).unwrap();

    let text = fs::read_to_string(&report.path).unwrap();
    let parsed = PackageTemplate::default().parse(&text).unwrap();
    assert_eq!(parsed, report.record);
}

#[test]
fn invariant_config_redirects_output_and_names() {
    let dir = tempfile::tempdir().unwrap();
    let config: GeneratorConfig = serde_json::from_str(
        r#"{"output": "ver_pkg.vhd", "packageName": "ver_pkg", "generalCores": {"name": "gc", "path": "gc"}}"#,
    ).unwrap();
    let mut vcs = FakeVcs::new(dir.path());
    vcs.deps.insert(PathBuf::from("gc"), "1234567".to_string());
    let generator = Generator::new(config, vcs);

    let report = generator.generate(nov_5_2024()).unwrap();
    assert_eq!(report.record.gencores_hash.as_str(), "01234567");
    let text = fs::read_to_string(dir.path().join("ver_pkg.vhd")).unwrap();
    assert!(text.contains("package ver_pkg is\n"));
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c", "user.name=hwver",
            "-c", "user.email=hwver@example.com",
            "-c", "commit.gpgsign=false",
            "-c", "protocol.file.allow=always",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn invariant_real_git_repository() {
    if !Git::is_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let dir = create_tree();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "initial"]);
    let head = git(dir.path(), &["log", "--pretty=format:%h", "-n", "1"]);

    let generator = Generator::new(GeneratorConfig::default(), Git::new(dir.path().join("modules")));
    let report = generator.generate(nov_5_2024()).unwrap();

    assert_eq!(report.record.switch_hdl_hash, HashField::from_abbrev(&head).unwrap());
    assert!(report.record.gencores_hash.is_unknown());
    assert!(report.record.wrcores_hash.is_unknown());
    assert!(package_path(dir.path()).exists());
}

#[test]
fn invariant_real_git_submodule() {
    if !Git::is_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let cores = tempfile::tempdir().unwrap();
    git(cores.path(), &["init", "-q"]);
    git(cores.path(), &["commit", "-q", "--allow-empty", "-m", "cores"]);
    let pinned = git(cores.path(), &["rev-parse", "HEAD"]);
    let expected = HashField::from_abbrev(&pinned.trim()[..7]).unwrap();

    let dir = create_tree();
    git(dir.path(), &["init", "-q"]);
    let source = cores.path().to_str().unwrap();
    git(dir.path(), &["submodule", "add", "-q", source, "ip_cores/general-cores"]);
    git(dir.path(), &["commit", "-q", "-m", "add general-cores"]);

    let generator = Generator::new(GeneratorConfig::default(), Git::new(dir.path()));
    let record = generator.collect(nov_5_2024()).unwrap();
    assert_eq!(record.gencores_hash, expected);
    assert!(record.wrcores_hash.is_unknown());

    // A deinitialized submodule still reports the recorded commit.
    git(dir.path(), &["submodule", "deinit", "-q", "-f", "ip_cores/general-cores"]);
    let record = generator.collect(nov_5_2024()).unwrap();
    assert_eq!(record.gencores_hash, expected);
}
