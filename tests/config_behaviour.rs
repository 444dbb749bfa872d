mod common;

use std::fs;
use std::path::Path;

use devwatch::config::model::DEFAULT_STATUS_DIR;
use devwatch::config::{load_and_validate, ConfigFile, RawConfigFile};
use tempfile::TempDir;

fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("devwatch.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn full_config_parses_with_rules_in_declaration_order() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        r#"
status_dir = "build/.status"
run_cmd = "./tmp/main"
ignore = ["**/*_test.go"]

[[rule]]
name = "gen"
watch = ["**/*.tpl"]
command = "my-generator"

[[rule]]
name = "compile"
watch = ["**/*.go"]
command = "go build -o ./tmp/main ."
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.status_dir(), "build/.status");
    assert_eq!(cfg.run_cmd(), Some("./tmp/main"));
    assert_eq!(cfg.ignore(), ["**/*_test.go".to_string()]);
    assert!(cfg.watching_enabled());

    let names: Vec<_> = cfg.rules().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["gen", "compile"]);
}

#[test]
fn missing_file_yields_a_disabled_default_config() {
    let tmp = TempDir::new().unwrap();
    let cfg = load_and_validate(tmp.path().join("does-not-exist.toml")).unwrap();

    assert_eq!(cfg.status_dir(), DEFAULT_STATUS_DIR);
    assert_eq!(cfg.run_cmd(), None);
    assert!(!cfg.watching_enabled());
}

#[test]
fn omitted_fields_fall_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        r#"
[[rule]]
name = "compile"
command = "make"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.status_dir(), DEFAULT_STATUS_DIR);
    assert_eq!(cfg.run_cmd(), None);
    assert!(cfg.ignore().is_empty());
    assert!(cfg.rules()[0].watch.is_empty());
}

#[test]
fn empty_run_cmd_means_no_application() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), r#"run_cmd = """#);

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.run_cmd(), None);
}

#[test]
fn malformed_toml_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(tmp.path(), "status_dir = [not toml");

    assert!(load_and_validate(&path).is_err());
}

#[test]
fn duplicate_rule_names_are_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
[[rule]]
name = "compile"
command = "make"

[[rule]]
name = "compile"
command = "make again"
"#,
    )
    .unwrap();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("duplicate rule name"));
}

#[test]
fn empty_rule_name_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
[[rule]]
name = "  "
command = "make"
"#,
    )
    .unwrap();

    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn empty_rule_command_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
[[rule]]
name = "compile"
command = ""
"#,
    )
    .unwrap();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("empty command"));
}

#[test]
fn invalid_watch_glob_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
[[rule]]
name = "compile"
watch = ["[unclosed"]
command = "make"
"#,
    )
    .unwrap();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("invalid watch pattern"));
}

#[test]
fn invalid_ignore_glob_is_rejected() {
    let raw: RawConfigFile = toml::from_str(r#"ignore = ["[unclosed"]"#).unwrap();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("invalid ignore pattern"));
}

#[test]
fn empty_status_dir_is_rejected() {
    let raw: RawConfigFile = toml::from_str(r#"status_dir = " ""#).unwrap();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(err.to_string().contains("status_dir"));
}
