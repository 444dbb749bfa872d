mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::rule;
use devwatch::engine::ChangeSet;
use devwatch::watch::{
    collect_watch_dirs, compile_ignore, compile_rules, select_rules, should_skip_dir,
};
use tempfile::TempDir;

fn changed(paths: &[&str]) -> ChangeSet {
    paths.iter().map(PathBuf::from).collect()
}

#[test]
fn base_name_glob_matches_anywhere_in_the_tree() {
    let rules = compile_rules(&[rule("compile", &["*.go"], "true")]).unwrap();

    assert!(rules[0].matches_path(Path::new("main.go")));
    assert!(rules[0].matches_path(Path::new("src/deep/nested/main.go")));
    assert!(!rules[0].matches_path(Path::new("src/main.rs")));
}

#[test]
fn recursive_glob_matches_by_suffix() {
    let rules = compile_rules(&[rule("gen", &["**/*.tpl"], "true")]).unwrap();

    assert!(rules[0].matches_path(Path::new("page.tpl")));
    assert!(rules[0].matches_path(Path::new("templates/admin/page.tpl")));
    assert!(!rules[0].matches_path(Path::new("templates/page.html")));
}

#[test]
fn rule_without_patterns_matches_nothing() {
    let rules = compile_rules(&[rule("noop", &[], "true")]).unwrap();
    assert!(!rules[0].matches_path(Path::new("main.go")));
}

#[test]
fn invalid_watch_pattern_is_a_compile_error() {
    assert!(compile_rules(&[rule("bad", &["[unclosed"], "true")]).is_err());
}

#[test]
fn empty_change_set_selects_every_rule_in_order() {
    let rules = compile_rules(&[
        rule("gen", &["**/*.tpl"], "true"),
        rule("compile", &["**/*.go"], "true"),
    ])
    .unwrap();

    let selected = select_rules(&rules, &ChangeSet::new());
    let names: Vec<_> = selected.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["gen", "compile"]);
}

#[test]
fn only_matching_rules_are_selected() {
    let rules = compile_rules(&[
        rule("gen", &["**/*.tpl"], "true"),
        rule("compile", &["**/*.go"], "true"),
    ])
    .unwrap();

    let selected = select_rules(&rules, &changed(&["src/main.go"]));
    let names: Vec<_> = selected.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["compile"]);
}

#[test]
fn declaration_order_is_kept_even_when_later_paths_match_earlier_rules() {
    let rules = compile_rules(&[
        rule("gen", &["**/*.tpl"], "true"),
        rule("compile", &["**/*.go"], "true"),
    ])
    .unwrap();

    // The change set is ordered (BTreeSet), with the .go file sorting before
    // the .tpl file; selection order must still follow rule declaration.
    let selected = select_rules(&rules, &changed(&["a.go", "b.tpl"]));
    let names: Vec<_> = selected.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["gen", "compile"]);
}

#[test]
fn a_rule_is_selected_at_most_once() {
    let rules = compile_rules(&[rule("compile", &["**/*.go"], "true")]).unwrap();

    let selected = select_rules(&rules, &changed(&["a.go", "b.go", "c.go"]));
    assert_eq!(selected.len(), 1);
}

#[test]
fn no_matching_rule_yields_empty_selection() {
    let rules = compile_rules(&[rule("compile", &["**/*.go"], "true")]).unwrap();
    assert!(select_rules(&rules, &changed(&["README.md"])).is_empty());
}

#[test]
fn ignore_patterns_match_like_watch_patterns() {
    let ignore = compile_ignore(&["**/*_test.go".to_string()]).unwrap();

    assert!(ignore.is_ignored(Path::new("pkg/server/server_test.go")));
    assert!(ignore.is_ignored(Path::new("main_test.go")));
    assert!(!ignore.is_ignored(Path::new("pkg/server/server.go")));
}

#[test]
fn empty_ignore_set_ignores_nothing() {
    let ignore = compile_ignore(&[]).unwrap();
    assert!(ignore.is_empty());
    assert!(!ignore.is_ignored(Path::new("main.go")));
}

#[test]
fn walker_prunes_hidden_and_well_known_directories() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    for dir in ["src/nested", ".git/objects", "node_modules/pkg", "vendor", "tmp"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("src/main.go"), "").unwrap();

    let dirs = collect_watch_dirs(root);

    assert!(dirs.contains(&root.to_path_buf()));
    assert!(dirs.contains(&root.join("src")));
    assert!(dirs.contains(&root.join("src/nested")));
    assert_eq!(dirs.len(), 3, "pruned dirs must not be registered: {dirs:?}");
}

#[test]
fn skip_rules_cover_hidden_and_listed_names() {
    assert!(should_skip_dir(".git"));
    assert!(should_skip_dir("node_modules"));
    assert!(should_skip_dir("target"));
    assert!(!should_skip_dir("src"));
    assert!(!should_skip_dir("templates"));
}
