// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

use crate::config::BuildRule;
use crate::engine::ChangeSet;

/// One compiled watch pattern.
///
/// Two shapes are recognised, matching the configured pattern language:
/// - any glob, matched against the path's base name (`*.go` vs `main.go`);
/// - a recursive-wildcard-then-extension glob (`**/*.go`), which
///   additionally matches when the path's suffix equals the extension part.
#[derive(Debug, Clone)]
struct WatchPattern {
    base: GlobMatcher,
    suffix: Option<String>,
}

impl WatchPattern {
    fn compile(pattern: &str) -> Result<Self> {
        let base = Glob::new(pattern)
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();

        let suffix = pattern
            .strip_prefix("**/*")
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self { base, suffix })
    }

    fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name() {
            if self.base.is_match(Path::new(name)) {
                return true;
            }
        }

        if let Some(suffix) = &self.suffix {
            if path.to_string_lossy().ends_with(suffix.as_str()) {
                return true;
            }
        }

        false
    }
}

/// A build rule with its watch patterns compiled.
///
/// Matchers keep the declaration order of their source rules; the
/// orchestrator runs selected rules in exactly that order.
#[derive(Clone)]
pub struct RuleMatcher {
    name: String,
    command: String,
    patterns: Vec<WatchPattern>,
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleMatcher")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RuleMatcher {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether any of this rule's watch patterns matches the given path.
    pub fn matches_path(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Compile every rule's watch patterns, preserving declaration order.
pub fn compile_rules(rules: &[BuildRule]) -> Result<Vec<RuleMatcher>> {
    let mut matchers = Vec::with_capacity(rules.len());

    for rule in rules {
        let patterns = rule
            .watch
            .iter()
            .map(|p| WatchPattern::compile(p))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("compiling watch patterns for rule '{}'", rule.name))?;

        matchers.push(RuleMatcher {
            name: rule.name.clone(),
            command: rule.command.clone(),
            patterns,
        });
    }

    Ok(matchers)
}

/// Compiled global ignore list.
///
/// Checked before any rule's positive match; an ignored path is removed from
/// all rules' consideration.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<WatchPattern>,
}

impl IgnoreSet {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

pub fn compile_ignore(patterns: &[String]) -> Result<IgnoreSet> {
    let patterns = patterns
        .iter()
        .map(|p| WatchPattern::compile(p))
        .collect::<Result<Vec<_>>>()
        .context("compiling ignore patterns")?;

    Ok(IgnoreSet { patterns })
}

/// Whether any rule is interested in the given path at all.
pub fn any_rule_matches(rules: &[RuleMatcher], path: &Path) -> bool {
    rules.iter().any(|r| r.matches_path(path))
}

/// Determine which rules apply to a change set, in declaration order.
///
/// An empty change set is the startup case and selects every rule. A rule is
/// selected at most once regardless of how many changed paths matched it.
pub fn select_rules<'a>(rules: &'a [RuleMatcher], changed: &ChangeSet) -> Vec<&'a RuleMatcher> {
    if changed.is_empty() {
        return rules.iter().collect();
    }

    rules
        .iter()
        .filter(|rule| changed.iter().any(|path| rule.matches_path(path)))
        .collect()
}
