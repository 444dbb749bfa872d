// src/config/model.rs

use serde::Deserialize;

/// Default directory for build status files, relative to the project root.
pub const DEFAULT_STATUS_DIR: &str = "tmp/.build-status";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// status_dir = "tmp/.build-status"
/// run_cmd = "./tmp/main"
/// ignore = ["**/*_test.go"]
///
/// [[rule]]
/// name = "gen"
/// watch = ["**/*.tpl"]
/// command = "my-generator"
///
/// [[rule]]
/// name = "compile"
/// watch = ["**/*.go"]
/// command = "go build -o ./tmp/main ."
/// ```
///
/// Rule order is significant: rules run in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Directory where build status files are written.
    #[serde(default = "default_status_dir")]
    pub status_dir: String,

    /// Command that runs the application after a successful build.
    ///
    /// Empty means "builds only, never start an application".
    #[serde(default)]
    pub run_cmd: String,

    /// Patterns that remove a changed path from consideration for *all*
    /// rules, checked before any rule's watch patterns.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Ordered build rules from `[[rule]]`.
    #[serde(default)]
    pub rule: Vec<BuildRule>,
}

fn default_status_dir() -> String {
    DEFAULT_STATUS_DIR.to_string()
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            status_dir: default_status_dir(),
            run_cmd: String::new(),
            ignore: Vec::new(),
            rule: Vec::new(),
        }
    }
}

/// One `[[rule]]` section: a named command guarded by watch patterns.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRule {
    /// Rule name, used in log output.
    pub name: String,

    /// Glob patterns deciding which changed files select this rule.
    ///
    /// Two shapes are supported: a base-name glob (`*.go`) and a
    /// recursive-wildcard-then-extension glob (`**/*.go`), which matches on
    /// the path suffix.
    #[serde(default)]
    pub watch: Vec<String>,

    /// Shell command executed when the rule is selected.
    pub command: String,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` in [`crate::config::validate`];
/// the raw struct is only exposed so tests can build configs directly.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    status_dir: String,
    run_cmd: String,
    ignore: Vec<String>,
    rules: Vec<BuildRule>,
}

impl ConfigFile {
    /// Internal constructor used by the validation layer.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            status_dir: raw.status_dir,
            run_cmd: raw.run_cmd,
            ignore: raw.ignore,
            rules: raw.rule,
        }
    }

    pub fn status_dir(&self) -> &str {
        &self.status_dir
    }

    /// The application run command, or `None` when unset.
    pub fn run_cmd(&self) -> Option<&str> {
        if self.run_cmd.is_empty() {
            None
        } else {
            Some(&self.run_cmd)
        }
    }

    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    /// Build rules in declaration order.
    pub fn rules(&self) -> &[BuildRule] {
        &self.rules
    }

    /// Whether there is anything to watch at all.
    pub fn watching_enabled(&self) -> bool {
        !self.rules.is_empty()
    }
}
