// src/config/validate.rs

use std::collections::HashSet;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_status_dir(cfg)?;
    validate_rules(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_status_dir(cfg: &RawConfigFile) -> Result<()> {
    if cfg.status_dir.trim().is_empty() {
        return Err(DevwatchError::ConfigError(
            "status_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_rules(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();

    for rule in cfg.rule.iter() {
        if rule.name.trim().is_empty() {
            return Err(DevwatchError::ConfigError(
                "every [[rule]] must have a non-empty name".to_string(),
            ));
        }
        if !seen.insert(rule.name.as_str()) {
            return Err(DevwatchError::ConfigError(format!(
                "duplicate rule name '{}'",
                rule.name
            )));
        }
        if rule.command.trim().is_empty() {
            return Err(DevwatchError::ConfigError(format!(
                "rule '{}' has an empty command",
                rule.name
            )));
        }
    }

    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    for rule in cfg.rule.iter() {
        for pattern in rule.watch.iter() {
            Glob::new(pattern).map_err(|err| {
                DevwatchError::ConfigError(format!(
                    "rule '{}' has invalid watch pattern '{}': {}",
                    rule.name, pattern, err
                ))
            })?;
        }
    }

    for pattern in cfg.ignore.iter() {
        Glob::new(pattern).map_err(|err| {
            DevwatchError::ConfigError(format!(
                "invalid ignore pattern '{}': {}",
                pattern, err
            ))
        })?;
    }

    Ok(())
}
