use std::{env, fs, path::Path};

use super::{Config, ConfigError, ConfigPaths};
use crate::input::PidExpander;

pub struct ConfigLoader<'a> {
    paths: &'a ConfigPaths,
    expander: PidExpander,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(paths: &'a ConfigPaths, expander: PidExpander) -> Self {
        Self { paths, expander }
    }

    /// Applies the rc file to `config`. Bad lines are skipped and returned
    /// as warnings; only an unreadable file fails the load.
    pub fn load_configs(&self, config: &mut Config) -> Result<Vec<ConfigError>, ConfigError> {
        let path = &self.paths.rc_path;
        if !path.exists() {
            if self.paths.required {
                return Err(ConfigError::ConfigFileNotFound(path.display().to_string()));
            }
            return Ok(Vec::new());
        }
        self.source(path, config)
    }

    fn source(&self, path: &Path, config: &mut Config) -> Result<Vec<ConfigError>, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut warnings = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if let Err(e) = self.process_line(line, config) {
                warnings.push(ConfigError::InvalidLine {
                    line: index + 1,
                    reason: e.to_string(),
                });
            }
        }
        Ok(warnings)
    }

    fn process_line(&self, line: &str, config: &mut Config) -> Result<(), ConfigError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        if let Some(definition) = line.strip_prefix("export ") {
            let export = self.process_env_var(definition)?;
            config.exports.push(export);
            return Ok(());
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::Unrecognized(line.to_string()))?;
        let value = strip_quotes(value.trim());
        match key.trim() {
            "prompt" => config.prompt = value.to_string(),
            "background_null_io" => config.background_null_io = parse_switch(value)?,
            other => return Err(ConfigError::Unrecognized(other.to_string())),
        }
        Ok(())
    }

    fn process_env_var(&self, definition: &str) -> Result<(String, String), ConfigError> {
        let (name, value) = definition
            .split_once('=')
            .ok_or_else(|| ConfigError::Unrecognized(definition.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::Unrecognized(definition.to_string()));
        }

        let value = strip_quotes(value.trim());
        let value = match env::var("HOME") {
            Ok(home) => value.replace("$HOME", &home),
            Err(_) => value.to_string(),
        };
        Ok((name.to_string(), self.expander.expand(&value).into_owned()))
    }
}

fn strip_quotes(value: &str) -> &str {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn parse_switch(value: &str) -> Result<bool, ConfigError> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(ConfigError::Unrecognized(other.to_string())),
    }
}
