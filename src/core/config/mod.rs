use std::{env, fmt};

mod loader;
mod paths;

pub use loader::ConfigLoader;
pub use paths::ConfigPaths;

use crate::input::PidExpander;

pub const DEFAULT_PROMPT: &str = ": ";

pub struct Config {
    paths: ConfigPaths,
    prompt: String,
    background_null_io: bool,
    exports: Vec<(String, String)>,
}

impl Config {
    pub fn new(paths: ConfigPaths) -> Self {
        Config {
            paths,
            prompt: DEFAULT_PROMPT.to_string(),
            background_null_io: true,
            exports: Vec::new(),
        }
    }

    /// Reads the rc file. Returns the per-line warnings.
    pub fn load(&mut self, expander: PidExpander) -> Result<Vec<ConfigError>, ConfigError> {
        let paths = self.paths.clone();
        let loader = ConfigLoader::new(&paths, expander);
        loader.load_configs(self)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn background_null_io(&self) -> bool {
        self.background_null_io
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// `export` lines from the rc file, in file order.
    pub fn exports(&self) -> &[(String, String)] {
        &self.exports
    }

    /// Copies the exports into the process environment, where children
    /// inherit them. Call before any other thread or child exists.
    pub fn apply_exports(&self) {
        for (name, value) in &self.exports {
            env::set_var(name, value);
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    HomeDirNotFound,
    ConfigFileNotFound(String),
    Unrecognized(String),
    InvalidLine { line: usize, reason: String },
    IoError(std::io::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::HomeDirNotFound => write!(f, "Home directory not found"),
            ConfigError::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::Unrecognized(what) => write!(f, "unrecognized setting: {}", what),
            ConfigError::InvalidLine { line, reason } => write!(f, "line {}: {}", line, reason),
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
