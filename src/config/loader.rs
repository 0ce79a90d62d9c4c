use crate::config::schema::{PinConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name looked up in the working directory and then the home directory.
pub const CONFIG_FILE_NAME: &str = ".gha-pin.toml";

/// How a config file came to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Named on the command line with `--config`.
    Explicit,
    WorkingDir,
    Home,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigOrigin::Explicit => "passed with --config",
            ConfigOrigin::WorkingDir => "found in the working directory",
            ConfigOrigin::Home => "found in the home directory",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub origin: ConfigOrigin,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>, origin: ConfigOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.origin)
    }
}

/// The config file in effect and its parsed content.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub file: ConfigFile,
    pub config: PinConfig,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {file}")]
    Io {
        file: ConfigFile,
        #[source]
        source: std::io::Error,
    },

    #[error("config{} is not valid TOML", in_file(.file))]
    Toml {
        file: Option<ConfigFile>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid config{}", in_file(.file))]
    Validation {
        file: Option<ConfigFile>,
        #[source]
        source: ValidationError,
    },
}

fn in_file(file: &Option<ConfigFile>) -> String {
    file.as_ref()
        .map(|file| format!(" in {file}"))
        .unwrap_or_default()
}

impl ConfigError {
    /// The file the error came from, once known.
    pub fn file(&self) -> Option<&ConfigFile> {
        match self {
            ConfigError::Io { file, .. } => Some(file),
            ConfigError::Toml { file, .. } | ConfigError::Validation { file, .. } => {
                file.as_ref()
            }
        }
    }

    fn with_file(self, found: &ConfigFile) -> Self {
        match self {
            ConfigError::Toml { file: None, source } => ConfigError::Toml {
                file: Some(found.clone()),
                source,
            },
            ConfigError::Validation { file: None, source } => ConfigError::Validation {
                file: Some(found.clone()),
                source,
            },
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PinConfig, ConfigError> {
    let config: PinConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { file: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { file: None, source })?;
    Ok(config)
}

/// Read and validate a config file.
pub fn load_file(file: &ConfigFile) -> Result<PinConfig, ConfigError> {
    let contents = fs::read_to_string(&file.path).map_err(|source| ConfigError::Io {
        file: file.clone(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_file(file))
}

/// Read a config file named directly by the caller.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PinConfig, ConfigError> {
    load_file(&ConfigFile::new(path.as_ref(), ConfigOrigin::Explicit))
}

/// Places a config file is looked for when none is given explicitly, in order.
pub fn candidate_paths(cwd: Option<&Path>, home: Option<&Path>) -> Vec<ConfigFile> {
    let in_dir = |dir: &Path, origin| ConfigFile::new(dir.join(CONFIG_FILE_NAME), origin);
    cwd.map(|dir| in_dir(dir, ConfigOrigin::WorkingDir))
        .into_iter()
        .chain(home.map(|dir| in_dir(dir, ConfigOrigin::Home)))
        .collect()
}

/// Load the config file in effect.
///
/// An explicit path must exist. Otherwise the first existing candidate from
/// [`candidate_paths`] is loaded, and having none is not an error.
pub fn discover(explicit: Option<&Path>) -> Result<Option<LoadedConfig>, ConfigError> {
    let cwd = std::env::current_dir().ok();
    let home = home::home_dir();
    discover_in(explicit, cwd.as_deref(), home.as_deref())
}

fn discover_in(
    explicit: Option<&Path>,
    cwd: Option<&Path>,
    home: Option<&Path>,
) -> Result<Option<LoadedConfig>, ConfigError> {
    let file = match explicit {
        Some(path) => Some(ConfigFile::new(path, ConfigOrigin::Explicit)),
        None => candidate_paths(cwd, home)
            .into_iter()
            .find(|candidate| candidate.path.is_file()),
    };
    let Some(file) = file else {
        return Ok(None);
    };

    debug!(path = %file.path.display(), origin = %file.origin, "loading config");
    let config = load_file(&file)?;
    Ok(Some(LoadedConfig { file, config }))
}
