//! Run configuration persisted as `<dir>/config/config.yml`.
//!
//! The file is owned by the whole pipeline; each reader keeps its state
//! under its own name. Only the four reader keys (`all_replicates`,
//! `analysis_design`, `levels`, `level_names`) are ever written here, and
//! everything else in the file is carried through untouched.

use crate::design::hierarchy::AnalysisDesign;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_DIR: &str = "config";
pub const CONFIG_FILE: &str = "config.yml";
pub const CONFIG_TMP_FILE: &str = "config_tmp.yml";

const READER_KEYS: [&str; 4] = ["all_replicates", "analysis_design", "levels", "level_names"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value provided for yaml file: {0}")]
    InvalidSource(String),

    #[error("Configuration in {} is not a mapping", .0.display())]
    NotAMapping(PathBuf),

    #[error("Section '{0}' of the configuration is not a mapping")]
    SectionNotAMapping(String),
}

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// Start from an empty configuration.
    Default,
    /// The directory's own `config/config.yml`, or empty if there is none.
    #[default]
    File,
    /// An explicit `.yml`/`.yaml` file.
    Path(PathBuf),
}

impl FromStr for ConfigSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "default" => Ok(ConfigSource::Default),
            "file" => Ok(ConfigSource::File),
            _ if lower.ends_with(".yml") || lower.ends_with(".yaml") => {
                Ok(ConfigSource::Path(PathBuf::from(s)))
            }
            _ => Err(ConfigError::InvalidSource(s.to_string())),
        }
    }
}

/// Human label of one design level. Fresh configurations use the level
/// index; users may replace it with a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelName {
    Index(usize),
    Label(String),
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelName::Index(i) => write!(f, "{}", i),
            LevelName::Label(s) => write!(f, "{}", s),
        }
    }
}

/// The per-reader part of the run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_replicates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_design: Option<AnalysisDesign>,
    #[serde(default)]
    pub levels: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub level_names: Vec<LevelName>,
}

pub fn default_level_names(levels: usize) -> Vec<LevelName> {
    (0..levels).map(LevelName::Index).collect()
}

impl ReaderConfig {
    /// Forget the stored design so the next read infers it again.
    pub fn clear(&mut self) {
        *self = ReaderConfig::default();
    }

    /// Record a freshly inferred design. Values already present are kept;
    /// a mismatch with the inferred ones is only reported.
    pub fn update_from(&mut self, sample_names: &[String], design: &AnalysisDesign) {
        if self.all_replicates.is_empty() {
            self.all_replicates = sample_names.to_vec();
        } else if self.all_replicates != sample_names {
            warn!(
                "Stored all_replicates ({} samples) differ from the {} samples found in the data; keeping the stored list",
                self.all_replicates.len(),
                sample_names.len()
            );
        }

        match &self.analysis_design {
            None => {
                self.analysis_design = Some(design.clone());
                self.levels = design.depth();
                self.level_names = default_level_names(self.levels);
            }
            Some(stored) if stored != design => {
                warn!("Stored analysis_design differs from the design inferred from the data; keeping the stored design");
            }
            Some(_) => {}
        }

        if self.level_names.len() < self.levels {
            let start = self.level_names.len();
            self.level_names
                .extend((start..self.levels).map(LevelName::Index));
        }
    }

    /// Label of a level, falling back to its index.
    pub fn level_name(&self, level: usize) -> String {
        self.level_names
            .get(level)
            .map(ToString::to_string)
            .unwrap_or_else(|| level.to_string())
    }
}

/// The whole run configuration of one data directory.
#[derive(Debug, Clone)]
pub struct RunConfig {
    start_dir: PathBuf,
    values: Mapping,
}

impl RunConfig {
    /// An empty configuration for `start_dir`.
    pub fn empty(start_dir: &Path) -> Self {
        RunConfig {
            start_dir: start_dir.to_path_buf(),
            values: Mapping::new(),
        }
    }

    /// Load the configuration for `start_dir` from `source`.
    pub fn load(start_dir: &Path, source: &ConfigSource) -> Result<Self, ConfigError> {
        let mut config = RunConfig::empty(start_dir);
        let path = match source {
            ConfigSource::Default => {
                debug!("Using an empty default configuration");
                return Ok(config);
            }
            ConfigSource::File => {
                let own = config.config_path();
                if !own.is_file() {
                    debug!("No {} found, using an empty configuration", own.display());
                    return Ok(config);
                }
                own
            }
            ConfigSource::Path(p) => p.clone(),
        };

        info!("Loading yml file {}", path.display());
        let text = fs::read_to_string(&path)?;
        config.values = match serde_yaml::from_str::<Value>(&text)? {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => return Err(ConfigError::NotAMapping(path)),
        };
        debug!("Config file contents: {:?}", config.values);
        Ok(config)
    }

    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    /// Location the configuration is saved to.
    pub fn config_path(&self) -> PathBuf {
        self.start_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Raw access to a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The stored state of reader `name`; empty if there is none.
    pub fn reader_config(&self, name: &str) -> Result<ReaderConfig, ConfigError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(ReaderConfig::default()),
            Some(section @ Value::Mapping(_)) => Ok(serde_yaml::from_value(section.clone())?),
            Some(_) => Err(ConfigError::SectionNotAMapping(name.to_string())),
        }
    }

    /// Store the state of reader `name`, leaving its other keys alone.
    pub fn set_reader_config(&mut self, name: &str, reader_config: &ReaderConfig) -> Result<(), ConfigError> {
        let serialized = match serde_yaml::to_value(reader_config)? {
            Value::Mapping(m) => m,
            _ => Mapping::new(),
        };

        let key = Value::from(name);
        if !matches!(self.values.get(name), Some(Value::Mapping(_))) {
            self.values.insert(key.clone(), Value::Mapping(Mapping::new()));
        }
        let section = match self.values.get_mut(name) {
            Some(Value::Mapping(m)) => m,
            _ => return Err(ConfigError::SectionNotAMapping(name.to_string())),
        };

        for k in READER_KEYS {
            match serialized.get(k) {
                Some(v) => {
                    section.insert(Value::from(k), v.clone());
                }
                None => {
                    section.remove(k);
                }
            }
        }
        Ok(())
    }

    /// Write to `config/config.yml` through a temporary file.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let dir = self.start_dir.join(CONFIG_DIR);
        fs::create_dir_all(&dir)?;
        let tmp = dir.join(CONFIG_TMP_FILE);
        let target = dir.join(CONFIG_FILE);

        debug!("Updating yml settings file");
        fs::write(&tmp, serde_yaml::to_string(&self.values)?)?;
        if target.exists() {
            fs::remove_file(&target)?;
        }
        fs::rename(&tmp, &target)?;
        Ok(target)
    }
}
