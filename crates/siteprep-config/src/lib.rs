//! Configuration loading for siteprep.
//! Reads siteprep.toml from the current directory or the path in the
//! SITEPREP_CONFIG env var. Every field has a default, so a missing file is
//! not an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use siteprep_common::{Result, SiteprepError};
use siteprep_molecules::batch::DEFAULT_RESULTS_DIR;
use siteprep_molecules::sitemine::Mode;

pub const CONFIG_ENV_VAR: &str = "SITEPREP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "siteprep.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sitemine: SiteMineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMineConfig {
    pub executable: Option<PathBuf>,
    pub database: Option<PathBuf>,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_threads()     -> u32     { 18 }
fn default_results_dir() -> PathBuf { PathBuf::from(DEFAULT_RESULTS_DIR) }

impl Default for SiteMineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            database: None,
            threads: default_threads(),
            mode: Mode::default(),
            results_dir: default_results_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub prepared_receptors_dir: Option<PathBuf>,
    pub prepared_edfs_dir: Option<PathBuf>,
}


impl Config {
    /// Load configuration from siteprep.toml.
    /// Checks SITEPREP_CONFIG env var first, then current directory.
    /// A file named by the env var must exist; the default file may not.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiteprepError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| SiteprepError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.sitemine.threads == 0 {
            return Err(SiteprepError::Config("sitemine.threads must be at least 1".to_string()));
        }
        Ok(config)
    }
}
