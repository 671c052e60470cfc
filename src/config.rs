//! Run configuration: YAML file merged with command line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

const CONFIG_DIR_NAME: &str = "linux-inventory";
const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InventoryConfig {
    /// Directory holding the captured command output
    pub source_dir: PathBuf,
    pub output: OutputConfig,
    pub classifier: ClassifierConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// File name of the emitted record (shards derive their names from it)
    pub target: String,
    pub to_screen: bool,
    pub to_file: bool,
    /// Split the file output into shards no larger than this many bytes
    pub max_shard_bytes: Option<usize>,
    pub screen_format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target: "inventory_result.json".to_string(),
            to_screen: false,
            to_file: true,
            max_shard_bytes: None,
            screen_format: OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Substrings of system vendor/platform that mark a virtual machine
    pub virtualization_vendors: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            virtualization_vendors: ["kvm", "vmware", "bochs", "qemu", "virtualbox", "xen"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Controller model marker that ties lshw controllers to RAID tool output
    pub raid_vendor_marker: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raid_vendor_marker: "megaraid".to_string(),
        }
    }
}

impl InventoryConfig {
    /// Load from an explicit path, else the per-user config file, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        serde_yaml::from_str(&text)
            .map_err(|e| InventoryError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.target.trim().is_empty() {
            return Err(InventoryError::Config("output target must not be empty".into()));
        }
        if self.output.max_shard_bytes == Some(0) {
            return Err(InventoryError::Config(
                "max_shard_bytes must be greater than zero".into(),
            ));
        }
        if self.storage.raid_vendor_marker.trim().is_empty() {
            return Err(InventoryError::Config(
                "raid_vendor_marker must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
