#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{InventoryError, Result};

// Captured source file names, one per logical source
pub const LSHW: &str = "lshw.json";
pub const STORCLI: &str = "storcli.json";
pub const RAID_CONTROLLER: &str = "raid_controller.txt";
pub const RAID_DISKS: &str = "raid_disks.txt";
pub const IP_LINK_JSON: &str = "ip_link.json";
pub const IP_LINK_TEXT: &str = "ip_link.txt";
pub const IP_ADDR_JSON: &str = "ip_addr.json";
pub const IP_ADDR_TEXT: &str = "ip_addr.txt";
pub const ROUTES: &str = "network_routes_all.txt";
pub const NETSTAT: &str = "netstat.txt";
pub const APT_LIST: &str = "apt_list.txt";
pub const YUM_LIST: &str = "yum_list.txt";
pub const CONTAINERS: &str = "docker_ps.json";
pub const VOLUMES: &str = "volumes.txt";
pub const DATE_OF_INVENTORY: &str = "date_of_inventory.txt";
pub const OS_HOSTNAME: &str = "os_hostname.txt";
pub const OS_VERSION: &str = "os_version.txt";
pub const OS_CORE: &str = "os_core.txt";
pub const OS_USERS: &str = "os_users.txt";
pub const OS_SSH_PORT: &str = "os_ssh_port.txt";
pub const OS_SSL_VERSION: &str = "os_ssl_version.txt";
pub const OS_SSH_VERSION: &str = "os_ssh_version.txt";

/// Access to pre-captured command output, addressed by source name.
pub trait SourceReader {
    fn exists(&self, name: &str) -> bool;

    fn read_text(&self, name: &str) -> Result<String>;

    fn lines(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.read_text(name)?.lines().map(str::to_string).collect())
    }

    /// First line without its terminator; empty source gives an empty string.
    fn first_line(&self, name: &str) -> Result<String> {
        Ok(self
            .read_text(name)?
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    fn json<T: DeserializeOwned>(&self, name: &str) -> Result<T>
    where
        Self: Sized,
    {
        let text = self.read_text(name)?;
        serde_json::from_str(&text).map_err(|source| InventoryError::Json {
            name: name.to_string(),
            source,
        })
    }
}

/// Sources stored as files in one directory.
#[derive(Debug, Clone)]
pub struct SourceDir {
    root: PathBuf,
}

impl SourceDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl SourceReader for SourceDir {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn read_text(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => InventoryError::MissingSource(name.to_string()),
            _ => InventoryError::Io { path, source },
        })
    }
}

/// Sources held in memory, keyed by name.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

#[cfg(test)]
impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, content: &str) -> Self {
        self.files.insert(name.to_string(), content.to_string());
        self
    }
}

#[cfg(test)]
impl SourceReader for MemorySource {
    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn read_text(&self, name: &str) -> Result<String> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| InventoryError::MissingSource(name.to_string()))
    }
}
