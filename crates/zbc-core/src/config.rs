use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Zotero main directory, the parent of the storage tree.
    pub vault_root: String,
    /// Name of the attachment storage directory under the vault root.
    /// Should always be "storage" but can be changed for testing.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    /// Name of the backup tree under the vault root.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    /// Ghostscript install directory, checked when the executable is not on
    /// the PATH.
    #[serde(default)]
    pub ghostscript_dir: Option<String>,
}

fn default_storage_dir() -> String {
    "storage".to_string()
}

fn default_backup_dir() -> String {
    "compression_backups".to_string()
}

impl AppConfig {
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.vault_root).join(&self.storage_dir)
    }

    pub fn backup_path(&self) -> PathBuf {
        PathBuf::from(&self.vault_root).join(&self.backup_dir)
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("ZBC"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
