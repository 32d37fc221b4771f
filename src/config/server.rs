use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "promokit.toml";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://promo.example.com").
    pub public_base_url: Option<String>,
    /// Largest CSV upload accepted by the import endpoints.
    pub max_upload_bytes: usize,
    /// Currency label used when campaign plans render money.
    pub currency: String,
}

/// Values read from `promokit.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub max_upload_bytes: Option<usize>,
    pub currency: Option<String>,
}

impl FileConfig {
    /// Loads `promokit.toml` from the data directory, if present.
    pub fn load(data_dir: &Path) -> Result<Option<Self>> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)?;
        let parsed = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(Some(parsed))
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("promokit.db")
    }

    /// Layers file values over the current ones.
    #[must_use]
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if file.public_base_url.is_some() {
            self.public_base_url = file.public_base_url;
        }
        if let Some(max) = file.max_upload_bytes {
            self.max_upload_bytes = max;
        }
        if let Some(currency) = file.currency {
            self.currency = currency;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Config("currency cannot be empty".into()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            currency: "KSh".to_string(),
        }
    }
}
