//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` passata esplicitamente ai costruttori
//!   (`CategoryStore`, `UploadPipeline`, `ImageCompressor`, `UrlBuilder`)
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `icons_root`: Directory radice delle icone (default: `icons`)
//! - `max_file_size`: Dimensione massima upload (default: 50 MiB)
//! - `supported_formats`: Estensioni accettate (default: svg, png, ico, webp)
//! - `default_categories`: Categorie create da `init`
//! - `urls`: Generazione URL (CDN jsDelivr o path locale)
//! - `compression`: Qualità per PNG/JPEG/WebP
//! - `server`: Indirizzo di bind dell'API HTTP
//!
//! ## Esempio:
//! ```rust
//! use icon_host::Config;
//!
//! let mut config = Config::default();
//! config.urls.repo_owner = "acme".to_string();
//! config.urls.repo_name = "icons".to_string();
//! config.validate().unwrap();
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 50 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Configuration for the icon host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding one folder per category
    pub icons_root: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_file_size: u64,
    /// Accepted extensions, lower-case, without the dot
    pub supported_formats: Vec<String>,
    /// Categories created by `init`
    pub default_categories: Vec<String>,
    /// Public URL generation
    pub urls: UrlConfig,
    /// Raster compression parameters
    pub compression: CompressionConfig,
    /// HTTP API settings
    pub server: ServerConfig,
}

/// How icon URLs are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlMode {
    /// `<cdn_base>/<owner>/<repo>@<branch>/icons/<category>/<file>`
    Cdn,
    /// `<local_base>/<category>/<file>`
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    pub mode: UrlMode,
    pub cdn_base: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    pub local_base: String,
}

/// Raster compression parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Lower bound handed to pngquant (`--quality min-max`)
    pub png_quality_min: u8,
    /// Upper bound handed to pngquant
    pub png_quality: u8,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// WebP quality (1-100)
    pub webp_quality: u8,
    /// cwebp compression effort (0-6)
    pub webp_method: u8,
    /// Try pngquant/oxipng/mozjpeg/jpegoptim/cwebp before the built-in encoders
    pub use_external_tools: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address for `serve`
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            icons_root: PathBuf::from("icons"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            supported_formats: ["svg", "png", "ico", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_categories: ["social", "ui", "brands", "flags", "custom"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            urls: UrlConfig::default(),
            compression: CompressionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            mode: UrlMode::Cdn,
            cdn_base: "https://cdn.jsdelivr.net/gh".to_string(),
            repo_owner: "dwirx".to_string(),
            repo_name: "my-icons".to_string(),
            branch: "main".to_string(),
            local_base: "/icons".to_string(),
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            png_quality_min: 65,
            png_quality: 80,
            jpeg_quality: 80,
            webp_quality: 80,
            webp_method: 6,
            use_external_tools: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3001".to_string(),
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(anyhow::anyhow!("Maximum file size must be greater than 0"));
        }

        if self.supported_formats.is_empty() {
            return Err(anyhow::anyhow!("At least one supported format is required"));
        }

        if let Some(bad) = self
            .supported_formats
            .iter()
            .find(|f| f.is_empty() || f.starts_with('.') || f.chars().any(|c| c.is_ascii_uppercase()))
        {
            return Err(anyhow::anyhow!(
                "Supported formats must be lower-case extensions without a dot, got {:?}",
                bad
            ));
        }

        self.compression.validate()?;

        if self.urls.mode == UrlMode::Cdn
            && (self.urls.repo_owner.trim().is_empty() || self.urls.repo_name.trim().is_empty())
        {
            return Err(anyhow::anyhow!(
                "Repository owner and name are required for CDN URLs"
            ));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// `icon-host.json` in the working directory, then the user config directory
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from("icon-host.json");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("icon-host").join("config.json"))
            .unwrap_or(local)
    }
}

impl CompressionConfig {
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("PNG quality", self.png_quality),
            ("PNG minimum quality", self.png_quality_min),
            ("JPEG quality", self.jpeg_quality),
            ("WebP quality", self.webp_quality),
        ] {
            if value == 0 || value > 100 {
                return Err(anyhow::anyhow!("{} must be between 1 and 100", label));
            }
        }

        if self.png_quality_min > self.png_quality {
            return Err(anyhow::anyhow!(
                "PNG minimum quality cannot exceed PNG quality"
            ));
        }

        if self.webp_method > 6 {
            return Err(anyhow::anyhow!("WebP method must be between 0 and 6"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.compression.jpeg_quality = 0;
        assert!(config.validate().is_err());

        config.compression.jpeg_quality = 80;
        config.compression.webp_method = 7;
        assert!(config.validate().is_err());

        config.compression.webp_method = 6;
        config.compression.png_quality_min = 90;
        assert!(config.validate().is_err());

        config.compression.png_quality_min = 65;
        config.max_file_size = 0;
        assert!(config.validate().is_err());

        config.max_file_size = DEFAULT_MAX_FILE_SIZE;
        config.supported_formats = vec![".SVG".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cdn_mode_requires_repository() {
        let mut config = Config::default();
        config.urls.repo_owner.clear();
        assert!(config.validate().is_err());

        config.urls.mode = UrlMode::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_file_size, 52_428_800);
        assert_eq!(config.supported_formats, vec!["svg", "png", "ico", "webp"]);
        assert_eq!(config.compression.jpeg_quality, 80);
        assert_eq!(config.urls.branch, "main");
        assert_eq!(config.server.bind, "0.0.0.0:3001");
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut original_config = Config::default();
        original_config.icons_root = PathBuf::from("/srv/icons");
        original_config.urls.mode = UrlMode::Local;
        original_config.compression.webp_quality = 70;

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.icons_root, PathBuf::from("/srv/icons"));
        assert_eq!(loaded_config.urls.mode, UrlMode::Local);
        assert_eq!(loaded_config.compression.webp_quality, 70);
        assert_eq!(loaded_config.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "urls": { "mode": "local" } }"#)
            .await
            .unwrap();

        let loaded = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded.urls.mode, UrlMode::Local);
        assert_eq!(loaded.urls.local_base, "/icons");
        assert_eq!(loaded.compression.jpeg_quality, 80);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::from_file(&temp_dir.path().join("nope.json")).await.unwrap();
        assert_eq!(loaded.icons_root, PathBuf::from("icons"));
    }
}
