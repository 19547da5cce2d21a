//! Layered settings for the studio
//!
//! Settings are loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `FORGE_PROVIDER`, `FORGE_GEMINI_API_KEY`,
//!    `FORGE_COMFYUI_ADDRESS`
//! 2. Project-local: `.forge/config.toml`
//! 3. Global: `~/.forge/config.toml`

use forge_core::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The generation backend the studio talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Comfyui,
    Mock,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Comfyui => write!(f, "comfyui"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini" => Ok(ProviderKind::Gemini),
            "comfyui" => Ok(ProviderKind::Comfyui),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(ForgeError::ConfigError(format!(
                "Unknown provider '{}'. Available: gemini, comfyui, mock",
                s
            ))),
        }
    }
}

/// Per-provider connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key for hosted providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Server address for local providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Override for the API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StudioSection {
    #[serde(default)]
    provider: ProviderKind,
}

/// On-disk config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConfigFile {
    #[serde(default)]
    studio: StudioSection,
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
}

/// Resolved settings with environment overrides applied.
///
/// One global record: the chosen provider plus the credential/address of
/// each backend.
#[derive(Debug, Clone, Default)]
pub struct StudioConfig {
    pub provider: ProviderKind,
    pub providers: HashMap<String, ProviderConfig>,
}

impl StudioConfig {
    /// Load settings with layered precedence: global < project-local < env vars
    pub fn load() -> Result<Self> {
        let mut file = StudioConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                Self::merge_into(&mut file, Self::load_file(&global_path)?);
            }
        }

        let local_path = Self::local_config_path();
        if local_path.exists() {
            Self::merge_into(&mut file, Self::load_file(&local_path)?);
        }

        let mut config = Self {
            provider: file.studio.provider,
            providers: file.providers,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load settings from one file only (for testing)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_raw(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load one file without environment overrides, so edits can be
    /// written back without baking env values into the file
    pub fn load_raw(path: &Path) -> Result<Self> {
        let file = Self::load_file(path)?;
        Ok(Self {
            provider: file.studio.provider,
            providers: file.providers,
        })
    }

    /// Write the settings to a config file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StudioConfigFile {
            studio: StudioSection {
                provider: self.provider,
            },
            providers: self.providers.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| ForgeError::ConfigError(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key for a provider
    pub fn api_key(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.is_empty())
    }

    /// Get the server address for a provider
    pub fn address(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.address.as_deref())
            .filter(|a| !a.is_empty())
    }

    /// Get the API base URL override for a provider
    pub fn api_url(&self, provider_name: &str) -> Option<&str> {
        self.providers
            .get(provider_name)
            .and_then(|p| p.api_url.as_deref())
    }

    /// Set the API key for a provider
    pub fn set_api_key(&mut self, provider_name: &str, key: impl Into<String>) {
        self.providers
            .entry(provider_name.to_string())
            .or_default()
            .api_key = Some(key.into());
    }

    /// Set the server address for a provider
    pub fn set_address(&mut self, provider_name: &str, address: impl Into<String>) {
        self.providers
            .entry(provider_name.to_string())
            .or_default()
            .address = Some(address.into());
    }

    /// Project-local config path (`.forge/config.toml`)
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".forge/config.toml")
    }

    /// Global config path (`~/.forge/config.toml`)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".forge").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<StudioConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ForgeError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn merge_into(base: &mut StudioConfigFile, overlay: StudioConfigFile) {
        base.studio.provider = overlay.studio.provider;
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_key.is_some() {
                entry.api_key = provider.api_key;
            }
            if provider.address.is_some() {
                entry.address = provider.address;
            }
            if provider.api_url.is_some() {
                entry.api_url = provider.api_url;
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("FORGE_PROVIDER") {
            if let Ok(kind) = provider.parse() {
                self.provider = kind;
            }
        }
        if let Ok(key) = std::env::var("FORGE_GEMINI_API_KEY") {
            self.set_api_key("gemini", key);
        }
        if let Ok(address) = std::env::var("FORGE_COMFYUI_ADDRESS") {
            self.set_address("comfyui", address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("forge_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_config_from_file() {
        std::env::remove_var("FORGE_PROVIDER");
        std::env::remove_var("FORGE_GEMINI_API_KEY");

        let config_str = r#"
[studio]
provider = "comfyui"

[providers.gemini]
api_key = "test-key-123"

[providers.comfyui]
address = "http://192.168.1.20:8188"
"#;
        let path = temp_config(config_str);
        let config = StudioConfig::load_from_file(&path).unwrap();

        assert_eq!(config.provider, ProviderKind::Comfyui);
        assert_eq!(config.api_key("gemini"), Some("test-key-123"));
        assert_eq!(config.address("comfyui"), Some("http://192.168.1.20:8188"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_env_var_override() {
        let path = temp_config(
            r#"
[providers.gemini]
api_key = "file-key"
"#,
        );

        std::env::set_var("FORGE_GEMINI_API_KEY", "env-key-override");
        let config = StudioConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_key("gemini"), Some("env-key-override"));
        std::env::remove_var("FORGE_GEMINI_API_KEY");

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_empty_api_key_treated_as_missing() {
        let path = temp_config(
            r#"
[providers.gemini]
api_key = ""
"#,
        );
        std::env::remove_var("FORGE_GEMINI_API_KEY");
        let config = StudioConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api_key("gemini"), None);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = std::env::temp_dir().join(format!("forge_config_test_{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        std::env::remove_var("FORGE_PROVIDER");
        std::env::remove_var("FORGE_GEMINI_API_KEY");
        std::env::remove_var("FORGE_COMFYUI_ADDRESS");

        let mut config = StudioConfig {
            provider: ProviderKind::Mock,
            providers: HashMap::new(),
        };
        config.set_api_key("gemini", "abc");
        config.set_address("comfyui", "http://localhost:8188");
        config.save_to_file(&path).unwrap();

        let loaded = StudioConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.provider, ProviderKind::Mock);
        assert_eq!(loaded.api_key("gemini"), Some("abc"));
        assert_eq!(loaded.address("comfyui"), Some("http://localhost:8188"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("mock".parse::<ProviderKind>().unwrap(), ProviderKind::Mock);
        assert!("dalle".parse::<ProviderKind>().is_err());
    }
}
