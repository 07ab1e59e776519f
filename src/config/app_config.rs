use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::trust_policy::TrustPolicy;

/// Public key file used when nothing else is configured.
pub const DEFAULT_PUBLIC_KEY: &str = "test_public_key.asc";
/// Plaintext CSV used when nothing else is configured.
pub const DEFAULT_INPUT: &str = "dummy_pan_data.csv";
/// Ciphertext destination used when nothing else is configured.
pub const DEFAULT_OUTPUT: &str = "encrypted_dummy_pan_data.pgp";

/// Name of the project-local config file.
pub const CONFIG_FILE_NAME: &str = "csvseal.toml";

/// Top-level configuration read from `csvseal.toml`.
///
/// Every field is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub files: FilesSection,
    #[serde(default)]
    pub encryption: EncryptionSection,
}

/// The `[files]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesSection {
    #[serde(default = "default_public_key")]
    pub public_key: PathBuf,
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            public_key: default_public_key(),
            input: default_input(),
            output: default_output(),
        }
    }
}

/// The `[encryption]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionSection {
    #[serde(default = "default_cipher")]
    pub cipher: String,
    pub recipient: Option<String>,
    #[serde(default)]
    pub trust: TrustPolicy,
    #[serde(default = "default_armor")]
    pub armor: bool,
}

impl Default for EncryptionSection {
    fn default() -> Self {
        Self {
            cipher: default_cipher(),
            recipient: None,
            trust: TrustPolicy::default(),
            armor: default_armor(),
        }
    }
}

fn default_public_key() -> PathBuf {
    PathBuf::from(DEFAULT_PUBLIC_KEY)
}

fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT)
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_cipher() -> String {
    "pgp".into()
}

fn default_armor() -> bool {
    true
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise `./csvseal.toml` is tried,
    /// then `<config dir>/csvseal/config.toml`, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CsvSealError::InvalidConfig {
                    detail: format!("config file not found: {}", path.display()),
                });
            }
            return Self::from_file(path);
        }

        for candidate in Self::search_paths() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    /// Candidate config locations, in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("csvseal").join("config.toml"));
        }
        paths
    }

    /// Parse a config file from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            CsvSealError::InvalidConfig { detail } => CsvSealError::InvalidConfig {
                detail: format!("{}: {detail}", path.display()),
            },
            other => other,
        })
    }

    /// Parse config file contents and validate them.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CsvSealError::InvalidConfig {
            detail: format!("Failed to parse {CONFIG_FILE_NAME}: {e}"),
        })?;

        validate_cipher(&config.encryption.cipher)?;
        Ok(config)
    }
}

/// Check that a cipher name refers to a known backend.
pub fn validate_cipher(name: &str) -> Result<()> {
    match name {
        "pgp" | "gpg" => Ok(()),
        other => Err(CsvSealError::InvalidConfig {
            detail: format!("Unknown cipher backend: '{other}'. Use 'pgp' or 'gpg'."),
        }),
    }
}
