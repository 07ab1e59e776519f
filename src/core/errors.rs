use std::path::PathBuf;

use crate::core::models::stage::Stage;

/// All domain errors for csvseal.
///
/// Each variant names the pipeline step that failed so a single
/// line on stderr is enough to diagnose the run.
#[derive(Debug, thiserror::Error)]
pub enum CsvSealError {
    #[error(
        "Failed to open public key file: {path} \
         (use --key <file> or set [files] public_key in csvseal.toml)"
    )]
    KeyFileNotFound { path: PathBuf },

    #[error(
        "Failed to import key: {reason} \
         (expected an ASCII-armored OpenPGP public key block)"
    )]
    KeyImportFailed { reason: String },

    #[error("No keys found in keyring")]
    EmptyKeyring,

    #[error(
        "Failed to retrieve public key: '{query}' not found in keyring \
         (run 'csvseal keys list' to see available keys)"
    )]
    RecipientNotFound { query: String },

    #[error(
        "Recipient key {key_id} is not trusted: {reason} \
         (use --trust always to skip key validation)"
    )]
    UntrustedKey { key_id: String, reason: String },

    #[error("Failed to open CSV file: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Failed to open output file: {path}: {source}")]
    OutputFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("Cannot run step '{step}' at stage {actual} (requires {expected})")]
    StageOrder {
        step: &'static str,
        expected: Stage,
        actual: Stage,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CsvSealError>;
