use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::adapters::cipher::AnyContext;
use crate::cli::EncryptArgs;
use crate::cli::output;
use crate::config::app_config::{AppConfig, validate_cipher};
use crate::core::errors::Result;
use crate::core::models::trust_policy::TrustPolicy;
use crate::core::services::encryption_service::EncryptionService;
use crate::core::traits::cipher::CryptoContext;

/// Everything an encryption run needs, after flags and config are merged.
#[derive(Debug, Clone)]
pub struct EncryptSettings {
    pub cipher: String,
    pub key: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub recipient: Option<String>,
    pub trust: TrustPolicy,
    pub armor: bool,
}

impl EncryptSettings {
    /// Merge command-line flags over the config file.
    pub fn resolve(args: &EncryptArgs, cipher: Option<&str>, config: &AppConfig) -> Result<Self> {
        let cipher = cipher.unwrap_or(&config.encryption.cipher).to_string();
        validate_cipher(&cipher)?;

        Ok(Self {
            cipher,
            key: args.key.clone().unwrap_or_else(|| config.files.public_key.clone()),
            input: args.input.clone().unwrap_or_else(|| config.files.input.clone()),
            output: args.output.clone().unwrap_or_else(|| config.files.output.clone()),
            recipient: args
                .recipient
                .clone()
                .or_else(|| config.encryption.recipient.clone()),
            trust: args.trust.unwrap_or(config.encryption.trust),
            armor: config.encryption.armor && !args.binary,
        })
    }
}

/// Execute the `csvseal encrypt` command (also the default command).
///
/// Imports the public key, picks the recipient, encrypts the CSV file
/// in memory and writes the ciphertext.
pub fn execute(args: &EncryptArgs, cipher: Option<&str>, config: &AppConfig) -> Result<()> {
    let settings = EncryptSettings::resolve(args, cipher, config)?;
    let context = AnyContext::open(&settings.cipher)?;
    encrypt_with(context, &settings)
}

/// Run the encryption pipeline on a given context.
fn encrypt_with<C: CryptoContext>(mut context: C, settings: &EncryptSettings) -> Result<()> {
    context.set_armor(settings.armor);
    let mut service = EncryptionService::new(context, settings.trust);
    let cipher_name = service.context().name().to_string();

    output::detail(&format!("Backend: {cipher_name}"));
    output::detail(&format!("Public key: {}", settings.key.display()));

    let count = service.import_key(&settings.key)?;
    output::detail(&format!("Imported {count} key(s) [{}]", service.stage()));

    let choice = service.resolve_recipient(settings.recipient.as_deref())?;
    if choice.candidates > 1 && settings.recipient.is_none() {
        output::warning(&format!(
            "Keyring holds {} keys; encrypting to the first one ({}). \
             Use --recipient to choose.",
            choice.candidates, choice.identity
        ));
    }
    output::detail(&format!(
        "Recipient: {} [{}]",
        choice.identity,
        service.stage()
    ));
    if !choice.identity.can_encrypt {
        output::warning(&format!(
            "Key {} does not advertise an encryption key",
            choice.identity.key_id
        ));
    }

    output::detail(&format!("Source: {}", settings.input.display()));
    let sp = output::spinner(&format!(
        "Encrypting {} with {cipher_name} (trust: {})...",
        settings.input.display(),
        settings.trust
    ));
    let report = match service.encrypt_file(&settings.input, &settings.output) {
        Ok(report) => report,
        Err(e) => {
            output::abandon_spinner(sp);
            return Err(e);
        }
    };
    output::finish_spinner(
        sp,
        &format!(
            "Encrypted {} bytes for {}",
            report.plaintext_len, report.recipient.key_id
        ),
    );

    output::detail(&format!(
        "Wrote {} bytes [{}]",
        report.ciphertext_len,
        service.stage()
    ));
    if let Some(hash) = compute_file_hash(&report.output) {
        output::detail(&format!("SHA-256: {hash}"));
    }

    println!("CSV file encrypted and saved to {}", report.output.display());
    Ok(())
}

/// SHA-256 hex digest of a file, or `None` if it cannot be read.
pub fn compute_file_hash(path: &Path) -> Option<String> {
    let data = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Some(format!("{:x}", hasher.finalize()))
}
