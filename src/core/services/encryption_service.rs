use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::models::stage::Stage;
use crate::core::models::trust_policy::TrustPolicy;
use crate::core::services::key_service::{KeyService, RecipientChoice};
use crate::core::traits::cipher::{CipherBackend, CryptoContext};

/// Size of the chunks the ciphertext is flushed to disk in.
pub const CHUNK_SIZE: usize = 512;

/// Summary of a finished encryption run.
#[derive(Debug, Clone)]
pub struct EncryptionReport {
    pub recipient: KeyIdentity,
    pub plaintext_len: usize,
    pub ciphertext_len: usize,
    pub output: PathBuf,
}

/// Drives one encryption run through the linear pipeline:
/// import key → resolve recipient → encrypt → write.
///
/// Each step checks that the previous one completed. A failed step
/// leaves the stage where it was; the run is expected to be abandoned.
pub struct EncryptionService<C: CryptoContext> {
    keys: KeyService<C>,
    trust: TrustPolicy,
    stage: Stage,
    recipient: Option<KeyIdentity>,
}

impl<C: CryptoContext> EncryptionService<C> {
    pub fn new(context: C, trust: TrustPolicy) -> Self {
        Self {
            keys: KeyService { keyring: context },
            trust,
            stage: Stage::Uninitialized,
            recipient: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn context(&self) -> &C {
        &self.keys.keyring
    }

    fn require(&self, step: &'static str, expected: Stage) -> Result<()> {
        if self.stage != expected {
            return Err(CsvSealError::StageOrder {
                step,
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
    }

    /// Import the public key file into the context's keyring.
    pub fn import_key(&mut self, path: &Path) -> Result<usize> {
        self.require("import key", Stage::Uninitialized)?;
        let count = self.keys.import_file(path)?;
        self.advance();
        Ok(count)
    }

    /// Pick the recipient, either the first key or the one matching `query`.
    pub fn resolve_recipient(&mut self, query: Option<&str>) -> Result<RecipientChoice> {
        self.require("resolve recipient", Stage::KeyImported)?;
        let choice = self.keys.select_recipient(query)?;
        self.recipient = Some(choice.identity.clone());
        self.advance();
        Ok(choice)
    }

    /// Read `input` into memory, encrypt it to the resolved recipient and
    /// write the ciphertext to `output`.
    ///
    /// `output` is only created once encryption has succeeded.
    pub fn encrypt_file(&mut self, input: &Path, output: &Path) -> Result<EncryptionReport> {
        self.require("encrypt", Stage::RecipientResolved)?;
        let recipient = self.recipient.clone().ok_or(CsvSealError::StageOrder {
            step: "encrypt",
            expected: Stage::RecipientResolved,
            actual: self.stage,
        })?;

        let plaintext = std::fs::read(input).map_err(|_| CsvSealError::InputNotFound {
            path: input.to_path_buf(),
        })?;

        let ciphertext = self
            .keys
            .keyring
            .encrypt(&plaintext, &recipient, self.trust)?;
        self.advance();

        write_chunked(&ciphertext, output)?;
        self.advance();

        Ok(EncryptionReport {
            recipient,
            plaintext_len: plaintext.len(),
            ciphertext_len: ciphertext.len(),
            output: output.to_path_buf(),
        })
    }
}

/// Write `data` to `path` in `CHUNK_SIZE` pieces, truncating any
/// existing file.
pub fn write_chunked(data: &[u8], path: &Path) -> Result<()> {
    let output_failed = |source| CsvSealError::OutputFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(output_failed)?;
    for chunk in data.chunks(CHUNK_SIZE) {
        file.write_all(chunk).map_err(output_failed)?;
    }
    file.flush().map_err(output_failed)?;
    Ok(())
}

/// Decrypt the message stored at `input` with the secret key at `secret_key`.
pub fn decrypt_file<C: CipherBackend>(cipher: &C, input: &Path, secret_key: &Path) -> Result<Vec<u8>> {
    let key_data = std::fs::read(secret_key).map_err(|_| CsvSealError::KeyFileNotFound {
        path: secret_key.to_path_buf(),
    })?;
    let ciphertext = std::fs::read(input).map_err(|_| CsvSealError::InputNotFound {
        path: input.to_path_buf(),
    })?;
    cipher.decrypt(&ciphertext, &key_data)
}
