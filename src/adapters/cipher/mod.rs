pub mod gpg_backend;
pub mod pgp_backend;

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::models::trust_policy::TrustPolicy;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::keyring::Keyring;

use gpg_backend::GpgContext;
use pgp_backend::PgpContext;

/// A cryptographic context chosen at runtime with `--cipher`.
pub enum AnyContext {
    Pgp(PgpContext),
    Gpg(GpgContext),
}

impl AnyContext {
    /// Create a fresh context for the named backend.
    pub fn open(cipher: &str) -> Result<Self> {
        match cipher {
            "pgp" => Ok(Self::Pgp(PgpContext::new())),
            "gpg" => {
                let ctx = GpgContext::new()?;
                if !ctx.is_available() {
                    return Err(CsvSealError::EncryptionFailed {
                        reason: "GPG is not installed or not found in PATH".into(),
                    });
                }
                Ok(Self::Gpg(ctx))
            }
            other => Err(CsvSealError::InvalidConfig {
                detail: format!("Unknown cipher backend: '{other}'. Use 'pgp' or 'gpg'."),
            }),
        }
    }
}

impl Keyring for AnyContext {
    fn import(&mut self, data: &[u8]) -> Result<usize> {
        match self {
            Self::Pgp(ctx) => ctx.import(data),
            Self::Gpg(ctx) => ctx.import(data),
        }
    }

    fn list(&self) -> Result<Vec<KeyIdentity>> {
        match self {
            Self::Pgp(ctx) => ctx.list(),
            Self::Gpg(ctx) => ctx.list(),
        }
    }
}

impl CipherBackend for AnyContext {
    fn set_armor(&mut self, armor: bool) {
        match self {
            Self::Pgp(ctx) => ctx.set_armor(armor),
            Self::Gpg(ctx) => ctx.set_armor(armor),
        }
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &KeyIdentity,
        trust: TrustPolicy,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Pgp(ctx) => ctx.encrypt(plaintext, recipient, trust),
            Self::Gpg(ctx) => ctx.encrypt(plaintext, recipient, trust),
        }
    }

    fn decrypt(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Pgp(ctx) => ctx.decrypt(ciphertext, secret_key),
            Self::Gpg(ctx) => ctx.decrypt(ciphertext, secret_key),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Pgp(ctx) => ctx.name(),
            Self::Gpg(ctx) => ctx.name(),
        }
    }
}
