use crate::core::errors::Result;
use crate::core::models::key_identity::KeyIdentity;
use crate::core::models::trust_policy::TrustPolicy;

/// Port for encryption/decryption backends.
///
/// Implementations live in `adapters::cipher` (e.g. PgpContext, GpgContext).
/// The core layer only depends on this trait, never on a concrete backend.
pub trait CipherBackend {
    /// Toggle ASCII-armored output for `encrypt`.
    fn set_armor(&mut self, armor: bool);

    /// Encrypt plaintext to a single recipient from this context's keyring.
    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &KeyIdentity,
        trust: TrustPolicy,
    ) -> Result<Vec<u8>>;

    /// Decrypt ciphertext with an armored secret key (no passphrase).
    fn decrypt(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>>;

    /// Human-readable name of this backend (e.g. "pgp", "gpg").
    fn name(&self) -> &str;
}

/// A full cryptographic context: keyring state plus cipher operations.
pub trait CryptoContext: super::keyring::Keyring + CipherBackend {}

impl<T: super::keyring::Keyring + CipherBackend> CryptoContext for T {}
