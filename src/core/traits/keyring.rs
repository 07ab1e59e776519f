use crate::core::errors::Result;
use crate::core::models::key_identity::KeyIdentity;

/// Port for the set of public keys held by a cryptographic context.
///
/// Implementations live in `adapters::cipher` next to the matching
/// `CipherBackend`, since both share the same context state.
pub trait Keyring {
    /// Import key data (ASCII-armored) into the keyring.
    ///
    /// Returns the number of keys that were added.
    fn import(&mut self, data: &[u8]) -> Result<usize>;

    /// List every key in import order.
    fn list(&self) -> Result<Vec<KeyIdentity>>;
}
