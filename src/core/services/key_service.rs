use std::path::Path;

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::traits::keyring::Keyring;

/// The recipient picked from a keyring, plus how many keys were eligible.
#[derive(Debug, Clone)]
pub struct RecipientChoice {
    pub identity: KeyIdentity,
    /// Number of keys that matched the selection (the whole keyring
    /// when no query was given). More than one means the choice was
    /// made by position only.
    pub candidates: usize,
}

/// Loads key files into a `Keyring` and picks recipients from it.
pub struct KeyService<K: Keyring> {
    pub keyring: K,
}

impl<K: Keyring> KeyService<K> {
    /// Read a key file and import its contents.
    ///
    /// Returns the number of keys added to the keyring.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let data = std::fs::read(path).map_err(|_| CsvSealError::KeyFileNotFound {
            path: path.to_path_buf(),
        })?;
        self.keyring.import(&data)
    }

    /// List all keys in the keyring.
    pub fn list_keys(&self) -> Result<Vec<KeyIdentity>> {
        self.keyring.list()
    }

    /// Pick the recipient for an encryption.
    ///
    /// Without a query the first key in the keyring wins. With a query
    /// the first key matching it wins (see `KeyIdentity::matches`).
    pub fn select_recipient(&self, query: Option<&str>) -> Result<RecipientChoice> {
        let keys = self.keyring.list()?;
        if keys.is_empty() {
            return Err(CsvSealError::EmptyKeyring);
        }

        let mut matching: Vec<KeyIdentity> = match query {
            Some(q) => keys.into_iter().filter(|k| k.matches(q)).collect(),
            None => keys,
        };

        if matching.is_empty() {
            return Err(CsvSealError::RecipientNotFound {
                query: query.unwrap_or_default().to_string(),
            });
        }

        let candidates = matching.len();
        Ok(RecipientChoice {
            identity: matching.remove(0),
            candidates,
        })
    }
}
