use serde::Serialize;

/// A public key known to a keyring, as seen by the rest of the crate.
///
/// Backends own the actual key material; everything above the adapter
/// layer refers to a key through this identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyIdentity {
    /// Primary key ID, 16 upper-case hex digits.
    pub key_id: String,
    /// Primary key fingerprint, upper-case hex.
    pub fingerprint: String,
    pub user_ids: Vec<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Whether the primary key or any subkey can encrypt.
    pub can_encrypt: bool,
}

impl KeyIdentity {
    /// Last 8 hex digits of the key ID.
    pub fn short_id(&self) -> &str {
        let len = self.key_id.len();
        &self.key_id[len.saturating_sub(8)..]
    }

    /// Check whether a recipient query designates this key.
    ///
    /// Hex queries are compared against the key ID, short key ID and
    /// fingerprint (case-insensitive, optional `0x` prefix). Anything
    /// else is matched as a substring of the user IDs.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }

        let hex = query
            .strip_prefix("0x")
            .or_else(|| query.strip_prefix("0X"))
            .unwrap_or(query)
            .replace(' ', "")
            .to_ascii_uppercase();

        if hex == self.key_id || hex == self.short_id() || hex == self.fingerprint {
            return true;
        }

        let needle = query.to_lowercase();
        self.user_ids
            .iter()
            .any(|uid| uid.to_lowercase().contains(&needle))
    }
}

impl std::fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.user_ids.first() {
            Some(uid) => write!(f, "{} ({})", self.key_id, uid),
            None => write!(f, "{}", self.key_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> KeyIdentity {
        KeyIdentity {
            key_id: "69C42450E7ED29B0".into(),
            fingerprint: "8E588714101FB4F6579A2DFD69C42450E7ED29B0".into(),
            user_ids: vec!["Alice Example <alice@example.com>".into()],
            created_at: None,
            can_encrypt: true,
        }
    }

    #[test]
    fn matches_key_id_any_case() {
        let key = alice();
        assert!(key.matches("69C42450E7ED29B0"));
        assert!(key.matches("69c42450e7ed29b0"));
        assert!(key.matches("0x69C42450E7ED29B0"));
    }

    #[test]
    fn matches_short_id_and_fingerprint() {
        let key = alice();
        assert!(key.matches("E7ED29B0"));
        assert!(key.matches("8E58 8714 101F B4F6 579A 2DFD 69C4 2450 E7ED 29B0"));
    }

    #[test]
    fn matches_user_id_substring() {
        let key = alice();
        assert!(key.matches("alice@example.com"));
        assert!(key.matches("ALICE"));
        assert!(!key.matches("bob@example.com"));
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(!alice().matches("  "));
    }

    #[test]
    fn display_uses_first_user_id() {
        assert_eq!(
            alice().to_string(),
            "69C42450E7ED29B0 (Alice Example <alice@example.com>)"
        );
    }
}
