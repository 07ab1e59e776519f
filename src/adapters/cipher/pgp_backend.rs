use std::io::Cursor;

use chrono::{DateTime, Duration, Utc};
use pgp::ArmorOptions;
use pgp::composed::{Deserializable, Message, SignedPublicKey, SignedPublicSubKey, SignedSecretKey};
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use pgp::packet::{PublicKey, Signature, SignatureType};
use pgp::ser::Serialize;
use pgp::types::{KeyTrait, PublicKeyTrait};

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::models::trust_policy::TrustPolicy;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::keyring::Keyring;

/// In-process OpenPGP context backed by rPGP.
///
/// Holds the imported public keys and the armor flag. Messages are
/// encrypted with AES-256 to the recipient's encryption-capable key.
pub struct PgpContext {
    keys: Vec<SignedPublicKey>,
    armor: bool,
}

/// The key component a message is actually encrypted to.
enum EncryptionKey<'a> {
    Primary(&'a PublicKey),
    Subkey(&'a SignedPublicSubKey),
}

impl PgpContext {
    /// Create an empty context with ASCII-armored output enabled.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            armor: true,
        }
    }

    fn identity(key: &SignedPublicKey) -> KeyIdentity {
        KeyIdentity {
            key_id: hex::encode_upper(key.key_id()),
            fingerprint: hex::encode_upper(key.fingerprint()),
            user_ids: key
                .details
                .users
                .iter()
                .map(|user| user.id.id().to_string())
                .collect(),
            created_at: Some(*key.primary_key.created_at()),
            can_encrypt: Self::encryption_key(key, Utc::now()).is_some(),
        }
    }

    /// Resolve an identity back to the key material it came from.
    fn find_key(&self, recipient: &KeyIdentity) -> Result<&SignedPublicKey> {
        self.keys
            .iter()
            .find(|key| hex::encode_upper(key.fingerprint()) == recipient.fingerprint)
            .ok_or_else(|| CsvSealError::RecipientNotFound {
                query: recipient.key_id.clone(),
            })
    }

    /// Pick the primary key if its flags allow encryption, otherwise the
    /// first usable subkey that does.
    ///
    /// A revoked or expired primary key rules out the whole key.
    fn encryption_key(key: &SignedPublicKey, now: DateTime<Utc>) -> Option<EncryptionKey<'_>> {
        if primary_unusable(key, now).is_some() {
            return None;
        }

        if flags_allow_encryption(self_signatures(key), key.primary_key.is_encryption_key()) {
            return Some(EncryptionKey::Primary(&key.primary_key));
        }

        key.public_subkeys
            .iter()
            .filter(|sub| subkey_usable(sub, now))
            .find(|sub| flags_allow_encryption(sub.signatures.iter(), sub.is_encryption_key()))
            .map(EncryptionKey::Subkey)
    }

    fn serialize(&self, message: &Message) -> Result<Vec<u8>> {
        if self.armor {
            let mut output = Vec::new();
            message
                .to_armored_writer(&mut output, ArmorOptions::default())
                .map_err(|e| CsvSealError::EncryptionFailed {
                    reason: format!("Failed to write armored message: {e}"),
                })?;
            Ok(output)
        } else {
            message.to_bytes().map_err(|e| CsvSealError::EncryptionFailed {
                reason: format!("Failed to serialize message: {e}"),
            })
        }
    }
}

impl Default for PgpContext {
    fn default() -> Self {
        Self::new()
    }
}

fn self_signatures(key: &SignedPublicKey) -> impl Iterator<Item = &Signature> {
    key.details
        .users
        .iter()
        .flat_map(|user| user.signatures.iter())
        .chain(key.details.direct_signatures.iter())
}

/// Why the primary key can no longer be used, if it can't.
fn primary_unusable(key: &SignedPublicKey, now: DateTime<Utc>) -> Option<String> {
    if !key.details.revocation_signatures.is_empty() {
        return Some("is revoked".into());
    }
    match expires_at(key.primary_key.created_at(), self_signatures(key)) {
        Some(expiry) if expiry <= now => {
            Some(format!("expired on {}", expiry.format("%Y-%m-%d")))
        }
        _ => None,
    }
}

fn subkey_usable(sub: &SignedPublicSubKey, now: DateTime<Utc>) -> bool {
    let revoked = sub
        .signatures
        .iter()
        .any(|sig| sig.typ() == SignatureType::SubkeyRevocation);
    let expired = expires_at(sub.key.created_at(), sub.signatures.iter())
        .is_some_and(|expiry| expiry <= now);
    !revoked && !expired
}

/// Latest expiry granted by any signature. A zero validity period never expires.
fn expires_at<'a>(
    created: &DateTime<Utc>,
    signatures: impl IntoIterator<Item = &'a Signature>,
) -> Option<DateTime<Utc>> {
    signatures
        .into_iter()
        .filter_map(Signature::key_expiration_time)
        .filter(|validity| **validity > Duration::zero())
        .max()
        .map(|validity| *created + *validity)
}

/// Decide from binding signatures whether a key component may encrypt.
///
/// Components whose signatures carry no key flags at all fall back to
/// what the public-key algorithm supports.
fn flags_allow_encryption<'a>(
    signatures: impl IntoIterator<Item = &'a Signature>,
    algorithm_can_encrypt: bool,
) -> bool {
    let mut saw_flags = false;
    for sig in signatures {
        let flags = sig.key_flags();
        if flags.encrypt_comms() || flags.encrypt_storage() {
            return true;
        }
        if flags.sign() || flags.certify() {
            saw_flags = true;
        }
    }
    !saw_flags && algorithm_can_encrypt
}

fn encrypt_to<K: PublicKeyTrait>(message: &Message, key: &K) -> pgp::errors::Result<Message> {
    message.encrypt_to_keys(
        &mut rand::thread_rng(),
        SymmetricKeyAlgorithm::AES256,
        &[key],
    )
}

impl Keyring for PgpContext {
    fn import(&mut self, data: &[u8]) -> Result<usize> {
        let (keys, _headers) = SignedPublicKey::from_armor_many(Cursor::new(data))
            .map_err(|e| CsvSealError::KeyImportFailed {
                reason: e.to_string(),
            })?;

        let mut imported = Vec::new();
        for key in keys {
            let key = key.map_err(|e| CsvSealError::KeyImportFailed {
                reason: e.to_string(),
            })?;
            imported.push(key);
        }

        if imported.is_empty() {
            return Err(CsvSealError::KeyImportFailed {
                reason: "no public keys found in key data".into(),
            });
        }

        let count = imported.len();
        for key in imported {
            let fingerprint = key.fingerprint();
            // Re-importing a key replaces the old copy instead of duplicating it
            self.keys.retain(|k| k.fingerprint() != fingerprint);
            self.keys.push(key);
        }
        Ok(count)
    }

    fn list(&self) -> Result<Vec<KeyIdentity>> {
        Ok(self.keys.iter().map(Self::identity).collect())
    }
}

impl CipherBackend for PgpContext {
    fn set_armor(&mut self, armor: bool) {
        self.armor = armor;
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &KeyIdentity,
        trust: TrustPolicy,
    ) -> Result<Vec<u8>> {
        let key = self.find_key(recipient)?;
        let now = Utc::now();
        let unusable = primary_unusable(key, now);

        if trust == TrustPolicy::Verified {
            let untrusted = |reason: String| CsvSealError::UntrustedKey {
                key_id: recipient.key_id.clone(),
                reason,
            };
            if let Some(state) = &unusable {
                return Err(untrusted(format!("key {state}")));
            }
            key.verify().map_err(|e| untrusted(e.to_string()))?;
        }

        let message = Message::new_literal_bytes("", plaintext);
        let encrypted = match Self::encryption_key(key, now) {
            Some(EncryptionKey::Primary(primary)) => encrypt_to(&message, primary),
            Some(EncryptionKey::Subkey(sub)) => encrypt_to(&message, sub),
            None => {
                let state = unusable.unwrap_or_else(|| "has no encryption-capable key".into());
                return Err(CsvSealError::EncryptionFailed {
                    reason: format!("key {} {state}", recipient.key_id),
                });
            }
        }
        .map_err(|e| CsvSealError::EncryptionFailed {
            reason: e.to_string(),
        })?;

        self.serialize(&encrypted)
    }

    fn decrypt(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        let (secret_key, _) = SignedSecretKey::from_armor_single(Cursor::new(secret_key))
            .map_err(|e| CsvSealError::DecryptionFailed {
                reason: format!("Invalid secret key: {e}"),
            })?;

        let message = if ciphertext.starts_with(b"-----BEGIN") {
            Message::from_armor_single(Cursor::new(ciphertext)).map(|(m, _)| m)
        } else {
            Message::from_bytes(Cursor::new(ciphertext))
        }
        .map_err(|e| CsvSealError::DecryptionFailed {
            reason: format!("Invalid encrypted message: {e}"),
        })?;

        let (decrypted, _) = message
            .decrypt(String::new, &[&secret_key])
            .map_err(|e| CsvSealError::DecryptionFailed {
                reason: e.to_string(),
            })?;

        decrypted
            .get_content()
            .map_err(|e| CsvSealError::DecryptionFailed {
                reason: e.to_string(),
            })?
            .ok_or_else(|| CsvSealError::DecryptionFailed {
                reason: "message has no literal data".into(),
            })
    }

    fn name(&self) -> &str {
        "pgp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/alice_public.asc");
    const ALICE_SECRET: &[u8] = include_bytes!("../../../tests/fixtures/alice_secret.asc");
    const BOB_SECRET: &[u8] = include_bytes!("../../../tests/fixtures/bob_secret.asc");
    const TEAM_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/team_public.asc");
    const SIGN_ONLY_PUBLIC: &[u8] =
        include_bytes!("../../../tests/fixtures/carol_signonly_public.asc");
    const REVOKED_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/dave_revoked_public.asc");
    const EXPIRED_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/erin_expired_public.asc");
    const BAD_SIG_PUBLIC: &[u8] = include_bytes!("../../../tests/fixtures/frank_badsig_public.asc");

    fn context_for(key_data: &[u8]) -> (PgpContext, KeyIdentity) {
        let mut ctx = PgpContext::new();
        ctx.import(key_data).unwrap();
        let recipient = ctx.list().unwrap().remove(0);
        (ctx, recipient)
    }

    fn alice_context() -> (PgpContext, KeyIdentity) {
        context_for(ALICE_PUBLIC)
    }

    fn encryption_error(result: Result<Vec<u8>>) -> String {
        match result {
            Err(CsvSealError::EncryptionFailed { reason }) => reason,
            other => panic!("expected EncryptionFailed, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn import_lists_fixture_key() {
        let (_ctx, alice) = alice_context();
        assert_eq!(alice.key_id, "69C42450E7ED29B0");
        assert_eq!(alice.fingerprint, "8E588714101FB4F6579A2DFD69C42450E7ED29B0");
        assert!(alice.user_ids[0].contains("alice@example.com"));
        assert!(alice.can_encrypt);
    }

    #[test]
    fn import_garbage_fails() {
        let mut ctx = PgpContext::new();
        let result = ctx.import(b"this is not a key");
        assert!(matches!(result, Err(CsvSealError::KeyImportFailed { .. })));
        assert!(ctx.list().unwrap().is_empty());
    }

    #[test]
    fn import_keeps_keyring_order_and_skips_duplicates() {
        let mut ctx = PgpContext::new();
        assert_eq!(ctx.import(TEAM_PUBLIC).unwrap(), 2);
        ctx.import(ALICE_PUBLIC).unwrap();

        let keys = ctx.list().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().any(|k| k.matches("bob@example.com")));
    }

    #[test]
    fn encrypt_produces_armored_message() {
        let (ctx, alice) = alice_context();
        let ciphertext = ctx
            .encrypt(b"pan,name\n4111,Alice\n", &alice, TrustPolicy::Always)
            .unwrap();

        let armored = String::from_utf8_lossy(&ciphertext);
        assert!(armored.starts_with("-----BEGIN PGP MESSAGE-----"));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let (ctx, alice) = alice_context();
        let plaintext = b"pan,expiry\n4111111111111111,12/30\n";

        let ciphertext = ctx.encrypt(plaintext, &alice, TrustPolicy::Always).unwrap();
        let decrypted = ctx.decrypt(&ciphertext, ALICE_SECRET).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn binary_output_round_trip() {
        let (mut ctx, alice) = alice_context();
        ctx.set_armor(false);
        let plaintext = b"a,b,c\n1,2,3\n";

        let ciphertext = ctx.encrypt(plaintext, &alice, TrustPolicy::Always).unwrap();
        assert!(!ciphertext.starts_with(b"-----BEGIN"));

        let decrypted = ctx.decrypt(&ciphertext, ALICE_SECRET).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_wrong_key_fails() {
        let (ctx, alice) = alice_context();
        let ciphertext = ctx.encrypt(b"secret", &alice, TrustPolicy::Always).unwrap();

        let result = ctx.decrypt(&ciphertext, BOB_SECRET);
        assert!(matches!(result, Err(CsvSealError::DecryptionFailed { .. })));
    }

    #[test]
    fn verified_trust_accepts_self_signed_key() {
        let (ctx, alice) = alice_context();
        let result = ctx.encrypt(b"x", &alice, TrustPolicy::Verified);
        assert!(result.is_ok());
    }

    #[test]
    fn sign_only_key_has_no_encryption_key() {
        let (ctx, carol) = context_for(SIGN_ONLY_PUBLIC);
        assert_eq!(carol.key_id, "E05DE24BB189DF61");
        assert!(!carol.can_encrypt);

        let reason = encryption_error(ctx.encrypt(b"x", &carol, TrustPolicy::Always));
        assert_eq!(reason, "key E05DE24BB189DF61 has no encryption-capable key");
    }

    #[test]
    fn revoked_key_is_not_used() {
        let (ctx, dave) = context_for(REVOKED_PUBLIC);
        assert_eq!(dave.key_id, "242B9E317E2D9C01");
        assert!(!dave.can_encrypt);

        let reason = encryption_error(ctx.encrypt(b"x", &dave, TrustPolicy::Always));
        assert_eq!(reason, "key 242B9E317E2D9C01 is revoked");

        let result = ctx.encrypt(b"x", &dave, TrustPolicy::Verified);
        assert!(matches!(
            result,
            Err(CsvSealError::UntrustedKey { ref reason, .. }) if reason == "key is revoked"
        ));
    }

    #[test]
    fn expired_key_is_not_used() {
        let (ctx, erin) = context_for(EXPIRED_PUBLIC);
        assert_eq!(erin.key_id, "CB91A7060ECC1AEC");
        assert!(!erin.can_encrypt);

        let reason = encryption_error(ctx.encrypt(b"x", &erin, TrustPolicy::Always));
        assert_eq!(reason, "key CB91A7060ECC1AEC expired on 2025-01-31");

        let result = ctx.encrypt(b"x", &erin, TrustPolicy::Verified);
        assert!(matches!(result, Err(CsvSealError::UntrustedKey { .. })));
    }

    #[test]
    fn expired_key_was_usable_before_expiry() {
        let (ctx, _erin) = context_for(EXPIRED_PUBLIC);
        let key = &ctx.keys[0];

        let before = DateTime::from_timestamp(1_736_899_200, 0).unwrap(); // 2025-01-15
        let after = DateTime::from_timestamp(1_738_368_000, 0).unwrap(); // 2025-02-01
        assert!(matches!(
            PgpContext::encryption_key(key, before),
            Some(EncryptionKey::Subkey(_))
        ));
        assert!(PgpContext::encryption_key(key, after).is_none());
    }

    #[test]
    fn broken_self_signature_fails_verified_trust() {
        let (ctx, frank) = context_for(BAD_SIG_PUBLIC);
        assert_eq!(frank.key_id, "2B897A61D78B146A");

        let result = ctx.encrypt(b"x", &frank, TrustPolicy::Verified);
        assert!(matches!(
            result,
            Err(CsvSealError::UntrustedKey { ref key_id, .. }) if key_id == "2B897A61D78B146A"
        ));

        // Always skips signature checks entirely
        assert!(ctx.encrypt(b"x", &frank, TrustPolicy::Always).is_ok());
    }

    #[test]
    fn encrypt_unknown_recipient_fails() {
        let (ctx, mut alice) = alice_context();
        alice.fingerprint = "0".repeat(40);
        let result = ctx.encrypt(b"x", &alice, TrustPolicy::Always);
        assert!(matches!(result, Err(CsvSealError::RecipientNotFound { .. })));
    }

    #[test]
    fn pgp_backend_has_correct_name() {
        assert_eq!(PgpContext::new().name(), "pgp");
    }
}
