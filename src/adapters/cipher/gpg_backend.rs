use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::models::trust_policy::TrustPolicy;
use crate::core::traits::cipher::CipherBackend;
use crate::core::traits::keyring::Keyring;

/// GnuPG context that shells out to the system `gpg` binary.
///
/// Every context gets its own throw-away `--homedir`, so importing a key
/// never touches the user's real keyring. The directory is removed when
/// the context is dropped.
pub struct GpgContext {
    /// Path to the gpg binary (defaults to "gpg").
    gpg_path: PathBuf,
    home: TempDir,
    armor: bool,
}

impl GpgContext {
    /// Create a context using the default `gpg` binary.
    pub fn new() -> Result<Self> {
        Self::with_path(PathBuf::from("gpg"))
    }

    /// Create a context with a custom gpg binary path.
    pub fn with_path(gpg_path: PathBuf) -> Result<Self> {
        let home = tempfile::Builder::new().prefix("csvseal-gnupg-").tempdir()?;
        Ok(Self {
            gpg_path,
            home,
            armor: true,
        })
    }

    /// Check if GPG is available on the system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gpg_path)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Run a gpg command against the private homedir and return stdout on success.
    ///
    /// `fail` builds the error for a failed run from gpg's stderr.
    fn run_gpg(
        &self,
        args: &[&str],
        stdin_data: Option<&[u8]>,
        fail: impl Fn(String) -> CsvSealError,
    ) -> Result<Vec<u8>> {
        use std::io::Write;
        use std::process::Stdio;

        let mut cmd = Command::new(&self.gpg_path);
        cmd.arg("--homedir")
            .arg(self.home.path())
            .args(["--batch", "--yes", "--no-tty", "--no-permission-warning"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| fail(format!("Failed to run gpg: {e}")))?;

        // gpg blocks on a full stdout pipe, so stdin is fed from another thread
        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|s| {
            let writer = s.spawn(move || match (stdin, stdin_data) {
                (Some(mut stdin), Some(data)) => stdin.write_all(data),
                _ => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| fail(format!("gpg process failed: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "gpg exited with error: {}",
                summarize_stderr(&stderr)
            )));
        }

        match written {
            Ok(Ok(())) => Ok(output.stdout),
            Ok(Err(e)) => Err(fail(format!("Failed to write to gpg stdin: {e}"))),
            Err(_) => Err(fail("gpg stdin writer panicked".into())),
        }
    }

    /// Validity letter (colon field 1) of the key with this fingerprint.
    fn validity(&self, fingerprint: &str) -> Result<Option<char>> {
        let listing = self.list_colons()?;
        Ok(Self::parse_listing(&listing)
            .into_iter()
            .find(|listed| listed.identity.fingerprint == fingerprint)
            .map(|listed| listed.validity))
    }

    fn list_colons(&self) -> Result<String> {
        let stdout = self.run_gpg(
            &["--with-colons", "--fixed-list-mode", "--list-keys"],
            None,
            |reason| CsvSealError::KeyImportFailed { reason },
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Parse `gpg --with-colons --list-keys` output into identities.
    ///
    /// Only `pub`, `fpr`, `uid` and `sub` records are used. The first
    /// `fpr` after a `pub` record is the primary key's fingerprint.
    fn parse_listing(listing: &str) -> Vec<ListedKey> {
        let mut keys: Vec<ListedKey> = Vec::new();
        let mut expect_primary_fpr = false;

        for line in listing.lines() {
            let fields: Vec<&str> = line.split(':').collect();
            let field = |i: usize| fields.get(i).copied().unwrap_or("");

            match field(0) {
                "pub" => {
                    let created_at = field(5)
                        .parse::<i64>()
                        .ok()
                        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
                    keys.push(ListedKey {
                        identity: KeyIdentity {
                            key_id: field(4).to_ascii_uppercase(),
                            fingerprint: String::new(),
                            user_ids: Vec::new(),
                            created_at,
                            // Upper-case capabilities describe the whole key
                            can_encrypt: field(11).contains('E'),
                        },
                        validity: field(1).chars().next().unwrap_or('-'),
                    });
                    expect_primary_fpr = true;
                }
                "fpr" if expect_primary_fpr => {
                    if let Some(key) = keys.last_mut() {
                        key.identity.fingerprint = field(9).to_ascii_uppercase();
                    }
                    expect_primary_fpr = false;
                }
                "uid" => {
                    if let Some(key) = keys.last_mut() {
                        key.identity.user_ids.push(field(9).to_string());
                    }
                }
                "sub" => expect_primary_fpr = false,
                _ => {}
            }
        }

        keys
    }
}

/// A primary key from a colon listing, with gpg's validity letter.
struct ListedKey {
    identity: KeyIdentity,
    validity: char,
}

/// Why gpg considers a key unusable, from its validity letter.
fn unusable_reason(validity: char) -> Option<&'static str> {
    match validity {
        'r' => Some("key is revoked"),
        'e' => Some("key has expired"),
        'i' => Some("key is invalid"),
        'd' => Some("key is disabled"),
        _ => None,
    }
}

/// Collapse gpg's stderr into one line, dropping homedir permission noise.
fn summarize_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains("WARNING: unsafe permissions"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Keyring for GpgContext {
    fn import(&mut self, data: &[u8]) -> Result<usize> {
        let before = self.list()?.len();
        self.run_gpg(&["--import"], Some(data), |reason| {
            CsvSealError::KeyImportFailed { reason }
        })?;
        let after = self.list()?.len();

        if after == before {
            return Err(CsvSealError::KeyImportFailed {
                reason: "no new public keys found in key data".into(),
            });
        }
        Ok(after - before)
    }

    fn list(&self) -> Result<Vec<KeyIdentity>> {
        let listing = self.list_colons()?;
        Ok(Self::parse_listing(&listing)
            .into_iter()
            .map(|listed| listed.identity)
            .collect())
    }
}

impl CipherBackend for GpgContext {
    fn set_armor(&mut self, armor: bool) {
        self.armor = armor;
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &KeyIdentity,
        trust: TrustPolicy,
    ) -> Result<Vec<u8>> {
        // The private homedir has no owner trust; only key validity counts
        if trust == TrustPolicy::Verified {
            let validity = self.validity(&recipient.fingerprint)?;
            if let Some(reason) = validity.and_then(unusable_reason) {
                return Err(CsvSealError::UntrustedKey {
                    key_id: recipient.key_id.clone(),
                    reason: reason.into(),
                });
            }
        }

        let mut args = vec!["--encrypt", "--trust-model", "always"];
        if self.armor {
            args.push("--armor");
        }
        args.extend_from_slice(&["--recipient", recipient.fingerprint.as_str()]);

        self.run_gpg(&args, Some(plaintext), |reason| {
            CsvSealError::EncryptionFailed { reason }
        })
    }

    fn decrypt(&self, ciphertext: &[u8], secret_key: &[u8]) -> Result<Vec<u8>> {
        let fail = |reason| CsvSealError::DecryptionFailed { reason };
        self.run_gpg(&["--import"], Some(secret_key), fail)?;
        self.run_gpg(
            &["--pinentry-mode", "loopback", "--passphrase", "", "--decrypt"],
            Some(ciphertext),
            fail,
        )
    }

    fn name(&self) -> &str {
        "gpg"
    }
}
