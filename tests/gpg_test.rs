//! Tests for `--cipher gpg`. They need a `gpg` binary on PATH and are
//! skipped (pass trivially) when it is missing.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;
use sha2::{Digest, Sha256};

const CSV: &str = "pan,name\n4111111111111111,Alice\n";

fn csvseal() -> Command {
    cargo_bin_cmd!("csvseal")
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn gpg_available() -> bool {
    std::process::Command::new("gpg")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn project(key_fixture: &str) -> assert_fs::TempDir {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("test_public_key.asc")
        .write_file(&fixture(key_fixture))
        .unwrap();
    dir.child("dummy_pan_data.csv").write_str(CSV).unwrap();
    dir
}

#[test]
fn gpg_backend_encrypts_armored() {
    if !gpg_available() {
        return;
    }
    let dir = project("alice_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg"])
        .assert()
        .success();

    dir.child("encrypted_dummy_pan_data.pgp")
        .assert(predicate::str::starts_with("-----BEGIN PGP MESSAGE-----"));
}

#[test]
fn gpg_round_trip() {
    if !gpg_available() {
        return;
    }
    let dir = project("alice_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["encrypt", "--cipher", "gpg"])
        .assert()
        .success();

    csvseal()
        .current_dir(dir.path())
        .args(["decrypt", "--cipher", "gpg", "--secret-key"])
        .arg(fixture("alice_secret.asc"))
        .assert()
        .success()
        .stdout(predicate::str::diff(CSV));
}

#[test]
fn gpg_backend_rejects_malformed_key() {
    if !gpg_available() {
        return;
    }
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("test_public_key.asc").write_str("garbage").unwrap();
    dir.child("dummy_pan_data.csv").write_str(CSV).unwrap();

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to import key"))
        .stderr(predicate::str::contains("unsafe permissions").not());
}

#[test]
fn gpg_keys_list_shows_both_keys() {
    if !gpg_available() {
        return;
    }
    let dir = project("team_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg", "keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("69C42450E7ED29B0"))
        .stdout(predicate::str::contains("E74C7F15126977C4"));
}

/// About 1.6 MB of CSV that does not compress, so gpg's output outgrows
/// the pipe buffers long before its input is consumed.
fn large_csv() -> String {
    let mut csv = String::from("row,digest\n");
    for row in 0..20_000u32 {
        let digest = Sha256::digest(row.to_le_bytes());
        writeln!(csv, "{row},{}", hex::encode(digest)).unwrap();
    }
    csv
}

#[test]
fn gpg_large_input_round_trips() {
    if !gpg_available() {
        return;
    }
    let csv = large_csv();
    assert!(csv.len() > 1_000_000);

    let dir = project("alice_public.asc");
    dir.child("dummy_pan_data.csv").write_str(&csv).unwrap();

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg"])
        .timeout(Duration::from_secs(60))
        .assert()
        .success();

    let out = csvseal()
        .current_dir(dir.path())
        .args(["decrypt", "--cipher", "gpg", "--secret-key"])
        .arg(fixture("alice_secret.asc"))
        .timeout(Duration::from_secs(60))
        .assert()
        .success();
    assert!(out.get_output().stdout == csv.as_bytes());
}

#[test]
fn gpg_verified_trust_accepts_valid_key() {
    if !gpg_available() {
        return;
    }
    let dir = project("alice_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg", "encrypt", "--trust", "verified"])
        .assert()
        .success();

    dir.child("encrypted_dummy_pan_data.pgp")
        .assert(predicate::str::starts_with("-----BEGIN PGP MESSAGE-----"));
}

#[test]
fn gpg_verified_trust_rejects_revoked_key() {
    if !gpg_available() {
        return;
    }
    let dir = project("dave_revoked_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg", "encrypt", "--trust", "verified"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Recipient key 242B9E317E2D9C01 is not trusted: key is revoked",
        ));

    dir.child("encrypted_dummy_pan_data.pgp")
        .assert(predicate::path::missing());
}

#[test]
fn gpg_rejects_revoked_and_expired_keys() {
    if !gpg_available() {
        return;
    }
    for key in ["dave_revoked_public.asc", "erin_expired_public.asc"] {
        let dir = project(key);

        csvseal()
            .current_dir(dir.path())
            .args(["--cipher", "gpg"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Encryption failed"))
            .stderr(predicate::str::contains("unsafe permissions").not())
            .stderr(predicate::function(|stderr: &str| stderr.lines().count() == 1));

        dir.child("encrypted_dummy_pan_data.pgp")
            .assert(predicate::path::missing());
    }
}

#[test]
fn gpg_sign_only_key_fails() {
    if !gpg_available() {
        return;
    }
    let dir = project("carol_signonly_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Encryption failed"));

    dir.child("encrypted_dummy_pan_data.pgp")
        .assert(predicate::path::missing());
}

#[test]
fn gpg_drops_key_with_broken_self_signature() {
    if !gpg_available() {
        return;
    }
    let dir = project("frank_badsig_public.asc");

    csvseal()
        .current_dir(dir.path())
        .args(["--cipher", "gpg"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to import key"));
}
