pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::models::trust_policy::TrustPolicy;

/// Encrypt a CSV file to an OpenPGP recipient as an ASCII-armored message.
///
/// Without a subcommand, encrypts `dummy_pan_data.csv` to the first key in
/// `test_public_key.asc` and writes `encrypted_dummy_pan_data.pgp`.
#[derive(Parser, Debug)]
#[command(name = "csvseal", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Encryption backend to use: pgp (built-in) or gpg (system binary)
    #[arg(long, global = true)]
    pub cipher: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt a CSV file (the default command)
    Encrypt(EncryptArgs),

    /// Decrypt an encrypted file with a secret key
    Decrypt {
        /// Armored secret key file (no passphrase)
        #[arg(long)]
        secret_key: PathBuf,
        /// Encrypted input file (default: encrypted_dummy_pan_data.pgp)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Where to write the plaintext (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Inspect public keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct EncryptArgs {
    /// Public key file (default: test_public_key.asc)
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// CSV file to encrypt (default: dummy_pan_data.csv)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Encrypted output file (default: encrypted_dummy_pan_data.pgp)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Key ID, fingerprint or user ID to encrypt to (default: first key)
    #[arg(short, long)]
    pub recipient: Option<String>,

    /// How much to trust the recipient key
    #[arg(long, value_enum)]
    pub trust: Option<TrustPolicy>,

    /// Write binary OpenPGP instead of ASCII armor
    #[arg(long)]
    pub binary: bool,
}

#[derive(Subcommand, Debug)]
pub enum KeysAction {
    /// List the keys in a public key file
    List {
        /// Public key file (default: test_public_key.asc)
        #[arg(long)]
        key: Option<PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
