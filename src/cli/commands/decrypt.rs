use std::io::Write;
use std::path::{Path, PathBuf};

use crate::adapters::cipher::AnyContext;
use crate::cli::output;
use crate::config::app_config::{AppConfig, validate_cipher};
use crate::core::errors::Result;
use crate::core::services::encryption_service::{decrypt_file, write_chunked};

/// Execute the `csvseal decrypt` command.
///
/// Decrypts `input` (default: the configured output file) with the given
/// secret key. The plaintext goes to `output`, or to stdout if no output
/// file is given.
pub fn execute(
    secret_key: &Path,
    input: Option<&Path>,
    output_path: Option<&Path>,
    cipher: Option<&str>,
    config: &AppConfig,
) -> Result<()> {
    let cipher = cipher.unwrap_or(&config.encryption.cipher);
    validate_cipher(cipher)?;

    let source: PathBuf = input
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.files.output.clone());

    let context = AnyContext::open(cipher)?;
    output::detail(&format!("Source: {}", source.display()));
    output::detail(&format!("Secret key: {}", secret_key.display()));

    let plaintext = decrypt_file(&context, &source, secret_key)?;

    match output_path {
        Some(dest) => {
            write_chunked(&plaintext, dest)?;
            output::success(&format!(
                "Decrypted {} bytes to {}",
                plaintext.len(),
                dest.display()
            ));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
