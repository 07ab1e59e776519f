use std::path::Path;

use colored::Colorize;

use crate::adapters::cipher::AnyContext;
use crate::cli::KeysAction;
use crate::cli::output;
use crate::config::app_config::{AppConfig, validate_cipher};
use crate::core::errors::{CsvSealError, Result};
use crate::core::models::key_identity::KeyIdentity;
use crate::core::services::key_service::KeyService;

/// Execute the `csvseal keys` command.
pub fn execute(action: &KeysAction, cipher: Option<&str>, config: &AppConfig) -> Result<()> {
    match action {
        KeysAction::List { key, json } => {
            let path = key.as_deref().unwrap_or(&config.files.public_key);
            let cipher = cipher.unwrap_or(&config.encryption.cipher);
            execute_list(path, cipher, *json)
        }
    }
}

/// Import a key file into a fresh keyring and print what it holds.
fn execute_list(path: &Path, cipher: &str, json: bool) -> Result<()> {
    validate_cipher(cipher)?;
    let mut service = KeyService {
        keyring: AnyContext::open(cipher)?,
    };
    service.import_file(path)?;
    let keys = service.list_keys()?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&keys).map_err(|e| CsvSealError::InvalidConfig {
                detail: format!("Failed to serialize key list: {e}"),
            })?;
        println!("{rendered}");
        return Ok(());
    }

    output::header(&format!("Keys in {}", path.display()));
    for (i, key) in keys.iter().enumerate() {
        print_key(key, i == 0);
    }

    if keys.len() > 1 {
        println!();
        output::warning("More than one key: the first one is used unless --recipient is given.");
    }

    Ok(())
}

fn print_key(key: &KeyIdentity, is_default: bool) {
    let marker = if is_default {
        " (default recipient)".green().to_string()
    } else {
        String::new()
    };
    println!("\n  {}{marker}", key.key_id.cyan());
    println!("    Fingerprint: {}", key.fingerprint);
    for uid in &key.user_ids {
        println!("    User ID:     {uid}");
    }
    if let Some(created) = key.created_at {
        println!("    Created:     {}", created.format("%Y-%m-%d"));
    }
    let can_encrypt = if key.can_encrypt {
        "yes".green()
    } else {
        "no".red()
    };
    println!("    Can encrypt: {can_encrypt}");
}
