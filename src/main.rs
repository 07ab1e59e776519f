mod adapters;
mod cli;
mod config;
mod core;

use clap::Parser;

use cli::{Cli, Commands, EncryptArgs};
use config::app_config::AppConfig;

fn main() {
    let args = Cli::parse();
    cli::output::init(args.verbose, args.quiet);

    let cipher = args.cipher.as_deref();

    let result = AppConfig::load(args.config.as_deref()).and_then(|config| match &args.command {
        None => cli::commands::encrypt::execute(&EncryptArgs::default(), cipher, &config),
        Some(Commands::Encrypt(encrypt)) => {
            cli::commands::encrypt::execute(encrypt, cipher, &config)
        }
        Some(Commands::Decrypt {
            secret_key,
            input,
            output,
        }) => cli::commands::decrypt::execute(
            secret_key,
            input.as_deref(),
            output.as_deref(),
            cipher,
            &config,
        ),
        Some(Commands::Keys { action }) => cli::commands::keys::execute(action, cipher, &config),
    });

    if let Err(e) = result {
        cli::output::error(&format!("Error: {e}"));
        std::process::exit(1);
    }
}
