pub mod cipher;
pub mod keyring;
