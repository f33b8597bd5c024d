//! Pluggable line encryption for strategy logs.
//!
//! The core never picks a cipher. Logs take a [`Cryptograph`] and run every line
//! through it; [`PlainCryptograph`] leaves lines untouched.

use crate::config::EncryptionConfig;
use crate::domain::LedgerError;

pub trait Cryptograph: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, LedgerError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, LedgerError>;
}

/// Identity transform, used when encryption is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCryptograph;

impl Cryptograph for PlainCryptograph {
    fn encrypt(&self, plaintext: &str) -> Result<String, LedgerError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, LedgerError> {
        Ok(ciphertext.to_string())
    }
}

/// Picks the cryptograph for the configured settings.
///
/// No cipher ships with the core, so an enabled encryption setting is refused
/// instead of silently writing plaintext.
pub fn cryptograph_for(settings: &EncryptionConfig) -> Result<Box<dyn Cryptograph>, LedgerError> {
    if settings.enabled {
        return Err(LedgerError::Storage {
            message: "encryption is enabled but no cipher is available in this build".to_string(),
        });
    }
    Ok(Box::new(PlainCryptograph))
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
