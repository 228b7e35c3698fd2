//! Private key and key id loading

use fnctl_core::config::{
    ORACLE_FINGERPRINT, ORACLE_KEY_ID, ORACLE_PASS_PHRASE, ORACLE_TENANCY_ID, ORACLE_USER_ID,
};
use fnctl_core::{ConfigSource, FnError, PassphraseSource, Result};
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use std::path::Path;
use tracing::debug;

/// Passphrase challenge id for the signing key
pub const PASSPHRASE_ID: &str = "oracle.privateKey";

/// Signing key id: `oracle.key-id`, or `<tenancy>/<user>/<fingerprint>`
pub fn key_id(config: &dyn ConfigSource) -> Result<String> {
    let explicit = config.get_string(ORACLE_KEY_ID);
    if !explicit.is_empty() {
        return Ok(explicit);
    }

    let parts = [ORACLE_TENANCY_ID, ORACLE_USER_ID, ORACLE_FINGERPRINT]
        .iter()
        .map(|key| {
            let value = config.get_string(key);
            if value.is_empty() {
                Err(FnError::Config(format!(
                    "no signing key id: set {} or {}",
                    ORACLE_KEY_ID, key
                )))
            } else {
                Ok(value)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("/"))
}

/// Decode a PEM RSA key: PKCS#1, PKCS#8 or encrypted PKCS#8
pub fn parse_private_key(pem: &str, pass_phrase: Option<&str>) -> Result<RsaPrivateKey> {
    if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        let pass_phrase =
            pass_phrase.ok_or_else(|| FnError::Key("private key is encrypted".into()))?;
        return RsaPrivateKey::from_pkcs8_encrypted_pem(pem, pass_phrase)
            .map_err(|e| FnError::Key(format!("unable to decrypt private key: {}", e)));
    }

    if pem.contains("BEGIN RSA PRIVATE KEY") {
        if pem.contains("Proc-Type: 4,ENCRYPTED") {
            return Err(FnError::Key(
                "legacy encrypted PKCS#1 keys are not supported; convert with `openssl pkcs8 -topk8`"
                    .into(),
            ));
        }
        return RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| FnError::Key(format!("invalid PKCS#1 private key: {}", e)));
    }

    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| FnError::Key(format!("invalid PKCS#8 private key: {}", e)))
}

/// Load the signing key from `path`.
///
/// When `oracle.pass-phrase` is set it is used as is. Otherwise the key is
/// first decoded without one, and only on failure is `passphrase` asked.
pub fn load_private_key(
    path: &Path,
    config: &dyn ConfigSource,
    passphrase: &dyn PassphraseSource,
) -> Result<RsaPrivateKey> {
    let pem = std::fs::read_to_string(path).map_err(|e| {
        FnError::Key(format!(
            "unable to load private key from file {}: {}",
            path.display(),
            e
        ))
    })?;

    if config.is_set(ORACLE_PASS_PHRASE) {
        let configured = config.get_string(ORACLE_PASS_PHRASE);
        let pass_phrase = Some(configured.as_str()).filter(|p| !p.is_empty());
        return parse_private_key(&pem, pass_phrase);
    }

    match parse_private_key(&pem, None) {
        Ok(key) => Ok(key),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Key needs a pass phrase");
            let answer = passphrase.challenge(
                PASSPHRASE_ID,
                &format!("Enter passphrase for private key {}", path.display()),
            )?;
            parse_private_key(&pem, Some(&answer))
        }
    }
}
