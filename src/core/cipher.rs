//! Cipher codec for device field payloads
//!
//! Devices encrypt individual field values with AES-128-CBC / PKCS#7 under a
//! fixed key and IV and ship them base64-encoded. Decoding never panics:
//! every failure is a `DecodeError` and callers keep the raw value.

use std::fmt;
use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde_json::Value;
use crate::error::{ConfigError, DecodeError};
use crate::MIN_CIPHERTEXT_LEN;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const BLOCK_LEN: usize = 16;

/// Stateless AES-128-CBC codec; cheap to clone and share across tasks
#[derive(Clone)]
pub struct CipherCodec {
    key: [u8; 16],
    iv: [u8; 16],
}

impl fmt::Debug for CipherCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherCodec").field("key", &"<redacted>").finish()
    }
}

impl CipherCodec {
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    /// Build from hex strings as they appear in configuration
    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            parse_material("key", key_hex)?,
            parse_material("iv", iv_hex)?,
        ))
    }

    /// Decrypt a base64 ciphertext. Short inputs are returned unchanged.
    pub fn decrypt(&self, input: &str) -> Result<String, DecodeError> {
        if input.chars().count() <= MIN_CIPHERTEXT_LEN {
            return Ok(input.to_string());
        }

        let bytes = STANDARD
            .decode(input.trim())
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
        if bytes.is_empty() || bytes.len() % BLOCK_LEN != 0 {
            return Err(DecodeError::BlockLength(bytes.len()));
        }

        let plain = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| DecodeError::Padding)?;

        String::from_utf8(plain).map_err(|_| DecodeError::Utf8)
    }

    /// Decrypt, falling back to the input on any failure
    pub fn decrypt_or_raw(&self, input: &str) -> String {
        self.decrypt(input).unwrap_or_else(|_| input.to_string())
    }

    /// Decrypt a JSON value. Non-string values pass through untouched.
    pub fn decrypt_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.decrypt_or_raw(s)),
            other => other.clone(),
        }
    }

    /// Encrypt plaintext to base64, the inverse of `decrypt`
    pub fn encrypt(&self, plaintext: &str) -> String {
        let bytes = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        STANDARD.encode(bytes)
    }
}

fn parse_material(field: &'static str, hex_str: &str) -> Result<[u8; 16], ConfigError> {
    let bytes = hex::decode(hex_str.trim()).map_err(|_| ConfigError::CipherMaterial {
        field,
        got: format!("non-hex string of {} chars", hex_str.len()),
    })?;
    bytes.try_into().map_err(|b: Vec<u8>| ConfigError::CipherMaterial {
        field,
        got: format!("{} bytes", b.len()),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> CipherCodec {
        CipherCodec::new(*b"0123456789abcdef", *b"fedcba9876543210")
    }

    #[test]
    fn test_round_trip() {
        let c = codec();
        for plain in ["210", "36.5", "true", "standing upright", ""] {
            let enc = c.encrypt(plain);
            assert!(enc.len() > MIN_CIPHERTEXT_LEN);
            assert_eq!(c.decrypt(&enc).unwrap(), plain);
        }
    }

    #[test]
    fn test_short_input_returned_as_is() {
        let c = codec();
        assert_eq!(c.decrypt("72").unwrap(), "72");
        assert_eq!(c.decrypt("0123456789").unwrap(), "0123456789");
    }

    #[test]
    fn test_malformed_base64() {
        let c = codec();
        assert!(matches!(c.decrypt("this is not base64 at all!"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_partial_block() {
        let c = codec();
        let twenty = STANDARD.encode([7u8; 20]);
        assert_eq!(c.decrypt(&twenty), Err(DecodeError::BlockLength(20)));
    }

    #[test]
    fn test_wrong_key_never_yields_plaintext() {
        let enc = codec().encrypt("heart rate payload");
        let other = CipherCodec::new(*b"ffffffffffffffff", *b"fedcba9876543210");
        assert_ne!(other.decrypt(&enc), Ok("heart rate payload".to_string()));
    }

    #[test]
    fn test_decrypt_or_raw_keeps_input() {
        let c = codec();
        let garbage = "U2FsdGVkX1-not-really";
        assert_eq!(c.decrypt_or_raw(garbage), garbage);
    }

    #[test]
    fn test_non_string_values_pass_through() {
        let c = codec();
        assert_eq!(c.decrypt_value(&json!(36.5)), json!(36.5));
        assert_eq!(c.decrypt_value(&json!(true)), json!(true));
        assert_eq!(c.decrypt_value(&json!(null)), json!(null));
    }

    #[test]
    fn test_from_hex() {
        let c = CipherCodec::from_hex(
            "30313233343536373839616263646566",
            "66656463626139383736353433323130",
        )
        .unwrap();
        assert_eq!(c.decrypt(&codec().encrypt("98.6")).unwrap(), "98.6");

        assert!(CipherCodec::from_hex("abcd", "66656463626139383736353433323130").is_err());
        assert!(CipherCodec::from_hex("zz", "zz").is_err());
    }
}
