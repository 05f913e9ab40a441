//! Optional at-rest encryption of Patient details.
//!
//! When a resource is ingested with `WhatToEncrypt { patient_details: true }`
//! and it is a Patient, a fixed set of sensitive fields is moved into a
//! plaintext sub-document, sealed with AES-256-GCM, and stored as
//! `__gofhirEncryptedBSON` plus the key id used. Egress reverses the
//! process and verifies the key id. Identifiers are only partially
//! encrypted: non-sensitive ones stay in the clear so they remain
//! searchable.
//!
//! The key is resolved once from the environment: `ENCRYPTION_KEY_BASE64`
//! (32 bytes, base64) and `ENCRYPTION_KEY_ID`.

use std::sync::OnceLock;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bson::{Bson, Document};

use crate::error::{ModelError, ModelResult};

pub const ENCRYPTED_FIELD: &str = "__gofhirEncryptedBSON";
pub const KEY_ID_FIELD: &str = "__gofhirEncryptionKeyId";

const SENSITIVE_IDENTIFIER_SYSTEM: &str = "http://ns.electronichealth.net.au/id/hi/mc";
const NONCE_LEN: usize = 12;

/// Selects which parts of an ingested resource are encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhatToEncrypt {
    /// Encrypt the demographic fields of Patient resources.
    pub patient_details: bool,
}

enum FieldPolicy {
    Clear,
    Encrypt,
    /// Encrypted, but a filtered copy stays in the clear for searching.
    EncryptRetainPartial,
}

fn field_policy(name: &str) -> FieldPolicy {
    match name {
        "name" | "birthDate" | "telecom" | "address" | "photo" | "contact"
        | "communication" | "text" => FieldPolicy::Encrypt,
        "identifier" => FieldPolicy::EncryptRetainPartial,
        _ => FieldPolicy::Clear,
    }
}

/// Drops identifiers carrying the sensitive system so the remainder can be
/// kept unencrypted and searchable.
fn retain_plain_identifiers(value: &Bson) -> Bson {
    let Some(items) = value.as_array() else {
        return value.clone();
    };
    let kept: Vec<Bson> = items
        .iter()
        .filter(|item| {
            item.as_document()
                .and_then(|doc| doc.get_str("system").ok())
                .map(|system| system != SENSITIVE_IDENTIFIER_SYSTEM)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    Bson::Array(kept)
}

fn cipher() -> ModelResult<&'static (Aes256Gcm, String)> {
    static CIPHER: OnceLock<Result<(Aes256Gcm, String), String>> = OnceLock::new();
    CIPHER
        .get_or_init(|| {
            let key_b64 = std::env::var("ENCRYPTION_KEY_BASE64")
                .map_err(|_| "missing environment variable: ENCRYPTION_KEY_BASE64".to_string())?;
            let key_id = std::env::var("ENCRYPTION_KEY_ID")
                .map_err(|_| "missing environment variable: ENCRYPTION_KEY_ID".to_string())?;
            let key = BASE64
                .decode(key_b64.trim())
                .map_err(|_| "invalid environment variable: ENCRYPTION_KEY_BASE64".to_string())?;
            if key.len() != 32 {
                return Err("ENCRYPTION_KEY_BASE64 must decode to 32 bytes".to_string());
            }
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
            Ok((cipher, key_id))
        })
        .as_ref()
        .map_err(|message| ModelError::Encryption(message.clone()))
}

/// Encrypts the sensitive fields of a Patient document in place.
pub fn encrypt_document(
    doc: &mut Document,
    resource_type: &str,
    what: &WhatToEncrypt,
) -> ModelResult<()> {
    if !what.patient_details || resource_type != "Patient" {
        return Ok(());
    }

    let mut plaintext = Document::new();
    let mut remainder = Document::new();
    for (key, value) in doc.iter() {
        match field_policy(key) {
            FieldPolicy::Clear => {
                remainder.insert(key.clone(), value.clone());
            }
            FieldPolicy::Encrypt => {
                plaintext.insert(key.clone(), value.clone());
            }
            FieldPolicy::EncryptRetainPartial => {
                plaintext.insert(key.clone(), value.clone());
                remainder.insert(key.clone(), retain_plain_identifiers(value));
            }
        }
    }

    let plaintext_bytes = bson::to_vec(&plaintext)
        .map_err(|e| ModelError::Encryption(format!("failed to serialise plaintext: {e}")))?;

    let (cipher, key_id) = cipher()?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext_bytes.as_slice())
        .map_err(|_| ModelError::Encryption("AES-GCM seal failed".to_string()))?;

    // stored form is nonce | ciphertext | tag, base64-encoded
    let mut combined = nonce.to_vec();
    combined.extend_from_slice(&sealed);

    remainder.insert(ENCRYPTED_FIELD, BASE64.encode(combined));
    remainder.insert(KEY_ID_FIELD, key_id.clone());
    *doc = remainder;
    Ok(())
}

/// Restores encrypted fields in place. A document without the encrypted
/// marker is returned untouched.
pub fn decrypt_document(doc: &mut Document) -> ModelResult<()> {
    let Ok(ciphertext_b64) = doc.get_str(ENCRYPTED_FIELD) else {
        return Ok(());
    };
    let expected_key_id = doc.get_str(KEY_ID_FIELD).unwrap_or_default().to_string();

    let (cipher, key_id) = cipher()?;
    if *key_id != expected_key_id {
        return Err(ModelError::Encryption(format!(
            "encryption key id ({key_id}) does not match stored key id ({expected_key_id})"
        )));
    }

    let combined = BASE64
        .decode(ciphertext_b64)
        .map_err(|_| ModelError::Encryption("failed to decode encrypted field".to_string()))?;
    if combined.len() < NONCE_LEN {
        return Err(ModelError::Encryption("encrypted field too short".to_string()));
    }
    let (nonce, sealed) = combined.split_at(NONCE_LEN);
    let plaintext_bytes = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| ModelError::Encryption("AES-GCM open failed".to_string()))?;
    let plaintext: Document = bson::from_slice(&plaintext_bytes)
        .map_err(|e| ModelError::Encryption(format!("failed to parse plaintext: {e}")))?;

    doc.remove(ENCRYPTED_FIELD);
    doc.remove(KEY_ID_FIELD);
    // fields partially retained in the clear are replaced by the full copy
    for (key, value) in plaintext {
        doc.insert(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn init_test_key() {
        // 32 zero bytes; set once for the whole test process
        std::env::set_var("ENCRYPTION_KEY_BASE64", BASE64.encode([0u8; 32]));
        std::env::set_var("ENCRYPTION_KEY_ID", "test-key");
    }

    #[test]
    fn round_trips_patient_fields() {
        init_test_key();
        let original = doc! {
            "_id": "p1",
            "resourceType": "Patient",
            "gender": "male",
            "name": [{"family": "Smith"}],
            "birthDate": {"__strDate": "1970"},
            "identifier": [
                {"system": SENSITIVE_IDENTIFIER_SYSTEM, "value": "secret"},
                {"system": "http://example.org/mrn", "value": "MRN1"},
            ],
        };

        let mut sealed = original.clone();
        encrypt_document(&mut sealed, "Patient", &WhatToEncrypt { patient_details: true })
            .unwrap();

        assert!(sealed.get_str(ENCRYPTED_FIELD).is_ok());
        assert_eq!(sealed.get_str(KEY_ID_FIELD).unwrap(), "test-key");
        assert!(sealed.get("name").is_none());
        // the non-sensitive identifier is retained in the clear
        let clear_identifiers = sealed.get_array("identifier").unwrap();
        assert_eq!(clear_identifiers.len(), 1);

        let mut opened = sealed;
        decrypt_document(&mut opened).unwrap();
        assert!(opened.get(ENCRYPTED_FIELD).is_none());
        assert_eq!(opened.get_array("name").unwrap().len(), 1);
        assert_eq!(opened.get_array("identifier").unwrap().len(), 2);
        assert_eq!(opened.get_str("gender").unwrap(), "male");
    }

    #[test]
    fn non_patient_is_left_alone() {
        init_test_key();
        let mut doc = doc! {"resourceType": "Observation", "status": "final"};
        let before = doc.clone();
        encrypt_document(&mut doc, "Observation", &WhatToEncrypt { patient_details: true })
            .unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn unencrypted_document_decrypts_to_itself() {
        init_test_key();
        let mut doc = doc! {"_id": "x", "gender": "female"};
        let before = doc.clone();
        decrypt_document(&mut doc).unwrap();
        assert_eq!(doc, before);
    }
}
