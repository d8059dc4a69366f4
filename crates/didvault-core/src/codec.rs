//! Field-level transform between plaintext keyring records and their at-rest form.
//!
//! Sensitive fields (`*.private`, `seed`, `mnemonic`) become standard base64 of the
//! cipher output; everything else passes through untouched. Both directions build a
//! new record and only hand it back once every field succeeded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use crate::{
    cipher::{Cipher, CipherError, Secret},
    keyring::KeyringRecord,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("field `{field}` is not valid base64: {reason}")]
    Base64 { field: &'static str, reason: String },
    #[error("field `{field}` did not decrypt to UTF-8 text")]
    Utf8 { field: &'static str },
}

/// Encrypt every sensitive field of `record`.
pub async fn encrypt_record<C: Cipher + ?Sized>(
    record: &KeyringRecord,
    cipher: &C,
    secret: &Secret,
) -> Result<KeyringRecord, CodecError> {
    let mut sealed = record.clone();
    for (_, slot) in sealed.sensitive_fields_mut() {
        let ciphertext = cipher.encrypt(slot.as_bytes(), secret).await?;
        *slot = STANDARD.encode(ciphertext);
    }
    Ok(sealed)
}

/// Inverse of [`encrypt_record`].
pub async fn decrypt_record<C: Cipher + ?Sized>(
    record: &KeyringRecord,
    cipher: &C,
    secret: &Secret,
) -> Result<KeyringRecord, CodecError> {
    let mut opened = record.clone();
    for (field, slot) in opened.sensitive_fields_mut() {
        let ciphertext = STANDARD
            .decode(slot.as_bytes())
            .map_err(|e| CodecError::Base64 {
                field,
                reason: e.to_string(),
            })?;
        let plaintext = cipher.decrypt(&ciphertext, secret).await?;
        *slot = String::from_utf8(plaintext).map_err(|_| CodecError::Utf8 { field })?;
    }
    Ok(opened)
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{testing::XorCipher, *};
    use crate::keyring::fixtures::sample_record;

    fn secret() -> Secret {
        Secret::new(b"test-secret".to_vec())
    }

    #[tokio::test]
    async fn round_trip_restores_every_field() {
        let record = sample_record("did:example:alice");
        let sealed = encrypt_record(&record, &XorCipher, &secret())
            .await
            .expect("encrypt");
        let opened = decrypt_record(&sealed, &XorCipher, &secret())
            .await
            .expect("decrypt");
        assert_eq!(opened, record);
    }

    #[tokio::test]
    async fn round_trip_keeps_absent_mnemonic_absent() {
        let mut record = sample_record("did:example:alice");
        record.mnemonic = None;
        let sealed = encrypt_record(&record, &XorCipher, &secret())
            .await
            .expect("encrypt");
        assert_eq!(sealed.mnemonic, None);
        let opened = decrypt_record(&sealed, &XorCipher, &secret())
            .await
            .expect("decrypt");
        assert_eq!(opened, record);
    }

    #[tokio::test]
    async fn encrypt_touches_only_sensitive_fields() {
        let record = sample_record("did:example:alice");
        let sealed = encrypt_record(&record, &XorCipher, &secret())
            .await
            .expect("encrypt");

        assert_eq!(sealed.did, record.did);
        for (before, after) in [
            (&record.sign, &sealed.sign),
            (&record.update, &sealed.update),
            (&record.recovery, &sealed.recovery),
            (&record.encrypt, &sealed.encrypt),
        ] {
            assert_eq!(after.public, before.public);
            assert_ne!(after.private, before.private);
            assert!(STANDARD.decode(&after.private).is_ok());
        }
        assert_ne!(sealed.seed, record.seed);
        assert_ne!(sealed.mnemonic, record.mnemonic);
    }

    #[tokio::test]
    async fn decrypt_rejects_malformed_base64() {
        let mut sealed = encrypt_record(&sample_record("did:example:alice"), &XorCipher, &secret())
            .await
            .expect("encrypt");
        sealed.seed = "not base64!".to_string();

        let err = decrypt_record(&sealed, &XorCipher, &secret())
            .await
            .expect_err("should reject");
        assert!(matches!(err, CodecError::Base64 { field: "seed", .. }));
    }

    #[tokio::test]
    async fn decrypt_rejects_non_utf8_plaintext() {
        let mut sealed = encrypt_record(&sample_record("did:example:alice"), &XorCipher, &secret())
            .await
            .expect("encrypt");
        let raw = XorCipher
            .encrypt(&[0xff, 0xfe, 0xfd], &secret())
            .await
            .expect("encrypt raw");
        sealed.recovery.private = STANDARD.encode(raw);

        let err = decrypt_record(&sealed, &XorCipher, &secret())
            .await
            .expect_err("should reject");
        assert_eq!(err, CodecError::Utf8 { field: "recovery.private" });
    }

    /// Fails on the n-th call.
    struct FlakyCipher {
        calls: AtomicUsize,
        fail_at: usize,
    }

    #[async_trait]
    impl Cipher for FlakyCipher {
        async fn encrypt(&self, plaintext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(CipherError::Encrypt {
                    reason: "kms unavailable".to_string(),
                });
            }
            XorCipher.encrypt(plaintext, secret).await
        }

        async fn decrypt(&self, ciphertext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError> {
            XorCipher.decrypt(ciphertext, secret).await
        }
    }

    #[tokio::test]
    async fn cipher_failure_propagates_verbatim_and_leaves_input_untouched() {
        let record = sample_record("did:example:alice");
        let cipher = FlakyCipher {
            calls: AtomicUsize::new(0),
            fail_at: 3,
        };

        let err = encrypt_record(&record, &cipher, &secret())
            .await
            .expect_err("fourth field should fail");
        assert_eq!(
            err,
            CodecError::Cipher(CipherError::Encrypt {
                reason: "kms unavailable".to_string()
            })
        );
        assert_eq!(err.to_string(), "encrypt failed: kms unavailable");
        assert_eq!(record, sample_record("did:example:alice"));
    }

    #[tokio::test]
    async fn tampered_ciphertext_surfaces_cipher_error() {
        let mut tampered = encrypt_record(&sample_record("did:example:alice"), &XorCipher, &secret())
            .await
            .expect("encrypt");
        tampered.update.private = STANDARD.encode(b"garbage");

        let err = decrypt_record(&tampered, &XorCipher, &secret())
            .await
            .expect_err("should fail");
        assert!(matches!(err, CodecError::Cipher(CipherError::Decrypt { .. })));
    }
}
