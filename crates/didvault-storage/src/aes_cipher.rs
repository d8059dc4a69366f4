use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use didvault_core::cipher::{Cipher, CipherError, Secret};

const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher. Output is `nonce || ciphertext+tag`; the secret must be 32 bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cipher for AesGcmCipher {
    async fn encrypt(&self, plaintext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError> {
        let cipher = build_cipher(secret)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CipherError::Encrypt {
                reason: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend(ciphertext);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CipherError::Decrypt {
                reason: format!("ciphertext shorter than {NONCE_LEN}-byte nonce"),
            });
        }
        let cipher = build_cipher(secret)?;
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);

        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|e| CipherError::Decrypt {
                reason: e.to_string(),
            })
    }
}

fn build_cipher(secret: &Secret) -> Result<Aes256Gcm, CipherError> {
    Aes256Gcm::new_from_slice(secret.expose()).map_err(|_| CipherError::InvalidSecret {
        reason: format!("expected 32-byte key, got {} bytes", secret.expose().len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> Secret {
        Secret::new(vec![byte; 32])
    }

    #[tokio::test]
    async fn round_trip_encrypts_and_decrypts() {
        let cipher = AesGcmCipher::new();
        let sealed = cipher
            .encrypt(b"seed-material", &secret(1))
            .await
            .expect("encrypt");
        assert_ne!(&sealed[NONCE_LEN..], b"seed-material");

        let opened = cipher.decrypt(&sealed, &secret(1)).await.expect("decrypt");
        assert_eq!(opened, b"seed-material");
    }

    #[tokio::test]
    async fn nonces_differ_between_calls() {
        let cipher = AesGcmCipher::new();
        let a = cipher.encrypt(b"same", &secret(1)).await.expect("encrypt");
        let b = cipher.encrypt(b"same", &secret(1)).await.expect("encrypt");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn wrong_secret_fails_to_decrypt() {
        let cipher = AesGcmCipher::new();
        let sealed = cipher.encrypt(b"x", &secret(1)).await.expect("encrypt");
        let err = cipher
            .decrypt(&sealed, &secret(2))
            .await
            .expect_err("should fail");
        assert!(matches!(err, CipherError::Decrypt { .. }));
    }

    #[tokio::test]
    async fn rejects_short_secret_and_truncated_input() {
        let cipher = AesGcmCipher::new();
        let err = cipher
            .encrypt(b"x", &Secret::new(b"short".to_vec()))
            .await
            .expect_err("short key");
        assert!(matches!(err, CipherError::InvalidSecret { .. }));

        let err = cipher
            .decrypt(&[0u8; 4], &secret(1))
            .await
            .expect_err("truncated");
        assert!(matches!(err, CipherError::Decrypt { .. }));
    }
}
