// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM encrypt/decrypt with a detached tag.

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use super::{CryptoError, DataKey, NONCE_LEN, TAG_LEN};

/// Output of one encryption: the ciphertext plus the values needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub auth_tag: [u8; TAG_LEN],
}

fn bind_key(key: &DataKey) -> Result<LessSafeKey, CryptoError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: AES_256_GCM.key_len(),
            actual: key.as_bytes().len(),
        }
    })?;
    Ok(LessSafeKey::new(unbound))
}

fn generate_nonce() -> Result<[u8; NONCE_LEN], CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::Randomness)?;
    Ok(nonce)
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(plaintext: &[u8], key: &DataKey) -> Result<SealedPayload, CryptoError> {
    let key = bind_key(key)?;
    let nonce = generate_nonce()?;

    let mut ciphertext = plaintext.to_vec();
    let tag = key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::empty(),
            &mut ciphertext,
        )
        .map_err(|_| CryptoError::Encryption)?;

    let auth_tag: [u8; TAG_LEN] = tag
        .as_ref()
        .try_into()
        .map_err(|_| CryptoError::Encryption)?;

    Ok(SealedPayload {
        ciphertext,
        nonce,
        auth_tag,
    })
}

/// Verify and decrypt.
///
/// `nonce` and `auth_tag` come straight from storage, so a wrong length is
/// treated like any other tampering and reported as [`CryptoError::Integrity`].
/// The tag is checked before any plaintext is returned.
pub fn decrypt(
    ciphertext: &[u8],
    key: &DataKey,
    nonce: &[u8],
    auth_tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| CryptoError::Integrity)?;
    if auth_tag.len() != TAG_LEN {
        return Err(CryptoError::Integrity);
    }

    let key = bind_key(key)?;

    let mut in_out = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    in_out.extend_from_slice(ciphertext);
    in_out.extend_from_slice(auth_tag);

    let plaintext_len = key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Integrity)?
        .len();

    in_out.truncate(plaintext_len);
    Ok(in_out)
}

// Compile-time guard that the detached tag matches what ring produces.
const _: () = assert!(TAG_LEN == aead::MAX_TAG_LEN);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn key() -> DataKey {
        DataKey::from_slice(&[7u8; 32]).unwrap()
    }

    #[test]
    fn round_trip_returns_original_bytes() {
        let key = key();
        for input in [&b""[..], &b"hello"[..], &[0u8; 4096][..]] {
            let sealed = encrypt(input, &key).unwrap();
            let opened = decrypt(&sealed.ciphertext, &key, &sealed.nonce, &sealed.auth_tag).unwrap();
            assert_eq!(opened, input);
        }
    }

    #[test]
    fn ciphertext_does_not_contain_plaintext() {
        let key = key();
        let sealed = encrypt(b"hello hello hello", &key).unwrap();
        assert_ne!(sealed.ciphertext, b"hello hello hello");
    }

    #[test]
    fn flipping_any_ciphertext_bit_fails_integrity() {
        let key = key();
        let sealed = encrypt(b"attack at dawn", &key).unwrap();
        for byte in 0..sealed.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = sealed.ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&tampered, &key, &sealed.nonce, &sealed.auth_tag);
                assert_eq!(result, Err(CryptoError::Integrity));
            }
        }
    }

    #[test]
    fn flipping_any_nonce_bit_fails_integrity() {
        let key = key();
        let sealed = encrypt(b"attack at dawn", &key).unwrap();
        for byte in 0..NONCE_LEN {
            for bit in 0..8 {
                let mut nonce = sealed.nonce;
                nonce[byte] ^= 1 << bit;
                let result = decrypt(&sealed.ciphertext, &key, &nonce, &sealed.auth_tag);
                assert_eq!(result, Err(CryptoError::Integrity));
            }
        }
    }

    #[test]
    fn flipping_any_tag_bit_fails_integrity() {
        let key = key();
        let sealed = encrypt(b"attack at dawn", &key).unwrap();
        for byte in 0..TAG_LEN {
            for bit in 0..8 {
                let mut tag = sealed.auth_tag;
                tag[byte] ^= 1 << bit;
                let result = decrypt(&sealed.ciphertext, &key, &sealed.nonce, &tag);
                assert_eq!(result, Err(CryptoError::Integrity));
            }
        }
    }

    #[test]
    fn wrong_key_fails_integrity() {
        let sealed = encrypt(b"secret", &key()).unwrap();
        let other = DataKey::from_slice(&[8u8; 32]).unwrap();
        let result = decrypt(&sealed.ciphertext, &other, &sealed.nonce, &sealed.auth_tag);
        assert_eq!(result, Err(CryptoError::Integrity));
    }

    #[test]
    fn truncated_nonce_or_tag_is_integrity_error() {
        let key = key();
        let sealed = encrypt(b"secret", &key).unwrap();
        assert_eq!(
            decrypt(&sealed.ciphertext, &key, &sealed.nonce[..11], &sealed.auth_tag),
            Err(CryptoError::Integrity)
        );
        assert_eq!(
            decrypt(&sealed.ciphertext, &key, &sealed.nonce, &sealed.auth_tag[..15]),
            Err(CryptoError::Integrity)
        );
    }

    #[test]
    fn nonces_are_unique_across_encryptions() {
        let key = key();
        let nonces: HashSet<[u8; NONCE_LEN]> = (0..1000)
            .map(|_| encrypt(b"same input", &key).unwrap().nonce)
            .collect();
        assert_eq!(nonces.len(), 1000);
    }
}
