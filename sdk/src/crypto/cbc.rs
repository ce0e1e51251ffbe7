//! # AES-CBC Codec
//!
//! Symmetric encryption as the platform does it: AES in CBC mode with PKCS#7
//! padding. Used to recover the identity envelope a mini-program hands back
//! after login, and available as a general-purpose payload codec.
//!
//! There are two schemes here and they are not interchangeable:
//!
//! - **Explicit IV** ([`encrypt`], [`decrypt`], [`decrypt_envelope`]): the
//!   caller supplies a 16-byte IV. This is what the identity envelope uses.
//! - **Key-as-IV** ([`encrypt_with_key_iv`], [`decrypt_with_key_iv`]): the
//!   IV is the first 16 bytes of the key. Weaker (the IV never changes for a
//!   key) and kept only for payloads produced by older integrations.
//!
//! ## Padding
//!
//! CBC gives no integrity. The padding check is the only signal that the key
//! or ciphertext is wrong, so it is strict: the pad length must be in
//! `1..=16`, fit inside the buffer, and every pad byte must equal it. A
//! violation is [`CodecError::InvalidPadding`], never a silently truncated
//! plaintext.
//!
//! Key and IV lengths are checked before any cipher object is built.

use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{AES_BLOCK_SIZE, AES_KEY_LENGTHS, SESSION_KEY_LENGTH};

/// Failures of the symmetric codec.
///
/// All of these are input-validation failures: wrong key, wrong IV, or a
/// ciphertext that does not decrypt to well-formed padding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid key length: got {actual} bytes, expected one of {expected:?}")]
    InvalidKeyLength {
        actual: usize,
        expected: &'static [usize],
    },

    #[error("invalid IV length: got {actual} bytes, expected {AES_BLOCK_SIZE}")]
    InvalidIvLength { actual: usize },

    #[error("invalid base64 in {field}")]
    InvalidBase64 { field: &'static str },

    #[error("ciphertext is empty")]
    EmptyCiphertext,

    #[error("ciphertext length {len} is not a multiple of {AES_BLOCK_SIZE}")]
    NotBlockAligned { len: usize },

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    InvalidPadding,

    #[error("PKCS#7 block size must be 1..=255, got {0}")]
    InvalidBlockSize(usize),
}

const SESSION_KEY_LENGTHS: &[usize] = &[SESSION_KEY_LENGTH];

// ---------------------------------------------------------------------------
// PKCS#7
// ---------------------------------------------------------------------------

/// Append PKCS#7 padding up to the next multiple of `block_size`.
///
/// Always adds at least one byte; a full block of padding when the input is
/// already aligned.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> Result<Vec<u8>, CodecError> {
    let block = check_block_size(block_size)?;
    let pad = block - data.len() % block;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    out.resize(data.len() + pad, pad as u8);
    Ok(out)
}

/// Strip and validate PKCS#7 padding.
pub fn pkcs7_unpad(data: &[u8], block_size: usize) -> Result<&[u8], CodecError> {
    check_block_size(block_size)?;
    let pad = *data.last().ok_or(CodecError::InvalidPadding)? as usize;
    if pad == 0 || pad > block_size || pad > data.len() {
        return Err(CodecError::InvalidPadding);
    }
    let (body, padding) = data.split_at(data.len() - pad);
    if padding.iter().any(|&b| b as usize != pad) {
        return Err(CodecError::InvalidPadding);
    }
    Ok(body)
}

// The pad length is stored in a single byte.
fn check_block_size(block_size: usize) -> Result<usize, CodecError> {
    match u8::try_from(block_size) {
        Ok(size) if size > 0 => Ok(block_size),
        _ => Err(CodecError::InvalidBlockSize(block_size)),
    }
}

// ---------------------------------------------------------------------------
// Raw CBC
// ---------------------------------------------------------------------------

fn check_key(key: &[u8], allowed: &'static [usize]) -> Result<(), CodecError> {
    if allowed.contains(&key.len()) {
        Ok(())
    } else {
        Err(CodecError::InvalidKeyLength {
            actual: key.len(),
            expected: allowed,
        })
    }
}

fn check_iv(iv: &[u8]) -> Result<(), CodecError> {
    if iv.len() == AES_BLOCK_SIZE {
        Ok(())
    } else {
        Err(CodecError::InvalidIvLength { actual: iv.len() })
    }
}

fn check_ciphertext(ciphertext: &[u8]) -> Result<(), CodecError> {
    if ciphertext.is_empty() {
        return Err(CodecError::EmptyCiphertext);
    }
    if ciphertext.len() % AES_BLOCK_SIZE != 0 {
        return Err(CodecError::NotBlockAligned {
            len: ciphertext.len(),
        });
    }
    Ok(())
}

/// CBC-encrypt block-aligned data. Lengths are validated by the caller.
fn cbc_encrypt_aligned(key: &[u8], iv: &[u8], aligned: &[u8]) -> Result<Vec<u8>, CodecError> {
    let invalid_key = || CodecError::InvalidKeyLength {
        actual: key.len(),
        expected: &AES_KEY_LENGTHS,
    };
    let out = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .encrypt_padded_vec_mut::<NoPadding>(aligned),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .encrypt_padded_vec_mut::<NoPadding>(aligned),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .encrypt_padded_vec_mut::<NoPadding>(aligned),
        _ => return Err(invalid_key()),
    };
    Ok(out)
}

/// CBC-decrypt block-aligned data without touching the padding.
fn cbc_decrypt_aligned(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
    let invalid_key = || CodecError::InvalidKeyLength {
        actual: key.len(),
        expected: &AES_KEY_LENGTHS,
    };
    let out = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| invalid_key())?
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext),
        _ => return Err(invalid_key()),
    };
    out.map_err(|_| CodecError::NotBlockAligned {
        len: ciphertext.len(),
    })
}

// ---------------------------------------------------------------------------
// Explicit-IV scheme
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` with AES-CBC and PKCS#7 padding.
///
/// `key` selects AES-128/192/256 by length (16/24/32 bytes). `iv` must be
/// 16 bytes.
///
/// # Example
///
/// ```
/// use wechat_sdk::crypto::cbc::{decrypt, encrypt};
///
/// let key = [7u8; 16];
/// let iv = [9u8; 16];
/// let sealed = encrypt(&key, &iv, b"hello").unwrap();
/// assert_eq!(decrypt(&key, &iv, &sealed).unwrap(), b"hello");
/// ```
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    check_key(key, &AES_KEY_LENGTHS)?;
    check_iv(iv)?;
    cbc_encrypt_aligned(key, iv, &pkcs7_pad(plaintext, AES_BLOCK_SIZE)?)
}

/// Decrypt AES-CBC ciphertext and strip PKCS#7 padding.
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
    check_key(key, &AES_KEY_LENGTHS)?;
    check_iv(iv)?;
    check_ciphertext(ciphertext)?;
    let padded = Zeroizing::new(cbc_decrypt_aligned(key, iv, ciphertext)?);
    Ok(pkcs7_unpad(&padded, AES_BLOCK_SIZE)?.to_vec())
}

fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(value.trim())
        .map_err(|_| CodecError::InvalidBase64 { field })
}

/// Decrypt a base64 identity envelope: session key, IV and ciphertext.
///
/// The session key must decode to exactly 16 bytes (AES-128). That is
/// checked, along with the IV, before anything is decrypted.
pub fn decrypt_envelope(
    session_key_b64: &str,
    iv_b64: &str,
    ciphertext_b64: &str,
) -> Result<Vec<u8>, CodecError> {
    let key = Zeroizing::new(decode_b64("session_key", session_key_b64)?);
    check_key(&key, SESSION_KEY_LENGTHS)?;
    let iv = decode_b64("iv", iv_b64)?;
    check_iv(&iv)?;
    let ciphertext = decode_b64("encrypted_data", ciphertext_b64)?;
    decrypt(&key, &iv, &ciphertext)
}

/// Encrypt and base64-encode, the inverse of [`decrypt_envelope`].
///
/// The platform never asks us to produce envelopes; this exists for tests
/// and for services that mimic the platform.
pub fn encrypt_envelope(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<String, CodecError> {
    check_key(key, SESSION_KEY_LENGTHS)?;
    Ok(STANDARD.encode(encrypt(key, iv, plaintext)?))
}

// ---------------------------------------------------------------------------
// Key-as-IV scheme
// ---------------------------------------------------------------------------

/// Encrypt with the key's first 16 bytes as the IV.
pub fn encrypt_with_key_iv(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    check_key(key, &AES_KEY_LENGTHS)?;
    encrypt(key, &key[..AES_BLOCK_SIZE], plaintext)
}

/// Decrypt data produced by [`encrypt_with_key_iv`].
pub fn decrypt_with_key_iv(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
    check_key(key, &AES_KEY_LENGTHS)?;
    decrypt(key, &key[..AES_BLOCK_SIZE], ciphertext)
}
