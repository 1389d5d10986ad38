//! Authenticated encryption envelope.
//!
//! Seals a plaintext payload under a session key as
//! `IV (128 bit) || AES-256-CBC ciphertext || HMAC-SHA-256 (256 bit)`,
//! computed encrypt-then-MAC over `IV || ciphertext || associated
//! header bytes`. Verification failures are reported without ever
//! returning partially-decrypted data.

use crate::error::CryptoError;
use crate::kdf::SessionKey;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of the prepended IV, in bytes.
pub const IV_SIZE: usize = 16;

/// Size of the appended HMAC-SHA-256 tag, in bytes.
pub const MAC_SIZE: usize = 32;

/// Size of the truncated authentication token carried in frame
/// headers (spec §6.1, offset 14, width 8).
pub const TRUNCATED_TAG_SIZE: usize = 8;

/// Minimum length of a sealed envelope (empty plaintext still costs a
/// full padding block under PKCS#7).
pub const MIN_SEALED_SIZE: usize = IV_SIZE + MAC_SIZE;

/// Seal `plaintext` under `key`, authenticating `associated_header`
/// alongside it. Returns `IV || ciphertext || HMAC`.
pub fn seal<R: RngCore + CryptoRng>(
    key: &SessionKey,
    plaintext: &[u8],
    associated_header: &[u8],
    rng: &mut R,
) -> Vec<u8> {
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);

    let ciphertext =
        Aes256CbcEnc::new(key.as_bytes().into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len() + MAC_SIZE);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);

    let tag = compute_mac(key, &out, associated_header);
    out.extend_from_slice(&tag);
    out
}

/// Open a sealed envelope produced by [`seal`]. Verifies the MAC
/// before attempting to decrypt; on any failure the caller must drop
/// the frame and increment its MAC-failure counter rather than retry
/// decryption (spec §4.1, §7).
///
/// # Errors
///
/// Returns [`CryptoError::TooShort`] if `sealed` is smaller than
/// [`MIN_SEALED_SIZE`], [`CryptoError::AuthenticationFailed`] if the
/// MAC does not match, or [`CryptoError::InvalidPadding`] if the MAC
/// matched but the padding was malformed (should not occur for
/// correctly-sealed input).
pub fn open(
    key: &SessionKey,
    sealed: &[u8],
    associated_header: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(CryptoError::TooShort {
            expected: MIN_SEALED_SIZE,
            actual: sealed.len(),
        });
    }

    let (iv_and_ciphertext, received_tag) = sealed.split_at(sealed.len() - MAC_SIZE);
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(iv_and_ciphertext);
    mac.update(associated_header);
    mac.verify_slice(received_tag)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    let (iv, ciphertext) = iv_and_ciphertext.split_at(IV_SIZE);
    Aes256CbcDec::new(key.as_bytes().into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)
}

/// Compute a full-width HMAC-SHA-256 tag over `iv_and_ciphertext || header`.
fn compute_mac(key: &SessionKey, iv_and_ciphertext: &[u8], header: &[u8]) -> [u8; MAC_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(iv_and_ciphertext);
    mac.update(header);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; MAC_SIZE];
    out.copy_from_slice(&result);
    out
}

/// Compute the truncated (64-bit) authentication token carried in
/// on-wire frame headers (spec §6.1). This is independent of the
/// payload-level envelope MAC and authenticates the header fields the
/// frame codec assembles.
#[must_use]
pub fn truncated_tag(key: &SessionKey, header_bytes: &[u8]) -> [u8; TRUNCATED_TAG_SIZE] {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(header_bytes);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; TRUNCATED_TAG_SIZE];
    out.copy_from_slice(&result[..TRUNCATED_TAG_SIZE]);
    out
}

/// Verify a truncated authentication token in constant time.
#[must_use]
pub fn verify_truncated_tag(key: &SessionKey, header_bytes: &[u8], tag: &[u8]) -> bool {
    if tag.len() != TRUNCATED_TAG_SIZE {
        return false;
    }
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(header_bytes);
    mac.verify_truncated_left(tag).is_ok()
}
