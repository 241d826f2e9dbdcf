//! Optional per-file encryption
//!
//! AES-128-CBC with a key derived from the password by PBKDF2-HMAC-SHA256,
//! salted with the file's database name. Plaintext is zero padded to a
//! 32-byte boundary (a full block of padding when already aligned) and stored
//! as `iv || ciphertext`.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha2::Sha256;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const KEY_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const PBKDF2_ROUNDS: u32 = 1000;
const PADDING_ALIGNMENT: usize = 32;

pub fn derive_key(password: &str, salt: &str) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut key);
    key
}

/// Zero pad to the next 32-byte boundary, always adding at least one byte.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let padding = PADDING_ALIGNMENT - data.len() % PADDING_ALIGNMENT;
    let mut padded = Vec::with_capacity(data.len() + padding);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding, 0);
    padded
}

pub fn encrypt(data: &[u8], password: &str, salt: &str) -> Vec<u8> {
    let key = derive_key(password, salt);
    let iv: [u8; IV_SIZE] = rand::random();
    let ciphertext =
        Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<NoPadding>(&pad(data));

    let mut stored = Vec::with_capacity(IV_SIZE + ciphertext.len());
    stored.extend_from_slice(&iv);
    stored.extend_from_slice(&ciphertext);
    stored
}

/// Reverse [`encrypt`]. The result still carries the zero padding.
pub fn decrypt(stored: &[u8], password: &str, salt: &str) -> Result<Vec<u8>, String> {
    if stored.len() < IV_SIZE {
        return Err(format!("{} bytes is shorter than the IV", stored.len()));
    }
    let (iv, ciphertext) = stored.split_at(IV_SIZE);
    let key = derive_key(password, salt);
    let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| "invalid IV".to_string())?;

    Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| format!("ciphertext length {} is not block aligned", ciphertext.len()))
}
