//! Decryption of packages encrypted by the PC WeChat client.
//!
//! Layout of an encrypted package: the ASCII marker `V1MMWX`, then 1024 bytes
//! of AES-256-CBC (PKCS#7) covering the first 1023 plain bytes, then the rest
//! of the plain package XORed with a single byte derived from the app id.
//! The AES key is PBKDF2-HMAC-SHA1 over the app id.

mod error;

pub use error::DecryptError;

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha1::Sha1;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::config::DecryptConfig;

/// Marker prefixed to encrypted packages.
pub const ENCRYPTED_MARKER: &[u8; 6] = b"V1MMWX";
pub const DEFAULT_IV: &[u8; 16] = b"the iv: 16 bytes";
pub const DEFAULT_SALT: &[u8] = b"saltiest";
pub const PBKDF2_ITERATIONS: u32 = 1000;
const AES_KEY_LEN: usize = 32;
/// Encrypted head length on disk.
const HEAD_CIPHER_LEN: usize = 1024;
/// Plain bytes covered by the encrypted head.
const HEAD_PLAIN_LEN: usize = 1023;
const DEFAULT_XOR_KEY: u8 = 0x66;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// IV and salt used for key derivation and the CBC head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptParams {
    pub iv: [u8; 16],
    pub salt: Vec<u8>,
}

impl Default for DecryptParams {
    fn default() -> Self {
        Self {
            iv: *DEFAULT_IV,
            salt: DEFAULT_SALT.to_vec(),
        }
    }
}

impl DecryptParams {
    /// Build from optional overrides; the IV must be exactly 16 bytes.
    pub fn new(iv: Option<&str>, salt: Option<&str>) -> Result<Self, DecryptError> {
        let mut params = Self::default();
        if let Some(iv) = iv {
            params.iv = iv
                .as_bytes()
                .try_into()
                .map_err(|_| DecryptError::InvalidIv { len: iv.len() })?;
        }
        if let Some(salt) = salt {
            params.salt = salt.as_bytes().to_vec();
        }
        Ok(params)
    }

    pub fn from_config(cfg: Option<&DecryptConfig>) -> Result<Self, DecryptError> {
        match cfg {
            Some(c) => Self::new(c.iv.as_deref(), c.salt.as_deref()),
            None => Ok(Self::default()),
        }
    }
}

/// True when `data` starts with the encryption marker.
pub fn is_encrypted(data: &[u8]) -> bool {
    data.starts_with(ENCRYPTED_MARKER)
}

/// Checks only the first bytes of the file. A missing or short file is not encrypted.
pub fn is_encrypted_path(path: &Path) -> Result<bool, DecryptError> {
    let mut f = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let mut head = [0u8; ENCRYPTED_MARKER.len()];
    match f.read_exact(&mut head) {
        Ok(()) => Ok(is_encrypted(&head)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// PBKDF2-HMAC-SHA1, 1000 rounds, 32-byte key.
pub fn derive_key(wxid: &str, salt: &[u8]) -> [u8; AES_KEY_LEN] {
    let mut key = [0u8; AES_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha1>(wxid.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Second-to-last character of the wxid, or `0x66` for ids shorter than 2.
pub fn xor_key(wxid: &str) -> u8 {
    wxid.chars()
        .rev()
        .nth(1)
        .map(|c| c as u32 as u8)
        .unwrap_or(DEFAULT_XOR_KEY)
}

/// Decrypt an encrypted package held in memory.
pub fn decrypt(wxid: &str, data: &[u8], params: &DecryptParams) -> Result<Vec<u8>, DecryptError> {
    if !is_encrypted(data) {
        let found = String::from_utf8_lossy(&data[..data.len().min(ENCRYPTED_MARKER.len())]);
        return Err(DecryptError::NotEncrypted {
            found: found.into_owned(),
        });
    }
    let body = &data[ENCRYPTED_MARKER.len()..];
    if body.len() < HEAD_CIPHER_LEN {
        return Err(DecryptError::Truncated { len: data.len() });
    }
    let (head, tail) = body.split_at(HEAD_CIPHER_LEN);

    let key = derive_key(wxid, &params.salt);
    let mut buf = head.to_vec();
    let plain_head = Aes256CbcDec::new(&key.into(), &params.iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| DecryptError::BadKey)?;
    if plain_head.len() < HEAD_PLAIN_LEN {
        return Err(DecryptError::BadKey);
    }

    let xor = xor_key(wxid);
    let mut out = Vec::with_capacity(HEAD_PLAIN_LEN + tail.len());
    out.extend_from_slice(&plain_head[..HEAD_PLAIN_LEN]);
    out.extend(tail.iter().map(|b| b ^ xor));
    Ok(out)
}

/// Inverse of [`decrypt`]: produce the on-disk form the PC client writes.
/// `plain` must hold at least 1023 bytes.
pub fn encrypt(wxid: &str, plain: &[u8], params: &DecryptParams) -> Result<Vec<u8>, DecryptError> {
    if plain.len() < HEAD_PLAIN_LEN {
        return Err(DecryptError::Truncated { len: plain.len() });
    }
    let (head, tail) = plain.split_at(HEAD_PLAIN_LEN);
    let key = derive_key(wxid, &params.salt);
    let mut buf = [0u8; HEAD_CIPHER_LEN];
    buf[..HEAD_PLAIN_LEN].copy_from_slice(head);
    let cipher_head = Aes256CbcEnc::new(&key.into(), &params.iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buf, HEAD_PLAIN_LEN)
        .map_err(|_| DecryptError::Truncated { len: plain.len() })?;

    let xor = xor_key(wxid);
    let mut out = Vec::with_capacity(ENCRYPTED_MARKER.len() + HEAD_CIPHER_LEN + tail.len());
    out.extend_from_slice(ENCRYPTED_MARKER);
    out.extend_from_slice(cipher_head);
    out.extend(tail.iter().map(|b| b ^ xor));
    Ok(out)
}

/// Decrypt `src` into `dst`, creating `dst`'s parent directories.
pub fn decrypt_file(
    wxid: &str,
    src: &Path,
    dst: &Path,
    params: &DecryptParams,
) -> Result<usize, DecryptError> {
    let data = fs::read(src)?;
    let plain = decrypt(wxid, &data, params)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dst, &plain)?;
    tracing::debug!(
        "decrypted {} -> {} ({} bytes)",
        src.display(),
        dst.display(),
        plain.len()
    );
    Ok(plain.len())
}
