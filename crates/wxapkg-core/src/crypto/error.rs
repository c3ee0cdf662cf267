//! Error type for encrypted-package decryption.

/// Why an encrypted package could not be decrypted.
#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    /// Missing `V1MMWX` marker: plain package or not a wxapkg at all.
    #[error("not an encrypted wxapkg (marker {found:?} != \"V1MMWX\")")]
    NotEncrypted { found: String },
    /// Shorter than marker + encrypted head.
    #[error("encrypted package truncated: {len} bytes")]
    Truncated { len: usize },
    /// AES head did not unpad; almost always a wrong wxid.
    #[error("AES head did not decrypt; wrong wxid or parameters")]
    BadKey,
    #[error("IV must be 16 bytes, got {len}")]
    InvalidIv { len: usize },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
