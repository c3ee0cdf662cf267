//! Error type for wxapkg container parsing.

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Byte 0 is not 0xBE or byte 13 is not 0xED (also raised for inputs under 14 bytes).
    #[error("not a wxapkg package (header marks missing)")]
    BadMagic,
    #[error("package index lists no files")]
    EmptyIndex,
    #[error("file name length {len} exceeds limit")]
    NameTooLong { len: u32 },
    /// Index read ran past the end of the buffer.
    #[error("package index truncated at byte {at}")]
    Truncated { at: usize },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
