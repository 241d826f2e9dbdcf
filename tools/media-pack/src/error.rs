/// Media database errors
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("not a media database (bad magic bytes)")]
    BadMagic,

    #[error("unsupported media database version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("failed to decode media database: {0}")]
    Decode(String),

    #[error("file '{0}' not found in media database")]
    NotFound(String),

    /// Entry is encrypted but no password was supplied
    #[error("file '{0}' is encrypted, a password is required")]
    PasswordRequired(String),

    #[error("failed to decrypt '{name}': {reason}")]
    Decrypt { name: String, reason: String },

    #[error("failed to decompress '{name}': {reason}")]
    Decompress { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
