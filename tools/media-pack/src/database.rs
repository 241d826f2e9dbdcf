//! Keyed media database
//!
//! # Layout
//! ```text
//! 0x00: magic "MDPK"
//! 0x04: bitcode-encoded DatabaseFile { version, entries }
//! ```
//!
//! Entries are keyed by database name; storing a name again replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bitcode::{Decode, Encode};

use crate::compress;
use crate::encrypt;
use crate::error::MediaError;

pub const MEDIA_DB_MAGIC: &[u8; 4] = b"MDPK";
pub const MEDIA_DB_VERSION: u32 = 1;

/// One stored file
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct StoredFile {
    /// Database name (mapped, forward slashes)
    pub name: String,
    /// Source modification time, whole seconds since the Unix epoch
    pub mtime: u64,
    /// LZ4 block size, 0 when stored uncompressed
    pub compressed_size: u64,
    pub original_size: u64,
    pub encrypted: bool,
    pub data: Vec<u8>,
}

#[derive(Encode, Decode)]
struct DatabaseFile {
    version: u32,
    entries: Vec<StoredFile>,
}

/// In-memory view of a media database file
#[derive(Debug)]
pub struct MediaDatabase {
    path: PathBuf,
    entries: BTreeMap<String, StoredFile>,
}

impl MediaDatabase {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, MediaError> {
        let entries = if path.exists() {
            decode(&std::fs::read(path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&StoredFile> {
        self.entries.get(name)
    }

    /// Stored modification time of `name`, 0 when absent.
    pub fn stored_mtime(&self, name: &str) -> u64 {
        self.entries.get(name).map_or(0, |file| file.mtime)
    }

    /// Insert or replace an entry.
    pub fn store(&mut self, file: StoredFile) {
        self.entries.insert(file.name.clone(), file);
    }

    /// Write the database, replacing the previous file atomically.
    pub fn save(&self) -> Result<(), MediaError> {
        let mut bytes = MEDIA_DB_MAGIC.to_vec();
        bytes.extend(bitcode::encode(&DatabaseFile {
            version: MEDIA_DB_VERSION,
            entries: self.entries.values().cloned().collect(),
        }));

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        std::fs::write(&temp, &bytes)?;
        std::fs::rename(&temp, &self.path)?;
        tracing::debug!("Saved {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    /// Original contents of `name`, decrypted and decompressed.
    pub fn read(&self, name: &str, password: Option<&str>) -> Result<Vec<u8>, MediaError> {
        let file = self
            .entries
            .get(name)
            .ok_or_else(|| MediaError::NotFound(name.to_string()))?;

        let mut data = if file.encrypted {
            let password = password.ok_or_else(|| MediaError::PasswordRequired(name.to_string()))?;
            encrypt::decrypt(&file.data, password, name).map_err(|reason| MediaError::Decrypt {
                name: name.to_string(),
                reason,
            })?
        } else {
            file.data.clone()
        };

        if file.compressed_size == 0 {
            data.truncate(file.original_size as usize);
            return Ok(data);
        }

        data.truncate(file.compressed_size as usize);
        compress::decompress(&data, file.original_size as usize).map_err(|e| {
            MediaError::Decompress {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

fn decode(bytes: &[u8]) -> Result<BTreeMap<String, StoredFile>, MediaError> {
    if bytes.len() < 4 || &bytes[0..4] != MEDIA_DB_MAGIC {
        return Err(MediaError::BadMagic);
    }
    let file: DatabaseFile =
        bitcode::decode(&bytes[4..]).map_err(|e| MediaError::Decode(e.to_string()))?;
    if file.version != MEDIA_DB_VERSION {
        return Err(MediaError::UnsupportedVersion {
            found: file.version,
            expected: MEDIA_DB_VERSION,
        });
    }
    Ok(file
        .entries
        .into_iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect())
}
