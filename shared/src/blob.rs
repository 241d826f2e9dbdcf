//! Permutation blob container (`.bin`)
//!
//! One blob holds every compiled permutation of a shader. Each permutation is
//! keyed by the CRC-32 of its define list, so a loader can locate it from the
//! defines it wants without parsing the stored keys.
//!
//! # Layout
//! ```text
//! 0x00: magic "NVSP"
//! repeated:
//!   0x00: hash_key_size u32
//!   0x04: data_size     u32
//!   0x08: data_crc      u32   (CRC-32 of the payload)
//!   0x0C: define_hash   u32   (CRC-32 of the hash key)
//!   0x10: flags         u32   (ShaderFlags)
//!   0x14: hash key bytes (hash_key_size)
//!   ....: payload bytes (data_size)
//! ```
//!
//! All integers are little-endian.

use std::io::{self, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::flags::ShaderFlags;

/// Magic bytes at the start of every permutation blob.
pub const PERMUTATION_BLOB_MAGIC: &[u8; 4] = b"NVSP";

/// Key text used for the permutation without any defines.
const DEFAULT_PERMUTATION_NAME: &str = "<default>";

/// Errors returned when looking up a permutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    /// The data has no blob magic, but specific defines were requested
    #[error("data is not a permutation blob, cannot select permutation '{key}'")]
    NotPermutationBlob { key: String },

    /// No record matched the requested defines
    #[error("permutation '{key}' not found in blob")]
    NotFound { key: String },

    /// A record matched but its payload failed the checksum
    #[error("permutation '{key}' is corrupted (payload checksum mismatch)")]
    ChecksumMismatch { key: String },
}

/// Fixed-size header in front of every blob record (20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobEntryHeader {
    pub hash_key_size: u32,
    pub data_size: u32,
    pub data_crc: u32,
    pub define_hash: u32,
    pub flags: ShaderFlags,
}

impl BlobEntryHeader {
    pub const SIZE: usize = 20;

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.hash_key_size);
        LittleEndian::write_u32(&mut bytes[4..8], self.data_size);
        LittleEndian::write_u32(&mut bytes[8..12], self.data_crc);
        LittleEndian::write_u32(&mut bytes[12..16], self.define_hash);
        LittleEndian::write_u32(&mut bytes[16..20], self.flags.bits());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            hash_key_size: LittleEndian::read_u32(&bytes[0..4]),
            data_size: LittleEndian::read_u32(&bytes[4..8]),
            data_crc: LittleEndian::read_u32(&bytes[8..12]),
            define_hash: LittleEndian::read_u32(&bytes[12..16]),
            flags: ShaderFlags::from_bits_retain(LittleEndian::read_u32(&bytes[16..20])),
        })
    }
}

/// Build the hash key for a define list: every define followed by `;`.
///
/// Defines are taken verbatim (`NAME` or `NAME=VALUE`), order preserved.
pub fn hash_key<S: AsRef<str>>(defines: &[S]) -> String {
    let mut key = String::new();
    for define in defines {
        key.push_str(define.as_ref());
        key.push(';');
    }
    key
}

/// Build the hash key a loader uses for `(name, value)` shader constants.
pub fn constant_hash_key(constants: &[(&str, &str)]) -> String {
    let mut key = String::new();
    for (name, value) in constants {
        key.push_str(name);
        key.push('=');
        key.push_str(value);
        key.push(';');
    }
    key
}

/// Permutation identity: CRC-32 (zlib polynomial) of the hash key.
pub fn permutation_hash(hash_key: &str) -> u32 {
    crc32fast::hash(hash_key.as_bytes())
}

/// Streaming writer for permutation blobs.
pub struct BlobWriter<W: Write> {
    writer: W,
    entry_count: usize,
}

impl<W: Write> BlobWriter<W> {
    /// Create a writer and emit the blob magic.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writer.write_all(PERMUTATION_BLOB_MAGIC)?;
        Ok(Self {
            writer,
            entry_count: 0,
        })
    }

    /// Append one permutation record.
    pub fn write_entry(
        &mut self,
        hash_key: &str,
        define_hash: u32,
        flags: ShaderFlags,
        data: &[u8],
    ) -> io::Result<()> {
        let header = BlobEntryHeader {
            hash_key_size: to_u32(hash_key.len(), "hash key")?,
            data_size: to_u32(data.len(), "payload")?,
            data_crc: crc32fast::hash(data),
            define_hash,
            flags,
        };

        self.writer.write_all(&header.to_bytes())?;
        self.writer.write_all(hash_key.as_bytes())?;
        self.writer.write_all(data)?;
        self.entry_count += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn to_u32(len: usize, what: &str) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} too large for blob record ({} bytes)", what, len),
        )
    })
}

/// One record borrowed from a blob.
struct BlobRecord<'a> {
    header: BlobEntryHeader,
    hash_key: &'a [u8],
    data: &'a [u8],
}

/// Walk the records after the magic.
///
/// Stops at an empty record or at the first record that does not fit in the
/// remaining bytes.
fn records(body: &[u8]) -> impl Iterator<Item = BlobRecord<'_>> {
    let mut rest = body;
    std::iter::from_fn(move || {
        if rest.len() <= BlobEntryHeader::SIZE {
            return None;
        }
        let header = BlobEntryHeader::from_bytes(rest)?;
        if header.data_size == 0 {
            return None;
        }

        let key_end = BlobEntryHeader::SIZE + header.hash_key_size as usize;
        let end = key_end + header.data_size as usize;
        if rest.len() < end {
            return None;
        }

        let record = BlobRecord {
            header,
            hash_key: &rest[BlobEntryHeader::SIZE..key_end],
            data: &rest[key_end..end],
        };
        rest = &rest[end..];
        Some(record)
    })
}

/// Locate the payload for a set of shader constants.
///
/// Data without the blob magic is treated as a single unpermuted shader: it
/// is returned as-is when no constants are requested.
pub fn find_permutation<'a>(
    blob: &'a [u8],
    constants: &[(&str, &str)],
) -> Result<&'a [u8], BlobError> {
    let key = constant_hash_key(constants);

    let Some(body) = blob.strip_prefix(PERMUTATION_BLOB_MAGIC.as_slice()) else {
        if constants.is_empty() {
            return Ok(blob);
        }
        return Err(BlobError::NotPermutationBlob { key });
    };

    let define_hash = permutation_hash(&key);
    for record in records(body) {
        if record.header.define_hash != define_hash {
            continue;
        }
        if crc32fast::hash(record.data) != record.header.data_crc {
            return Err(BlobError::ChecksumMismatch { key });
        }
        return Ok(record.data);
    }

    Err(BlobError::NotFound { key })
}

/// List the hash keys of all permutations stored in a blob.
///
/// Returns an empty list for data that is not a permutation blob.
pub fn enumerate_permutations(blob: &[u8]) -> Vec<String> {
    let Some(body) = blob.strip_prefix(PERMUTATION_BLOB_MAGIC.as_slice()) else {
        return Vec::new();
    };

    records(body)
        .map(|record| {
            if record.hash_key.is_empty() {
                DEFAULT_PERMUTATION_NAME.to_string()
            } else {
                String::from_utf8_lossy(record.hash_key).into_owned()
            }
        })
        .collect()
}

/// Human-readable explanation for a failed lookup, listing what is available.
pub fn format_not_found_message(blob: &[u8], constants: &[(&str, &str)]) -> String {
    let mut message = String::from(
        "Couldn't find the required shader permutation in the blob, or the blob is corrupted.\n",
    );
    message.push_str("Required permutation key: \n");
    if constants.is_empty() {
        message.push_str(DEFAULT_PERMUTATION_NAME);
    } else {
        message.push_str(&constant_hash_key(constants));
    }
    message.push('\n');

    let permutations = enumerate_permutations(blob);
    if permutations.is_empty() {
        message.push_str("No permutations found in the blob.");
    } else {
        message.push_str("Permutations available in the blob:\n");
        for key in permutations {
            message.push_str(&key);
            message.push('\n');
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> Vec<u8> {
        let mut writer = BlobWriter::new(Vec::new()).unwrap();
        let key_a = hash_key(&["MODE=0"]);
        let key_b = hash_key(&["MODE=1", "FAST=1"]);
        writer
            .write_entry(&key_a, permutation_hash(&key_a), ShaderFlags::DXIL, b"payload-a")
            .unwrap();
        writer
            .write_entry(
                &key_b,
                permutation_hash(&key_b),
                ShaderFlags::DXIL | ShaderFlags::WAVE_MATCH,
                b"payload-b",
            )
            .unwrap();
        assert_eq!(writer.entry_count(), 2);
        writer.finish().unwrap()
    }

    #[test]
    fn test_header_layout() {
        let header = BlobEntryHeader {
            hash_key_size: 1,
            data_size: 2,
            data_crc: 3,
            define_hash: 4,
            flags: ShaderFlags::SPIRV,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[4, 0, 0, 0]);
        assert_eq!(BlobEntryHeader::from_bytes(&bytes), Some(header));
        assert_eq!(BlobEntryHeader::from_bytes(&bytes[..19]), None);
    }

    #[test]
    fn test_hash_key_format() {
        assert_eq!(hash_key::<&str>(&[]), "");
        assert_eq!(hash_key(&["A=1", "B"]), "A=1;B;");
        assert_eq!(constant_hash_key(&[("A", "1"), ("B", "2")]), "A=1;B=2;");
    }

    #[test]
    fn test_permutation_hash_is_zlib_crc32() {
        // Reference values from zlib.crc32
        assert_eq!(permutation_hash(""), 0);
        assert_eq!(permutation_hash("123456789"), 0xcbf4_3926);
    }

    #[test]
    fn test_permutation_hash_depends_on_order() {
        let ab = permutation_hash(&hash_key(&["A=1", "B=1"]));
        let ba = permutation_hash(&hash_key(&["B=1", "A=1"]));
        assert_ne!(ab, ba);
        assert_eq!(ab, permutation_hash(&hash_key(&["A=1", "B=1"])));
    }

    #[test]
    fn test_blob_starts_with_magic() {
        let blob = sample_blob();
        assert_eq!(&blob[0..4], PERMUTATION_BLOB_MAGIC);
        let first = BlobEntryHeader::from_bytes(&blob[4..]).unwrap();
        assert_eq!(first.hash_key_size as usize, "MODE=0;".len());
        assert_eq!(first.data_size as usize, b"payload-a".len());
        assert_eq!(first.flags, ShaderFlags::DXIL);
    }

    #[test]
    fn test_written_record_matches_header_encoding() {
        let blob = sample_blob();
        let key = hash_key(&["MODE=0"]);
        let expected = BlobEntryHeader {
            hash_key_size: key.len() as u32,
            data_size: b"payload-a".len() as u32,
            data_crc: crc32fast::hash(b"payload-a"),
            define_hash: permutation_hash(&key),
            flags: ShaderFlags::DXIL,
        };
        assert_eq!(&blob[4..4 + BlobEntryHeader::SIZE], &expected.to_bytes());

        let second = 4 + BlobEntryHeader::SIZE + key.len() + b"payload-a".len();
        let header = BlobEntryHeader::from_bytes(&blob[second..]).unwrap();
        assert_eq!(header.flags, ShaderFlags::DXIL | ShaderFlags::WAVE_MATCH);
        assert_eq!(&blob[second..second + BlobEntryHeader::SIZE], &header.to_bytes());
    }

    #[test]
    fn test_find_permutation() {
        let blob = sample_blob();
        assert_eq!(
            find_permutation(&blob, &[("MODE", "0")]).unwrap(),
            b"payload-a"
        );
        assert_eq!(
            find_permutation(&blob, &[("MODE", "1"), ("FAST", "1")]).unwrap(),
            b"payload-b"
        );
        assert_eq!(
            find_permutation(&blob, &[("MODE", "2")]),
            Err(BlobError::NotFound {
                key: "MODE=2;".to_string()
            })
        );
    }

    #[test]
    fn test_find_permutation_detects_corruption() {
        let mut blob = sample_blob();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(matches!(
            find_permutation(&blob, &[("MODE", "1"), ("FAST", "1")]),
            Err(BlobError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_plain_shader_passthrough() {
        let plain = b"DXBC-plain-bytecode";
        assert_eq!(find_permutation(plain, &[]).unwrap(), plain);
        assert!(matches!(
            find_permutation(plain, &[("MODE", "0")]),
            Err(BlobError::NotPermutationBlob { .. })
        ));
    }

    #[test]
    fn test_truncated_blob_stops_walk() {
        let blob = sample_blob();
        let truncated = &blob[..blob.len() - 3];
        assert_eq!(enumerate_permutations(truncated), vec!["MODE=0;".to_string()]);
    }

    #[test]
    fn test_not_found_message_lists_permutations() {
        let blob = sample_blob();
        let message = format_not_found_message(&blob, &[("MODE", "7")]);
        assert!(message.contains("MODE=7;"));
        assert!(message.contains("Permutations available in the blob:"));
        assert!(message.contains("MODE=1;FAST=1;"));

        let message = format_not_found_message(b"nope", &[]);
        assert!(message.contains("<default>"));
        assert!(message.contains("No permutations found in the blob."));
    }
}
