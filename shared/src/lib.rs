//! Shared formats for the shader and media pipeline tools.
//!
//! Anything a runtime loader has to agree on with the build tools lives here:
//! the shader flag word, the permutation identity hash and the permutation
//! blob container.

pub mod blob;
pub mod flags;
pub mod fs;

pub use blob::{
    BlobEntryHeader, BlobError, BlobWriter, PERMUTATION_BLOB_MAGIC, constant_hash_key,
    enumerate_permutations, find_permutation, format_not_found_message, hash_key,
    permutation_hash,
};
pub use flags::ShaderFlags;
pub use fs::{modified_time, newest_modified};
