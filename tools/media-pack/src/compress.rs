//! LZ4 block compression for selected file types

use std::path::Path;

/// Extensions stored compressed; everything else is stored as-is.
const COMPRESSED_EXTENSIONS: &[&str] = &["chk", "dds", "json", "bin"];

/// Whether `path` is stored compressed.
pub fn should_compress(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COMPRESSED_EXTENSIONS.contains(&ext))
}

/// Raw LZ4 block, without the uncompressed size.
pub fn compress(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}

pub fn decompress(
    data: &[u8],
    original_size: usize,
) -> Result<Vec<u8>, lz4_flex::block::DecompressError> {
    lz4_flex::block::decompress(data, original_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_extensions() {
        assert!(should_compress(Path::new("media/level.chk")));
        assert!(should_compress(Path::new("textures/a.dds")));
        assert!(should_compress(Path::new("scene.json")));
        assert!(should_compress(Path::new("shaders/blit.bin")));
        assert!(!should_compress(Path::new("fonts/ui.ttf")));
        assert!(!should_compress(Path::new("README")));
    }

    #[test]
    fn test_block_has_no_size_prefix() {
        let data = vec![7u8; 4096];
        let packed = compress(&data);
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
        assert!(decompress(&packed, 16).is_err());
    }
}
