//! Permutation identity and cache planning
//!
//! Every expanded configuration becomes a [`CompileRequest`] with a stable
//! output name:
//!
//! - `<shader>` when the permutation has no defines
//! - `<shader>_<crc32 of defines, 8 hex digits>` otherwise
//!
//! A request is skipped when its artifact is newer than everything that
//! feeds into it (source, includes, compiler).

use pipeline_shared::{ShaderFlags, hash_key, permutation_hash};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::Platform;
use crate::permutation::{DEFAULT_ENTRY_POINT, ShaderConfig};

/// Extension of compiled permutations and blobs
pub const OUTPUT_EXTENSION: &str = "bin";

/// One concrete unit of compilation work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub config: ShaderConfig,
    /// Absolute path of the source file
    pub source: PathBuf,
    pub platform: Platform,
    /// Format bit plus manifest feature bits
    pub flags: ShaderFlags,
    /// Defines joined as `define;define;`
    pub hash_key: String,
    /// CRC-32 of `hash_key`
    pub define_hash: u32,
    /// Base name shared by all permutations of the shader
    pub shader_name: String,
    /// Where the compiler writes this permutation
    pub output_path: PathBuf,
}

impl CompileRequest {
    pub fn new(
        config: ShaderConfig,
        source: PathBuf,
        platform: Platform,
        features: ShaderFlags,
        output_dir: &Path,
    ) -> Self {
        let hash_key = hash_key(&config.defines);
        let define_hash = permutation_hash(&hash_key);
        let shader_name = shader_base_name(&config.file_name, config.entry_point.as_deref());
        let output_path = output_dir.join(format!(
            "{}.{}",
            permutation_name(&shader_name, &config.defines, define_hash),
            OUTPUT_EXTENSION
        ));

        Self {
            config,
            source,
            platform,
            flags: platform.format_flag() | features,
            hash_key,
            define_hash,
            shader_name,
            output_path,
        }
    }

    /// Whether the permutation carries any defines.
    pub fn has_defines(&self) -> bool {
        !self.config.defines.is_empty()
    }
}

/// Flattened output name for a source file and entry point.
///
/// `lighting/deferred.hlsl` with entry `main_cs` becomes
/// `lighting_deferred_main_cs`.
pub fn shader_base_name(file_name: &str, entry_point: Option<&str>) -> String {
    let mut name: String = file_name
        .replace(".hlsl", "")
        .chars()
        .map(|c| match c {
            '/' | '\\' | '.' => '_',
            other => other,
        })
        .collect();

    if let Some(entry) = entry_point {
        if entry != DEFAULT_ENTRY_POINT {
            name.push('_');
            name.push_str(entry);
        }
    }
    name
}

/// Output name of one permutation of `shader_name`.
pub fn permutation_name<S: AsRef<str>>(shader_name: &str, defines: &[S], define_hash: u32) -> String {
    if defines.is_empty() {
        shader_name.to_string()
    } else {
        format!("{}_{:08x}", shader_name, define_hash)
    }
}

/// What to do with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    /// Artifact is newer than every input
    Cached,
    /// Needs compiling
    Queue,
}

/// Decide whether `output` must be rebuilt.
///
/// `inputs_modified` is the newest modification time among the source, its
/// transitive includes and the compiler toolchain.
pub fn plan(output: &Path, inputs_modified: SystemTime, force: bool) -> PlanDecision {
    if force {
        return PlanDecision::Queue;
    }
    let artifact_modified = std::fs::metadata(output).and_then(|m| m.modified()).ok();
    match artifact_modified {
        Some(mtime) if mtime > inputs_modified => PlanDecision::Cached,
        _ => PlanDecision::Queue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn request(line: &str) -> CompileRequest {
        CompileRequest::new(
            ShaderConfig::parse(line).unwrap(),
            PathBuf::from("/src/x.hlsl"),
            Platform::Dxil,
            ShaderFlags::WAVE_MATCH,
            Path::new("/out"),
        )
    }

    #[test]
    fn test_zero_defines_use_bare_name() {
        let req = request("post/blit.hlsl /T vs_6_0");
        assert_eq!(req.shader_name, "post_blit");
        assert_eq!(req.output_path, PathBuf::from("/out/post_blit.bin"));
        assert_eq!(req.define_hash, 0);
        assert!(!req.has_defines());
    }

    #[test]
    fn test_defines_append_hex_identity() {
        let req = request("post/blit.hlsl /T vs_6_0 /D MSAA=4");
        let expected = format!("post_blit_{:08x}.bin", permutation_hash("MSAA=4;"));
        assert_eq!(req.output_path, Path::new("/out").join(expected));
        assert_eq!(req.hash_key, "MSAA=4;");

        let name = req.output_path.file_stem().unwrap().to_str().unwrap();
        let suffix = name.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_identity_is_order_sensitive() {
        let ab = request("a.hlsl /T ps_6_0 /D A /D B");
        let ab_again = request("a.hlsl /T ps_6_0 /D A /D B");
        let ba = request("a.hlsl /T ps_6_0 /D B /D A");
        assert_eq!(ab.define_hash, ab_again.define_hash);
        assert_eq!(ab.output_path, ab_again.output_path);
        assert_ne!(ab.define_hash, ba.define_hash);
    }

    #[test]
    fn test_flag_word_combines_format_and_features() {
        let req = request("a.hlsl /T ps_6_0");
        assert_eq!(req.flags, ShaderFlags::DXIL | ShaderFlags::WAVE_MATCH);
    }

    #[test]
    fn test_shader_base_name() {
        assert_eq!(shader_base_name("a/b.c.hlsl", Some("main")), "a_b_c");
        assert_eq!(shader_base_name("a.hlsl", Some("main_ps")), "a_main_ps");
        assert_eq!(shader_base_name("rt.hlsl", None), "rt");
        assert_eq!(shader_base_name("dir\\x.hlsl", None), "dir_x");
    }

    #[test]
    fn test_permutation_name_format() {
        assert_eq!(permutation_name::<&str>("blit", &[], 0x1234), "blit");
        assert_eq!(permutation_name("blit", &["A"], 0xab), "blit_000000ab");
    }

    #[test]
    fn test_plan_staleness() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("a.bin");
        let inputs = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);

        assert_eq!(plan(&artifact, inputs, false), PlanDecision::Queue);

        std::fs::write(&artifact, b"x").unwrap();
        let file = std::fs::File::options().write(true).open(&artifact).unwrap();

        file.set_modified(inputs + Duration::from_secs(10)).unwrap();
        assert_eq!(plan(&artifact, inputs, false), PlanDecision::Cached);
        assert_eq!(plan(&artifact, inputs, true), PlanDecision::Queue);

        // equal timestamps are not "strictly newer"
        file.set_modified(inputs).unwrap();
        assert_eq!(plan(&artifact, inputs, false), PlanDecision::Queue);
    }
}
