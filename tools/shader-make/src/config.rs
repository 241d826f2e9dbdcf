//! Run configuration
//!
//! The CLI layer fills a [`CompileOptions`]; everything below it reads
//! settings from there instead of global state.

use pipeline_shared::ShaderFlags;
use std::path::{Path, PathBuf};

/// Target binary format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Legacy bytecode, compiled with fxc
    Dxbc,
    /// DXIL, compiled with dxc
    Dxil,
    /// SPIR-V, compiled with dxc
    Spirv,
}

impl Platform {
    /// Flag bit identifying the payload format.
    pub fn format_flag(self) -> ShaderFlags {
        match self {
            Platform::Dxbc => ShaderFlags::DXBC,
            Platform::Dxil => ShaderFlags::DXIL,
            Platform::Spirv => ShaderFlags::SPIRV,
        }
    }

    /// Command-line prefix for preprocessor defines.
    pub fn define_prefix(self) -> &'static str {
        match self {
            Platform::Dxbc => "/D",
            Platform::Dxil | Platform::Spirv => "-D",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Dxbc => "DXBC",
            Platform::Dxil => "DXIL",
            Platform::Spirv => "SPIRV",
        }
    }
}

/// Settings for one compiler driver run
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Shader manifest; source paths inside it are relative to its directory
    pub manifest: PathBuf,
    /// Directory for compiled permutations and blobs
    pub output_dir: PathBuf,
    pub platform: Platform,
    /// Extra include search roots, in priority order
    pub include_dirs: Vec<PathBuf>,
    /// Include names skipped during dependency scanning
    pub ignore_includes: Vec<String>,
    /// fxc executable (path or name on PATH)
    pub fxc: PathBuf,
    /// dxc executable (path or name on PATH)
    pub dxc: PathBuf,
    /// Use one worker per logical CPU instead of one
    pub parallel: bool,
    /// Print every command line before running it
    pub verbose: bool,
    /// Ignore existing artifacts
    pub force: bool,
}

impl CompileOptions {
    pub fn new(manifest: PathBuf, output_dir: PathBuf, platform: Platform) -> Self {
        Self {
            manifest,
            output_dir,
            platform,
            include_dirs: Vec::new(),
            ignore_includes: Vec::new(),
            fxc: PathBuf::from("fxc"),
            dxc: PathBuf::from("dxc"),
            parallel: false,
            verbose: false,
            force: false,
        }
    }

    /// Compiler used for the selected platform.
    pub fn compiler(&self) -> &Path {
        match self.platform {
            Platform::Dxbc => &self.fxc,
            Platform::Dxil | Platform::Spirv => &self.dxc,
        }
    }

    /// Directory the manifest lives in.
    pub fn manifest_dir(&self) -> &Path {
        self.manifest.parent().unwrap_or(Path::new("."))
    }

    /// Number of concurrent compiler workers.
    pub fn worker_count(&self) -> usize {
        if self.parallel {
            rayon::current_num_threads().max(1)
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_flags_and_prefixes() {
        assert_eq!(Platform::Dxbc.format_flag(), ShaderFlags::DXBC);
        assert_eq!(Platform::Dxil.format_flag(), ShaderFlags::DXIL);
        assert_eq!(Platform::Spirv.format_flag(), ShaderFlags::SPIRV);
        assert_eq!(Platform::Dxbc.define_prefix(), "/D");
        assert_eq!(Platform::Spirv.define_prefix(), "-D");
    }

    #[test]
    fn test_compiler_selection() {
        let mut options = CompileOptions::new(
            PathBuf::from("shaders/shaders.cfg"),
            PathBuf::from("out"),
            Platform::Dxbc,
        );
        options.fxc = PathBuf::from("/sdk/fxc");
        options.dxc = PathBuf::from("/sdk/dxc");
        assert_eq!(options.compiler(), Path::new("/sdk/fxc"));
        options.platform = Platform::Spirv;
        assert_eq!(options.compiler(), Path::new("/sdk/dxc"));
        assert_eq!(options.manifest_dir(), Path::new("shaders"));
    }

    #[test]
    fn test_serial_uses_one_worker() {
        let options = CompileOptions::new(
            PathBuf::from("shaders.cfg"),
            PathBuf::from("out"),
            Platform::Dxil,
        );
        assert_eq!(options.worker_count(), 1);
    }
}
