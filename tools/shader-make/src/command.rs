//! Compiler command lines per target platform
//!
//! fxc (DXBC) and dxc (DXIL, SPIR-V) take the same information with different
//! spellings. SPIR-V additionally needs every HLSL register class remapped
//! into Vulkan bindings: each shader stage gets its own 512-binding window and
//! each register class a 128-binding stride inside it, per descriptor set.

use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::config::{CompileOptions, Platform};
use crate::error::ConfigError;
use crate::plan::CompileRequest;

const FXC_OPTIONS: &[&str] = &["/O3", "/Zi", "/nologo", "/Zpr", "/Qstrip_debug", "/Qstrip_priv", "/WX"];
const DXIL_OPTIONS: &[&str] = &["-O3", "-Zi", "-nologo", "-Zpr", "-Qstrip_debug", "-WX"];
const SPIRV_OPTIONS: &[&str] = &[
    "-O3",
    "-Zi",
    "-nologo",
    "-Zpr",
    "-spirv",
    "-fspv-target-env=vulkan1.0",
    "-WX",
];

/// Descriptor set slots every shader gets macros for
pub const DESCRIPTOR_SET_COUNT: u32 = 10;

/// Vulkan bindings reserved per register class (t, s, b, u)
pub const SPIRV_BINDINGS_PER_RESOURCE_TYPE: u32 = 128;

/// Vulkan bindings reserved per shader stage
pub const SPIRV_BINDINGS_PER_STAGE: u32 = 512;

/// Register class shift flags, in binding-window order
const SPIRV_SHIFT_FLAGS: [&str; 4] = ["-fvk-t-shift", "-fvk-s-shift", "-fvk-b-shift", "-fvk-u-shift"];

/// Binding offset of a shader stage for SPIR-V.
///
/// Compute runs alone, so it shares offset 0 with the vertex stage.
pub fn spirv_stage_offset(stage: &str) -> Result<u32, ConfigError> {
    let index = match stage {
        "vs" | "cs" => 0,
        "hs" => 1,
        "ds" => 2,
        "gs" => 3,
        "ps" => 4,
        other => return Err(ConfigError::UnknownShaderStage(other.to_string())),
    };
    Ok(index * SPIRV_BINDINGS_PER_STAGE)
}

/// One external compiler process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CompilerInvocation {
    /// Short compiler name for progress lines (`fxc`, `dxc`).
    pub fn display_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Full command line, for verbose output.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds compiler invocations for the configured platform
pub struct CommandBuilder {
    platform: Platform,
    compiler: PathBuf,
    common_options: Vec<OsString>,
}

impl CommandBuilder {
    pub fn new(options: &CompileOptions) -> Self {
        let platform = options.platform;
        let (base, include_flag): (&[&str], &str) = match platform {
            Platform::Dxbc => (FXC_OPTIONS, "/I"),
            Platform::Dxil => (DXIL_OPTIONS, "-I"),
            Platform::Spirv => (SPIRV_OPTIONS, "-I"),
        };

        let mut common_options: Vec<OsString> = base.iter().map(OsString::from).collect();
        for dir in &options.include_dirs {
            common_options.push(include_flag.into());
            common_options.push(match platform {
                Platform::Dxbc => dir.as_os_str().to_owned(),
                // dxc does not accept forward slashes after a drive letter
                Platform::Dxil | Platform::Spirv => native_separators(dir),
            });
        }

        Self {
            platform,
            compiler: options.compiler().to_path_buf(),
            common_options,
        }
    }

    /// Defines with the platform's flag prefix (`/DNAME` or `-DNAME`).
    pub fn prefixed_defines(&self, request: &CompileRequest) -> Vec<String> {
        let prefix = self.platform.define_prefix();
        request
            .config
            .defines
            .iter()
            .map(|define| format!("{}{}", prefix, define))
            .collect()
    }

    /// Command lines that produce `request.output_path`.
    pub fn build(&self, request: &CompileRequest) -> Result<Vec<CompilerInvocation>, ConfigError> {
        let dash = match self.platform {
            Platform::Dxbc => "/",
            Platform::Dxil | Platform::Spirv => "-",
        };

        let mut args: Vec<OsString> = vec![request.source.as_os_str().to_owned()];
        args.extend(self.common_options.iter().cloned());
        args.extend(self.prefixed_defines(request).into_iter().map(OsString::from));
        args.push(format!("{}T", dash).into());
        args.push(request.config.profile.as_str().into());
        if let Some(entry) = &request.config.entry_point {
            args.push(format!("{}E", dash).into());
            args.push(entry.as_str().into());
        }
        args.push(format!("{}Fo", dash).into());
        args.push(request.output_path.as_os_str().to_owned());

        match self.platform {
            // descriptor sets mean nothing to DXBC; the trailing space keeps the macro defined
            Platform::Dxbc => {
                for set in 0..DESCRIPTOR_SET_COUNT {
                    args.push(format!("/DDESCRIPTOR_SET_{}= ", set).into());
                }
            }
            // everything lands in the default space
            Platform::Dxil => {
                for set in 0..DESCRIPTOR_SET_COUNT {
                    args.push(format!("-DDESCRIPTOR_SET_{}=", set).into());
                }
            }
            Platform::Spirv => {
                let stage_offset = spirv_stage_offset(request.config.stage_code())?;
                let set_base = request.config.descriptor_set_base()?;
                for set in 0..DESCRIPTOR_SET_COUNT {
                    let space = set_base
                        .checked_add(set)
                        .ok_or_else(|| ConfigError::InvalidDescriptorSetBase(set_base.to_string()))?;
                    args.push(format!("-DDESCRIPTOR_SET_{}=,space{}", set, space).into());
                    for (class, flag) in (0u32..).zip(SPIRV_SHIFT_FLAGS) {
                        args.push(flag.into());
                        args.push(
                            (stage_offset + class * SPIRV_BINDINGS_PER_RESOURCE_TYPE)
                                .to_string()
                                .into(),
                        );
                        args.push(set.to_string().into());
                    }
                }
            }
        }

        Ok(vec![CompilerInvocation {
            program: self.compiler.clone(),
            args,
        }])
    }
}

fn native_separators(path: &Path) -> OsString {
    path.to_string_lossy().replace('/', &MAIN_SEPARATOR.to_string()).into()
}
