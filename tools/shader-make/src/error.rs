use std::path::PathBuf;

/// Build-configuration errors.
///
/// All of these are fatal and are raised before any compiler process is
/// started for the offending shader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `#include` target not present in any search root
    #[error("Cannot find include file    {include}{}", included_in(.chain))]
    MissingInclude { include: String, chain: Vec<PathBuf> },

    /// Source or include file could not be read
    #[error("Cannot open file    {}: {reason}", included_in_first(.chain))]
    UnreadableFile { chain: Vec<PathBuf>, reason: String },

    /// A file includes itself, directly or indirectly
    #[error("Include cycle detected    {}", included_in_first(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    /// Manifest flag prefix contains a letter outside `HUGM`
    #[error("unknown flag '{0}'")]
    UnknownFlag(char),

    /// Manifest flag prefix has no closing bracket
    #[error("unterminated flag prefix in '{0}'")]
    UnterminatedFlags(String),

    /// First two profile characters are not a known stage
    #[error("unknown shader type '{0}'")]
    UnknownShaderStage(String),

    /// Configuration has no `/T` token
    #[error("missing /T <profile> in '{0}'")]
    MissingProfile(String),

    /// `/T`, `/E` or `/D` at the end of the line
    #[error("missing value after {token} in '{config}'")]
    MissingValue { token: String, config: String },

    /// `{` without `}` or the other way around
    #[error("unbalanced braces in '{0}'")]
    UnbalancedBraces(String),

    /// `{` inside an open group
    #[error("nested brace groups are not supported in '{0}'")]
    NestedBraceGroup(String),

    /// `DESCRIPTOR_SET_BASE=` value is not an integer
    #[error("invalid DESCRIPTOR_SET_BASE value '{0}'")]
    InvalidDescriptorSetBase(String),

    /// Compiler executable not found
    #[error("compiler executable not found: {0}")]
    CompilerNotFound(PathBuf),
}

/// `"\n    included in    a\n    included in    b"` for every file in the chain.
fn included_in(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|path| format!("\n        included in    {}", path.display()))
        .collect()
}

/// First file printed inline, the rest as `included in` lines.
fn included_in_first(chain: &[PathBuf]) -> String {
    match chain.split_first() {
        Some((first, rest)) => format!("{}{}", first.display(), included_in(rest)),
        None => String::new(),
    }
}
