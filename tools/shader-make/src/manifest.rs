//! Shader manifest parsing
//!
//! One shader configuration per line:
//!
//! ```text
//! # comment
//! [HU] lighting.hlsl /T ps_6_0 /E main_ps /D QUALITY={0,1,2}
//! blit.hlsl /T vs_6_0
//! ```
//!
//! The optional bracketed prefix lists per-shader feature letters (see
//! [`ShaderFlags::from_letter`]). Everything after it is the raw
//! configuration handed to the permutation expander.

use anyhow::{Context, Result};
use pipeline_shared::ShaderFlags;
use std::path::Path;

use crate::error::ConfigError;

/// One non-comment manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderEntry {
    /// 1-based line number in the manifest
    pub line: usize,
    /// Feature flags from the `[...]` prefix
    pub features: ShaderFlags,
    /// Configuration text after the prefix
    pub config: String,
    /// Source file name (first token of the configuration)
    pub file_name: String,
}

/// Load and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<ShaderEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shader manifest: {}", path.display()))?;
    parse_manifest(&content)
}

/// Parse manifest text into entries, skipping blanks and comments.
pub fn parse_manifest(content: &str) -> Result<Vec<ShaderEntry>> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let entry = parse_line(index + 1, line)
            .with_context(|| format!("Invalid shader manifest line {}: {}", index + 1, line.trim()))?;
        if let Some(entry) = entry {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Parse a single manifest line. Returns `None` for blank and comment lines.
pub fn parse_line(line: usize, text: &str) -> Result<Option<ShaderEntry>, ConfigError> {
    let mut config = text.trim();
    if config.is_empty() || config.starts_with('#') {
        return Ok(None);
    }

    let mut features = ShaderFlags::empty();
    if let Some(rest) = config.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| ConfigError::UnterminatedFlags(config.to_string()))?;
        features = parse_feature_letters(&rest[..end])?;
        config = rest[end + 1..].trim_start();
    }

    let Some(file_name) = config.split_whitespace().next() else {
        return Ok(None);
    };

    Ok(Some(ShaderEntry {
        line,
        features,
        file_name: file_name.to_string(),
        config: config.to_string(),
    }))
}

/// Parse the letters between `[` and `]`. Spaces are allowed.
pub fn parse_feature_letters(letters: &str) -> Result<ShaderFlags, ConfigError> {
    let mut flags = ShaderFlags::empty();
    for letter in letters.chars().filter(|c| *c != ' ') {
        let flag = ShaderFlags::from_letter(letter)
            .ok_or(ConfigError::UnknownFlag(letter.to_ascii_uppercase()))?;
        flags |= flag;
    }
    Ok(flags)
}
