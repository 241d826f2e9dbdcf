//! Permutation expansion
//!
//! A configuration line may contain brace groups, each listing alternatives:
//!
//! ```text
//! tonemap.hlsl /T ps_6_0 /D HDR={0,1} {,/D DITHER}
//! ```
//!
//! The line is split into literal text and groups, and every combination of
//! alternatives is substituted back in (first group varies slowest). The four
//! resulting lines above are then tokenized into [`ShaderConfig`]s.
//! Groups cannot be nested.

use crate::error::ConfigError;

/// Entry point used when a configuration has no `/E`.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Profile prefix of shader libraries, which take no entry point.
pub const LIBRARY_PROFILE_PREFIX: &str = "lib_";

/// Define that offsets descriptor set numbers for SPIR-V targets.
pub const DESCRIPTOR_SET_BASE_DEFINE: &str = "DESCRIPTOR_SET_BASE=";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Group(Vec<&'a str>),
}

fn parse_segments(config: &str) -> Result<Vec<Segment<'_>>, ConfigError> {
    let mut segments = Vec::new();
    let mut rest = config;

    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(ConfigError::UnbalancedBraces(config.to_string()));
        }
        let after_open = &rest[open + 1..];
        let close = after_open
            .find(['{', '}'])
            .ok_or_else(|| ConfigError::UnbalancedBraces(config.to_string()))?;
        if after_open.as_bytes()[close] == b'{' {
            return Err(ConfigError::NestedBraceGroup(config.to_string()));
        }

        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        segments.push(Segment::Group(after_open[..close].split(',').collect()));
        rest = &after_open[close + 1..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    Ok(segments)
}

/// Expand every brace group into its alternatives.
///
/// A line without groups yields itself.
pub fn expand_groups(config: &str) -> Result<Vec<String>, ConfigError> {
    let segments = parse_segments(config)?;
    let mut expanded = Vec::new();
    expand_into(&segments, String::new(), &mut expanded);
    Ok(expanded)
}

fn expand_into(segments: &[Segment<'_>], prefix: String, out: &mut Vec<String>) {
    let Some((first, rest)) = segments.split_first() else {
        out.push(prefix);
        return;
    };

    match first {
        Segment::Text(text) => expand_into(rest, prefix + *text, out),
        Segment::Group(options) => {
            for option in options {
                expand_into(rest, format!("{}{}", prefix, option), out);
            }
        }
    }
}

/// One fully expanded shader configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderConfig {
    /// Source file name as written in the manifest
    pub file_name: String,
    /// Target profile, e.g. `ps_6_0`
    pub profile: String,
    /// Entry point, `None` for shader libraries
    pub entry_point: Option<String>,
    /// Preprocessor defines in manifest order, without the `/D`
    pub defines: Vec<String>,
}

impl ShaderConfig {
    /// Tokenize an expanded (brace-free) configuration.
    pub fn parse(config: &str) -> Result<Self, ConfigError> {
        let mut tokens = config.split_whitespace();
        let file_name = tokens
            .next()
            .ok_or_else(|| ConfigError::MissingProfile(config.to_string()))?
            .to_string();

        let mut profile = None;
        let mut entry = None;
        let mut defines = Vec::new();

        while let Some(token) = tokens.next() {
            let slot = match token {
                "/T" | "/E" | "/D" => token,
                _ => {
                    tracing::warn!("Ignoring unrecognized token '{}' in '{}'", token, config);
                    continue;
                }
            };
            let value = tokens
                .next()
                .ok_or_else(|| ConfigError::MissingValue {
                    token: slot.to_string(),
                    config: config.to_string(),
                })?
                .to_string();

            match slot {
                "/T" => {
                    profile.get_or_insert(value);
                }
                "/E" => {
                    entry.get_or_insert(value);
                }
                _ => defines.push(value),
            }
        }

        let profile = profile.ok_or_else(|| ConfigError::MissingProfile(config.to_string()))?;
        let entry_point = if profile.starts_with(LIBRARY_PROFILE_PREFIX) {
            None
        } else {
            Some(entry.unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string()))
        };

        Ok(Self {
            file_name,
            profile,
            entry_point,
            defines,
        })
    }

    /// Whether the profile targets a shader library.
    pub fn is_library(&self) -> bool {
        self.profile.starts_with(LIBRARY_PROFILE_PREFIX)
    }

    /// Two-letter stage code taken from the profile (`ps`, `vs`, ...).
    pub fn stage_code(&self) -> &str {
        self.profile.get(..2).unwrap_or(&self.profile)
    }

    /// Descriptor set offset from a `DESCRIPTOR_SET_BASE=<n>` define.
    ///
    /// The last occurrence wins; defaults to 0.
    pub fn descriptor_set_base(&self) -> Result<u32, ConfigError> {
        let mut base = 0;
        for define in &self.defines {
            if let Some(value) = define.strip_prefix(DESCRIPTOR_SET_BASE_DEFINE) {
                base = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidDescriptorSetBase(value.to_string()))?;
            }
        }
        Ok(base)
    }
}

/// Expand a manifest configuration into concrete shader configurations.
pub fn expand(config: &str) -> Result<Vec<ShaderConfig>, ConfigError> {
    expand_groups(config)?
        .iter()
        .map(|line| ShaderConfig::parse(line))
        .collect()
}
