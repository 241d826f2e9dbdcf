//! Package manifest parsing
//!
//! ```text
//! # everything after '#' is ignored
//! media/shaders -> shaders     # path mapping
//! media/shaders/$(API)         # directory, walked recursively
//! media/fonts/ui.ttf           # single file
//! ```
//!
//! Command-line defines are substituted as plain text before a line is
//! interpreted. Mappings apply to every path listed after them.

use anyhow::{Result, bail};

/// One meaningful manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestItem {
    /// `from -> to`, applied to database names
    Mapping { from: String, to: String },
    /// File or directory to store
    Path(String),
}

/// Split a `NAME=VALUE` command-line define.
pub fn parse_define(define: &str) -> Result<(String, String)> {
    let Some((name, value)) = define.split_once('=') else {
        bail!("Invalid define '{}', expected NAME=VALUE", define);
    };
    if name.is_empty() {
        bail!("Invalid define '{}', name is empty", define);
    }
    Ok((name.to_string(), value.to_string()))
}

pub fn parse_manifest(content: &str, defines: &[(String, String)]) -> Vec<ManifestItem> {
    content
        .lines()
        .filter_map(|line| parse_line(line, defines))
        .collect()
}

fn parse_line(line: &str, defines: &[(String, String)]) -> Option<ManifestItem> {
    let line = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };
    let mut line = line.trim().to_string();
    if line.is_empty() {
        return None;
    }

    for (name, value) in defines {
        line = line.replace(name.as_str(), value);
    }

    Some(match line.split_once("->") {
        Some((from, to)) => ManifestItem::Mapping {
            from: from.trim().to_string(),
            to: to.trim().to_string(),
        },
        None => ManifestItem::Path(line),
    })
}

/// Database name for a path: mappings applied in order, `\` turned into `/`.
pub fn normalize_name(path: &str, mappings: &[(String, String)]) -> String {
    let mut name = path.to_string();
    for (from, to) in mappings {
        name = name.replace(from.as_str(), to);
    }
    name.replace('\\', "/")
}

/// Intermediate shader permutations look like `blit_0a1b2c3d.bin`; only the
/// packed blobs are needed at runtime.
pub fn is_intermediate_shader(path: &str) -> bool {
    let Some(stem) = path.strip_suffix(".bin") else {
        return false;
    };
    stem.len() >= 8
        && stem.is_char_boundary(stem.len() - 8)
        && u32::from_str_radix(&stem[stem.len() - 8..], 16).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = "\
# media for the demo
media/shaders/$(API) -> shaders   # strip the api folder

media/shaders/$(API)
media/fonts/ui.ttf
";
        let items = parse_manifest(manifest, &defines(&[("$(API)", "spirv")]));
        assert_eq!(
            items,
            vec![
                ManifestItem::Mapping {
                    from: "media/shaders/spirv".to_string(),
                    to: "shaders".to_string(),
                },
                ManifestItem::Path("media/shaders/spirv".to_string()),
                ManifestItem::Path("media/fonts/ui.ttf".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("API=dxil").unwrap(),
            ("API".to_string(), "dxil".to_string())
        );
        assert_eq!(parse_define("EMPTY=").unwrap().1, "");
        assert!(parse_define("NOVALUE").is_err());
        assert!(parse_define("=x").is_err());
    }

    #[test]
    fn test_normalize_name() {
        let mappings = defines(&[("media/shaders/dxil", "shaders")]);
        assert_eq!(
            normalize_name("media/shaders/dxil\\post\\blit.bin", &mappings),
            "shaders/post/blit.bin"
        );
        assert_eq!(normalize_name("media\\a.dds", &[]), "media/a.dds");
    }

    #[test]
    fn test_intermediate_shader_detection() {
        assert!(is_intermediate_shader("shaders/blit_0a1b2c3d.bin"));
        assert!(is_intermediate_shader("shaders/blit_DEADBEEF.bin"));
        assert!(!is_intermediate_shader("shaders/blit.bin"));
        assert!(!is_intermediate_shader("shaders/tonemap_main_ps.bin"));
        assert!(!is_intermediate_shader("textures/0a1b2c3d.dds"));
        assert!(!is_intermediate_shader("a.bin"));
    }
}
