//! `#include` dependency resolution
//!
//! Scans shader sources for include directives and resolves each include
//! against the search roots: the including file's own directory first, then
//! the configured include directories in order. Results are memoized for the
//! whole run, since most shaders share the same headers.

use hashbrown::HashMap;
use regex::bytes::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::ConfigError;

fn include_regex() -> &'static Regex {
    static INCLUDE: OnceLock<Regex> = OnceLock::new();
    INCLUDE.get_or_init(|| {
        Regex::new(r#"(?m-u)^[ \t]*#include[ \t]+["<]([^>"\r\n]+)[>"]"#)
            .expect("include pattern is valid")
    })
}

/// Memoizing include resolver
pub struct DependencyResolver {
    include_dirs: Vec<PathBuf>,
    ignored: Vec<String>,
    resolved: HashMap<PathBuf, Vec<PathBuf>>,
}

impl DependencyResolver {
    /// `ignored` lists include names provided out-of-band that must not be resolved.
    pub fn new(include_dirs: Vec<PathBuf>, ignored: Vec<String>) -> Self {
        Self {
            include_dirs,
            ignored,
            resolved: HashMap::new(),
        }
    }

    /// Every file `path` transitively includes, depth first in file order.
    pub fn resolve(&mut self, path: &Path) -> Result<Vec<PathBuf>, ConfigError> {
        let mut stack = Vec::new();
        self.resolve_with_stack(path, &mut stack)
    }

    /// Number of files whose includes are memoized.
    pub fn cached_count(&self) -> usize {
        self.resolved.len()
    }

    fn resolve_with_stack(
        &mut self,
        path: &Path,
        stack: &mut Vec<PathBuf>,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        if let Some(deps) = self.resolved.get(path) {
            return Ok(deps.clone());
        }

        if stack.iter().any(|p| p == path) {
            return Err(ConfigError::IncludeCycle {
                chain: chain_from(path, stack),
            });
        }

        // sources are not always UTF-8; only the include names are decoded
        let source = std::fs::read(path).map_err(|e| ConfigError::UnreadableFile {
            chain: chain_from(path, stack),
            reason: e.to_string(),
        })?;

        stack.push(path.to_path_buf());
        let mut deps = Vec::new();
        for captures in include_regex().captures_iter(&source) {
            let include = String::from_utf8_lossy(&captures[1]);
            let include = include.as_ref();
            if self.ignored.iter().any(|ignored| ignored == include) {
                continue;
            }

            let found = self.find_include(path, include).ok_or_else(|| {
                ConfigError::MissingInclude {
                    include: include.to_string(),
                    chain: chain_from(path, &stack[..stack.len() - 1]),
                }
            })?;

            let nested = self.resolve_with_stack(&found, stack)?;
            deps.push(found);
            deps.extend(nested);
        }
        stack.pop();

        tracing::debug!("{}: {} dependencies", path.display(), deps.len());
        self.resolved.insert(path.to_path_buf(), deps.clone());
        Ok(deps)
    }

    fn find_include(&self, including: &Path, include: &str) -> Option<PathBuf> {
        let own_dir = including.parent().unwrap_or(Path::new(""));
        std::iter::once(own_dir)
            .chain(self.include_dirs.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(include))
            .find(|candidate| candidate.exists())
    }
}

/// Include chain from `path` back to the root file, innermost first.
fn chain_from(path: &Path, stack: &[PathBuf]) -> Vec<PathBuf> {
    std::iter::once(path.to_path_buf())
        .chain(stack.iter().rev().cloned())
        .collect()
}
