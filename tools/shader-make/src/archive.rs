//! Permutation blob packing
//!
//! After a successful run every shader base name gets one `<name>.bin`
//! holding all of its compiled permutations, see [`pipeline_shared::blob`].

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hashbrown::HashMap;
use pipeline_shared::{BlobWriter, ShaderFlags, modified_time, newest_modified};

use crate::plan::{CompileRequest, OUTPUT_EXTENSION};

/// One permutation destined for a blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub define_hash: u32,
    pub hash_key: String,
    pub artifact: PathBuf,
    pub flags: ShaderFlags,
}

impl From<&CompileRequest> for CacheEntry {
    fn from(request: &CompileRequest) -> Self {
        Self {
            define_hash: request.define_hash,
            hash_key: request.hash_key.clone(),
            artifact: request.output_path.clone(),
            flags: request.flags,
        }
    }
}

/// Cache entries grouped by shader base name, in discovery order
#[derive(Debug, Default)]
pub struct ShaderCaches {
    shaders: Vec<(String, Vec<CacheEntry>)>,
    index: HashMap<String, usize>,
}

impl ShaderCaches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shader_name: &str, entry: CacheEntry) {
        let slot = match self.index.get(shader_name) {
            Some(&slot) => slot,
            None => {
                self.shaders.push((shader_name.to_string(), Vec::new()));
                self.index.insert(shader_name.to_string(), self.shaders.len() - 1);
                self.shaders.len() - 1
            }
        };
        self.shaders[slot].1.push(entry);
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn entries(&self, shader_name: &str) -> Option<&[CacheEntry]> {
        self.index
            .get(shader_name)
            .map(|&slot| self.shaders[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CacheEntry])> {
        self.shaders
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }
}

/// Write one blob per shader. Returns the number of blobs written.
pub fn write_containers(caches: &ShaderCaches, output_dir: &Path) -> Result<usize> {
    let mut written = 0;
    for (name, entries) in caches.iter() {
        let target = output_dir.join(format!("{}.{}", name, OUTPUT_EXTENSION));
        if is_up_to_date(&target, entries)? {
            tracing::debug!("{} is up to date", target.display());
            continue;
        }
        write_container(&target, entries)?;
        written += 1;
    }
    tracing::info!("Wrote {} of {} shader blobs", written, caches.len());
    Ok(written)
}

/// A blob is current when it is strictly newer than every artifact in it.
fn is_up_to_date(target: &Path, entries: &[CacheEntry]) -> Result<bool> {
    if !target.exists() {
        return Ok(false);
    }
    let target_modified = modified_time(target)?;
    let newest_artifact = newest_modified(entries.iter().map(|e| e.artifact.as_path()))?;
    Ok(newest_artifact.is_none_or(|newest| target_modified > newest))
}

/// Write a blob holding `entries` to `target`.
///
/// The blob goes to `<target>.tmp` first and is renamed into place; a failed
/// write leaves nothing at `target`.
pub fn write_container(target: &Path, entries: &[CacheEntry]) -> Result<()> {
    let tmp = temp_path(target);
    if let Err(e) = write_blob_file(&tmp, target, entries) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, target)
        .with_context(|| format!("Failed to rename shader blob: {}", target.display()))?;
    tracing::debug!("{}: {} permutations", target.display(), entries.len());
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let mut path = target.as_os_str().to_owned();
    path.push(".tmp");
    PathBuf::from(path)
}

fn write_blob_file(path: &Path, target: &Path, entries: &[CacheEntry]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create shader blob: {}", target.display()))?;
    let mut writer = BlobWriter::new(BufWriter::new(file))
        .with_context(|| format!("Failed to write shader blob: {}", target.display()))?;

    for entry in entries {
        let data = std::fs::read(&entry.artifact).with_context(|| {
            format!("Failed to read compiled shader: {}", entry.artifact.display())
        })?;
        writer
            .write_entry(&entry.hash_key, entry.define_hash, entry.flags, &data)
            .with_context(|| format!("Failed to write shader blob: {}", target.display()))?;
    }

    writer
        .finish()
        .with_context(|| format!("Failed to write shader blob: {}", target.display()))?;
    Ok(())
}
