//! Manifest-driven packing
//!
//! Paths in the manifest are relative to [`PackOptions::root`], and that
//! relative text (after mappings) is the database name.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use pipeline_shared::modified_time;
use walkdir::WalkDir;

use crate::compress;
use crate::database::{MediaDatabase, StoredFile};
use crate::encrypt;
use crate::manifest::{ManifestItem, is_intermediate_shader, normalize_name, parse_manifest};

/// Settings for one packing run
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub manifest: PathBuf,
    pub database: PathBuf,
    /// Directory manifest paths are resolved against
    pub root: PathBuf,
    /// Report what would be stored without touching the database
    pub dry_run: bool,
    /// `(name, value)` text substitutions for manifest lines
    pub defines: Vec<(String, String)>,
    pub password: Option<String>,
}

impl PackOptions {
    pub fn new(manifest: PathBuf, database: PathBuf) -> Self {
        Self {
            manifest,
            database,
            root: PathBuf::from("."),
            dry_run: false,
            defines: Vec::new(),
            password: None,
        }
    }
}

/// What a run did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackSummary {
    /// Files written (or that would be written in a dry run)
    pub stored: usize,
    /// Files whose stored copy is current
    pub unchanged: usize,
    /// Intermediate shader permutations left out
    pub skipped: usize,
}

struct Packer<'a> {
    options: &'a PackOptions,
    database: Option<MediaDatabase>,
    mappings: Vec<(String, String)>,
    summary: PackSummary,
}

pub fn run(options: &PackOptions) -> Result<PackSummary> {
    let content = std::fs::read_to_string(&options.manifest)
        .with_context(|| format!("Failed to read package manifest: {}", options.manifest.display()))?;
    let items = parse_manifest(&content, &options.defines);

    let database = if options.dry_run {
        None
    } else {
        Some(MediaDatabase::open(&options.database).with_context(|| {
            format!("Failed to open media database: {}", options.database.display())
        })?)
    };

    let mut packer = Packer {
        options,
        database,
        mappings: Vec::new(),
        summary: PackSummary::default(),
    };

    for item in items {
        match item {
            ManifestItem::Mapping { from, to } => packer.mappings.push((from, to)),
            ManifestItem::Path(path) => packer.add_path(&path)?,
        }
    }

    if let Some(database) = &packer.database {
        if packer.summary.stored > 0 {
            database.save().with_context(|| {
                format!("Failed to save media database: {}", database.path().display())
            })?;
        }
    }

    tracing::info!(
        "{} stored, {} unchanged, {} intermediate shaders skipped",
        packer.summary.stored,
        packer.summary.unchanged,
        packer.summary.skipped
    );
    Ok(packer.summary)
}

impl Packer<'_> {
    fn add_path(&mut self, path: &str) -> Result<()> {
        let disk_path = self.options.root.join(path);
        if !disk_path.is_dir() {
            return self.add_file(path, &disk_path);
        }

        let walker = WalkDir::new(&disk_path).sort_by_file_name();
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", disk_path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.options.root).unwrap_or(entry.path());
            self.add_file(&relative.to_string_lossy(), entry.path())?;
        }
        Ok(())
    }

    fn add_file(&mut self, path: &str, disk_path: &Path) -> Result<()> {
        if is_intermediate_shader(path) {
            self.summary.skipped += 1;
            return Ok(());
        }

        let name = normalize_name(path, &self.mappings);
        let mtime = modified_time(disk_path)?
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        if let Some(database) = &self.database {
            if database.stored_mtime(&name) >= mtime {
                self.summary.unchanged += 1;
                return Ok(());
            }
        }

        let contents = std::fs::read(disk_path)
            .with_context(|| format!("Failed to read {}", disk_path.display()))?;
        let original_size = contents.len() as u64;

        let (mut data, compressed_size) = if compress::should_compress(disk_path) {
            let packed = compress::compress(&contents);
            let size = packed.len() as u64;
            (packed, size)
        } else {
            (contents, 0)
        };

        println!("{} {}", data.len(), name);

        let encrypted = self.options.password.is_some();
        if let Some(password) = &self.options.password {
            data = encrypt::encrypt(&data, password, &name);
        }

        if let Some(database) = &mut self.database {
            database.store(StoredFile {
                name,
                mtime,
                compressed_size,
                original_size,
                encrypted,
                data,
            });
        }
        self.summary.stored += 1;
        Ok(())
    }
}
