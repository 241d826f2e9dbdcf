//! Compile run orchestration
//!
//! Reads the manifest, plans every permutation, runs the compilers and packs
//! the results. Configuration problems abort the run before any compiler is
//! started.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::SystemTime;

use anyhow::{Context, Result};
use pipeline_shared::{modified_time, newest_modified};

use crate::archive::{CacheEntry, ShaderCaches, write_containers};
use crate::command::CommandBuilder;
use crate::config::{CompileOptions, Platform};
use crate::deps::DependencyResolver;
use crate::diagnostics::print_failures;
use crate::error::ConfigError;
use crate::executor::{CompileTask, Executor};
use crate::manifest::load_manifest;
use crate::permutation::expand;
use crate::plan::{CompileRequest, PlanDecision, plan};

/// What a run did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Permutations in the manifest after expansion
    pub permutations: usize,
    /// Permutations handed to the compiler
    pub queued: usize,
    /// Permutations whose artifact was still valid
    pub cached: usize,
    /// Compiles that were started
    pub started: usize,
    pub failures: usize,
    /// Stopped by an interrupt rather than a failure
    pub interrupted: bool,
    pub containers_written: usize,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.failures == 0 && !self.interrupted
    }
}

/// Planned work for one run
struct CompilePlan {
    tasks: Vec<CompileTask>,
    caches: ShaderCaches,
    permutations: usize,
    cached: usize,
}

/// Run the whole pipeline. `cancel` is set by the interrupt handler.
pub fn run(options: &CompileOptions, cancel: Arc<AtomicBool>) -> Result<RunSummary> {
    let mut options = absolute_options(options)?;

    if !options.output_dir.exists() {
        println!("Creating folder '{}'", options.output_dir.display());
        std::fs::create_dir_all(&options.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", options.output_dir.display())
        })?;
    }

    let compiler = which::which(options.compiler())
        .map_err(|_| ConfigError::CompilerNotFound(options.compiler().to_path_buf()))?;
    tracing::info!("Using {} for {}", compiler.display(), options.platform.name());
    match options.platform {
        Platform::Dxbc => options.fxc = compiler,
        Platform::Dxil | Platform::Spirv => options.dxc = compiler,
    }

    let toolchain_modified = toolchain_modified(options.compiler())?;
    let compile_plan = plan_run(&options, toolchain_modified)?;

    let mut summary = RunSummary {
        permutations: compile_plan.permutations,
        queued: compile_plan.tasks.len(),
        cached: compile_plan.cached,
        ..RunSummary::default()
    };

    if !compile_plan.tasks.is_empty() {
        let executor = Executor::new(options.worker_count(), options.verbose, cancel);
        let report = executor.run(compile_plan.tasks)?;
        summary.started = report.started;
        summary.failures = report.failures.len();

        if !report.failures.is_empty() {
            print_failures(&report.failures, options.manifest_dir());
            return Ok(summary);
        }
        if report.cancelled {
            eprintln!("Interrupted, shader blobs were not updated");
            summary.interrupted = true;
            return Ok(summary);
        }
    } else {
        tracing::info!("All {} permutations are up to date", summary.permutations);
    }

    summary.containers_written = write_containers(&compile_plan.caches, &options.output_dir)?;
    Ok(summary)
}

fn absolute_options(options: &CompileOptions) -> Result<CompileOptions> {
    let mut resolved = options.clone();
    resolved.manifest = absolute(&options.manifest)?;
    resolved.output_dir = absolute(&options.output_dir)?;
    resolved.include_dirs = options
        .include_dirs
        .iter()
        .map(|dir| absolute(dir))
        .collect::<Result<Vec<PathBuf>>>()?;
    Ok(resolved)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

/// Newest of the compiler and this executable; either changing invalidates
/// every artifact.
fn toolchain_modified(compiler: &Path) -> Result<SystemTime> {
    let compiler_modified = modified_time(compiler)?;
    let own_modified = std::env::current_exe()
        .ok()
        .and_then(|exe| modified_time(&exe).ok());
    Ok(own_modified.map_or(compiler_modified, |own| own.max(compiler_modified)))
}

fn plan_run(options: &CompileOptions, toolchain_modified: SystemTime) -> Result<CompilePlan> {
    let entries = load_manifest(&options.manifest)?;
    let manifest_dir = options.manifest_dir();
    let builder = CommandBuilder::new(options);
    let mut resolver =
        DependencyResolver::new(options.include_dirs.clone(), options.ignore_includes.clone());

    let mut compile_plan = CompilePlan {
        tasks: Vec::new(),
        caches: ShaderCaches::new(),
        permutations: 0,
        cached: 0,
    };

    for entry in entries {
        let context = || {
            format!(
                "{}({}): {}",
                options.manifest.display(),
                entry.line,
                entry.config
            )
        };

        let source = manifest_dir.join(&entry.file_name);
        let includes = resolver.resolve(&source).with_context(context)?;
        let inputs_modified = newest_modified(
            std::iter::once(source.as_path()).chain(includes.iter().map(PathBuf::as_path)),
        )?
        .map_or(toolchain_modified, |newest| newest.max(toolchain_modified));

        for config in expand(&entry.config).with_context(context)? {
            let request = CompileRequest::new(
                config,
                source.clone(),
                options.platform,
                entry.features,
                &options.output_dir,
            );
            let commands = builder.build(&request).with_context(context)?;
            compile_plan.permutations += 1;

            if request.has_defines() {
                compile_plan
                    .caches
                    .add(&request.shader_name, CacheEntry::from(&request));
            }

            match plan(&request.output_path, inputs_modified, options.force) {
                PlanDecision::Cached => {
                    tracing::debug!("{} is up to date", request.output_path.display());
                    compile_plan.cached += 1;
                }
                PlanDecision::Queue => compile_plan.tasks.push(CompileTask {
                    file_name: request.config.file_name.clone(),
                    entry_point: request.config.entry_point.clone().unwrap_or_default(),
                    defines: builder.prefixed_defines(&request).join(" "),
                    commands,
                }),
            }
        }
    }

    tracing::info!(
        "{} permutations, {} queued, {} up to date ({} files scanned)",
        compile_plan.permutations,
        compile_plan.tasks.len(),
        compile_plan.cached,
        resolver.cached_count()
    );
    Ok(compile_plan)
}
