//! shader-make - compile shader permutations listed in a manifest
//!
//! # Usage
//!
//! ```bash
//! shader-make --infile shaders.cfg --out bin/spirv --spirv --parallel
//! shader-make --infile shaders.cfg --out bin/dxbc --dxbc --fxc "C:/sdk/fxc.exe"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use shader_make::{CompileOptions, Platform};

/// Compile shader permutations with fxc or dxc and pack them into blobs
#[derive(Parser, Debug)]
#[command(name = "shader-make")]
#[command(version)]
#[command(group(ArgGroup::new("platform").required(true).args(["dxbc", "dxil", "spirv"])))]
struct Cli {
    /// Shader manifest
    #[arg(long)]
    infile: PathBuf,

    /// Output directory for compiled permutations and blobs
    #[arg(long)]
    out: PathBuf,

    /// Compile DXBC with fxc
    #[arg(long)]
    dxbc: bool,

    /// Compile DXIL with dxc
    #[arg(long)]
    dxil: bool,

    /// Compile SPIR-V with dxc
    #[arg(long)]
    spirv: bool,

    /// Use one compiler process per logical CPU
    #[arg(long)]
    parallel: bool,

    /// Print compiler command lines
    #[arg(long)]
    verbose: bool,

    /// Recompile everything
    #[arg(long)]
    force: bool,

    /// fxc executable
    #[arg(long, default_value = "fxc")]
    fxc: PathBuf,

    /// dxc executable
    #[arg(long, default_value = "dxc")]
    dxc: PathBuf,

    /// Additional include directory (repeatable)
    #[arg(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,

    /// Include name to skip during dependency scanning (repeatable)
    #[arg(long = "ignore-include")]
    ignore_includes: Vec<String>,
}

impl Cli {
    fn platform(&self) -> Platform {
        if self.dxbc {
            Platform::Dxbc
        } else if self.dxil {
            Platform::Dxil
        } else {
            Platform::Spirv
        }
    }

    fn into_options(self) -> CompileOptions {
        let mut options = CompileOptions::new(self.infile.clone(), self.out.clone(), self.platform());
        options.include_dirs = self.include_dirs;
        options.ignore_includes = self.ignore_includes;
        options.fxc = self.fxc;
        options.dxc = self.dxc;
        options.parallel = self.parallel;
        options.verbose = self.verbose;
        options.force = self.force;
        options
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = Cli::parse().into_options();

    // Running compilers finish; nothing new starts once this is set
    let cancel = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&cancel))
            .context("Failed to install interrupt handler")?;
    }

    let summary = shader_make::run(&options, cancel)?;
    if !summary.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
