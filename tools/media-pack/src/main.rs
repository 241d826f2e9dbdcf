//! media-pack - store the files listed in a package manifest in a media database
//!
//! # Usage
//!
//! ```bash
//! media-pack --manifest package_manifest.txt --database media.db -D '$(API)=spirv'
//! media-pack -n   # list what would be stored
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use media_pack::PackOptions;
use media_pack::manifest::parse_define;

/// Compress, optionally encrypt and store manifest files in a media database
#[derive(Parser, Debug)]
#[command(name = "media-pack")]
#[command(version)]
struct Cli {
    /// Package manifest file
    #[arg(long, default_value = "package_manifest.txt")]
    manifest: PathBuf,

    /// Database file
    #[arg(long, default_value = "media.db")]
    database: PathBuf,

    /// Report what would be stored without writing the database
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Text substitution for manifest lines, NAME=VALUE (repeatable)
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,

    /// Password to encrypt the files
    #[arg(long)]
    password: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut options = PackOptions::new(cli.manifest, cli.database);
    options.dry_run = cli.dry_run;
    options.password = cli.password;
    options.defines = cli
        .defines
        .iter()
        .map(|define| parse_define(define))
        .collect::<Result<_>>()?;

    media_pack::run(&options)?;
    Ok(())
}
