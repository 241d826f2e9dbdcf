//! Shader permutation compiler driver
//!
//! Turns a shader manifest into compiled permutations:
//!
//! 1. [`manifest`] reads one configuration per line
//! 2. [`deps`] resolves `#include` graphs for staleness checks
//! 3. [`permutation`] expands `{a,b}` groups into concrete configurations
//! 4. [`plan`] names each permutation and decides whether it is up to date
//! 5. [`command`] builds the fxc/dxc command line
//! 6. [`executor`] runs the compilers on a worker pool
//! 7. [`archive`] packs the permutations of each shader into one blob
//!
//! [`driver::run`] ties the steps together.

pub mod archive;
pub mod command;
pub mod config;
pub mod deps;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod permutation;
pub mod plan;

pub use config::{CompileOptions, Platform};
pub use driver::{RunSummary, run};
pub use error::ConfigError;
