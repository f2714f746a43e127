//! CLI argument parsing, exported from the library so integration tests can exercise it.

use std::path::PathBuf;

use clap::Parser;

use crate::interp::{EvalLimits, DEFAULT_MAX_DEPTH};
use crate::{CompileOptions, EmitKind};

/// Compile a source file to a sea-of-nodes graph and emit or evaluate it.
#[derive(Parser, Debug)]
#[command(name = "seanode", version)]
#[command(about = "Sea-of-nodes SSA compiler: graph, LLVM IR, JSON or direct evaluation")]
pub struct CliArgs {
    /// Source file; reads stdin when absent or `-`
    pub path: Option<PathBuf>,

    /// Output kind
    #[arg(long, value_enum, default_value_t = EmitKind::Graph)]
    pub emit: EmitKind,

    /// Function to run with `--emit eval`
    #[arg(long, default_value = "main")]
    pub entry: String,

    /// Argument for the entry function (repeat for several parameters)
    #[arg(long = "arg", allow_negative_numbers = true)]
    pub args: Vec<i64>,

    /// Write output to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Maximum evaluator control steps before aborting (unbounded when absent)
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Maximum evaluator call depth before aborting
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Prepend a native `main` that parses the entry's arguments from argv,
    /// calls it and prints the result (`--emit llvm` only)
    #[arg(long)]
    pub driver: bool,
}

impl CliArgs {
    /// Whether the source comes from stdin.
    pub fn reads_stdin(&self) -> bool {
        match &self.path {
            None => true,
            Some(p) => p.as_os_str() == "-",
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            emit: self.emit,
            entry: self.entry.clone(),
            args: self.args.clone(),
            limits: EvalLimits {
                max_steps: self.max_steps.unwrap_or(u64::MAX),
                max_depth: self.max_depth,
            },
            llvm_driver: self.driver,
        }
    }
}
