use clap::Parser;
use std::path::PathBuf;

use crate::processor::CompileOptions;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .json game document
    pub input: PathBuf,
    /// Output directory
    #[arg(default_value = "out")]
    pub output: PathBuf,
    /// Rounds of mimic folding; raise it for long mimic chains
    #[arg(long, default_value_t = 5)]
    pub fold_passes: usize,
    /// Spell compound assignments out (`x = x + 1` instead of `x += 1`)
    #[arg(long)]
    pub no_relative_assign: bool,
    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            fold_passes: self.fold_passes,
            relative_assign: !self.no_relative_assign,
        }
    }
}
