//! Component 3 – the functional core.
//!
//! Turns a decoded `Program` into one Lua source unit plus the
//! deduplicated frame bitmaps.
pub mod assemble;
pub mod ast;
pub mod builtins;
pub mod context;
pub mod expr;
pub mod fold;
pub mod frames;
pub mod promote;
pub mod registry;
pub mod stmt;
pub mod token;

use crate::model::{ProcessedProject, Program};
use anyhow::Result;

/// Knobs for one compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Rounds of mimic folding; chains longer than this stay partly
    /// dispatched at run time.
    pub fold_passes: usize,
    /// Emit `x += v` instead of `x = x + v`.
    pub relative_assign: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fold_passes: 5,
            relative_assign: true,
        }
    }
}

/// Runs every processing pass and returns a read-only structure for writers.
pub fn run(program: &Program, options: &CompileOptions) -> Result<ProcessedProject> {
    let atlas = frames::FrameAtlas::build(&program.frames);
    log::info!("{} distinct frame(s)", atlas.unique.len());

    let assembly = assemble::assemble(program, &atlas, *options)?;
    if !assembly.diagnostics.is_empty() {
        log::warn!("compiled with {} diagnostic(s)", assembly.diagnostics.len());
    }

    Ok(ProcessedProject {
        lua: assembly.lua,
        frames: atlas.unique,
        diagnostics: assembly.diagnostics,
    })
}
