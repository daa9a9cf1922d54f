pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use anyhow::Context;

pub fn run(args: &cli::Cli) -> anyhow::Result<()> {
    // 1. ── Parse ──────────────────────────────────────────────────────
    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;
    let program = parser::load_from_json(&json).with_context(|| "Parsing input JSON")?;

    // 2. ── Process ────────────────────────────────────────────────────
    let processed = processor::run(&program, &args.compile_options())
        .with_context(|| "Compiling scripts to Lua")?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    writer::lua::emit(&processed, &args.output).with_context(|| "Writing Lua source")?;
    writer::bin::emit(&processed, &args.output).with_context(|| "Writing frame bitmaps")?;

    log::info!("files written to {}", args.output.display());
    Ok(())
}
