//! Write the compiled Lua unit.

use crate::model::ProcessedProject;
use std::fs;
use std::io;
use std::path::Path;

pub const MAIN_FILE: &str = "main.lua";

pub fn emit(project: &ProcessedProject, out_dir: &Path) -> io::Result<()> {
    let path = out_dir.join(MAIN_FILE);
    fs::write(&path, &project.lua)?;
    log::debug!("wrote {} ({} bytes)", path.display(), project.lua.len());
    Ok(())
}
