//! Dump the deduplicated frame bitmaps for the asset rasterizer.

use crate::model::ProcessedProject;
use crate::processor::frames::pack_frames;
use std::fs;
use std::io;
use std::path::Path;

pub const FRAMES_FILE: &str = "frames.bin";

pub fn emit(project: &ProcessedProject, out_dir: &Path) -> io::Result<()> {
    frames(project, out_dir)?;
    Ok(())
}

/// Eight bytes per frame, in dedup-index order.
fn frames(project: &ProcessedProject, out_dir: &Path) -> io::Result<()> {
    let path = out_dir.join(FRAMES_FILE);
    let packed = pack_frames(&project.frames);
    fs::write(&path, &packed)?;
    log::debug!("wrote {} ({} frame(s))", path.display(), project.frames.len());
    Ok(())
}
