pub mod script;

use anyhow::{Context, Result};

use crate::model::{Program, RawDocument};

/// Parse the whole input JSON string into a `Program`.
///
/// The document is expected to carry the editor's top-level arrays
/// (`tiles`, `rooms`, `frames`, `sounds`, `songs`, `scripts`) and a
/// `player` descriptor. Every script is decoded into typed blocks here,
/// so a malformed script fails the load rather than the compile.
pub fn load_from_json(json: &str) -> Result<Program> {
    log::debug!("document size: {} bytes", json.len());
    let raw: RawDocument = serde_json::from_str(json).context("Failed to parse JSON")?;
    log::info!(
        "loaded `{}`: {} tile(s), {} room(s), {} script(s)",
        raw.name,
        raw.tiles.len(),
        raw.rooms.len(),
        raw.scripts.len()
    );

    let mut scripts = Vec::with_capacity(raw.scripts.len());
    for raw_script in &raw.scripts {
        let script = script::decode_script(raw_script).with_context(|| {
            format!("Decoding script type {} id {}", raw_script.kind, raw_script.id)
        })?;
        scripts.push(script);
    }

    Ok(Program {
        name: raw.name,
        author: raw.author,
        player: raw.player,
        frames: raw.frames,
        tiles: raw.tiles,
        rooms: raw.rooms,
        sounds: raw.sounds,
        songs: raw.songs,
        scripts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let json = r#"{
            "name": "tiny",
            "player": {"id": 0, "room": 0, "x": 1, "y": 2},
            "frames": [{"data": [0, 1]}, false],
            "scripts": [
                {"id": 0, "type": 0, "data": {
                    "__blocks": [[["log", "hi"]]],
                    "__comments": {},
                    "load": ["block", 0]
                }}
            ]
        }"#;
        let program = load_from_json(json).unwrap();

        assert_eq!(program.name, "tiny");
        assert_eq!(program.author, None);
        assert_eq!(program.frames.len(), 2);
        assert_eq!(program.scripts.len(), 1);
        assert_eq!(program.scripts[0].events, vec![("load".to_string(), 0)]);
    }

    #[test]
    fn test_bad_script_names_the_script() {
        let json = r#"{
            "name": "tiny",
            "player": {"id": 0, "room": 0, "x": 0, "y": 0},
            "scripts": [{"id": 3, "type": 7, "data": {}}]
        }"#;
        let err = load_from_json(json).unwrap_err();
        assert_eq!(err.to_string(), "Decoding script type 7 id 3");
    }
}
