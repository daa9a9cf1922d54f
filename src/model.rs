use crate::processor::ast::Block;
use serde::Deserialize;
use serde_json::Value;

/// Entire document as it comes out of the JSON loader.
///
/// Scripts are still raw JSON here; `parser::script` decodes them into
/// typed blocks when the `Program` is built.
#[derive(Debug, Deserialize)]
pub struct RawDocument {
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    pub player: Player,
    #[serde(default)]
    pub frames: Vec<RawFrame>,
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub sounds: Vec<Value>,
    #[serde(default)]
    pub songs: Vec<Value>,
    #[serde(default)]
    pub scripts: Vec<RawScript>,
}

/// ─────────────────────────────────────────────────────
/// Individual record types
/// ─────────────────────────────────────────────────────
#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    pub id: i64,
    pub room: i64,
    pub x: i64,
    pub y: i64,
}

/// One 8×8 bitmap. The editor leaves `false` in slots it never filled.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFrame {
    Data { data: Vec<u8> },
    Empty(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tile {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub fps: Option<serde_json::Number>,
    #[serde(rename = "type", default)]
    pub kind: i64,
    #[serde(default)]
    pub btype: i64,
    #[serde(default)]
    pub solid: bool,
    #[serde(default)]
    pub frames: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    #[serde(default = "no_song")]
    pub song: i64,
    #[serde(default)]
    pub tiles: Vec<i64>,
    #[serde(default)]
    pub exits: Vec<Value>,
}

fn no_song() -> i64 {
    -1
}

/// A script record exactly as stored: `data` maps event names to
/// `["block", n]` references, plus `__`-prefixed metadata keys.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScript {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Global,
    Room,
    Tile,
}

impl ScriptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Global => "global",
            ScriptKind::Room => "room",
            ScriptKind::Tile => "tile",
        }
    }
}

/// A script after decoding: event handlers in document order, each
/// pointing into the script's own block array.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub kind: ScriptKind,
    pub id: i64,
    pub events: Vec<(String, usize)>,
    pub blocks: Vec<Block>,
}

/// Immediately-after-parse representation handed to the processor.
#[derive(Debug, Clone)]
pub struct Program {
    pub name: String,
    pub author: Option<String>,
    pub player: Player,
    pub frames: Vec<RawFrame>,
    pub tiles: Vec<Tile>,
    pub rooms: Vec<Room>,
    pub sounds: Vec<Value>,
    pub songs: Vec<Value>,
    pub scripts: Vec<Script>,
}

/// Fully processed output handed to `writer`.
pub struct ProcessedProject {
    pub lua: String,
    /// Distinct 8×8 frames, 64 pixels each, in dedup-index order.
    pub frames: Vec<Vec<u8>>,
    pub diagnostics: Vec<String>,
}
