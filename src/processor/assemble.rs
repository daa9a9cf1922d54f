//! Code assembler.
//!
//! Produces the whole Lua unit: runtime preamble, data tables, variable
//! declarations, scripts, the mimic-folding block, reflective variable
//! access, bootstrap, and a trailing comment listing diagnostics.

use super::CompileOptions;
use super::context::Context;
use super::fold::fold_mimics;
use super::frames::FrameAtlas;
use super::promote::{accessors, declarations, promote};
use super::registry::Registry;
use super::token::{lua_value, quote};
use crate::error::CompileResult;
use crate::model::Program;
use serde_json::Value;

/// Room grids are 25 tiles wide.
const ROOM_WIDTH: usize = 25;

pub struct Assembly {
    pub lua: String,
    pub diagnostics: Vec<String>,
}

pub fn assemble(program: &Program, atlas: &FrameAtlas, options: CompileOptions) -> CompileResult<Assembly> {
    let mut ctx = Context::new(options);

    let mut lua = preamble(program);
    lua.push_str(&tile_table(program, atlas, &mut ctx));
    lua.push_str(&room_table(program));
    lua.push_str(&keyed_table("sounds", &program.sounds));
    lua.push_str(&keyed_table("songs", &program.songs));

    let registry = Registry::build(program, &mut ctx);
    let scripts = registry.compile_scripts(&program.scripts, &mut ctx)?;
    log::debug!("{} script(s) compiled", program.scripts.len());

    let folded = fold_mimics(&registry, ctx.fold_candidates(), ctx.options.fold_passes);
    let promotion = promote(&ctx);

    lua.push('\n');
    lua.push_str(&declarations(&promotion));
    lua.push_str(&scripts);
    if !folded.is_empty() {
        lua.push('\n');
        lua.push_str(&folded);
    }
    lua.push_str(&accessors(&promotion));
    lua.push_str("\n__pulp:load()\n__pulp:start()\n");

    let diagnostics = ctx.diagnostics();
    lua.push_str(&trailer(&diagnostics));
    Ok(Assembly { lua, diagnostics })
}

/// `__roomtiles`, `__pix8scale` and `__fillcolours` belong to the
/// runtime and are read as globals; shadowing them here would freeze
/// values the runtime rebinds.
fn preamble(program: &Program) -> String {
    let player = &program.player;
    let mut out = String::from("___pulp = {\n");
    out.push_str(&format!("  playerid = {},\n", player.id));
    out.push_str(&format!("  startroom = {},\n", player.room));
    out.push_str(&format!("  startx = {},\n", player.x));
    out.push_str(&format!("  starty = {},\n", player.y));
    out.push_str(&format!("  gamename = {},\n", quote(&program.name)));
    if let Some(author) = &program.author {
        out.push_str(&format!("  author = {},\n", quote(author)));
    }
    out.push_str("  tile_img = playdate.graphics.imagetable.new(\"tiles\")\n}\n");
    out.push_str(
        "local __pulp <const> = ___pulp\n\
         import \"pulp\"\n\
         \n\
         local __sin <const> = math.sin\n\
         local __cos <const> = math.cos\n\
         local __tan <const> = math.tan\n\
         local __floor <const> = math.floor\n\
         local __ceil <const> = math.ceil\n\
         local __round <const> = function(x) return math.floor(x + 0.5) end\n\
         local __random <const> = math.random\n\
         local __tostring <const> = tostring\n\
         local __print <const> = print\n\
         local __sub <const> = string.sub\n\
         local __tau <const> = math.pi * 2\n\
         local __G <const> = _G\n\
         local __getTime <const> = playdate.getTime\n\
         local __getSecondsSinceEpoch <const> = playdate.getSecondsSinceEpoch\n\
         local __setcolour <const> = playdate.graphics.setColor\n\
         local __fillrect <const> = playdate.graphics.fillRect\n",
    );
    out
}

/// Also teaches `ctx` every tile name, for name folding.
fn tile_table(program: &Program, atlas: &FrameAtlas, ctx: &mut Context) -> String {
    let mut out = String::from("\n__pulp.tiles = {}\n");
    for tile in &program.tiles {
        ctx.register_tile(&tile.name, tile.id);

        let frames: Vec<String> = tile
            .frames
            .iter()
            .map(|&frame| {
                let idx = atlas.index_of(frame).unwrap_or_else(|| {
                    ctx.note(format!("tile {} uses unknown frame {frame}", tile.name));
                    0
                });
                (idx + 1).to_string()
            })
            .collect();
        let fps = tile.fps.as_ref().map_or("nil".to_string(), ToString::to_string);

        out.push_str(&format!("__pulp.tiles[{}] = {{\n", tile.id));
        out.push_str(&format!("  id = {},\n", tile.id));
        out.push_str(&format!("  fps = {fps},\n"));
        out.push_str(&format!("  name = {},\n", quote(&tile.name)));
        out.push_str(&format!("  type = {},\n", tile.kind));
        out.push_str(&format!("  btype = {},\n", tile.btype));
        out.push_str(&format!("  solid = {},\n", tile.solid));
        out.push_str(&format!("  frames = {{ {} }},\n", frames.join(", ")));
        out.push_str("}\n");
    }
    out
}

fn room_table(program: &Program) -> String {
    let mut out = String::from("\n__pulp.rooms = {}\n");
    for room in &program.rooms {
        out.push_str(&format!("__pulp.rooms[{}] = {{\n", room.id));
        out.push_str(&format!("  id = {},\n", room.id));
        out.push_str(&format!("  name = {},\n", quote(&room.name)));
        out.push_str(&format!("  song = {},\n", room.song));
        out.push_str("  tiles = {\n");
        for row in room.tiles.chunks(ROOM_WIDTH) {
            let row: Vec<String> = row.iter().map(i64::to_string).collect();
            out.push_str(&format!("    {},\n", row.join(", ")));
        }
        out.push_str("  },\n");
        let exits: Vec<String> = room.exits.iter().map(lua_value).collect();
        out.push_str(&format!("  exits = {{ {} }},\n", exits.join(", ")));
        out.push_str("}\n");
    }
    out
}

/// Keyed by each record's own `id`, or its position when it has none.
fn keyed_table(name: &str, records: &[Value]) -> String {
    let mut out = format!("\n__pulp.{name} = {{}}\n");
    for (pos, record) in records.iter().enumerate() {
        let key = match record.get("id") {
            Some(Value::Number(id)) => id.to_string(),
            _ => pos.to_string(),
        };
        out.push_str(&format!("__pulp.{name}[{key}] = {}\n", lua_value(record)));
    }
    out
}

fn trailer(diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n-- diagnostics:\n");
    for message in diagnostics {
        out.push_str(&format!("-- {}\n", message.replace('\n', " ")));
    }
    out
}
