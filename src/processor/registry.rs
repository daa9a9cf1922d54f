//! Script/event registry.
//!
//! Names every script, remembers which events each one defines, and
//! emits the registration code and event functions for a script.

use super::ast::{Cmd, Expr};
use super::context::{Context, FoldCandidate};
use super::expr::HANDLER_PARAMS;
use super::stmt::compile_block;
use super::token::{field, quote};
use crate::error::CompileResult;
use crate::model::{Program, Script, ScriptKind};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Event name of the catch-all handler.
pub const WILDCARD_EVENT: &str = "any";

pub struct Registry {
    /// `(kind, id)` → unique name, in program order.
    names: IndexMap<(ScriptKind, i64), String>,
    /// Unique name → events the script defines.
    events: IndexMap<String, IndexSet<String>>,
}

impl Registry {
    /// Pre-pass over every script: unique names and event sets are known
    /// before any body compiles.
    pub fn build(program: &Program, ctx: &mut Context) -> Self {
        let mut names = IndexMap::new();
        let mut events = IndexMap::new();
        let mut taken = IndexSet::new();

        for script in &program.scripts {
            if names.contains_key(&(script.kind, script.id)) {
                ctx.note(format!(
                    "duplicate script, type {}, id {}",
                    kind_code(script.kind),
                    script.id
                ));
                continue;
            }
            let base = script_name(program, script.kind, script.id, ctx);
            let mut name = base.clone();
            if taken.contains(&name) {
                name = format!("{}_{}_{base}", script.kind.as_str(), script.id);
                let mut n = 2;
                while taken.contains(&name) {
                    name = format!("{}_{}_{base}_{n}", script.kind.as_str(), script.id);
                    n += 1;
                }
                log::debug!("script name `{base}` already taken, using `{name}`");
            }
            taken.insert(name.clone());

            let defined: IndexSet<String> = script.events.iter().map(|(ev, _)| ev.clone()).collect();
            events.insert(name.clone(), defined);
            names.insert((script.kind, script.id), name);
        }

        Self { names, events }
    }

    pub fn name_of(&self, kind: ScriptKind, id: i64) -> Option<&str> {
        self.names.get(&(kind, id)).map(String::as_str)
    }

    pub fn defines(&self, script: &str, event: &str) -> bool {
        self.events.get(script).is_some_and(|evs| evs.contains(event))
    }

    /// Every script's name and event set, in program order.
    pub fn scripts(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.events.iter().map(|(name, evs)| (name.as_str(), evs))
    }

    /// Every script in program order. A script repeating an earlier
    /// `(kind, id)` was left out of the registry and is skipped.
    pub fn compile_scripts<'p>(&self, scripts: &'p [Script], ctx: &mut Context<'p>) -> CompileResult<String> {
        let mut seen = HashSet::new();
        let mut out = String::new();
        for script in scripts {
            if seen.insert((script.kind, script.id)) {
                out.push_str(&self.compile_script(script, ctx)?);
            }
        }
        Ok(out)
    }

    /// Registration code plus one function per event.
    pub fn compile_script<'p>(&self, script: &'p Script, ctx: &mut Context<'p>) -> CompileResult<String> {
        let Some(name) = self.name_of(script.kind, script.id) else {
            return Ok(String::new());
        };
        ctx.set_blocks(&script.blocks);

        let mut out = format!(
            "\n----------------- {} ----------------------------\n",
            name.replace('\n', " ")
        );
        out.push_str(&format!("__pulp:newScript({})\n", quote(name)));
        out.push_str(&format!(
            "__pulp:associateScript({}, \"{}\", {})\n",
            quote(name),
            script.kind.as_str(),
            script.id
        ));

        for (event, block) in &script.events {
            log::debug!("compiling {name}.{event}");
            out.push('\n');
            out.push_str(&compile_event(name, event, *block, ctx)?);
        }
        Ok(out)
    }
}

/// Display name of a script before uniqueness is applied.
pub fn script_name(program: &Program, kind: ScriptKind, id: i64, ctx: &mut Context) -> String {
    let found = match kind {
        ScriptKind::Global if id == 0 => Some("game"),
        ScriptKind::Global => None,
        ScriptKind::Room => usize::try_from(id)
            .ok()
            .and_then(|i| program.rooms.get(i))
            .map(|room| room.name.as_str()),
        ScriptKind::Tile => usize::try_from(id)
            .ok()
            .and_then(|i| program.tiles.get(i))
            .map(|tile| tile.name.as_str()),
    };
    match found {
        Some(name) => name.to_string(),
        None => {
            let code = kind_code(kind);
            ctx.note(format!("unknown script, type {code}, id {id}"));
            format!("__UNKNOWN_SCRIPT_{code}_{id}")
        }
    }
}

fn kind_code(kind: ScriptKind) -> u8 {
    match kind {
        ScriptKind::Global => 0,
        ScriptKind::Room => 1,
        ScriptKind::Tile => 2,
    }
}

fn compile_event(script: &str, event: &str, block: usize, ctx: &mut Context) -> CompileResult<String> {
    let evobj = format!("__pulp:getScript({})", quote(script));
    let cmds = ctx.block(block)?;

    let body = ctx.with_target(evobj.clone(), |ctx| compile_block(cmds, ctx, true))?;
    let mut out = format!("{} = function({HANDLER_PARAMS})\n", field(&evobj, event));
    out.push_str(&body);
    out.push_str("end\n");

    if let Some(tile_id) = pure_mimic(cmds, ctx) {
        ctx.add_fold_candidate(FoldCandidate {
            source: script.to_string(),
            event: event.to_string(),
            tile_id,
        });
    }
    Ok(out)
}

/// Tile id when the handler, ignoring no-ops and comments, is a single
/// `mimic` whose target folds to a constant.
fn pure_mimic(cmds: &[Cmd], ctx: &Context) -> Option<i64> {
    let mut effective = cmds.iter().filter(|cmd| !cmd.is_decoration());
    let (Some(Cmd::Mimic(target)), None) = (effective.next(), effective.next()) else {
        return None;
    };
    match ctx.fold_tile_ref(target)? {
        Expr::FoldedId { id, .. } => Some(id),
        _ => None,
    }
}
