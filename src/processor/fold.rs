//! Mimic folding.
//!
//! Handlers that only `mimic` a known tile are re-pointed at the handler
//! they would end up calling. The rewrite is simulated at compile time
//! over a table of `(script, event) → original handler` bindings, for a
//! fixed number of passes so that short chains converge.

use super::context::FoldCandidate;
use super::registry::{Registry, WILDCARD_EVENT};
use super::token::{field, quote};
use crate::model::ScriptKind;
use indexmap::IndexMap;

/// The handler a slot currently resolves to: the script that originally
/// defined it and the event it was defined under.
type Binding = (String, String);

struct Slots {
    table: IndexMap<String, IndexMap<String, Binding>>,
    /// Slots written by folding, in first-write order.
    rewritten: IndexMap<(String, String), Binding>,
}

impl Slots {
    fn new(registry: &Registry) -> Self {
        let table = registry
            .scripts()
            .map(|(script, events)| {
                let own = events
                    .iter()
                    .map(|ev| (ev.clone(), (script.to_string(), ev.clone())))
                    .collect();
                (script.to_string(), own)
            })
            .collect();
        Self {
            table,
            rewritten: IndexMap::new(),
        }
    }

    fn get(&self, script: &str, event: &str) -> Option<&Binding> {
        self.table.get(script).and_then(|evs| evs.get(event))
    }

    fn set(&mut self, script: &str, event: &str, binding: Binding) {
        if self.get(script, event) == Some(&binding) {
            return;
        }
        self.table
            .entry(script.to_string())
            .or_default()
            .insert(event.to_string(), binding.clone());
        self.rewritten
            .insert((script.to_string(), event.to_string()), binding);
    }
}

/// Runs `passes` rounds of folding and returns the Lua that applies the
/// result, or an empty string when nothing folds.
pub fn fold_mimics(registry: &Registry, candidates: &[FoldCandidate], passes: usize) -> String {
    let mut slots = Slots::new(registry);

    for pass in 0..passes {
        let before = slots.rewritten.clone();
        for candidate in candidates {
            apply(registry, &mut slots, candidate);
        }
        if slots.rewritten == before {
            log::debug!("mimic folding settled after {} pass(es)", pass + 1);
            break;
        }
    }

    emit(&slots.rewritten)
}

fn apply(registry: &Registry, slots: &mut Slots, candidate: &FoldCandidate) {
    let Some(target) = registry.name_of(ScriptKind::Tile, candidate.tile_id) else {
        return;
    };
    let source = candidate.source.as_str();
    if target == source {
        return;
    }

    if candidate.event == WILDCARD_EVENT {
        let inherited: Vec<(String, Binding)> = slots
            .table
            .get(target)
            .map(|evs| {
                evs.iter()
                    .filter(|(ev, _)| !registry.defines(source, ev))
                    .map(|(ev, binding)| (ev.clone(), binding.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for (event, binding) in inherited {
            slots.set(source, &event, binding);
        }
        return;
    }

    let binding = slots
        .get(target, &candidate.event)
        .or_else(|| slots.get(target, WILDCARD_EVENT))
        .cloned();
    if let Some(binding) = binding {
        slots.set(source, &candidate.event, binding);
    }
}

/// Every handler is read into a snapshot before any slot is written, so
/// the order of the assignments cannot change what they see.
fn emit(rewritten: &IndexMap<(String, String), Binding>) -> String {
    let assignments: Vec<_> = rewritten
        .iter()
        .filter(|((script, event), binding)| binding.0 != *script || binding.1 != *event)
        .collect();
    if assignments.is_empty() {
        return String::new();
    }

    let mut sources: IndexMap<String, usize> = IndexMap::new();
    let mut lines = Vec::with_capacity(assignments.len());
    for ((script, event), (owner, owner_event)) in assignments {
        let rhs = field(&get_script(owner), owner_event);
        let next = sources.len() + 1;
        let slot = *sources.entry(rhs).or_insert(next);
        lines.push(format!(
            "  {} = __folded[{slot}]\n",
            field(&get_script(script), event)
        ));
    }

    let mut out = String::from("-- mimic folding\ndo\n  local __folded = {\n");
    for rhs in sources.keys() {
        out.push_str(&format!("    {rhs},\n"));
    }
    out.push_str("  }\n");
    for line in lines {
        out.push_str(&line);
    }
    out.push_str("end\n");
    out
}

fn get_script(name: &str) -> String {
    format!("__pulp:getScript({})", quote(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Player, Program, Script, Tile};
    use crate::processor::CompileOptions;
    use crate::processor::ast::Cmd;
    use crate::processor::context::Context;

    fn program(tiles: &[&str], scripts: Vec<(i64, Vec<&str>)>) -> Program {
        Program {
            name: "fold".into(),
            author: None,
            player: Player {
                id: 0,
                room: 0,
                x: 0,
                y: 0,
            },
            frames: vec![],
            tiles: tiles
                .iter()
                .enumerate()
                .map(|(i, name)| Tile {
                    id: i as i64,
                    name: name.to_string(),
                    fps: None,
                    kind: 1,
                    btype: 0,
                    solid: false,
                    frames: vec![],
                })
                .collect(),
            rooms: vec![],
            sounds: vec![],
            songs: vec![],
            scripts: scripts
                .into_iter()
                .map(|(id, events)| Script {
                    kind: ScriptKind::Tile,
                    id,
                    events: events.into_iter().map(|e| (e.to_string(), 0)).collect(),
                    blocks: vec![vec![Cmd::Done]],
                })
                .collect(),
        }
    }

    fn candidate(source: &str, event: &str, tile_id: i64) -> FoldCandidate {
        FoldCandidate {
            source: source.into(),
            event: event.into(),
            tile_id,
        }
    }

    fn registry(program: &Program) -> Registry {
        let mut ctx = Context::new(CompileOptions::default());
        Registry::build(program, &mut ctx)
    }

    #[test]
    fn test_single_mimic_aliases_target_handler() {
        let names = ["player", "a", "b", "c", "d", "e", "f", "Door"];
        let program = program(&names, vec![(7, vec!["interact"]), (1, vec!["interact"])]);
        let registry = registry(&program);

        let out = fold_mimics(&registry, &[candidate("a", "interact", 7)], 5);
        assert_eq!(
            out,
            "-- mimic folding\n\
             do\n\
             \x20 local __folded = {\n\
             \x20   __pulp:getScript(\"Door\").interact,\n\
             \x20 }\n\
             \x20 __pulp:getScript(\"a\").interact = __folded[1]\n\
             end\n"
        );
    }

    #[test]
    fn test_missing_event_falls_back_to_wildcard() {
        let program = program(&["Door", "Key"], vec![(0, vec!["any"]), (1, vec!["collect"])]);
        let registry = registry(&program);

        let out = fold_mimics(&registry, &[candidate("Key", "collect", 0)], 5);
        assert!(out.contains("__pulp:getScript(\"Door\").any,\n"));
        assert!(out.contains("__pulp:getScript(\"Key\").collect = __folded[1]\n"));
    }

    #[test]
    fn test_wildcard_copies_only_undefined_events() {
        let program = program(
            &["Door", "Gate"],
            vec![(0, vec!["interact", "collect", "update"]), (1, vec!["any", "collect"])],
        );
        let registry = registry(&program);

        let out = fold_mimics(&registry, &[candidate("Gate", "any", 0)], 5);
        assert!(out.contains("__pulp:getScript(\"Gate\").interact = __folded[1]\n"));
        assert!(out.contains("__pulp:getScript(\"Gate\").update = __folded[2]\n"));
        assert!(!out.contains("__pulp:getScript(\"Gate\").collect ="));
    }

    #[test]
    fn test_chain_resolves_to_origin_and_is_stable() {
        // a → b → c → d, listed in the least favourable order.
        let program = program(
            &["a", "b", "c", "d"],
            vec![
                (0, vec!["interact"]),
                (1, vec!["interact"]),
                (2, vec!["interact"]),
                (3, vec!["interact"]),
            ],
        );
        let registry = registry(&program);
        let candidates = vec![
            candidate("a", "interact", 1),
            candidate("b", "interact", 2),
            candidate("c", "interact", 3),
        ];

        let five = fold_mimics(&registry, &candidates, 5);
        let ten = fold_mimics(&registry, &candidates, 10);
        assert_eq!(five, ten);
        assert!(five.contains("    __pulp:getScript(\"d\").interact,\n  }\n"));
        assert!(!five.contains("__folded[2]"));
    }

    #[test]
    fn test_single_pass_leaves_long_chain_partial() {
        let program = program(
            &["a", "b", "c"],
            vec![(0, vec!["interact"]), (1, vec!["interact"]), (2, vec!["interact"])],
        );
        let registry = registry(&program);
        let candidates = vec![candidate("a", "interact", 1), candidate("b", "interact", 2)];

        let one = fold_mimics(&registry, &candidates, 1);
        assert!(one.contains("__pulp:getScript(\"b\").interact,\n"));
        let two = fold_mimics(&registry, &candidates, 2);
        assert!(!two.contains("__pulp:getScript(\"b\").interact,\n"));
    }

    #[test]
    fn test_unknown_target_and_no_candidates_emit_nothing() {
        let program = program(&["a"], vec![(0, vec!["interact"])]);
        let registry = registry(&program);
        assert_eq!(fold_mimics(&registry, &[], 5), "");
        assert_eq!(fold_mimics(&registry, &[candidate("a", "interact", 42)], 5), "");
    }
}
