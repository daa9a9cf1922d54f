//! Mutable state threaded through one compile.
//!
//! Every scope-shaped piece of state (dispatch targets, per-function alias
//! caches) is only reachable through the closure-taking helpers below,
//! which pop what they pushed whether or not the closure succeeded.

use super::ast::{Block, Cmd, Expr};
use super::token::{escape_reserved, is_identifier, quote};
use super::CompileOptions;
use crate::error::{CompileError, CompileResult};
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeSet, HashMap};

/// Dispatch target used when nothing has been pushed.
pub const EMPTY_TARGET: &str = "__pulp.EMPTY";

/// Name of the table that backs every variable not held in a local.
pub const VARIABLE_TABLE: &str = "__G";

/// A handler that reduces to one `mimic` of a tile known at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldCandidate {
    pub source: String,
    pub event: String,
    pub tile_id: i64,
}

pub struct Context<'p> {
    pub options: CompileOptions,
    indent: usize,
    blocks: &'p [Block],
    diagnostics: IndexSet<String>,
    /// Variable name → usage count, in first-seen order.
    vars: IndexMap<String, usize>,
    /// Tile name → id, filled while the tile table is emitted.
    tile_ids: HashMap<String, i64>,
    alias_frames: Vec<BTreeSet<String>>,
    targets: Vec<String>,
    fold_candidates: Vec<FoldCandidate>,
}

impl<'p> Context<'p> {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            indent: 1,
            blocks: &[],
            diagnostics: IndexSet::new(),
            vars: IndexMap::new(),
            tile_ids: HashMap::new(),
            alias_frames: Vec::new(),
            targets: Vec::new(),
            fold_candidates: Vec::new(),
        }
    }

    // ── indentation ─────────────────────────────────────────────────

    /// Current indentation prefix.
    pub fn gi(&self) -> String {
        "  ".repeat(self.indent)
    }

    /// Runs `f` indented `levels` deeper.
    pub fn indented<T>(&mut self, levels: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        self.indent += levels;
        let out = f(self);
        self.indent -= levels;
        out
    }

    // ── blocks ──────────────────────────────────────────────────────

    pub fn set_blocks(&mut self, blocks: &'p [Block]) {
        self.blocks = blocks;
    }

    pub fn block(&self, idx: usize) -> CompileResult<&'p [Cmd]> {
        self.blocks
            .get(idx)
            .map(Vec::as_slice)
            .ok_or_else(|| CompileError::structural("block reference", format!("no block {idx}")))
    }

    // ── diagnostics ─────────────────────────────────────────────────

    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.diagnostics.insert(message.clone()) {
            log::warn!("{message}");
        }
    }

    /// Deduplicated, in the order they were first raised.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.iter().cloned().collect()
    }

    // ── variables ───────────────────────────────────────────────────

    /// Registers one read or write of `name` and returns how the
    /// variable is spelled in the output.
    pub fn ping_var(&mut self, name: &str) -> String {
        *self.vars.entry(name.to_string()).or_insert(0) += 1;
        variable_ref(name)
    }

    #[cfg(test)]
    pub fn usage(&self, name: &str) -> usize {
        self.vars.get(name).copied().unwrap_or(0)
    }

    /// `(name, usage)` pairs in first-seen order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, usize)> {
        self.vars.iter().map(|(name, count)| (name.as_str(), *count))
    }

    // ── tile names ──────────────────────────────────────────────────

    pub fn register_tile(&mut self, name: &str, id: i64) {
        self.tile_ids.insert(name.to_string(), id);
    }

    /// Resolves a literal tile name (or a literal integer id) to a
    /// folded constant. Anything else stays a runtime lookup.
    pub fn fold_tile_ref(&self, expr: &Expr) -> Option<Expr> {
        match expr {
            Expr::Str(name) => self.tile_ids.get(name).map(|id| Expr::FoldedId {
                id: *id,
                name: name.clone(),
            }),
            Expr::Number(n) => n.as_i64().map(|id| Expr::FoldedId {
                id,
                name: id.to_string(),
            }),
            Expr::FoldedId { .. } => Some(expr.clone()),
            _ => None,
        }
    }

    // ── per-function alias caches ───────────────────────────────────

    /// Runs `f` inside a fresh alias frame and returns the aliases it
    /// scheduled, sorted, alongside its result.
    pub fn function_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<(T, Vec<String>)> {
        self.alias_frames.push(BTreeSet::new());
        let out = f(self);
        let aliases = self.alias_frames.pop().unwrap_or_default();
        out.map(|value| (value, aliases.into_iter().collect()))
    }

    /// Schedules a one-time local declaration for the current function.
    pub fn schedule_alias(&mut self, declaration: String) {
        match self.alias_frames.last_mut() {
            Some(frame) => {
                frame.insert(declaration);
            }
            None => self.note(format!("alias outside of a function: {declaration}")),
        }
    }

    #[cfg(test)]
    pub fn alias_depth(&self) -> usize {
        self.alias_frames.len()
    }

    // ── dispatch targets ────────────────────────────────────────────

    pub fn with_target<T>(&mut self, target: String, f: impl FnOnce(&mut Self) -> T) -> T {
        self.targets.push(target);
        let out = f(self);
        self.targets.pop();
        out
    }

    pub fn target(&self) -> &str {
        self.targets.last().map_or(EMPTY_TARGET, String::as_str)
    }

    #[cfg(test)]
    pub fn target_depth(&self) -> usize {
        self.targets.len()
    }

    // ── fold candidates ─────────────────────────────────────────────

    pub fn add_fold_candidate(&mut self, candidate: FoldCandidate) {
        self.fold_candidates.push(candidate);
    }

    pub fn fold_candidates(&self) -> &[FoldCandidate] {
        &self.fold_candidates
    }
}

/// Output spelling of a user variable: a bare identifier when possible,
/// otherwise an index into the variable table. Names carrying the
/// reserved prefix get it doubled first.
pub fn variable_ref(name: &str) -> String {
    let emitted = escape_reserved(name);
    if is_identifier(&emitted) {
        emitted
    } else {
        format!("{VARIABLE_TABLE}[{}]", quote(&emitted))
    }
}
