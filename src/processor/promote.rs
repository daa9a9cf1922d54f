//! Variable promotion.
//!
//! The most used variables become chunk-level locals; the rest live in
//! the variable table. Both kinds stay reachable by name through the
//! reflective get/set functions installed on the runtime.

use super::context::{Context, VARIABLE_TABLE};
use super::token::{escape_reserved, is_identifier, quote};

/// Locals available to user variables in the main chunk.
pub const MAX_FAST_LOCALS: usize = 160;

/// Emitted (escaped) variable names split by storage.
#[derive(Debug, Default, PartialEq)]
pub struct Promotion {
    /// Ranked by usage, most used first.
    pub locals: Vec<String>,
    /// Discovery order.
    pub table: Vec<String>,
}

pub fn promote(ctx: &Context) -> Promotion {
    let mut ranked: Vec<(String, usize)> = ctx
        .variables()
        .map(|(name, uses)| (escape_reserved(name), uses))
        .collect();
    // Stable: equal counts keep discovery order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut promotion = Promotion::default();
    for (name, _) in ranked {
        if promotion.locals.len() < MAX_FAST_LOCALS && is_identifier(&name) {
            promotion.locals.push(name);
        }
    }
    promotion.table = ctx
        .variables()
        .map(|(name, _)| escape_reserved(name))
        .filter(|name| !promotion.locals.contains(name))
        .collect();

    log::debug!(
        "{} variable(s) promoted to locals, {} table-backed",
        promotion.locals.len(),
        promotion.table.len()
    );
    promotion
}

/// One declaration per variable, locals first.
pub fn declarations(promotion: &Promotion) -> String {
    let mut out = String::new();
    for name in &promotion.locals {
        out.push_str(&format!("local {name} = 0\n"));
    }
    for name in &promotion.table {
        out.push_str(&format!("{VARIABLE_TABLE}[{}] = 0\n", quote(name)));
    }
    out
}

/// `getvariable`/`setvariable`/`resetvariables` on the runtime table.
pub fn accessors(promotion: &Promotion) -> String {
    let mut out = String::from("\nlocal __var_get <const> = {}\nlocal __var_set <const> = {}\n");
    for name in &promotion.locals {
        let key = quote(name);
        out.push_str(&format!("__var_get[{key}] = function() return {name} end\n"));
        out.push_str(&format!("__var_set[{key}] = function(value) {name} = value end\n"));
    }

    let fallback: Vec<String> = promotion.table.iter().map(|name| quote(name)).collect();
    if fallback.is_empty() {
        out.push_str("local __var_fallback <const> = {}\n");
    } else {
        out.push_str(&format!(
            "local __var_fallback <const> = {{ {} }}\n",
            fallback.join(", ")
        ));
    }

    out.push_str(
        "\nfunction __pulp.getvariable(name)\n\
         \x20 if __sub(name, 1, 2) == \"__\" then name = \"__\" .. name end\n\
         \x20 local get = __var_get[name]\n\
         \x20 if get then return get() end\n\
         \x20 return __G[name]\n\
         end\n\
         \n\
         function __pulp.setvariable(name, value)\n\
         \x20 if __sub(name, 1, 2) == \"__\" then name = \"__\" .. name end\n\
         \x20 local set = __var_set[name]\n\
         \x20 if set then return set(value) end\n\
         \x20 __G[name] = value\n\
         end\n\
         \n\
         function __pulp.resetvariables()\n",
    );
    for name in &promotion.locals {
        out.push_str(&format!("  {name} = 0\n"));
    }
    out.push_str(
        "  for i = 1, #__var_fallback do\n\
         \x20   __G[__var_fallback[i]] = 0\n\
         \x20 end\n\
         end\n",
    );
    out
}
