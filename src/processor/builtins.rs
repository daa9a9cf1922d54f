//! Builtin opcode calls.
//!
//! Arguments are split into structural groups (coordinate pair, rect,
//! callback block) that fill named slots, and a residual list of plain
//! arguments. The call is rebuilt as: the opcode's canonical slots in
//! order (`nil` where unused), then the residuals in source order.

use super::ast::Expr;
use super::context::Context;
use super::expr::compile_expression;
use crate::error::CompileResult;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Side-effecting command, runtime entry `__pulp.__fn_<op>`.
    Effect,
    /// Value-producing expression, runtime entry `__pulp.__ex_<op>`.
    Value,
}

impl CallKind {
    fn prefix(self) -> &'static str {
        match self {
            CallKind::Effect => "__fn_",
            CallKind::Value => "__ex_",
        }
    }
}

/// Leading parameters an opcode expects; further arguments follow.
fn canonical_slots(op: &str) -> &'static [&'static str] {
    const DIALOG: &[&str] = &["x", "y", "w", "h", "self", "actor", "event", "evname", "block"];
    const CALLBACK: &[&str] = &["self", "actor", "event", "evname", "block"];
    const RECT: &[&str] = &["x", "y", "w", "h"];
    const XY: &[&str] = &["x", "y"];

    match op {
        "frame" | "swap" => &["actor"],
        "goto" | "draw" | "solid" | "type" => XY,
        "tell" => &["event", "evname", "block"],
        "label" => &["x", "y", "len", "lines"],
        "wait" | "option" | "play" | "once" => CALLBACK,
        "say" | "ask" | "menu" => DIALOG,
        "window" | "fill" | "crop" => RECT,
        _ => &[],
    }
}

/// Opcodes that expand into fixed source text instead of a call;
/// `{n}` is the n-th assembled argument.
fn template(kind: CallKind, op: &str) -> Option<&'static str> {
    match (kind, op) {
        (CallKind::Effect, "frame") => Some("{0}.frame = {1}"),
        (CallKind::Effect, "log") => Some("__print({0})"),
        // TODO: fold the colour lookup when the colour argument is a literal
        (CallKind::Effect, "fill") => Some(
            "__setcolour(__fillcolours[{4}]); __fillrect({0} * __pix8scale, {1} * __pix8scale, {2} * __pix8scale, {3} * __pix8scale)",
        ),
        (CallKind::Value, "frame") => Some("({0}.frame or 0)"),
        (CallKind::Value, "invert") => Some("(__pulp.invert and 1 or 0)"),
        (CallKind::Value, "degrees") => Some("({0} * 360 / __tau)"),
        (CallKind::Value, "radians") => Some("({0} * __tau / 360)"),
        _ => None,
    }
}

/// Value opcodes that map straight onto a cached math primitive.
fn static_function(kind: CallKind, op: &str) -> Option<&'static str> {
    if kind != CallKind::Value {
        return None;
    }
    match op {
        "floor" => Some("__floor"),
        "ceil" => Some("__ceil"),
        "round" => Some("__round"),
        "sine" => Some("__sin"),
        "cosine" => Some("__cos"),
        "tangent" => Some("__tan"),
        "random" => Some("__random"),
        _ => None,
    }
}

pub fn assemble_call(
    op: &str,
    kind: CallKind,
    args: &[Expr],
    ctx: &mut Context,
) -> CompileResult<String> {
    let mut slots: HashMap<&'static str, String> = HashMap::from([
        ("self", "__self".to_string()),
        ("actor", "__actor".to_string()),
        ("event", "event".to_string()),
        ("evname", "__evname".to_string()),
    ]);
    let mut residual = Vec::new();

    for arg in args {
        match arg {
            Expr::Xy(x, y) => {
                slots.insert("x", compile_expression(x, ctx)?);
                slots.insert("y", compile_expression(y, ctx)?);
            }
            Expr::Rect(parts) => {
                for (name, part) in ["x", "y", "w", "h"].into_iter().zip(parts) {
                    slots.insert(name, compile_expression(part, ctx)?);
                }
            }
            Expr::Subroutine(_) => {
                slots.insert("block", compile_expression(arg, ctx)?);
            }
            other => residual.push(compile_expression(other, ctx)?),
        }
    }

    let mut assembled: Vec<String> = canonical_slots(op)
        .iter()
        .map(|name| slots.remove(name).unwrap_or_else(|| "nil".to_string()))
        .collect();
    assembled.extend(residual);

    if let Some(text) = template(kind, op) {
        return Ok(fill_template(text, &assembled));
    }
    let callee = match static_function(kind, op) {
        Some(name) => name.to_string(),
        None => format!("__pulp.{}{op}", kind.prefix()),
    };
    Ok(format!("{callee}({})", assembled.join(", ")))
}

/// Substitutes `{n}` placeholders; a placeholder without an argument
/// becomes `nil`.
fn fill_template(text: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let digits = after.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            let idx: usize = after[..digits].parse().unwrap_or(usize::MAX);
            out.push_str(args.get(idx).map_or("nil", String::as_str));
            rest = &after[digits + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::CompileOptions;

    fn num(n: i64) -> Expr {
        Expr::Number(n.into())
    }

    fn xy(x: i64, y: i64) -> Expr {
        Expr::Xy(Box::new(num(x)), Box::new(num(y)))
    }

    fn call(op: &str, kind: CallKind, args: Vec<Expr>) -> String {
        let mut ctx = Context::new(CompileOptions::default());
        assemble_call(op, kind, &args, &mut ctx).unwrap()
    }

    #[test]
    fn test_effect_calls() {
        let test_cases = vec![
            ("sound", vec![Expr::Str("beep".into())], "__pulp.__fn_sound(\"beep\")"),
            ("goto", vec![xy(4, 5)], "__pulp.__fn_goto(4, 5)"),
            ("goto", vec![xy(4, 5), Expr::Str("cave".into())], "__pulp.__fn_goto(4, 5, \"cave\")"),
            ("frame", vec![num(2)], "__actor.frame = 2"),
            ("log", vec![Expr::Str("hi".into())], "__print(\"hi\")"),
            ("swap", vec![Expr::Str("wall".into())], "__pulp.__fn_swap(__actor, \"wall\")"),
            (
                "say",
                vec![Expr::Str("hello".into())],
                "__pulp.__fn_say(nil, nil, nil, nil, __self, __actor, event, __evname, nil, \"hello\")",
            ),
            (
                "fill",
                vec![Expr::Str("black".into()), Expr::Rect(vec![num(1), num(2), num(3), num(4)])],
                "__setcolour(__fillcolours[\"black\"]); __fillrect(1 * __pix8scale, 2 * __pix8scale, 3 * __pix8scale, 4 * __pix8scale)",
            ),
        ];

        for (op, args, expected) in test_cases {
            assert_eq!(call(op, CallKind::Effect, args), expected, "effect {op}");
        }
    }

    #[test]
    fn test_value_calls() {
        let test_cases = vec![
            ("random", vec![num(1), num(6)], "__random(1, 6)"),
            ("floor", vec![Expr::Get("x".into())], "__floor(x)"),
            ("degrees", vec![num(1)], "(1 * 360 / __tau)"),
            ("invert", vec![], "(__pulp.invert and 1 or 0)"),
            ("type", vec![xy(1, 2)], "__pulp.__ex_type(1, 2)"),
            ("lpad", vec![Expr::Get("x".into()), num(3)], "__pulp.__ex_lpad(x, 3)"),
        ];

        for (op, args, expected) in test_cases {
            assert_eq!(call(op, CallKind::Value, args), expected, "value {op}");
        }
    }

    #[test]
    fn test_rect_without_height_leaves_slot_empty() {
        let out = call(
            "window",
            CallKind::Effect,
            vec![Expr::Rect(vec![num(1), num(2), num(3)])],
        );
        assert_eq!(out, "__pulp.__fn_window(1, 2, 3, nil)");
    }

    #[test]
    fn test_fill_template() {
        let args = vec!["a".to_string(), "b".to_string()];
        let test_cases = vec![
            ("{0}.frame = {1}", "a.frame = b"),
            ("f({2})", "f(nil)"),
            ("{ {0} }", "{ a }"),
        ];

        for (text, expected) in test_cases {
            assert_eq!(fill_template(text, &args), expected);
        }
    }
}
