//! Expression compiler: one tagged node in, one inline source expression out.

use super::ast::{Expr, ValueOp};
use super::builtins::{self, CallKind};
use super::context::Context;
use super::stmt::compile_block;
use super::token::{annotation, quote};
use crate::error::CompileResult;

/// Parameter list shared by event handlers and subroutine callbacks.
pub const HANDLER_PARAMS: &str = "__self, __actor, event, __evname";

pub fn compile_expression(expr: &Expr, ctx: &mut Context) -> CompileResult<String> {
    let out = match expr {
        Expr::Str(s) => quote(s),
        Expr::Number(n) => n.to_string(),
        Expr::Bool(b) => b.to_string(),
        Expr::Nil => "nil".to_string(),
        Expr::Get(name) => read_variable(name, ctx),
        Expr::FoldedId { id, name } => format!("{} {id}", annotation(name)),
        Expr::Format(parts) => compile_format(parts, ctx)?,
        Expr::Embed(inner) => {
            format!("__pulp.__ex_embed({})", compile_expression(inner, ctx)?)
        }
        Expr::Name(args) => match args.first() {
            Some(Expr::Xy(x, y)) => {
                let x = compile_expression(x, ctx)?;
                let y = compile_expression(y, ctx)?;
                format!("__roomtiles[{y}][{x}].name")
            }
            _ => builtins::assemble_call(ValueOp::Name.name(), CallKind::Value, args, ctx)?,
        },
        Expr::Builtin { op, args } => {
            builtins::assemble_call(op.name(), CallKind::Value, args, ctx)?
        }
        Expr::Subroutine(idx) => compile_subroutine(*idx, ctx)?,
        Expr::Xy(..) => unknown("xy", ctx),
        Expr::Rect(..) => unknown("rect", ctx),
        Expr::Unknown(tag) => unknown(tag, ctx),
    };
    Ok(out)
}

fn unknown(tag: &str, ctx: &mut Context) -> String {
    ctx.note(format!("unknown expression code: {tag}"));
    format!("nil --[[unknown expression code '{tag}']]")
}

/// Literal fragments are emitted as-is, everything else is stringified.
fn compile_format(parts: &[Expr], ctx: &mut Context) -> CompileResult<String> {
    if parts.is_empty() {
        return Ok("\"\"".to_string());
    }
    let mut pieces = Vec::with_capacity(parts.len());
    for part in parts {
        let piece = match part {
            Expr::Str(s) => quote(s),
            other => format!("__tostring({})", compile_expression(other, ctx)?),
        };
        pieces.push(piece);
    }
    Ok(pieces.join(" .. "))
}

fn compile_subroutine(idx: usize, ctx: &mut Context) -> CompileResult<String> {
    let block = ctx.block(idx)?;
    let body = ctx.indented(2, |ctx| compile_block(block, ctx, true))?;
    Ok(format!("function({HANDLER_PARAMS})\n{body}{}  end", ctx.gi()))
}

/// Reads a variable. Dotted names are not variables: the reserved ones
/// map onto runtime accessors, the rest pass through as field reads.
pub fn read_variable(name: &str, ctx: &mut Context) -> String {
    if name.contains('.') {
        special_name(name, ctx).unwrap_or_else(|| name.to_string())
    } else {
        ctx.ping_var(name)
    }
}

/// Names owned by the compiler; a program may read but never assign them.
pub fn is_reserved_name(name: &str) -> bool {
    cached_accessor(name).is_some() || time_field(name).is_some() || direct_accessor(name).is_some()
}

/// Accessors worth a local per function: `(alias, initialiser)`.
fn cached_accessor(name: &str) -> Option<(&'static str, &'static str)> {
    let pair = match name {
        "event.px" => ("__event_px", "__pulp.player.x"),
        "event.py" => ("__event_py", "__pulp.player.y"),
        "event.x" => ("__event_x", "__actor.x or __pulp.player.x"),
        "event.y" => ("__event_y", "__actor.y or __pulp.player.y"),
        "event.dx" => ("__event_dx", "event.dx or 0"),
        "event.dy" => ("__event_dy", "event.dy or 0"),
        "event.tile" => ("__event_tile", "__actor.name or 0"),
        _ => return None,
    };
    Some(pair)
}

/// `datetime.*` fields, read off the per-function `__time` snapshot.
fn time_field(name: &str) -> Option<&'static str> {
    let expr = match name {
        "datetime.year" => "__time.year",
        "datetime.year99" => "(__time.year % 100)",
        "datetime.month" => "__time.month",
        "datetime.day" => "__time.day",
        "datetime.weekday" => "(__time.weekday - 1)",
        "datetime.hour" => "__time.hour",
        "datetime.hour12" => "((__time.hour % 12) + 1)",
        "datetime.minute" => "__time.minute",
        "datetime.second" => "__time.second",
        "datetime.millisecond" => "__time.millisecond",
        "datetime.ampm" => "(__time.hour < 12 and \"am\" or \"pm\")",
        "datetime.AMPM" => "(__time.hour < 12 and \"AM\" or \"PM\")",
        _ => return None,
    };
    Some(expr)
}

fn direct_accessor(name: &str) -> Option<&'static str> {
    match name {
        "event.room" => Some("event.room.name"),
        "event.player" => Some("__pulp.player.name"),
        "datetime.timestamp" => Some("__getSecondsSinceEpoch()"),
        _ => None,
    }
}

fn special_name(name: &str, ctx: &mut Context) -> Option<String> {
    if let Some((alias, init)) = cached_accessor(name) {
        ctx.schedule_alias(format!("local {alias} = {init}"));
        return Some(alias.to_string());
    }
    if let Some(expr) = time_field(name) {
        ctx.schedule_alias("local __time = __getTime()".to_string());
        return Some(expr.to_string());
    }
    direct_accessor(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::CompileOptions;

    fn compile(expr: &Expr) -> String {
        let mut ctx = Context::new(CompileOptions::default());
        compile_expression(expr, &mut ctx).unwrap()
    }

    #[test]
    fn test_literals() {
        let test_cases = vec![
            (Expr::Str("a \"b\"".into()), "\"a \\\"b\\\"\""),
            (Expr::Number(3.into()), "3"),
            (Expr::Nil, "nil"),
            (Expr::Bool(true), "true"),
            (
                Expr::FoldedId {
                    id: 7,
                    name: "Door".into(),
                },
                "--[[(Door)]] 7",
            ),
            (
                Expr::Embed(Box::new(Expr::Str("hp".into()))),
                "__pulp.__ex_embed(\"hp\")",
            ),
        ];

        for (input, expected) in test_cases {
            assert_eq!(compile(&input), expected);
        }
    }

    #[test]
    fn test_format_counts_each_read_once() {
        let mut ctx = Context::new(CompileOptions::default());
        let expr = Expr::Format(vec![Expr::Str("Score: ".into()), Expr::Get("score".into())]);
        let out = compile_expression(&expr, &mut ctx).unwrap();
        assert_eq!(out, "\"Score: \" .. __tostring(score)");
        assert_eq!(ctx.usage("score"), 1);
    }

    #[test]
    fn test_name_lookup_by_coordinate() {
        let expr = Expr::Name(vec![Expr::Xy(
            Box::new(Expr::Number(3.into())),
            Box::new(Expr::Get("row".into())),
        )]);
        assert_eq!(compile(&expr), "__roomtiles[row][3].name");
    }

    #[test]
    fn test_name_lookup_by_ambient_target() {
        assert_eq!(compile(&Expr::Name(vec![])), "__pulp.__ex_name()");
    }

    #[test]
    fn test_special_names_are_cached_per_function() {
        let mut ctx = Context::new(CompileOptions::default());
        let (reads, aliases) = ctx
            .function_scope(|ctx| {
                let a = read_variable("event.x", ctx);
                let b = read_variable("event.x", ctx);
                let c = read_variable("datetime.hour", ctx);
                let d = read_variable("event.room", ctx);
                Ok(vec![a, b, c, d])
            })
            .unwrap();

        assert_eq!(reads, vec!["__event_x", "__event_x", "__time.hour", "event.room.name"]);
        assert_eq!(
            aliases,
            vec![
                "local __event_x = __actor.x or __pulp.player.x",
                "local __time = __getTime()",
            ]
        );
        assert_eq!(ctx.variables().count(), 0);
    }

    #[test]
    fn test_unknown_expression_is_inert() {
        let mut ctx = Context::new(CompileOptions::default());
        let out = compile_expression(&Expr::Unknown("warp".into()), &mut ctx).unwrap();
        assert_eq!(out, "nil --[[unknown expression code 'warp']]");
        assert_eq!(ctx.diagnostics(), vec!["unknown expression code: warp"]);
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("event.px"));
        assert!(is_reserved_name("datetime.year"));
        assert!(is_reserved_name("event.room"));
        assert!(!is_reserved_name("event.custom"));
        assert!(!is_reserved_name("score"));
    }
}
