//! Decodes a raw script record into typed blocks.
//!
//! Commands arrive as `[tag, args...]` arrays and expressions as plain
//! JSON scalars or `[tag, args...]` arrays. Unknown tags survive as
//! `Unknown` nodes so the compiler can report them; a known tag with the
//! wrong shape is a structural error.

use crate::error::{CompileError, CompileResult};
use crate::model::{RawScript, Script, ScriptKind};
use crate::processor::ast::*;
use serde_json::Value;

/// Metadata keys inside a script's `data` map start with this.
const META_PREFIX: &str = "__";

pub fn decode_script(raw: &RawScript) -> CompileResult<Script> {
    let kind = match raw.kind {
        0 => ScriptKind::Global,
        1 => ScriptKind::Room,
        2 => ScriptKind::Tile,
        other => {
            return Err(CompileError::structural(
                format!("script {}", raw.id),
                format!("unknown script type {other}"),
            ));
        }
    };

    let raw_blocks = match raw.data.get("__blocks") {
        None => &[][..],
        Some(Value::Array(blocks)) => &blocks[..],
        Some(other) => {
            return Err(CompileError::structural(
                format!("script {}", raw.id),
                format!("`__blocks` is not an array: {other}"),
            ));
        }
    };

    let decoder = Decoder {
        block_count: raw_blocks.len(),
    };

    let mut blocks = Vec::<Block>::with_capacity(raw_blocks.len());
    for (i, raw_block) in raw_blocks.iter().enumerate() {
        let cmds = raw_block.as_array().ok_or_else(|| {
            CompileError::structural(format!("script {} block {i}", raw.id), "not an array")
        })?;
        let mut block = Block::new();
        for cmd in cmds {
            if let Some(cmd) = decoder.cmd(cmd)? {
                block.push(cmd);
            }
        }
        blocks.push(block);
    }

    let mut events = Vec::new();
    for (key, value) in &raw.data {
        if key.starts_with(META_PREFIX) {
            continue;
        }
        let idx = decoder.block_ref(value, &format!("event `{key}`"))?;
        events.push((key.clone(), idx));
    }

    Ok(Script {
        kind,
        id: raw.id,
        events,
        blocks,
    })
}

struct Decoder {
    block_count: usize,
}

impl Decoder {
    /// Non-array entries in a block carry no command and are skipped.
    fn cmd(&self, value: &Value) -> CompileResult<Option<Cmd>> {
        let Some(items) = value.as_array() else {
            return Ok(None);
        };
        let Some(tag) = items.first() else {
            return Ok(None);
        };
        let tag = tag.as_str().ok_or_else(|| {
            CompileError::structural("command", format!("tag is not a string: {tag}"))
        })?;

        let cmd = match tag {
            "_" => Cmd::Noop,
            "#" => Cmd::Comment,
            "#$" => Cmd::CommentContinued,
            "done" => Cmd::Done,
            "set" | "add" | "sub" | "mul" | "div" => Cmd::Assign {
                target: self.name(items.get(1), tag)?,
                op: AssignOp::from_name(tag).unwrap_or(AssignOp::Set),
                value: self.expr(items.get(2))?,
            },
            "inc" => Cmd::Increment(self.name(items.get(1), tag)?),
            "dec" => Cmd::Decrement(self.name(items.get(1), tag)?),
            "if" => {
                let mut follow = Vec::new();
                for sub in items.iter().skip(3) {
                    follow.push(self.follow_up(sub)?);
                }
                Cmd::If {
                    comparison: self.comparison(items.get(1), tag)?,
                    block: self.block_ref_at(items.get(2), tag)?,
                    follow,
                }
            }
            "while" => Cmd::While {
                comparison: self.comparison(items.get(1), tag)?,
                block: self.block_ref_at(items.get(2), tag)?,
            },
            "call" => Cmd::Call(self.expr(items.get(1))?),
            "emit" => Cmd::Emit(self.expr(items.get(1))?),
            "mimic" => Cmd::Mimic(self.expr(items.get(1))?),
            "tell" => Cmd::Tell {
                target: self.tell_target(items.get(1))?,
                block: self.block_ref_at(items.get(2), tag)?,
            },
            other => match Effect::from_name(other) {
                Some(op) => Cmd::Effect {
                    op,
                    args: self.exprs(&items[1..])?,
                },
                None => Cmd::Unknown(other.to_string()),
            },
        };
        Ok(Some(cmd))
    }

    fn expr(&self, value: Option<&Value>) -> CompileResult<Expr> {
        let Some(value) = value else {
            return Ok(Expr::Nil);
        };
        let expr = match value {
            Value::Null => Expr::Nil,
            Value::Bool(b) => Expr::Bool(*b),
            Value::Number(n) => Expr::Number(n.clone()),
            Value::String(s) => Expr::Str(s.clone()),
            Value::Object(_) => Expr::Unknown("object".to_string()),
            Value::Array(items) => {
                let Some(tag) = items.first().and_then(Value::as_str) else {
                    return Ok(Expr::Unknown("array".to_string()));
                };
                let rest = &items[1..];
                match tag {
                    "get" => Expr::Get(self.name(items.get(1), tag)?),
                    "format" => Expr::Format(self.exprs(rest)?),
                    "embed" => Expr::Embed(Box::new(self.expr(items.get(1))?)),
                    "xy" => {
                        if rest.len() < 2 {
                            return Err(CompileError::structural(
                                "xy",
                                format!("expected 2 coordinates, got {}", rest.len()),
                            ));
                        }
                        Expr::Xy(
                            Box::new(self.expr(items.get(1))?),
                            Box::new(self.expr(items.get(2))?),
                        )
                    }
                    // some published games store rects without a height
                    "rect" => {
                        if rest.len() < 3 {
                            return Err(CompileError::structural(
                                "rect",
                                format!("expected at least 3 components, got {}", rest.len()),
                            ));
                        }
                        Expr::Rect(self.exprs(rest)?)
                    }
                    "block" => Expr::Subroutine(self.block_ref(value, tag)?),
                    "name" => Expr::Name(self.exprs(rest)?),
                    other => match ValueOp::from_name(other) {
                        Some(op) => Expr::Builtin {
                            op,
                            args: self.exprs(rest)?,
                        },
                        None => Expr::Unknown(other.to_string()),
                    },
                }
            }
        };
        Ok(expr)
    }

    fn exprs(&self, values: &[Value]) -> CompileResult<Vec<Expr>> {
        values.iter().map(|v| self.expr(Some(v))).collect()
    }

    fn name(&self, value: Option<&Value>, context: &str) -> CompileResult<String> {
        match value {
            Some(Value::String(s)) => Ok(s.clone()),
            other => Err(CompileError::structural(
                context,
                format!("variable target is not a name: {}", show(other)),
            )),
        }
    }

    fn comparison(&self, value: Option<&Value>, context: &str) -> CompileResult<Comparison> {
        let items = value.and_then(Value::as_array).ok_or_else(|| {
            CompileError::structural(context, format!("comparison is not an array: {}", show(value)))
        })?;
        let code = items.first().and_then(Value::as_str).unwrap_or_default();
        let op = Compare::from_name(code).ok_or_else(|| {
            CompileError::structural(context, format!("unrecognized comparison operator '{code}'"))
        })?;
        Ok(Comparison {
            op,
            left: self.expr(items.get(1))?,
            right: self.expr(items.get(2))?,
        })
    }

    fn follow_up(&self, value: &Value) -> CompileResult<FollowUp> {
        let items = value.as_array().ok_or_else(|| {
            CompileError::structural("if", format!("follow-up is not an array: {value}"))
        })?;
        match items.first().and_then(Value::as_str) {
            Some("elseif") => Ok(FollowUp::ElseIf {
                comparison: self.comparison(items.get(1), "elseif")?,
                block: self.block_ref_at(items.get(2), "elseif")?,
            }),
            Some("else") => Ok(FollowUp::Else {
                block: self.block_ref_at(items.get(1), "else")?,
            }),
            other => Err(CompileError::structural(
                "if",
                format!("unrecognized block followup '{}'", other.unwrap_or("?")),
            )),
        }
    }

    fn tell_target(&self, value: Option<&Value>) -> CompileResult<TellTarget> {
        let target = match self.expr(value)? {
            Expr::Xy(x, y) => TellTarget::At(*x, *y),
            Expr::Get(name) => match name.as_str() {
                "event.room" => TellTarget::Room,
                "event.player" => TellTarget::Player,
                "event.game" => TellTarget::Game,
                _ => TellTarget::Named(Expr::Get(name)),
            },
            other => TellTarget::Named(other),
        };
        Ok(target)
    }

    fn block_ref_at(&self, value: Option<&Value>, context: &str) -> CompileResult<usize> {
        match value {
            Some(v) => self.block_ref(v, context),
            None => Err(CompileError::structural(context, "body is missing")),
        }
    }

    /// `["block", n]` with `n` inside this script's block array.
    fn block_ref(&self, value: &Value, context: &str) -> CompileResult<usize> {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        let idx = match items {
            [tag, idx] if tag.as_str() == Some("block") => idx.as_u64(),
            _ => None,
        };
        let idx = idx.ok_or_else(|| {
            CompileError::structural(context, format!("body is not a block: {value}"))
        })? as usize;
        if idx >= self.block_count {
            return Err(CompileError::structural(
                context,
                format!("block {idx} out of range ({} blocks)", self.block_count),
            ));
        }
        Ok(idx)
    }
}

fn show(value: Option<&Value>) -> String {
    value.map_or_else(|| "nothing".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(kind: u8, data: Value) -> RawScript {
        RawScript {
            id: 3,
            kind,
            data: data.as_object().cloned().unwrap(),
        }
    }

    fn num(n: i64) -> Expr {
        Expr::Number(n.into())
    }

    fn decode_cmd(value: Value) -> CompileResult<Option<Cmd>> {
        Decoder { block_count: 4 }.cmd(&value)
    }

    #[test]
    fn test_decode_commands() {
        let test_cases = vec![
            (json!(["_"]), Cmd::Noop),
            (json!(["#", 2]), Cmd::Comment),
            (json!(["done"]), Cmd::Done),
            (
                json!(["add", "score", 10]),
                Cmd::Assign {
                    target: "score".into(),
                    op: AssignOp::Add,
                    value: num(10),
                },
            ),
            (json!(["inc", "steps"]), Cmd::Increment("steps".into())),
            (
                json!(["if", ["gte", "x", 10], ["block", 1], ["else", ["block", 2]]]),
                Cmd::If {
                    comparison: Comparison {
                        op: Compare::Gte,
                        left: Expr::Str("x".into()),
                        right: num(10),
                    },
                    block: 1,
                    follow: vec![FollowUp::Else { block: 2 }],
                },
            ),
            (
                json!(["tell", ["xy", 4, 5], ["block", 3]]),
                Cmd::Tell {
                    target: TellTarget::At(num(4), num(5)),
                    block: 3,
                },
            ),
            (
                json!(["tell", ["get", "event.player"], ["block", 3]]),
                Cmd::Tell {
                    target: TellTarget::Player,
                    block: 3,
                },
            ),
            (
                json!(["sound", "beep"]),
                Cmd::Effect {
                    op: Effect::Sound,
                    args: vec![Expr::Str("beep".into())],
                },
            ),
            (json!(["teleport", 1]), Cmd::Unknown("teleport".into())),
        ];

        for (input, expected) in test_cases {
            let result = decode_cmd(input.clone()).unwrap();
            assert_eq!(result, Some(expected), "decoding {input}");
        }
    }

    #[test]
    fn test_non_array_entries_are_skipped() {
        assert_eq!(decode_cmd(json!(null)).unwrap(), None);
        assert_eq!(decode_cmd(json!(12)).unwrap(), None);
    }

    #[test]
    fn test_decode_expressions() {
        let decoder = Decoder { block_count: 2 };
        let test_cases = vec![
            (json!(null), Expr::Nil),
            (json!("hi"), Expr::Str("hi".into())),
            (
                json!(["format", "Score: ", ["get", "score"]]),
                Expr::Format(vec![Expr::Str("Score: ".into()), Expr::Get("score".into())]),
            ),
            (json!(["block", 1]), Expr::Subroutine(1)),
            (
                json!(["random", 1, 6]),
                Expr::Builtin {
                    op: ValueOp::Random,
                    args: vec![num(1), num(6)],
                },
            ),
            (json!(["warp", 1]), Expr::Unknown("warp".into())),
        ];

        for (input, expected) in test_cases {
            assert_eq!(decoder.expr(Some(&input)).unwrap(), expected, "decoding {input}");
        }
    }

    #[test]
    fn test_structural_violations_are_fatal() {
        let test_cases = vec![
            json!(["set", ["get", "x"], 1]),
            json!(["if", ["gte", "x", 1], ["get", "y"]]),
            json!(["if", ["approx", "x", 1], ["block", 0]]),
            json!(["if", ["eq", "x", 1], ["block", 0], ["otherwise", ["block", 1]]]),
            json!(["while", ["eq", "x", 1], ["block", 9]]),
            json!(["say", ["xy", 1]]),
        ];

        for input in test_cases {
            let result = decode_cmd(input.clone());
            assert!(
                matches!(result, Err(CompileError::Structural { .. })),
                "expected structural error for {input}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_decode_script_skips_metadata_keys() {
        let script = decode_script(&raw(
            2,
            json!({
                "__blocks": [[["sound", "open"]], [["_"]]],
                "__comments": {},
                "interact": ["block", 0],
                "collect": ["block", 1],
            }),
        ))
        .unwrap();

        assert_eq!(script.kind, ScriptKind::Tile);
        assert_eq!(
            script.events,
            vec![("interact".to_string(), 0), ("collect".to_string(), 1)]
        );
        assert_eq!(script.blocks.len(), 2);
    }

    #[test]
    fn test_decode_script_rejects_unknown_type() {
        let result = decode_script(&raw(7, json!({})));
        assert!(matches!(result, Err(CompileError::Structural { .. })));
    }
}
