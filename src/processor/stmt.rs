//! Statement compiler: commands and blocks of commands.
//!
//! Every compiled command is a run of complete lines, each starting at
//! the current indentation and ending in a newline.

use super::ast::{AssignOp, Cmd, Comparison, Expr, FollowUp, TellTarget};
use super::builtins::{self, CallKind};
use super::context::Context;
use super::expr::{compile_expression, is_reserved_name, read_variable};
use super::token::{field, is_identifier, is_token, quote};
use crate::error::{CompileError, CompileResult};

/// Dispatch target inside a `tell` body.
const TOLD_TARGET: &str = "__actor.script or __pulp.EMPTY";

/// Compiles `block` at the current indentation. With `function_scope`
/// the block gets its own alias frame, and the aliases it scheduled are
/// declared once each at its top.
pub fn compile_block(block: &[Cmd], ctx: &mut Context, function_scope: bool) -> CompileResult<String> {
    if !function_scope {
        return compile_commands(block, ctx);
    }
    let (body, aliases) = ctx.function_scope(|ctx| compile_commands(block, ctx))?;
    let gi = ctx.gi();
    let mut out = String::new();
    for alias in aliases {
        out.push_str(&format!("{gi}{alias}\n"));
    }
    out.push_str(&body);
    Ok(out)
}

fn compile_commands(block: &[Cmd], ctx: &mut Context) -> CompileResult<String> {
    let mut out = String::new();
    for cmd in block {
        out.push_str(&compile_command(cmd, ctx)?);
    }
    Ok(out)
}

pub fn compile_command(cmd: &Cmd, ctx: &mut Context) -> CompileResult<String> {
    let gi = ctx.gi();
    let line = match cmd {
        Cmd::Noop => return Ok(String::new()),
        Cmd::Comment => "--(comment omitted)".to_string(),
        Cmd::CommentContinued => "--(previous-line comment omitted)".to_string(),
        Cmd::Done => "do return end".to_string(),
        Cmd::Assign { target, op, value } => compile_assign(target, *op, value, ctx)?,
        Cmd::Increment(target) => compile_step(target, "+", ctx)?,
        Cmd::Decrement(target) => compile_step(target, "-", ctx)?,
        Cmd::If {
            comparison,
            block,
            follow,
        } => compile_if(comparison, *block, follow, ctx)?,
        Cmd::While { comparison, block } => {
            let head = compile_comparison(comparison, ctx)?;
            let body = ctx.indented(1, |ctx| compile_block(ctx.block(*block)?, ctx, false))?;
            format!("while {head} do\n{body}{gi}end")
        }
        Cmd::Call(name) => compile_call(name, ctx)?,
        Cmd::Emit(name) => format!("__pulp:emit({}, event)", compile_expression(name, ctx)?),
        Cmd::Mimic(target) => compile_mimic(target, ctx)?,
        Cmd::Tell { target, block } => compile_tell(target, *block, ctx)?,
        Cmd::Effect { op, args } => builtins::assemble_call(op.name(), CallKind::Effect, args, ctx)?,
        Cmd::Unknown(tag) => {
            ctx.note(format!("unknown command code: {tag}"));
            format!("--unknown command code '{tag}'")
        }
    };
    Ok(format!("{gi}{line}\n"))
}

/// Target of a write: must be a plain name the program owns.
fn write_target(target: &str, ctx: &mut Context) -> CompileResult<String> {
    if is_reserved_name(target) {
        return Err(CompileError::NamingConflict {
            name: target.to_string(),
        });
    }
    Ok(read_variable(target, ctx))
}

fn compile_assign(target: &str, op: AssignOp, value: &Expr, ctx: &mut Context) -> CompileResult<String> {
    let lvalue = write_target(target, ctx)?;
    let rvalue = compile_expression(value, ctx)?;
    let line = match op.operator() {
        None => format!("{lvalue} = {rvalue}"),
        Some(sym) if ctx.options.relative_assign => format!("{lvalue} {sym}= {rvalue}"),
        Some(sym) => format!("{lvalue} = {lvalue} {sym} {rvalue}"),
    };
    Ok(line)
}

fn compile_step(target: &str, sym: &str, ctx: &mut Context) -> CompileResult<String> {
    let lvalue = write_target(target, ctx)?;
    if ctx.options.relative_assign {
        Ok(format!("{lvalue} {sym}= 1"))
    } else {
        Ok(format!("{lvalue} = {lvalue} {sym} 1"))
    }
}

/// `left op right`. A bare left operand that looks like a name is a
/// variable read, not a string.
fn compile_comparison(comparison: &Comparison, ctx: &mut Context) -> CompileResult<String> {
    let left = match &comparison.left {
        Expr::Str(name) if is_token(name) => read_variable(name, ctx),
        other => compile_expression(other, ctx)?,
    };
    let right = compile_expression(&comparison.right, ctx)?;
    Ok(format!("{left} {} {right}", comparison.op.symbol()))
}

fn compile_if(
    comparison: &Comparison,
    block: usize,
    follow: &[FollowUp],
    ctx: &mut Context,
) -> CompileResult<String> {
    let gi = ctx.gi();
    let head = compile_comparison(comparison, ctx)?;
    let body = ctx.indented(1, |ctx| compile_block(ctx.block(block)?, ctx, false))?;
    let mut out = format!("if {head} then\n{body}");

    for sub in follow {
        match sub {
            FollowUp::ElseIf { comparison, block } => {
                let head = compile_comparison(comparison, ctx)?;
                let body = ctx.indented(1, |ctx| compile_block(ctx.block(*block)?, ctx, false))?;
                out.push_str(&format!("{gi}elseif {head} then\n{body}"));
            }
            FollowUp::Else { block } => {
                let body = ctx.indented(1, |ctx| compile_block(ctx.block(*block)?, ctx, false))?;
                out.push_str(&format!("{gi}else\n{body}"));
            }
        }
    }
    out.push_str(&format!("{gi}end"));
    Ok(out)
}

/// Calls a slot on the current dispatch target, falling back to its
/// `any` handler. The target is bound once per function as `__evobj`.
fn compile_call(name: &Expr, ctx: &mut Context) -> CompileResult<String> {
    ctx.schedule_alias(format!("local __evobj = {}", ctx.target()));
    let (fnstr, callee) = match name {
        Expr::Str(s) if is_identifier(s) => (quote(s), field("__evobj", s)),
        other => {
            let fnstr = compile_expression(other, ctx)?;
            let callee = format!("__evobj[{fnstr}]");
            (fnstr, callee)
        }
    };
    Ok(format!(
        ";({callee} or __evobj.any)(__evobj, __actor, event, {fnstr}) -- call {}",
        fnstr.replace('\n', " ")
    ))
}

/// Runs another script's handler for the current event. The callee is
/// passed itself as `__self`, so its own calls dispatch against it.
fn compile_mimic(target: &Expr, ctx: &mut Context) -> CompileResult<String> {
    let gi = ctx.gi();
    let lookup = match ctx.fold_tile_ref(target) {
        Some(folded) => format!(
            "((__pulp.tiles[{}] or __pulp.EMPTY).script or __pulp.EMPTY)",
            compile_expression(&folded, ctx)?
        ),
        None => format!(
            "(__pulp:getScript({}) or __pulp.EMPTY)",
            compile_expression(target, ctx)?
        ),
    };
    Ok(format!(
        "do -- (mimic)\n\
         {gi}  local __mimic_target__ = {lookup}\n\
         {gi}  ;(__mimic_target__[__evname] or __mimic_target__.any)(__mimic_target__, __actor, event, __evname)\n\
         {gi}end"
    ))
}

fn compile_tell(target: &TellTarget, block: usize, ctx: &mut Context) -> CompileResult<String> {
    let gi = ctx.gi();
    let (label, actor, guard) = match target {
        TellTarget::At(x, y) => {
            let y = compile_expression(y, ctx)?;
            let x = compile_expression(x, ctx)?;
            (
                "x,y".to_string(),
                format!("__roomtiles[{y}][{x}]"),
                "__actor and __actor.tile",
            )
        }
        TellTarget::Room => ("event.room".to_string(), "event.room".to_string(), "__actor"),
        TellTarget::Game => ("event.game".to_string(), "event.game".to_string(), "__actor"),
        TellTarget::Player => ("__pulp.player".to_string(), "__pulp.player".to_string(), "__actor"),
        TellTarget::Named(name) => {
            let target = ctx.fold_tile_ref(name).unwrap_or_else(|| name.clone());
            let args = [target, Expr::Subroutine(block)];
            return builtins::assemble_call("tell", CallKind::Effect, &args, ctx);
        }
    };

    let body = ctx.indented(2, |ctx| {
        let cmds = ctx.block(block)?;
        ctx.with_target(TOLD_TARGET.to_string(), |ctx| compile_block(cmds, ctx, true))
    })?;
    Ok(format!(
        "do --tell {label} to\n\
         {gi}  local __actor = {actor}\n\
         {gi}  if {guard} then\n\
         {body}\
         {gi}  end\n\
         {gi}end"
    ))
}
