//! Assignment, loops, control-flow signals, procedures and `eval()`.

use super::{boxed, exec_with_literals, ivar_name, node_arg, Builtin};
use crate::script::compiler::{is_proc_name, Compiler, NodeKind, ParseNode};
use crate::script::construct::Construct;
use crate::script::env::{Environment, Procedure};
use crate::script::error::{ExceptionKind, Flow, Halt, ScriptError, Signal, SignalKind};
use crate::script::exec::Executor;
use crate::script::lexer::lex;
use crate::script::optimizer::Optimizer;
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        boxed(Assign),
        boxed(For),
        boxed(Foreach),
        Builtin::new(
            "break",
            Arity::Fixed(&[0, 1]),
            "void {[levels]} Leaves the innermost loop, or the innermost levels loops.",
            brk,
        )
        .throws(&[ExceptionKind::Cast, ExceptionKind::Range])
        .raises(SignalKind::Break)
        .boxed(),
        Builtin::new(
            "continue",
            Arity::Fixed(&[0]),
            "void {} Skips the rest of the current loop iteration.",
            cont,
        )
        .raises(SignalKind::Continue)
        .boxed(),
        Builtin::new(
            "return",
            Arity::Fixed(&[0, 1]),
            "void {[value]} Leaves the current procedure, returning value (or void).",
            ret,
        )
        .since_version("3.2.0")
        .raises(SignalKind::Return)
        .boxed(),
        Builtin::new(
            "die",
            Arity::Fixed(&[0, 1]),
            "void {[message]} Stops the script. The message, if any, is sent to the player first.",
            die,
        )
        .raises(SignalKind::Cancel)
        .boxed(),
        boxed(Proc),
        boxed(Eval),
    ]
}

// ── Signals ───────────────────────────────────────────────────────────────────

fn brk(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let levels = match args.first() {
        Some(v) => v.as_int(t)?,
        None => 1,
    };
    if levels < 1 {
        return Err(ScriptError::range(format!("break() needs at least 1 level, got {levels}"), t.clone()).into());
    }
    Err(Signal::Break(u32::try_from(levels).unwrap_or(u32::MAX)).into())
}

fn cont(_: &Target, _: Option<&mut Environment>, _: &[Construct]) -> Flow {
    Err(Signal::Continue.into())
}

fn ret(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let value = args.first().cloned().unwrap_or_else(|| Construct::Void(t.clone()));
    Err(Signal::Return(value).into())
}

fn die(_: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
    if let (Some(env), Some(message)) = (env, args.first()) {
        env.send(&message.value());
    }
    Err(Signal::Cancel.into())
}

// ── Loops ─────────────────────────────────────────────────────────────────────

enum Iteration {
    Next,
    Exit,
}

/// Run one loop body, consuming the signals addressed to this loop.
fn iterate(ctx: &mut Executor<'_>, body: &ParseNode) -> Result<Iteration, Halt> {
    match ctx.eval(body) {
        Ok(_) | Err(Halt::Signal(Signal::Continue)) => Ok(Iteration::Next),
        Err(Halt::Signal(Signal::Break(n))) if n <= 1 => Ok(Iteration::Exit),
        Err(Halt::Signal(Signal::Break(n))) => Err(Signal::Break(n - 1).into()),
        Err(other) => Err(other),
    }
}

/// `assign(@ivar, value)`
struct Assign;

impl Function for Assign {
    fn name(&self) -> &'static str {
        "assign"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[2])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[ExceptionKind::Cast]
    }

    fn docs(&self) -> &'static str {
        "ivar {@ivar, value} Stores value in the ivariable and returns it. Arrays are stored by reference."
    }

    fn since(&self) -> &'static str {
        "3.0.0"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let name = ivar_name(node_arg(args, 0, "assign", t)?, "assign", 1)?;
        let value = ctx.eval(node_arg(args, 1, "assign", t)?)?.resolved().clone();
        ctx.env().set_ivar(name, value.clone());
        Ok(value)
    }
}

/// `for(assign(@i, start), cond, step, body)`
struct For;

impl Function for For {
    fn name(&self) -> &'static str {
        "for"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[4])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[ExceptionKind::Cast]
    }

    fn docs(&self) -> &'static str {
        "void {assign, condition, expression, body} Runs assign once, then body followed by expression for as long as condition is true. The first argument must be an assign() call."
    }

    fn since(&self) -> &'static str {
        "3.0.0"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let init = node_arg(args, 0, "for", t)?;
        if init.call_name() != Some("assign") {
            return Err(ScriptError::cast("the first argument of for() must be an assign() call", init.target.clone()).into());
        }
        let cond = node_arg(args, 1, "for", t)?;
        let step = node_arg(args, 2, "for", t)?;
        let body = node_arg(args, 3, "for", t)?;

        ctx.eval(init)?;
        while ctx.eval(cond)?.as_bool() {
            if let Iteration::Exit = iterate(ctx, body)? {
                break;
            }
            ctx.eval(step)?;
        }
        Ok(Construct::Void(t.clone()))
    }
}

/// `foreach(array, @ivar, body)`
struct Foreach;

impl Function for Foreach {
    fn name(&self) -> &'static str {
        "foreach"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[3])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[ExceptionKind::Cast]
    }

    fn docs(&self) -> &'static str {
        "void {array, @ivar, body} Runs body once per element of array, with the element stored in the ivariable."
    }

    fn since(&self) -> &'static str {
        "3.0.0"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let name = ivar_name(node_arg(args, 1, "foreach", t)?, "foreach", 2)?;
        let body = node_arg(args, 2, "foreach", t)?;
        let cells = match ctx.eval(node_arg(args, 0, "foreach", t)?)?.resolved() {
            Construct::Array(a) => a.cells(),
            other => {
                return Err(ScriptError::cast(
                    format!("foreach() expects an array, but received a value of type {}", other.type_name()),
                    t.clone(),
                )
                .into())
            }
        };
        for cell in cells {
            ctx.env().set_ivar(name, cell);
            if let Iteration::Exit = iterate(ctx, body)? {
                break;
            }
        }
        Ok(Construct::Void(t.clone()))
    }
}

// ── Procedures ────────────────────────────────────────────────────────────────

/// `proc(_name, [@param | assign(@param, default)...], body)`
struct Proc;

impl Proc {
    fn param(ctx: &mut Executor<'_>, node: &ParseNode, position: usize) -> Result<(String, Construct), Halt> {
        match &node.kind {
            NodeKind::IVariable(name) => Ok((name.clone(), Construct::string("", node.target.clone()))),
            NodeKind::Call { name, args } if name == "assign" && args.len() == 2 => {
                let param = ivar_name(&args[0], "proc", position)?.to_owned();
                let default = ctx.eval(&args[1])?.resolved().clone();
                Ok((param, default))
            }
            _ => Err(ScriptError::cast(
                format!("argument {position} of proc() must be an ivariable or assign(@ivar, default)"),
                node.target.clone(),
            )
            .into()),
        }
    }
}

impl Function for Proc {
    fn name(&self) -> &'static str {
        "proc"
    }

    fn arity(&self) -> Arity {
        Arity::Unbounded
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[ExceptionKind::Cast, ExceptionKind::Format, ExceptionKind::InsufficientArguments]
    }

    fn docs(&self) -> &'static str {
        "void {_name, [@param...], body} Defines a procedure. Parameters may be given defaults with assign(@param, default); inside the body, @arguments holds every argument passed."
    }

    fn since(&self) -> &'static str {
        "3.3.0"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let Some((body, rest)) = args.split_last().filter(|(_, rest)| !rest.is_empty()) else {
            return Err(ScriptError::new(
                ExceptionKind::InsufficientArguments,
                "proc() needs at least a name and a body",
                t.clone(),
            )
            .into());
        };
        let name = ctx.eval(&rest[0])?.value();
        if !is_proc_name(&name) {
            return Err(ScriptError::format(
                format!("procedure names must start with an underscore, but got \"{name}\""),
                rest[0].target.clone(),
            )
            .into());
        }
        let mut params = Vec::with_capacity(rest.len() - 1);
        for (i, node) in rest.iter().enumerate().skip(1) {
            params.push(Self::param(ctx, node, i + 1)?);
        }
        tracing::debug!(procedure = %name, params = params.len(), "defined");
        ctx.env().define_proc(Procedure { name, params, body: body.clone() });
        Ok(Construct::Void(t.clone()))
    }
}

// ── eval ──────────────────────────────────────────────────────────────────────

/// `eval(script)`: compile and run a string in the current environment.
struct Eval;

impl Function for Eval {
    fn name(&self) -> &'static str {
        "eval"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[1])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[ExceptionKind::Format, ExceptionKind::Range]
    }

    fn docs(&self) -> &'static str {
        "string {script_string} Compiles and runs the string as a script, returning the output of its statements. A compile failure is a FormatException; eval() nested too deeply is a RangeException."
    }

    fn since(&self) -> &'static str {
        "3.1.0"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let text = ctx.eval(node_arg(args, 0, "eval", t)?)?.value();
        let registry = ctx.registry();
        let tree = lex(&text, None)
            .and_then(|tokens| Compiler::new(registry).parse(&tokens))
            .and_then(|tree| Optimizer::new(registry).optimize(tree))
            .map_err(|e| ScriptError::format(format!("eval() could not compile its argument: {e}"), t.clone()))?;

        let mut output = Vec::new();
        ctx.nested("eval()", t, |ctx| {
            for root in &tree.roots {
                let value = ctx.eval(root)?;
                if !value.is_void() {
                    output.push(value.value());
                }
            }
            Ok(())
        })?;
        if output.is_empty() {
            Ok(Construct::Void(t.clone()))
        } else {
            Ok(Construct::string(output.join(" "), t.clone()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
