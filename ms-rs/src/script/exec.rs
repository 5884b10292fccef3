//! Tree-walking evaluator.
//!
//! Evaluation is depth-first and left to right.  Every node produces a
//! [`Flow`]; a halted child short-circuits its siblings through `?`, and the
//! halt travels upward until something consumes it: loops take Break and
//! Continue, procedure calls take Return, and [`execute`] takes Cancel and
//! errors.

use tracing::{debug, trace, warn};

use super::compiler::{is_proc_name, NodeKind, ParseNode, ParseTree};
use super::construct::Construct;
use super::env::Environment;
use super::error::{ExceptionKind, Flow, Halt, ScriptError, Signal};
use super::registry::{self, Registry};
use super::target::Target;

/// Nested procedure calls and `eval()`s allowed before the run is aborted.
pub const MAX_CALL_DEPTH: usize = 128;

/// Evaluates parse nodes against one environment.
pub struct Executor<'a> {
    registry: &'a Registry,
    env: &'a mut Environment,
    depth: usize,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a Registry, env: &'a mut Environment) -> Self {
        Executor { registry, env, depth: 0 }
    }

    /// Run `f` one call level deeper.  Past [`MAX_CALL_DEPTH`] levels the
    /// run fails with a Range-kind error instead.
    pub fn nested<T>(
        &mut self,
        what: &str,
        target: &Target,
        f: impl FnOnce(&mut Self) -> Flow<T>,
    ) -> Flow<T> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::range(
                format!("{what} nested deeper than {MAX_CALL_DEPTH} calls"),
                target.clone(),
            )
            .into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn env(&mut self) -> &mut Environment {
        &mut *self.env
    }

    pub fn eval(&mut self, node: &ParseNode) -> Flow {
        match &node.kind {
            NodeKind::Literal(c) => Ok(c.clone()),
            NodeKind::IVariable(name) => Ok(self
                .env
                .ivar(name)
                .cloned()
                .unwrap_or_else(|| Construct::string("", node.target.clone()))),
            NodeKind::Variable(var) => Ok(self.env.alias_var(var)),
            NodeKind::Call { name, args } => self.call(name, &node.target, args),
        }
    }

    /// Evaluate every node in order and follow variables to their values.
    pub fn eval_all(&mut self, nodes: &[ParseNode]) -> Flow<Vec<Construct>> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.eval(node)?.resolved().clone());
        }
        Ok(values)
    }

    /// Dispatch one call node.
    pub fn call(&mut self, name: &str, target: &Target, args: &[ParseNode]) -> Flow {
        if is_proc_name(name) {
            return self.call_proc(name, target, args);
        }
        let registry = self.registry;
        let Some(f) = registry.get(name) else {
            return Err(ScriptError::new(
                ExceptionKind::InvalidProcedure,
                format!("unknown function {name}()"),
                target.clone(),
            )
            .into());
        };
        if !f.arity().accepts(args.len()) {
            return Err(ScriptError::new(
                ExceptionKind::InsufficientArguments,
                format!("{name}() expects {} argument(s), but got {}", f.arity(), args.len()),
                target.clone(),
            )
            .into());
        }
        if f.is_restricted() && !self.env.is_privileged() {
            return Err(ScriptError::new(
                ExceptionKind::Security,
                format!("you do not have permission to use {name}()"),
                target.clone(),
            )
            .into());
        }
        trace!(function = name, %target, "dispatch");
        if f.pre_resolve_variables() {
            let values = self.eval_all(args)?;
            f.exec(target, Some(&mut *self.env), &values)
        } else {
            f.exec_lazy(target, self, args)
        }
    }

    fn call_proc(&mut self, name: &str, target: &Target, args: &[ParseNode]) -> Flow {
        let Some(proc) = self.env.proc(name).cloned() else {
            return Err(ScriptError::new(
                ExceptionKind::InvalidProcedure,
                format!("unknown procedure {name}"),
                target.clone(),
            )
            .into());
        };
        let values = self.eval_all(args)?;
        debug!(procedure = name, args = values.len(), "call");

        let result = self.nested("procedure calls", target, |exec| {
            exec.env.push_frame();
            for (i, (param, default)) in proc.params.iter().enumerate() {
                let value = values.get(i).cloned().unwrap_or_else(|| default.clone());
                exec.env.set_ivar(param.as_str(), value);
            }
            exec.env.set_ivar("arguments", Construct::array(values, target.clone()));
            let result = exec.eval(&proc.body);
            exec.env.pop_frame();
            result
        });

        match result {
            Ok(_) => Ok(Construct::Void(target.clone())),
            Err(Halt::Signal(Signal::Return(value))) => Ok(value),
            Err(Halt::Signal(s @ (Signal::Break(_) | Signal::Continue))) => {
                Err(s.into_misuse(target.clone()).into())
            }
            Err(other) => Err(other),
        }
    }
}

/// Run `tree` against the process-wide registry.
///
/// Statements run in order.  The values of non-void statements are joined
/// with spaces and handed to `on_complete` once the run finishes, including
/// after `die()`.  The first error aborts the run; it is logged, reported to
/// the invoking actor and returned.
pub fn execute(
    tree: &ParseTree,
    env: &mut Environment,
    on_complete: Option<&mut dyn FnMut(&str)>,
) -> Result<Construct, ScriptError> {
    execute_with(registry::global(), tree, env, on_complete)
}

/// [`execute`] against an explicit registry.
pub fn execute_with(
    registry: &Registry,
    tree: &ParseTree,
    env: &mut Environment,
    on_complete: Option<&mut dyn FnMut(&str)>,
) -> Result<Construct, ScriptError> {
    let mut output: Vec<String> = Vec::new();
    let mut last = Construct::void();
    let mut exec = Executor::new(registry, env);

    for root in &tree.roots {
        let err = match exec.eval(root) {
            Ok(value) => {
                if !value.is_void() {
                    output.push(value.value());
                }
                last = value;
                continue;
            }
            Err(Halt::Signal(Signal::Cancel)) => {
                debug!(target = %root.target, "script cancelled");
                break;
            }
            Err(Halt::Signal(s)) => s.into_misuse(root.target.clone()),
            Err(Halt::Error(e)) => e,
        };
        warn!(error = %err, "script failed");
        exec.env().send(&err.to_string());
        return Err(err);
    }

    if let Some(done) = on_complete {
        done(&output.join(" "));
    }
    Ok(last)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
