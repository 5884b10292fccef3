//! MethodScript core runtime.
//!
//! Source text goes through three stages:
//!
//! - [`lexer::lex`] turns text into [`Token`]s carrying their [`Target`]
//! - [`compile`] builds a [`ParseTree`] against the function registry and
//!   folds constant calls
//! - [`execute`] walks the tree in an [`Environment`]
//!
//! # Quick start
//!
//! ```rust
//! use mscript::script::{run, Environment};
//!
//! let mut env = Environment::new();
//! let mut out = String::new();
//! run("assign(@x, 6)\nmultiply(@x, 7)", &mut env, Some(&mut |s: &str| out = s.to_owned())).unwrap();
//! assert_eq!(out, "6 42");
//! ```

pub mod compiler;
pub mod construct;
pub mod env;
pub mod error;
pub mod exec;
pub mod functions;
pub mod lexer;
pub mod optimizer;
pub mod registry;
pub mod target;
pub mod validate;

use thiserror::Error;

pub use compiler::{Compiler, NodeKind, ParseNode, ParseTree};
pub use construct::{CArray, CString, Construct, ConstructType, HostValue, Number, Variable};
pub use env::{CommandSender, Environment, Procedure, Server};
pub use error::{CompileError, ExceptionKind, Flow, Halt, ScriptError, Signal, SignalKind};
pub use exec::{execute, execute_with, Executor};
pub use lexer::{lex, Token, TokenKind};
pub use optimizer::Optimizer;
pub use registry::{Arity, AsyncMode, Function, FunctionInfo, Registry, RegistryError};
pub use target::Target;

/// Either stage of [`run`] failing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Parse and optimize `tokens` against the process-wide registry.
pub fn compile(tokens: &[Token]) -> Result<ParseTree, CompileError> {
    compile_with(registry::global(), tokens, true)
}

/// Parse `tokens` against `registry`, folding constants when `optimize` is
/// set.
pub fn compile_with(registry: &Registry, tokens: &[Token], optimize: bool) -> Result<ParseTree, CompileError> {
    let tree = Compiler::new(registry).parse(tokens)?;
    if optimize {
        Optimizer::new(registry).optimize(tree)
    } else {
        Ok(tree)
    }
}

/// Lex, compile and execute `text` in `env`.
pub fn run(
    text: &str,
    env: &mut Environment,
    on_complete: Option<&mut dyn FnMut(&str)>,
) -> Result<Construct, RunError> {
    let tree = compile(&lex(text, None)?)?;
    Ok(execute(&tree, env, on_complete)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_folds_by_default() {
        let tokens = lex("add(1, 2)", None).unwrap();
        let folded = compile(&tokens).unwrap();
        assert!(folded.roots[0].is_static_literal());
        let raw = compile_with(registry::global(), &tokens, false).unwrap();
        assert_eq!(raw.roots[0].call_name(), Some("add"));
    }

    #[test]
    fn run_reports_each_stage() {
        let mut env = Environment::new();
        assert!(matches!(run("nosuch(1)", &mut env, None), Err(RunError::Compile(_))));
        match run("divide(1, 0)", &mut env, None) {
            Err(RunError::Compile(CompileError::Fold { source, .. })) => {
                assert_eq!(source.kind, ExceptionKind::Range)
            }
            other => panic!("expected a fold error, got {other:?}"),
        }
        assert!(matches!(run("assign(@z, 0)\ndivide(1, @z)", &mut env, None), Err(RunError::Script(_))));
    }

    #[test]
    fn run_returns_last_value() {
        let mut env = Environment::new();
        let v = run("concat(a, b)\nto_upper(x)", &mut env, None).unwrap();
        assert_eq!(v.value(), "X");
    }
}
