//! Builtin function contract and the process-wide function registry.
//!
//! Every builtin implements [`Function`].  The registry is assembled once
//! from an explicit table ([`crate::script::functions::builtins`]), checked
//! for duplicate names and missing docs, and installed into a write-once
//! slot.  After that it is only ever read, so concurrent script evaluations
//! share it without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, info};

use super::compiler::ParseNode;
use super::construct::Construct;
use super::env::Environment;
use super::error::{CompileError, ExceptionKind, Flow, Halt, ScriptError, SignalKind};
use super::exec::Executor;
use super::functions;
use super::target::Target;

// ── Arity ─────────────────────────────────────────────────────────────────────

/// Argument counts a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One of an explicit set of counts.
    Fixed(&'static [usize]),
    /// Any number of arguments.
    Unbounded,
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Fixed(counts) => counts.contains(&n),
            Arity::Unbounded => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Unbounded => f.write_str("any number"),
            Arity::Fixed(counts) => {
                let parts: Vec<String> = counts.iter().map(usize::to_string).collect();
                f.write_str(&parts.join(" or "))
            }
        }
    }
}

// ── AsyncMode ─────────────────────────────────────────────────────────────────

/// Thread preference a host may consult when scheduling a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncMode {
    /// Must run off the host's main thread.
    Always,
    /// Must run on the host's main thread.
    Never,
    /// No preference.
    CallerDecides,
}

// ── Function ──────────────────────────────────────────────────────────────────

/// The contract every builtin satisfies.
///
/// Implementations that set [`pre_resolve_variables`](Function::pre_resolve_variables)
/// to `false` receive their argument sub-trees unevaluated through
/// [`exec_lazy`](Function::exec_lazy) and decide themselves what to run and
/// when.  [`exec`](Function::exec) is the entry point for already-evaluated
/// values: the optimizer uses it with no environment, and hosts may call it
/// directly.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;

    fn arity(&self) -> Arity;

    /// Error kinds this function may raise.
    fn thrown(&self) -> &'static [ExceptionKind];

    fn docs(&self) -> &'static str;

    /// Version of the language the function first appeared in.
    fn since(&self) -> &'static str;

    fn is_restricted(&self) -> bool {
        false
    }

    fn run_async(&self) -> AsyncMode {
        AsyncMode::CallerDecides
    }

    fn pre_resolve_variables(&self) -> bool {
        true
    }

    /// The control-flow signal this function exists to raise, if any.
    fn signal(&self) -> Option<SignalKind> {
        None
    }

    /// Whether a call with only literal arguments may be folded at compile
    /// time.  Must be `false` for anything that needs the environment.
    fn can_optimize(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow;

    /// [`exec`](Function::exec), with any calls the function makes itself
    /// resolved against `registry` instead of the process-wide one.
    fn exec_in(
        &self,
        registry: &Registry,
        target: &Target,
        env: Option<&mut Environment>,
        args: &[Construct],
    ) -> Flow {
        if self.pre_resolve_variables() {
            self.exec(target, env, args)
        } else {
            functions::exec_literals_in(self, registry, target, env, args)
        }
    }

    /// Entry point for functions that control their own argument evaluation.
    fn exec_lazy(&self, target: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(ctx.eval(arg)?);
        }
        self.exec(target, Some(ctx.env()), &values)
    }

    /// Compile-time evaluation; only called when [`can_optimize`](Function::can_optimize)
    /// is `true` and every argument is a literal.
    fn optimize(&self, target: &Target, args: &[Construct]) -> Result<Construct, CompileError> {
        let fold_error = |source: ScriptError| CompileError::Fold {
            name: self.name().to_owned(),
            source,
        };
        match self.exec(target, None, args) {
            Ok(value) => Ok(value),
            Err(Halt::Error(e)) => Err(fold_error(e)),
            Err(Halt::Signal(s)) => Err(fold_error(s.into_misuse(target.clone()))),
        }
    }
}

// ── FunctionInfo ──────────────────────────────────────────────────────────────

/// Descriptor snapshot used for documentation and validation tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub arity: Arity,
    pub thrown: &'static [ExceptionKind],
    pub restricted: bool,
    pub run_async: AsyncMode,
    pub docs: &'static str,
    pub since: &'static str,
}

impl FunctionInfo {
    fn of(f: &dyn Function) -> Self {
        FunctionInfo {
            name: f.name(),
            arity: f.arity(),
            thrown: f.thrown(),
            restricted: f.is_restricted(),
            run_async: f.run_async(),
            docs: f.docs(),
            since: f.since(),
        }
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("function {0}() is registered twice")]
    Duplicate(&'static str),
    #[error("function {0}() has no documentation")]
    MissingDocs(&'static str),
    #[error("function {0}() accepts no argument counts")]
    EmptyArity(&'static str),
    #[error("a function registry is already installed")]
    AlreadyInstalled,
}

/// Immutable name → implementation table.
pub struct Registry {
    functions: HashMap<&'static str, Box<dyn Function>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("functions", &self.functions.len()).finish()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { functions: HashMap::new() }
    }

    /// The builtin function table.
    pub fn builtin() -> Result<Registry, RegistryError> {
        let mut builder = Registry::builder();
        for f in functions::builtins() {
            builder = builder.register(f)?;
        }
        Ok(builder.build())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Function> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered functions in name order.
    pub fn functions(&self) -> impl Iterator<Item = &dyn Function> {
        let mut all: Vec<&dyn Function> = self.functions.values().map(|f| f.as_ref()).collect();
        all.sort_by_key(|f| f.name());
        all.into_iter()
    }

    /// Descriptor of every function, in name order.
    pub fn describe(&self) -> impl Iterator<Item = FunctionInfo> + '_ {
        self.functions().map(FunctionInfo::of)
    }
}

/// Collects functions before the registry is frozen.
pub struct RegistryBuilder {
    functions: HashMap<&'static str, Box<dyn Function>>,
}

impl RegistryBuilder {
    pub fn register(mut self, f: Box<dyn Function>) -> Result<Self, RegistryError> {
        let name = f.name();
        if f.docs().trim().is_empty() {
            return Err(RegistryError::MissingDocs(name));
        }
        if matches!(f.arity(), Arity::Fixed(counts) if counts.is_empty()) {
            return Err(RegistryError::EmptyArity(name));
        }
        if self.functions.contains_key(name) {
            return Err(RegistryError::Duplicate(name));
        }
        debug!(function = name, "registered");
        self.functions.insert(name, f);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { functions: self.functions }
    }
}

// ── Process-wide slot ─────────────────────────────────────────────────────────

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry.  Succeeds at most once, and only if
/// nothing has read the registry yet.
pub fn install(registry: Registry) -> Result<(), RegistryError> {
    let count = registry.len();
    GLOBAL.set(registry).map_err(|_| RegistryError::AlreadyInstalled)?;
    info!(functions = count, "function registry installed");
    Ok(())
}

/// The process-wide registry, installing the builtin table on first use.
///
/// # Panics
///
/// If the builtin table itself is malformed (a duplicate name or missing
/// docs).  That is a defect in this crate, not in any script.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| {
        let registry = Registry::builtin().unwrap_or_else(|e| panic!("builtin function table rejected: {e}"));
        info!(functions = registry.len(), "builtin function registry installed");
        registry
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
