//! The builtin function table.
//!
//! Simple functions are described by a [`Builtin`] record holding their
//! metadata and a plain `fn` pointer.  Functions that control their own
//! argument evaluation (conditionals, loops, assignment…) are separate
//! types implementing [`Function`] directly.

pub mod basic;
pub mod control;
pub mod crypto;
pub mod logic;
pub mod math;
pub mod meta;
pub mod string;

use super::compiler::ParseNode;
use super::construct::Construct;
use super::env::Environment;
use super::error::{ExceptionKind, Flow, ScriptError, SignalKind};
use super::exec::Executor;
use super::registry::{self, Arity, AsyncMode, Function, Registry};
use super::target::Target;

/// Every builtin, in registration order.
pub fn builtins() -> Vec<Box<dyn Function>> {
    let mut all = Vec::new();
    all.extend(basic::functions());
    all.extend(math::functions());
    all.extend(logic::functions());
    all.extend(control::functions());
    all.extend(string::functions());
    all.extend(crypto::functions());
    all.extend(meta::functions());
    all
}

// ── Builtin ───────────────────────────────────────────────────────────────────

pub type ExecFn = fn(&Target, Option<&mut Environment>, &[Construct]) -> Flow;

/// A table-driven builtin: metadata plus an evaluation function that
/// receives already-resolved arguments.
pub struct Builtin {
    name: &'static str,
    arity: Arity,
    docs: &'static str,
    since: &'static str,
    thrown: &'static [ExceptionKind],
    foldable: bool,
    restricted: bool,
    run_async: AsyncMode,
    signal: Option<SignalKind>,
    exec: ExecFn,
}

impl Builtin {
    pub fn new(name: &'static str, arity: Arity, docs: &'static str, exec: ExecFn) -> Self {
        Builtin {
            name,
            arity,
            docs,
            since: "3.0.0",
            thrown: &[],
            foldable: false,
            restricted: false,
            run_async: AsyncMode::CallerDecides,
            signal: None,
            exec,
        }
    }

    pub fn since_version(mut self, since: &'static str) -> Self {
        self.since = since;
        self
    }

    pub fn throws(mut self, kinds: &'static [ExceptionKind]) -> Self {
        self.thrown = kinds;
        self
    }

    /// Result depends only on the arguments, so literal calls may be folded.
    pub fn foldable(mut self) -> Self {
        self.foldable = true;
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn on_main_thread(mut self) -> Self {
        self.run_async = AsyncMode::Never;
        self
    }

    pub fn raises(mut self, signal: SignalKind) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn boxed(self) -> Box<dyn Function> {
        Box::new(self)
    }
}

impl Function for Builtin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        self.thrown
    }

    fn docs(&self) -> &'static str {
        self.docs
    }

    fn since(&self) -> &'static str {
        self.since
    }

    fn is_restricted(&self) -> bool {
        self.restricted
    }

    fn run_async(&self) -> AsyncMode {
        self.run_async
    }

    fn signal(&self) -> Option<SignalKind> {
        self.signal
    }

    fn can_optimize(&self) -> bool {
        self.foldable
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        (self.exec)(target, env, args)
    }
}

// ── Helpers shared by the builtin modules ─────────────────────────────────────

pub(crate) fn boxed<F: Function + 'static>(f: F) -> Box<dyn Function> {
    Box::new(f)
}

/// Run a lazily-evaluated function on values that are already known, by
/// presenting each value as a literal argument node.  Calls it makes are
/// resolved against the process-wide registry.
pub(crate) fn exec_with_literals(
    f: &dyn Function,
    target: &Target,
    env: Option<&mut Environment>,
    args: &[Construct],
) -> Flow {
    exec_literals_in(f, registry::global(), target, env, args)
}

/// [`exec_with_literals`] against an explicit registry.
pub(crate) fn exec_literals_in<F: Function + ?Sized>(
    f: &F,
    registry: &Registry,
    target: &Target,
    env: Option<&mut Environment>,
    args: &[Construct],
) -> Flow {
    let nodes: Vec<ParseNode> = args.iter().cloned().map(ParseNode::literal).collect();
    let mut scratch = Environment::new();
    let env = env.unwrap_or(&mut scratch);
    let mut exec = Executor::new(registry, env);
    f.exec_lazy(target, &mut exec, &nodes)
}

/// The environment a builtin was given, or a NullPointer-kind error when it
/// was called without one.
pub(crate) fn require_env<'e>(
    env: Option<&'e mut Environment>,
    name: &str,
    target: &Target,
) -> Result<&'e mut Environment, ScriptError> {
    env.ok_or_else(|| {
        ScriptError::new(
            ExceptionKind::NullPointer,
            format!("{name}() needs a running script environment"),
            target.clone(),
        )
    })
}

/// Name of the ivariable an argument node refers to, or a Cast-kind error.
pub(crate) fn ivar_name<'n>(
    node: &'n ParseNode,
    function: &str,
    position: usize,
) -> Result<&'n str, ScriptError> {
    match &node.kind {
        super::compiler::NodeKind::IVariable(name) => Ok(name),
        _ => Err(ScriptError::cast(
            format!("argument {position} of {function}() must be an ivariable"),
            node.target.clone(),
        )),
    }
}

/// Unevaluated argument `i` of a lazy function.
pub(crate) fn node_arg<'n>(
    args: &'n [ParseNode],
    i: usize,
    function: &str,
    target: &Target,
) -> Result<&'n ParseNode, ScriptError> {
    args.get(i).ok_or_else(|| {
        ScriptError::new(
            ExceptionKind::InsufficientArguments,
            format!("{function}() is missing argument {}", i + 1),
            target.clone(),
        )
    })
}

/// Argument `i`, which the arity check guarantees exists.
pub(crate) fn arg(args: &[Construct], i: usize) -> &Construct {
    static VOID: Construct = Construct::Void(Target::UNKNOWN);
    args.get(i).unwrap_or(&VOID)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique() {
        let all = builtins();
        let names: HashSet<_> = all.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn docs_follow_signature_format() {
        for f in builtins() {
            let docs = f.docs();
            assert!(docs.contains('{') && docs.contains('}'), "{}: {docs}", f.name());
        }
    }

    #[test]
    fn signal_functions_declare_their_signal() {
        let reg = registry::global();
        for (name, kind) in [
            ("break", SignalKind::Break),
            ("continue", SignalKind::Continue),
            ("return", SignalKind::Return),
            ("die", SignalKind::Cancel),
        ] {
            assert_eq!(reg.get(name).and_then(|f| f.signal()), Some(kind), "{name}");
        }
    }

    #[test]
    fn lazy_functions_run_on_literals() {
        let reg = registry::global();
        let f = reg.get("if").unwrap();
        let v = f.exec(&Target::UNKNOWN, None, &[true.into(), "yes".into(), "no".into()]);
        assert_eq!(v.unwrap().value(), "yes");
    }

    struct Shout;

    impl Function for Shout {
        fn name(&self) -> &'static str {
            "shout"
        }
        fn arity(&self) -> Arity {
            Arity::Fixed(&[1])
        }
        fn thrown(&self) -> &'static [ExceptionKind] {
            &[]
        }
        fn docs(&self) -> &'static str {
            "string {text} Upper-cases text and adds an exclamation mark."
        }
        fn since(&self) -> &'static str {
            "0.0.0"
        }
        fn exec(&self, t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
            Ok(Construct::string(format!("{}!", arg(args, 0).value().to_uppercase()), t.clone()))
        }
    }

    #[test]
    fn lazy_functions_resolve_calls_in_the_given_registry() {
        let mut builder = Registry::builder();
        for f in builtins() {
            builder = builder.register(f).unwrap();
        }
        let reg = builder.register(boxed(Shout)).unwrap().build();
        let eval = reg.get("eval").unwrap();
        let args = ["shout(hi)".into()];
        let v = eval.exec_in(&reg, &Target::UNKNOWN, None, &args).unwrap();
        assert_eq!(v.value(), "HI!");
        let e = eval.exec(&Target::UNKNOWN, None, &args).unwrap_err();
        assert!(matches!(e, crate::script::error::Halt::Error(e) if e.kind == ExceptionKind::Format));
    }

    #[test]
    fn missing_env_is_null_pointer() {
        let e = require_env(None, "msg", &Target::UNKNOWN).unwrap_err();
        assert_eq!(e.kind, ExceptionKind::NullPointer);
    }
}
