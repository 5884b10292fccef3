//! Fuzz validation of the builtin contract.
//!
//! Every function is called with combinations of a fixed set of sample
//! values at every argument count it accepts.  A call may succeed or fail,
//! but it must only fail with an error kind the function declares, and it
//! may only raise the control-flow signal it declares.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::construct::Construct;
use super::env::{CommandSender, Environment, Server};
use super::error::{ExceptionKind, Halt, SignalKind};
use super::registry::{self, Arity, Function, Registry};
use super::target::Target;

/// Argument counts tried for functions that accept any number.
const UNBOUNDED_COUNTS: &[usize] = &[0, 1, 2, 3, 10];

/// Above this many combinations the full product is replaced by one call
/// per sample value.
const MAX_COMBINATIONS: usize = 10_000;

/// A call that broke the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub function: &'static str,
    pub args: Vec<String>,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    UndeclaredError(ExceptionKind),
    UnexpectedSignal(SignalKind),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): ", self.function, self.args.join(", "))?;
        match &self.problem {
            Problem::UndeclaredError(kind) => write!(f, "raised undeclared {kind}"),
            Problem::UnexpectedSignal(kind) => write!(f, "raised undeclared signal {kind:?}"),
        }
    }
}

/// The values every argument position is filled from.
pub fn sample_values() -> Vec<Construct> {
    let t = Target::UNKNOWN;
    vec![
        Construct::string("hi", t.clone()),
        Construct::Int(1, t.clone()),
        Construct::Int(-1, t.clone()),
        Construct::Int(0, t.clone()),
        Construct::Int(100, t.clone()),
        Construct::array(vec![Construct::string("hi", t.clone()), Construct::Int(1, t.clone())], t.clone()),
        Construct::Null(t.clone()),
        Construct::Boolean(true, t.clone()),
        Construct::Boolean(false, t),
    ]
}

/// Every argument list to try for a function of the given arity.
pub fn argument_sets(arity: Arity) -> Vec<Vec<Construct>> {
    let counts: &[usize] = match arity {
        Arity::Fixed(counts) => counts,
        Arity::Unbounded => UNBOUNDED_COUNTS,
    };
    let values = sample_values();
    let mut sets = Vec::new();
    for &n in counts {
        let total = u32::try_from(n)
            .ok()
            .and_then(|n| values.len().checked_pow(n))
            .filter(|&total| total <= MAX_COMBINATIONS);
        match total {
            Some(total) => sets.extend((0..total).map(|i| combination(&values, n, i))),
            None => sets.extend(values.iter().map(|v| vec![v.clone(); n])),
        }
    }
    sets
}

/// The `index`-th element of the `n`-fold product, read as a base-`len`
/// number.
fn combination(values: &[Construct], n: usize, mut index: usize) -> Vec<Construct> {
    let mut args = Vec::with_capacity(n);
    for _ in 0..n {
        args.push(values[index % values.len()].clone());
        index /= values.len();
    }
    args
}

struct Harness;

impl CommandSender for Harness {
    fn name(&self) -> &str {
        "validator"
    }

    fn has_privilege(&self) -> bool {
        true
    }

    fn send_message(&self, _: &str) {}
}

impl Server for Harness {
    fn dispatch_command(&self, _: &str, _: &str) -> bool {
        false
    }

    fn is_online(&self, _: &str) -> bool {
        false
    }
}

fn harness_env() -> Environment {
    let harness = Arc::new(Harness);
    Environment::new().with_sender(harness.clone()).with_server(harness)
}

/// Run the contract check for one function.
pub fn check_function(f: &dyn Function) -> Vec<Violation> {
    check_function_in(registry::global(), f)
}

/// [`check_function`], resolving nested calls against `registry`.
pub fn check_function_in(registry: &Registry, f: &dyn Function) -> Vec<Violation> {
    let t = Target::UNKNOWN;
    let mut violations = Vec::new();
    let sets = argument_sets(f.arity());
    debug!(function = f.name(), calls = sets.len(), "validating");
    for args in sets {
        let mut env = harness_env();
        let problem = match f.exec_in(registry, &t, Some(&mut env), &args) {
            Ok(_) => None,
            Err(Halt::Error(e)) if !f.thrown().contains(&e.kind) => Some(Problem::UndeclaredError(e.kind)),
            Err(Halt::Error(_)) => None,
            Err(Halt::Signal(s)) if f.signal() != Some(s.kind()) => Some(Problem::UnexpectedSignal(s.kind())),
            Err(Halt::Signal(_)) => None,
        };
        if let Some(problem) = problem {
            violations.push(Violation {
                function: f.name(),
                args: args.iter().map(Construct::value).collect(),
                problem,
            });
        }
    }
    violations
}

/// Run the contract check for every function in `registry`.
pub fn check_registry(registry: &Registry) -> Vec<Violation> {
    registry.functions().flat_map(|f| check_function_in(registry, f)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
