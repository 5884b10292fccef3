//! Arithmetic and comparison.
//!
//! Integer arithmetic is checked: an overflow raises a Range-kind error
//! rather than wrapping.  Mixing an int with a double yields a double.

use super::{arg, boxed, exec_with_literals, ivar_name, node_arg, Builtin};
use crate::script::compiler::ParseNode;
use crate::script::construct::{Construct, Number};
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow, ScriptError};
use crate::script::exec::Executor;
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

const CAST_RANGE: &[ExceptionKind] = &[ExceptionKind::Cast, ExceptionKind::Range];

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        Builtin::new("add", Arity::Unbounded, "mixed {var1, [var2...]} Adds all the arguments together.", add)
            .throws(CAST_RANGE)
            .foldable()
            .boxed(),
        Builtin::new(
            "subtract",
            Arity::Fixed(&[2]),
            "mixed {var1, var2} Subtracts var2 from var1.",
            subtract,
        )
        .throws(CAST_RANGE)
        .foldable()
        .boxed(),
        Builtin::new(
            "multiply",
            Arity::Unbounded,
            "mixed {var1, [var2...]} Multiplies all the arguments together.",
            multiply,
        )
        .throws(CAST_RANGE)
        .foldable()
        .boxed(),
        Builtin::new(
            "divide",
            Arity::Fixed(&[2]),
            "mixed {var1, var2} Divides var1 by var2. The result is an int only when the division is exact.",
            divide,
        )
        .throws(CAST_RANGE)
        .foldable()
        .boxed(),
        Builtin::new(
            "mod",
            Arity::Fixed(&[2]),
            "int {x, n} Returns the remainder of x divided by n.",
            modulo,
        )
        .throws(CAST_RANGE)
        .foldable()
        .boxed(),
        boxed(Step { name: "inc", sign: 1 }),
        boxed(Step { name: "dec", sign: -1 }),
        Builtin::new(
            "equals",
            Arity::Fixed(&[2]),
            "boolean {var1, var2} Compares numerically when both values are numbers, and by string value otherwise.",
            equals,
        )
        .foldable()
        .boxed(),
        Builtin::new("lt", Arity::Fixed(&[2]), "boolean {var1, var2} Returns whether var1 < var2.", lt)
            .throws(&[ExceptionKind::Cast])
            .foldable()
            .boxed(),
        Builtin::new("gt", Arity::Fixed(&[2]), "boolean {var1, var2} Returns whether var1 > var2.", gt)
            .throws(&[ExceptionKind::Cast])
            .foldable()
            .boxed(),
        Builtin::new("lte", Arity::Fixed(&[2]), "boolean {var1, var2} Returns whether var1 <= var2.", lte)
            .throws(&[ExceptionKind::Cast])
            .foldable()
            .boxed(),
        Builtin::new("gte", Arity::Fixed(&[2]), "boolean {var1, var2} Returns whether var1 >= var2.", gte)
            .throws(&[ExceptionKind::Cast])
            .foldable()
            .boxed(),
    ]
}

fn overflow(op: &str, t: &Target) -> ScriptError {
    ScriptError::range(format!("integer overflow in {op}()"), t.clone())
}

/// Combine two operands, checking integer overflow.
fn combine(
    a: Number,
    b: Number,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    t: &Target,
) -> Result<Number, ScriptError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y).map(Number::Int).ok_or_else(|| overflow(op, t)),
        _ => Ok(Number::Double(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn fold_all(
    args: &[Construct],
    start: Number,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    t: &Target,
) -> Flow {
    let mut acc = start;
    for a in args {
        acc = combine(acc, a.as_number(t)?, op, int_op, float_op, t)?;
    }
    Ok(acc.into_construct(t.clone()))
}

fn add(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    fold_all(args, Number::Int(0), "add", i64::checked_add, |x, y| x + y, t)
}

fn multiply(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    fold_all(args, Number::Int(1), "multiply", i64::checked_mul, |x, y| x * y, t)
}

fn subtract(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let a = arg(args, 0).as_number(t)?;
    let b = arg(args, 1).as_number(t)?;
    Ok(combine(a, b, "subtract", i64::checked_sub, |x, y| x - y, t)?.into_construct(t.clone()))
}

fn divide(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let a = arg(args, 0).as_number(t)?;
    let b = arg(args, 1).as_number(t)?;
    if b.as_f64() == 0.0 {
        return Err(ScriptError::range("division by zero", t.clone()).into());
    }
    let result = match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_rem(y) {
            None => return Err(overflow("divide", t).into()),
            Some(0) => Number::Int(x / y),
            Some(_) => Number::Double(x as f64 / y as f64),
        },
        _ => Number::Double(a.as_f64() / b.as_f64()),
    };
    Ok(result.into_construct(t.clone()))
}

fn modulo(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let x = arg(args, 0).as_int(t)?;
    let n = arg(args, 1).as_int(t)?;
    if n == 0 {
        return Err(ScriptError::range("modulus by zero", t.clone()).into());
    }
    let r = x.checked_rem(n).ok_or_else(|| overflow("mod", t))?;
    Ok(Construct::Int(r, t.clone()))
}

fn equals(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let (a, b) = (arg(args, 0), arg(args, 1));
    let same = match (a.as_number(t), b.as_number(t)) {
        (Ok(x), Ok(y)) => x.as_f64() == y.as_f64(),
        _ => a.value() == b.value(),
    };
    Ok(Construct::Boolean(same, t.clone()))
}

fn compare(args: &[Construct], t: &Target, test: fn(f64, f64) -> bool) -> Flow {
    let a = arg(args, 0).as_double(t)?;
    let b = arg(args, 1).as_double(t)?;
    Ok(Construct::Boolean(test(a, b), t.clone()))
}

fn lt(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    compare(args, t, |a, b| a < b)
}

fn gt(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    compare(args, t, |a, b| a > b)
}

fn lte(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    compare(args, t, |a, b| a <= b)
}

fn gte(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    compare(args, t, |a, b| a >= b)
}

// ── inc / dec ─────────────────────────────────────────────────────────────────

/// `inc(@x[, by])` / `dec(@x[, by])`: adjust an ivariable in place.
struct Step {
    name: &'static str,
    sign: i64,
}

impl Function for Step {
    fn name(&self) -> &'static str {
        self.name
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[1, 2])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        CAST_RANGE
    }

    fn docs(&self) -> &'static str {
        if self.sign > 0 {
            "ivar {@ivar, [by]} Adds by (default 1) to the ivariable, stores and returns the new value."
        } else {
            "ivar {@ivar, [by]} Subtracts by (default 1) from the ivariable, stores and returns the new value."
        }
    }

    fn since(&self) -> &'static str {
        "3.0.1"
    }

    fn pre_resolve_variables(&self) -> bool {
        false
    }

    fn exec(&self, target: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
        exec_with_literals(self, target, env, args)
    }

    fn exec_lazy(&self, t: &Target, ctx: &mut Executor<'_>, args: &[ParseNode]) -> Flow {
        let name = ivar_name(node_arg(args, 0, self.name, t)?, self.name, 1)?;
        let by = match args.get(1) {
            Some(node) => ctx.eval(node)?.as_number(t)?,
            None => Number::Int(1),
        };
        let by = match by {
            Number::Int(n) => Number::Int(n.checked_mul(self.sign).ok_or_else(|| overflow(self.name, t))?),
            Number::Double(x) => Number::Double(x * self.sign as f64),
        };
        let current = match ctx.env().ivar(name) {
            Some(v) => v.as_number(t)?,
            None => Number::Int(0),
        };
        let next = combine(current, by, self.name, i64::checked_add, |x, y| x + y, t)?.into_construct(t.clone());
        ctx.env().set_ivar(name, next.clone());
        Ok(next)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
