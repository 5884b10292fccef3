//! String joining, arrays and type inspection.

use super::{arg, Builtin};
use crate::script::construct::{CArray, Construct};
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow, ScriptError};
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        Builtin::new(
            "sconcat",
            Arity::Unbounded,
            "string {var1, [var2...]} Joins its arguments with a space between each. Juxtaposed values compile to this.",
            sconcat,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "concat",
            Arity::Unbounded,
            "string {var1, [var2...]} Joins its arguments with nothing between them.",
            concat,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "array",
            Arity::Unbounded,
            "array {[var1, [var2...]]} Creates a new array holding the arguments.",
            array,
        )
        .boxed(),
        Builtin::new(
            "array_get",
            Arity::Fixed(&[2]),
            "mixed {array, index} Returns the element at index. Strings may be indexed too. Negative indices count from the end of an array. Written x[i] in scripts.",
            array_get,
        )
        .throws(&[ExceptionKind::Cast, ExceptionKind::Format, ExceptionKind::IndexOverflow])
        .foldable()
        .boxed(),
        Builtin::new(
            "array_size",
            Arity::Fixed(&[1]),
            "int {array} Returns the number of elements in the array.",
            array_size,
        )
        .throws(&[ExceptionKind::Cast])
        .boxed(),
        Builtin::new(
            "array_push",
            Arity::Fixed(&[2]),
            "void {array, value} Appends value to the array. Every reference to the array sees the change.",
            array_push,
        )
        .throws(&[ExceptionKind::Cast])
        .boxed(),
        Builtin::new(
            "length",
            Arity::Fixed(&[1]),
            "int {value} Returns the number of elements of an array, or the number of characters in the value's string form.",
            length,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "is_null",
            Arity::Fixed(&[1]),
            "boolean {value} Returns whether the value is null.",
            is_null,
        )
        .since_version("3.1.2")
        .foldable()
        .boxed(),
        Builtin::new(
            "typeof",
            Arity::Fixed(&[1]),
            "string {value} Returns the type name of the value: string, int, double, boolean, array, null or void.",
            type_of,
        )
        .since_version("3.3.0")
        .foldable()
        .boxed(),
    ]
}

fn join(args: &[Construct], sep: &str) -> String {
    args.iter().map(Construct::value).collect::<Vec<_>>().join(sep)
}

fn sconcat(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(join(args, " "), t.clone()))
}

fn concat(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(join(args, ""), t.clone()))
}

fn array(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::array(args.to_vec(), t.clone()))
}

fn array_get(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(arg(args, 0).get(&arg(args, 1).value(), t)?)
}

fn expect_array<'c>(value: &'c Construct, name: &str, t: &Target) -> Result<&'c CArray, ScriptError> {
    match value.resolved() {
        Construct::Array(a) => Ok(a),
        other => Err(ScriptError::cast(
            format!("{name}() expects an array, but received a value of type {}", other.type_name()),
            t.clone(),
        )),
    }
}

fn array_size(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let a = expect_array(arg(args, 0), "array_size", t)?;
    Ok(Construct::Int(a.size() as i64, t.clone()))
}

fn array_push(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let a = expect_array(arg(args, 0), "array_push", t)?;
    a.push(arg(args, 1).clone());
    Ok(Construct::Void(t.clone()))
}

fn length(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let value = arg(args, 0);
    let n = match value.resolved() {
        Construct::Array(a) => a.size(),
        other => other.value().chars().count(),
    };
    Ok(Construct::Int(n as i64, t.clone()))
}

fn is_null(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::Boolean(arg(args, 0).is_null(), t.clone()))
}

fn type_of(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(arg(args, 0).resolved().type_name(), t.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
