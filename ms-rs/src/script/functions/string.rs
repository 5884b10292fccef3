//! String manipulation.

use regex::Regex;

use super::{arg, Builtin};
use crate::script::construct::{CString, Construct};
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow, ScriptError};
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        Builtin::new(
            "to_upper",
            Arity::Fixed(&[1]),
            "string {str} Returns the string in upper case.",
            to_upper,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "to_lower",
            Arity::Fixed(&[1]),
            "string {str} Returns the string in lower case.",
            to_lower,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "trim",
            Arity::Fixed(&[1]),
            "string {str} Returns the string without leading or trailing whitespace.",
            trim,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "reg_match",
            Arity::Fixed(&[2]),
            "array {pattern, subject} Matches subject against the regular expression. Returns an array holding the whole match followed by each capture group, or an empty array when nothing matches.",
            reg_match,
        )
        .since_version("3.2.0")
        .throws(&[ExceptionKind::Format])
        .boxed(),
        Builtin::new(
            "replace",
            Arity::Fixed(&[3]),
            "string {subject, search, replacement} Replaces every occurrence of search in subject.",
            replace,
        )
        .foldable()
        .boxed(),
        Builtin::new(
            "char_at",
            Arity::Fixed(&[2]),
            "string {str, index} Returns the character at index (0 based).",
            char_at,
        )
        .since_version("3.3.0")
        .throws(&[ExceptionKind::Format, ExceptionKind::IndexOverflow])
        .foldable()
        .boxed(),
    ]
}

fn to_upper(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(arg(args, 0).value().to_uppercase(), t.clone()))
}

fn to_lower(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(arg(args, 0).value().to_lowercase(), t.clone()))
}

fn trim(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::string(arg(args, 0).value().trim(), t.clone()))
}

fn reg_match(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let pattern = arg(args, 0).value();
    let re = Regex::new(&pattern)
        .map_err(|e| ScriptError::format(format!("invalid regular expression \"{pattern}\": {e}"), t.clone()))?;
    let subject = arg(args, 1).value();
    let groups = match re.captures(&subject) {
        Some(caps) => caps
            .iter()
            .map(|m| match m {
                Some(m) => Construct::string(m.as_str(), t.clone()),
                None => Construct::Null(t.clone()),
            })
            .collect(),
        None => Vec::new(),
    };
    Ok(Construct::array(groups, t.clone()))
}

fn replace(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let subject = arg(args, 0).value();
    let search = arg(args, 1).value();
    if search.is_empty() {
        return Ok(Construct::string(subject, t.clone()));
    }
    Ok(Construct::string(subject.replace(&search, &arg(args, 2).value()), t.clone()))
}

fn char_at(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let s = CString::new(arg(args, 0).value(), t.clone());
    Ok(s.get(&arg(args, 1).value(), t)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
