//! Runtime values ("constructs") for MethodScript.
//!
//! Every value a script touches is a [`Construct`]: a closed sum over the
//! built-in variants plus [`Construct::Ext`] for host-defined types.  Each
//! construct remembers the [`Target`] it came from so that errors raised
//! while using it can point back at the script text.
//!
//! Duplication rules differ per variant and are part of each type's
//! contract: immutable leaves share their storage, a [`Variable`] copies its
//! currently bound value, and a [`CArray`] copies its cell vector.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::error::ScriptError;
use super::target::Target;

// ── ConstructType ─────────────────────────────────────────────────────────────

/// The type tag of a construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructType {
    String,
    Int,
    Double,
    Boolean,
    Array,
    Variable,
    Null,
    Void,
    Ext,
}

impl ConstructType {
    /// Name returned by `typeof()`.
    pub fn name(self) -> &'static str {
        match self {
            ConstructType::String => "string",
            ConstructType::Int => "int",
            ConstructType::Double => "double",
            ConstructType::Boolean => "boolean",
            ConstructType::Array => "array",
            ConstructType::Variable => "variable",
            ConstructType::Null => "null",
            ConstructType::Void => "void",
            ConstructType::Ext => "ext",
        }
    }
}

// ── HostValue ─────────────────────────────────────────────────────────────────

/// Extension point for values the host hands to scripts (locations, items…).
pub trait HostValue: fmt::Debug + Send + Sync {
    /// Type name reported by `typeof()`.
    fn type_name(&self) -> &'static str;

    /// Canonical string form.
    fn value(&self) -> String;

    /// Whether the value can change after construction.
    fn is_dynamic(&self) -> bool {
        true
    }
}

// ── CString ───────────────────────────────────────────────────────────────────

/// An immutable string value.
///
/// `duplicate()` returns the same string: the backing storage is shared and
/// can never change.
#[derive(Debug, Clone)]
pub struct CString {
    val: Arc<str>,
    target: Target,
}

impl CString {
    pub fn new(val: impl Into<Arc<str>>, target: Target) -> Self {
        CString { val: val.into(), target }
    }

    pub fn as_str(&self) -> &str {
        &self.val
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Identity: strings are immutable, so the duplicate shares storage.
    pub fn duplicate(&self) -> CString {
        self.clone()
    }

    /// Number of characters (not bytes).
    pub fn size(&self) -> usize {
        self.val.chars().count()
    }

    /// Strings cannot be used as key/value maps.
    pub fn can_be_associative(&self) -> bool {
        false
    }

    /// The single character at position `index`, as a new string construct
    /// located at `target`.
    pub fn get(&self, index: &str, target: &Target) -> Result<Construct, ScriptError> {
        let i = parse_index(index, target)?;
        let ch = usize::try_from(i)
            .ok()
            .and_then(|i| self.val.chars().nth(i))
            .ok_or_else(|| {
                ScriptError::new(
                    super::error::ExceptionKind::IndexOverflow,
                    format!("index {i} is out of bounds for a string of length {}", self.size()),
                    target.clone(),
                )
            })?;
        Ok(Construct::String(CString::new(ch.to_string(), target.clone())))
    }
}

// ── CArray ────────────────────────────────────────────────────────────────────

/// An ordered, mutable array.
///
/// Clones share the same cells, so `array_push(@a, …)` is visible through
/// every reference to `@a`.  `duplicate()` makes an independent copy.
#[derive(Clone)]
pub struct CArray {
    cells: Arc<RwLock<Vec<Construct>>>,
    target: Target,
}

impl fmt::Debug for CArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CArray").field("cells", &self.render()).field("target", &self.target).finish()
    }
}

impl CArray {
    pub fn new(cells: Vec<Construct>, target: Target) -> Self {
        CArray { cells: Arc::new(RwLock::new(cells)), target }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Snapshot of the current cells.
    pub fn cells(&self) -> Vec<Construct> {
        self.cells.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn size(&self) -> usize {
        self.cells.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn push(&self, value: Construct) {
        self.cells.write().unwrap_or_else(PoisonError::into_inner).push(value);
    }

    /// Arrays are not associative in this runtime.
    pub fn can_be_associative(&self) -> bool {
        false
    }

    /// Copy of the cell vector in a fresh array; later pushes do not alias.
    pub fn duplicate(&self) -> CArray {
        CArray::new(self.cells(), self.target.clone())
    }

    /// Cell at `index`; negative indices count from the end.
    pub fn get(&self, index: &str, target: &Target) -> Result<Construct, ScriptError> {
        let i = parse_index(index, target)?;
        let cells = self.cells.read().unwrap_or_else(PoisonError::into_inner);
        let len = cells.len() as i64;
        let pos = if i < 0 { len + i } else { i };
        if pos < 0 || pos >= len {
            return Err(ScriptError::new(
                super::error::ExceptionKind::IndexOverflow,
                format!("index {i} is out of bounds for an array of size {len}"),
                target.clone(),
            ));
        }
        Ok(cells[pos as usize].clone())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, &mut Vec::new());
        out
    }

    /// Append `{a, b, c}` to `out`.  An array that is already being rendered
    /// further up (one that contains itself) prints as `*recursion*`.
    fn render_into(&self, out: &mut String, open: &mut Vec<*const RwLock<Vec<Construct>>>) {
        let id = Arc::as_ptr(&self.cells);
        if open.contains(&id) {
            out.push_str("*recursion*");
            return;
        }
        open.push(id);
        out.push('{');
        for (i, cell) in self.cells().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match cell.resolved() {
                Construct::Array(a) => a.render_into(out, open),
                other => out.push_str(&other.value()),
            }
        }
        out.push('}');
        open.pop();
    }
}

fn parse_index(index: &str, target: &Target) -> Result<i64, ScriptError> {
    index.trim().parse::<i64>().map_err(|_| {
        ScriptError::format(
            format!("Expecting numerical index, but received {index}"),
            target.clone(),
        )
    })
}

// ── Variable ──────────────────────────────────────────────────────────────────

/// A named `$variable` slot.
///
/// The bound value is resolved from the default text when the variable is
/// built; afterwards `value()` always reports whatever is currently bound.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    default: String,
    optional: bool,
    final_var: bool,
    bound: Box<Construct>,
    target: Target,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        default: impl Into<String>,
        optional: bool,
        final_var: bool,
        target: Target,
    ) -> Self {
        let default = default.into();
        let bound = Box::new(Construct::resolve(&default, &target));
        Variable { name: name.into(), default, optional, final_var, bound, target }
    }

    /// A non-optional, non-final variable.
    pub fn simple(name: impl Into<String>, default: impl Into<String>, target: Target) -> Self {
        Self::new(name, default, false, false, target)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_text(&self) -> &str {
        &self.default
    }

    pub fn set_default(&mut self, default: impl Into<String>) {
        self.default = default.into();
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    pub fn is_final(&self) -> bool {
        self.final_var
    }

    pub fn set_final(&mut self, final_var: bool) {
        self.final_var = final_var;
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn bound(&self) -> &Construct {
        &self.bound
    }

    pub fn value(&self) -> String {
        self.bound.value()
    }

    /// Rebind the variable; fails once it has been marked final.
    pub fn set_value(&mut self, value: Construct) -> Result<(), ScriptError> {
        if self.final_var {
            return Err(ScriptError::misuse(
                format!("${} is final and cannot be reassigned", self.name),
                value.target().clone(),
            ));
        }
        self.bound = Box::new(value);
        Ok(())
    }

    /// Copy that keeps the currently bound value (not a re-resolution of
    /// the default text).
    pub fn duplicate(&self) -> Variable {
        self.clone()
    }
}

// ── Construct ─────────────────────────────────────────────────────────────────

/// A MethodScript runtime value.
#[derive(Debug, Clone)]
pub enum Construct {
    String(CString),
    Int(i64, Target),
    Double(f64, Target),
    Boolean(bool, Target),
    Array(CArray),
    Variable(Variable),
    Null(Target),
    /// Result of functions that return nothing; renders as "".
    Void(Target),
    Ext(Arc<dyn HostValue>, Target),
}

impl Construct {
    // ── Constructors ──────────────────────────────────────────────────────────

    pub fn string(val: impl Into<Arc<str>>, target: Target) -> Self {
        Construct::String(CString::new(val, target))
    }

    pub fn array(cells: Vec<Construct>, target: Target) -> Self {
        Construct::Array(CArray::new(cells, target))
    }

    pub fn null() -> Self {
        Construct::Null(Target::UNKNOWN)
    }

    pub fn void() -> Self {
        Construct::Void(Target::UNKNOWN)
    }

    /// Turn unparsed text into the most specific construct it spells.
    ///
    /// `null`, `true` and `false` become their keywords, integers and finite
    /// decimals become numbers, and anything else stays a string.
    pub fn resolve(text: &str, target: &Target) -> Construct {
        let t = target.clone();
        match text {
            "null" => return Construct::Null(t),
            "true" => return Construct::Boolean(true, t),
            "false" => return Construct::Boolean(false, t),
            _ => {}
        }
        if let Ok(n) = text.parse::<i64>() {
            return Construct::Int(n, t);
        }
        if looks_numeric(text) {
            if let Ok(x) = text.parse::<f64>() {
                if x.is_finite() {
                    return Construct::Double(x, t);
                }
            }
        }
        Construct::string(text, t)
    }

    // ── Core contract ─────────────────────────────────────────────────────────

    pub fn ctype(&self) -> ConstructType {
        match self {
            Construct::String(_) => ConstructType::String,
            Construct::Int(..) => ConstructType::Int,
            Construct::Double(..) => ConstructType::Double,
            Construct::Boolean(..) => ConstructType::Boolean,
            Construct::Array(_) => ConstructType::Array,
            Construct::Variable(_) => ConstructType::Variable,
            Construct::Null(_) => ConstructType::Null,
            Construct::Void(_) => ConstructType::Void,
            Construct::Ext(..) => ConstructType::Ext,
        }
    }

    /// Name reported by `typeof()`; host types report their own name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Construct::Ext(v, _) => v.type_name(),
            other => other.ctype().name(),
        }
    }

    /// Canonical string form.
    pub fn value(&self) -> String {
        match self {
            Construct::String(s) => s.as_str().to_owned(),
            Construct::Int(n, _) => n.to_string(),
            Construct::Double(x, _) => format_double(*x),
            Construct::Boolean(b, _) => b.to_string(),
            Construct::Array(a) => a.render(),
            Construct::Variable(v) => v.value(),
            Construct::Null(_) => "null".to_owned(),
            Construct::Void(_) => String::new(),
            Construct::Ext(v, _) => v.value(),
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            Construct::String(s) => s.target(),
            Construct::Array(a) => a.target(),
            Construct::Variable(v) => v.target(),
            Construct::Int(_, t)
            | Construct::Double(_, t)
            | Construct::Boolean(_, t)
            | Construct::Null(t)
            | Construct::Void(t)
            | Construct::Ext(_, t) => t,
        }
    }

    /// Same value, relocated to `target`.
    pub fn with_target(self, target: Target) -> Construct {
        match self {
            Construct::String(s) => Construct::String(CString { target, ..s }),
            Construct::Array(a) => Construct::Array(CArray { target, ..a }),
            Construct::Variable(v) => Construct::Variable(Variable { target, ..v }),
            Construct::Int(n, _) => Construct::Int(n, target),
            Construct::Double(x, _) => Construct::Double(x, target),
            Construct::Boolean(b, _) => Construct::Boolean(b, target),
            Construct::Null(_) => Construct::Null(target),
            Construct::Void(_) => Construct::Void(target),
            Construct::Ext(v, _) => Construct::Ext(v, target),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Construct::String(_)
            | Construct::Int(..)
            | Construct::Double(..)
            | Construct::Boolean(..)
            | Construct::Null(_)
            | Construct::Void(_) => false,
            Construct::Array(_) | Construct::Variable(_) => true,
            Construct::Ext(v, _) => v.is_dynamic(),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Construct::Null(_) => true,
            Construct::Variable(v) => v.bound().is_null(),
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Construct::Void(_))
    }

    /// Per-variant duplicate; see the type-level docs for the rules.
    pub fn duplicate(&self) -> Construct {
        match self {
            Construct::String(s) => Construct::String(s.duplicate()),
            Construct::Array(a) => Construct::Array(a.duplicate()),
            Construct::Variable(v) => Construct::Variable(v.duplicate()),
            other => other.clone(),
        }
    }

    /// Follow a variable to its bound value; every other construct is
    /// returned as is.
    pub fn resolved(&self) -> &Construct {
        match self {
            Construct::Variable(v) => v.bound().resolved(),
            other => other,
        }
    }

    // ── Indexing ──────────────────────────────────────────────────────────────

    /// Element access for indexable variants (strings and arrays).
    pub fn get(&self, index: &str, target: &Target) -> Result<Construct, ScriptError> {
        match self.resolved() {
            Construct::String(s) => s.get(index, target),
            Construct::Array(a) => a.get(index, target),
            other => Err(ScriptError::cast(
                format!("a value of type {} cannot be indexed", other.type_name()),
                target.clone(),
            )),
        }
    }

    /// Element count for indexable variants.
    pub fn size(&self) -> Option<usize> {
        match self.resolved() {
            Construct::String(s) => Some(s.size()),
            Construct::Array(a) => Some(a.size()),
            _ => None,
        }
    }

    // ── Coercions ─────────────────────────────────────────────────────────────

    /// Truthiness: `false`, `0`, `""`, `"false"`, `null`, void and empty
    /// arrays are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Construct::Boolean(b, _) => *b,
            Construct::Int(n, _) => *n != 0,
            Construct::Double(x, _) => *x != 0.0,
            Construct::String(s) => {
                let s = s.as_str().trim();
                !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
            }
            Construct::Array(a) => a.size() > 0,
            Construct::Variable(v) => v.bound().as_bool(),
            Construct::Null(_) | Construct::Void(_) => false,
            Construct::Ext(..) => true,
        }
    }

    /// Numeric view of the construct, failing with a Cast-kind error.
    pub fn as_number(&self, target: &Target) -> Result<Number, ScriptError> {
        match self {
            Construct::Int(n, _) => Ok(Number::Int(*n)),
            Construct::Double(x, _) => Ok(Number::Double(*x)),
            Construct::Boolean(b, _) => Ok(Number::Int(i64::from(*b))),
            Construct::String(s) => {
                let text = s.as_str().trim();
                if let Ok(n) = text.parse::<i64>() {
                    Ok(Number::Int(n))
                } else if let Some(x) = looks_numeric(text).then(|| text.parse::<f64>().ok()).flatten() {
                    Ok(Number::Double(x))
                } else {
                    Err(ScriptError::cast(
                        format!("expecting a number, but received \"{text}\""),
                        target.clone(),
                    ))
                }
            }
            Construct::Variable(v) => v.bound().as_number(target),
            other => Err(ScriptError::cast(
                format!("expecting a number, but received a value of type {}", other.type_name()),
                target.clone(),
            )),
        }
    }

    /// Integer view (doubles are truncated).
    pub fn as_int(&self, target: &Target) -> Result<i64, ScriptError> {
        Ok(match self.as_number(target)? {
            Number::Int(n) => n,
            Number::Double(x) => x.trunc() as i64,
        })
    }

    pub fn as_double(&self, target: &Target) -> Result<f64, ScriptError> {
        Ok(self.as_number(target)?.as_f64())
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value())
    }
}

// ── Number ────────────────────────────────────────────────────────────────────

/// A coerced numeric operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Double(x) => x,
        }
    }

    pub fn into_construct(self, target: Target) -> Construct {
        match self {
            Number::Int(n) => Construct::Int(n, target),
            Number::Double(x) => Construct::Double(x, target),
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Doubles print without exponent noise; whole values keep one decimal.
fn format_double(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

/// Only plain decimal spellings count as numbers ("inf", "NaN" and "1e5"
/// stay strings).
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.chars().filter(|&c| c == '.').count() <= 1
        && body.chars().any(|c| c.is_ascii_digit())
}

impl From<i64> for Construct {
    fn from(n: i64) -> Self {
        Construct::Int(n, Target::UNKNOWN)
    }
}

impl From<f64> for Construct {
    fn from(x: f64) -> Self {
        Construct::Double(x, Target::UNKNOWN)
    }
}

impl From<bool> for Construct {
    fn from(b: bool) -> Self {
        Construct::Boolean(b, Target::UNKNOWN)
    }
}

impl From<&str> for Construct {
    fn from(s: &str) -> Self {
        Construct::string(s, Target::UNKNOWN)
    }
}

impl From<String> for Construct {
    fn from(s: String) -> Self {
        Construct::string(s, Target::UNKNOWN)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::error::ExceptionKind;

    fn at(line: u32) -> Target {
        Target::new(None, line, 1)
    }

    #[test]
    fn value_per_variant() {
        assert_eq!(Construct::from("hi").value(), "hi");
        assert_eq!(Construct::from(42i64).value(), "42");
        assert_eq!(Construct::from(1.0).value(), "1.0");
        assert_eq!(Construct::from(2.5).value(), "2.5");
        assert_eq!(Construct::from(true).value(), "true");
        assert_eq!(Construct::null().value(), "null");
        assert_eq!(Construct::void().value(), "");
        let arr = Construct::array(vec!["a".into(), 1i64.into()], Target::UNKNOWN);
        assert_eq!(arr.value(), "{a, 1}");
    }

    #[test]
    fn static_and_dynamic() {
        assert!(!Construct::from("x").is_dynamic());
        assert!(!Construct::from(1i64).is_dynamic());
        assert!(!Construct::from(false).is_dynamic());
        assert!(Construct::array(vec![], Target::UNKNOWN).is_dynamic());
        let v = Variable::simple("x", "5", Target::UNKNOWN);
        assert!(Construct::Variable(v).is_dynamic());
    }

    #[test]
    fn cstring_get_in_range() {
        let s = CString::new("héllo", Target::UNKNOWN);
        assert_eq!(s.size(), 5);
        for (i, ch) in "héllo".chars().enumerate() {
            let c = s.get(&i.to_string(), &at(3)).unwrap();
            assert_eq!(c.value(), ch.to_string());
            assert_eq!(c.target(), &at(3));
        }
    }

    #[test]
    fn cstring_get_non_numeric_is_format() {
        let s = CString::new("abc", Target::UNKNOWN);
        let e = s.get("one", &at(7)).unwrap_err();
        assert_eq!(e.kind, ExceptionKind::Format);
        assert!(e.message.contains("one"));
        assert_eq!(e.target, at(7));
    }

    #[test]
    fn cstring_get_out_of_range() {
        let s = CString::new("abc", Target::UNKNOWN);
        assert_eq!(s.get("3", &at(1)).unwrap_err().kind, ExceptionKind::IndexOverflow);
        assert_eq!(s.get("-1", &at(1)).unwrap_err().kind, ExceptionKind::IndexOverflow);
    }

    #[test]
    fn cstring_duplicate_shares_storage() {
        let s = CString::new("same", Target::UNKNOWN);
        let d = s.duplicate();
        assert!(Arc::ptr_eq(&s.val, &d.val));
        assert!(!s.can_be_associative());
    }

    #[test]
    fn variable_default_then_rebind() {
        let mut v = Variable::simple("x", "5", Target::UNKNOWN);
        assert_eq!(v.value(), "5");
        assert_eq!(v.bound().ctype(), ConstructType::Int);
        v.set_value("X".into()).unwrap();
        assert_eq!(v.value(), "X");
        let d = v.duplicate();
        assert_eq!(d.value(), "X");
        assert_eq!(d.default_text(), "5");
    }

    #[test]
    fn final_variable_rejects_rebind() {
        let mut v = Variable::new("x", "1", false, true, Target::UNKNOWN);
        let e = v.set_value(2i64.into()).unwrap_err();
        assert_eq!(e.kind, ExceptionKind::Misuse);
        assert_eq!(v.value(), "1");
    }

    #[test]
    fn array_shares_until_duplicated() {
        let a = CArray::new(vec![1i64.into()], Target::UNKNOWN);
        let alias = a.clone();
        let copy = a.duplicate();
        a.push(2i64.into());
        assert_eq!(alias.size(), 2);
        assert_eq!(copy.size(), 1);
    }

    #[test]
    fn array_negative_index() {
        let a = CArray::new(vec!["a".into(), "b".into()], Target::UNKNOWN);
        assert_eq!(a.get("-1", &Target::UNKNOWN).unwrap().value(), "b");
        assert_eq!(a.get("2", &Target::UNKNOWN).unwrap_err().kind, ExceptionKind::IndexOverflow);
    }

    #[test]
    fn non_indexable_get_is_cast() {
        let e = Construct::from(5i64).get("0", &Target::UNKNOWN).unwrap_err();
        assert_eq!(e.kind, ExceptionKind::Cast);
        assert_eq!(Construct::from(5i64).size(), None);
    }

    #[test]
    fn resolve_text() {
        let t = Target::UNKNOWN;
        assert_eq!(Construct::resolve("null", &t).ctype(), ConstructType::Null);
        assert_eq!(Construct::resolve("true", &t).ctype(), ConstructType::Boolean);
        assert_eq!(Construct::resolve("-12", &t).ctype(), ConstructType::Int);
        assert_eq!(Construct::resolve("1.5", &t).ctype(), ConstructType::Double);
        assert_eq!(Construct::resolve("inf", &t).ctype(), ConstructType::String);
        assert_eq!(Construct::resolve("", &t).ctype(), ConstructType::String);
    }

    #[test]
    fn truthiness() {
        assert!(Construct::from("hi").as_bool());
        assert!(!Construct::from("").as_bool());
        assert!(!Construct::from("false").as_bool());
        assert!(!Construct::from(0i64).as_bool());
        assert!(!Construct::null().as_bool());
        assert!(Construct::array(vec![1i64.into()], Target::UNKNOWN).as_bool());
    }

    #[test]
    fn numeric_coercion() {
        let t = Target::UNKNOWN;
        assert_eq!(Construct::from(" 12 ").as_int(&t).unwrap(), 12);
        assert_eq!(Construct::from(3.9).as_int(&t).unwrap(), 3);
        assert_eq!(Construct::from(true).as_int(&t).unwrap(), 1);
        assert_eq!(Construct::from("abc").as_int(&t).unwrap_err().kind, ExceptionKind::Cast);
        assert_eq!(Construct::null().as_double(&t).unwrap_err().kind, ExceptionKind::Cast);
    }

    #[test]
    fn with_target_relocates() {
        let c = Construct::from("x").with_target(at(9));
        assert_eq!(c.target(), &at(9));
    }

    #[test]
    fn self_containing_array_renders() {
        let a = Construct::array(vec![1i64.into()], Target::UNKNOWN);
        let Construct::Array(cells) = &a else { unreachable!() };
        cells.push(a.clone());
        assert_eq!(a.value(), "{1, *recursion*}");
        assert!(format!("{a:?}").contains("*recursion*"));
    }

    #[test]
    fn shared_subarray_renders_every_time() {
        let inner = Construct::array(vec!["x".into()], Target::UNKNOWN);
        let outer = Construct::array(vec![inner.clone(), inner], Target::UNKNOWN);
        assert_eq!(outer.value(), "{{x}, {x}}");
    }
}
