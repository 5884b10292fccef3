//! Conditionals and boolean logic.

use super::{arg, boxed, exec_with_literals, node_arg, Builtin};
use crate::script::compiler::ParseNode;
use crate::script::construct::Construct;
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow};
use crate::script::exec::Executor;
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        boxed(If),
        boxed(Connective { and: true }),
        boxed(Connective { and: false }),
        Builtin::new("not", Arity::Fixed(&[1]), "boolean {var1} Returns the boolean opposite of var1.", not)
            .foldable()
            .boxed(),
    ]
}

fn not(t: &Target, _: Option<&mut Environment>, args: &[Construct]) -> Flow {
    Ok(Construct::Boolean(!arg(args, 0).as_bool(), t.clone()))
}

/// `if(cond, then, [else])`: only the chosen branch is evaluated.
struct If;

impl Function for If {
    fn name(&self) -> &'static str {
        "if"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(&[2, 3])
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[]
    }

    fn docs(&self) -> &'static str {
        "mixed {cond, trueRet, [falseRet]} Evaluates cond; if it is true, evaluates and returns trueRet, otherwise falseRet (or void)."
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
        let cond = ctx.eval(node_arg(args, 0, "if", t)?)?;
        if cond.as_bool() {
            ctx.eval(node_arg(args, 1, "if", t)?)
        } else if let Some(otherwise) = args.get(2) {
            ctx.eval(otherwise)
        } else {
            Ok(Construct::Void(t.clone()))
        }
    }
}

/// `and(...)` / `or(...)`: evaluate left to right and stop as soon as the
/// result is known.
struct Connective {
    and: bool,
}

impl Function for Connective {
    fn name(&self) -> &'static str {
        if self.and {
            "and"
        } else {
            "or"
        }
    }

    fn arity(&self) -> Arity {
        Arity::Unbounded
    }

    fn thrown(&self) -> &'static [ExceptionKind] {
        &[]
    }

    fn docs(&self) -> &'static str {
        if self.and {
            "boolean {var1, [var2...]} Returns true if every argument is true. Stops at the first false argument."
        } else {
            "boolean {var1, [var2...]} Returns true if any argument is true. Stops at the first true argument."
        }
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
        for node in args {
            // For `and` a false argument decides; for `or` a true one does.
            if ctx.eval(node)?.as_bool() != self.and {
                return Ok(Construct::Boolean(!self.and, t.clone()));
            }
        }
        Ok(Construct::Boolean(self.and, t.clone()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{compile, execute, lexer::lex};

    fn eval(text: &str) -> String {
        let tree = compile(&lex(text, None).unwrap()).unwrap();
        let mut env = Environment::new();
        execute(&tree, &mut env, None).unwrap().value()
    }

    #[test]
    fn if_picks_branch() {
        assert_eq!(eval("if(true, yes, no)"), "yes");
        assert_eq!(eval("if(0, yes, no)"), "no");
        assert_eq!(eval("if('', yes)"), "");
    }

    #[test]
    fn if_skips_untaken_branch() {
        // The untaken branch would raise a Range error if evaluated.
        assert_eq!(eval("assign(@z, 0)\nif(true, ok, divide(1, @z))"), "ok");
    }

    #[test]
    fn and_or_short_circuit() {
        assert_eq!(eval("assign(@z, 0)\nand(false, divide(1, @z))"), "false");
        assert_eq!(eval("assign(@z, 0)\nor(1, divide(1, @z))"), "true");
        assert_eq!(eval("and()"), "true");
        assert_eq!(eval("or()"), "false");
        assert_eq!(eval("and(1, yes, true)"), "true");
    }

    #[test]
    fn not_inverts() {
        assert_eq!(eval("not(false)"), "true");
        assert_eq!(eval("not(hi)"), "false");
    }
}
