//! Constant folding.
//!
//! A call whose function reports `can_optimize()` and whose arguments are
//! all static literals is replaced by the value the function computes for
//! them.  The pass works bottom-up, so `add(1, multiply(2, 3))` collapses in
//! one sweep; it is repeated until a sweep changes nothing.

use tracing::debug;

use super::compiler::{is_proc_name, NodeKind, ParseNode, ParseTree};
use super::construct::Construct;
use super::error::CompileError;
use super::registry::Registry;

pub struct Optimizer<'r> {
    registry: &'r Registry,
}

impl<'r> Optimizer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Optimizer { registry }
    }

    pub fn optimize(&self, mut tree: ParseTree) -> Result<ParseTree, CompileError> {
        let mut sweeps = 0;
        loop {
            sweeps += 1;
            let mut changed = false;
            for root in &mut tree.roots {
                changed |= self.fold(root)?;
            }
            if !changed {
                break;
            }
        }
        debug!(sweeps, nodes = tree.size(), "optimized");
        Ok(tree)
    }

    /// Fold `node` in place; returns whether anything changed.
    fn fold(&self, node: &mut ParseNode) -> Result<bool, CompileError> {
        let NodeKind::Call { name, args } = &mut node.kind else {
            return Ok(false);
        };
        let mut changed = false;
        for arg in args.iter_mut() {
            changed |= self.fold(arg)?;
        }
        if is_proc_name(name) || !args.iter().all(ParseNode::is_static_literal) {
            return Ok(changed);
        }
        let Some(f) = self.registry.get(name) else {
            return Ok(changed);
        };
        if !f.can_optimize() {
            return Ok(changed);
        }
        let values: Vec<Construct> = args
            .iter()
            .filter_map(|a| match &a.kind {
                NodeKind::Literal(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        let folded = f.optimize(&node.target, &values)?;
        debug!(function = %name, value = %folded, target = %node.target, "folded");
        *node = ParseNode::literal(folded.with_target(node.target.clone()));
        Ok(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::script::compiler::Compiler;
    use crate::script::env::Environment;
    use crate::script::error::{ExceptionKind, Flow};
    use crate::script::lexer::lex;
    use crate::script::registry::{global, Arity, Function};
    use crate::script::target::Target;

    fn optimized(text: &str) -> Result<ParseTree, CompileError> {
        let tree = Compiler::new(global()).parse(&lex(text, None)?)?;
        Optimizer::new(global()).optimize(tree)
    }

    fn literal_value(node: &ParseNode) -> Option<String> {
        match &node.kind {
            NodeKind::Literal(c) => Some(c.value()),
            _ => None,
        }
    }

    #[test]
    fn folds_nested_pure_calls() {
        let tree = optimized("add(1, multiply(2, 3))").unwrap();
        assert_eq!(literal_value(&tree.roots[0]), Some("7".into()));
    }

    #[test]
    fn folded_value_keeps_call_site() {
        let tree = optimized("\n  rot13(abc)").unwrap();
        assert_eq!(literal_value(&tree.roots[0]), Some("nop".into()));
        assert_eq!(tree.roots[0].target.line, 2);
        assert_eq!(tree.roots[0].target.column, 3);
    }

    #[test]
    fn ivariables_block_folding() {
        let tree = optimized("add(@x, multiply(2, 3))").unwrap();
        let NodeKind::Call { name, args } = &tree.roots[0].kind else {
            panic!("add() should not fold");
        };
        assert_eq!(name, "add");
        assert_eq!(literal_value(&args[1]), Some("6".into()));
    }

    #[test]
    fn environment_functions_are_not_folded() {
        let tree = optimized("msg(hi)").unwrap();
        assert_eq!(tree.roots[0].call_name(), Some("msg"));
    }

    #[test]
    fn fold_errors_abort_compilation() {
        match optimized("divide(1, 0)") {
            Err(CompileError::Fold { name, source }) => {
                assert_eq!(name, "divide");
                assert_eq!(source.kind, ExceptionKind::Range);
            }
            other => panic!("expected a fold error, got {other:?}"),
        }
    }

    // A function that refuses folding must never see `optimize()`.
    static OPTIMIZE_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Spy;

    impl Function for Spy {
        fn name(&self) -> &'static str {
            "spy"
        }
        fn arity(&self) -> Arity {
            Arity::Unbounded
        }
        fn thrown(&self) -> &'static [ExceptionKind] {
            &[]
        }
        fn docs(&self) -> &'static str {
            "void {...} records calls"
        }
        fn since(&self) -> &'static str {
            "0.0.0"
        }
        fn exec(&self, _: &Target, _: Option<&mut Environment>, _: &[Construct]) -> Flow {
            Ok(Construct::void())
        }
        fn optimize(&self, _: &Target, _: &[Construct]) -> Result<Construct, CompileError> {
            OPTIMIZE_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(Construct::void())
        }
    }

    #[test]
    fn optimize_never_called_without_opt_in() {
        let reg = Registry::builder().register(Box::new(Spy)).unwrap().build();
        let tree = Compiler::new(&reg).parse(&lex("spy(1, 2)\nspy()", None).unwrap()).unwrap();
        let tree = Optimizer::new(&reg).optimize(tree).unwrap();
        assert_eq!(OPTIMIZE_CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(tree.roots[0].call_name(), Some("spy"));
    }
}
