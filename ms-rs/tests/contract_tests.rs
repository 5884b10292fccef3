/// The builtin contract: every registered function only raises the error
/// kinds and signals it declares, for every sample argument combination.
use mscript::script::registry::{self, Registry};
use mscript::script::validate::{argument_sets, check_function, check_registry};
use mscript::script::{Arity, ExceptionKind, Function, Halt, Target};

#[test]
fn every_builtin_honours_its_declarations() {
    let violations = check_registry(registry::global());
    if !violations.is_empty() {
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("{} contract violations:\n  {}", report.len(), report.join("\n  "));
    }
}

#[test]
fn builtin_table_matches_global() {
    let fresh = Registry::builtin().expect("builtin table");
    let global = registry::global();
    assert_eq!(fresh.len(), global.len());
    let a: Vec<_> = fresh.describe().collect();
    let b: Vec<_> = global.describe().collect();
    assert_eq!(a, b);
}

#[test]
fn every_builtin_is_documented() {
    for info in registry::global().describe() {
        assert!(info.docs.contains('{'), "{} docs lack a signature", info.name);
        assert!(!info.since.is_empty(), "{} has no version", info.name);
    }
}

#[test]
fn restricted_functions() {
    let restricted: Vec<_> = registry::global()
        .describe()
        .filter(|i| i.restricted)
        .map(|i| i.name)
        .collect();
    assert_eq!(restricted, vec!["runas"]);
}

#[test]
fn large_arities_use_uniform_assignments() {
    let f = registry::global().get("sconcat").unwrap();
    assert_eq!(f.arity(), Arity::Unbounded);
    let tens: Vec<_> = argument_sets(f.arity()).into_iter().filter(|a| a.len() == 10).collect();
    assert_eq!(tens.len(), 9);
    assert!(tens.iter().all(|args| args.iter().all(|a| a.value() == args[0].value())));
}

#[test]
fn folding_functions_need_no_environment() {
    for f in registry::global().functions().filter(|f| f.can_optimize()) {
        for args in argument_sets(f.arity()).into_iter().take(50) {
            if let Err(Halt::Error(e)) = f.exec(&Target::UNKNOWN, None, &args) {
                assert_ne!(e.kind, ExceptionKind::NullPointer, "{}", f.name());
            }
        }
    }
}

#[test]
fn single_function_check() {
    let f = registry::global().get("divide").unwrap();
    assert!(check_function(f).is_empty());
}
