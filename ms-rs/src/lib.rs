//! MethodScript core runtime: constructs, function registry, compiler and
//! evaluator, plus the preferences and command-line layers used by the
//! `mscript` binary.

pub mod cli;
pub mod config;
pub mod script;

pub use script::{
    compile, compile_with, execute, lex, run, Construct, Environment, ParseTree, Registry, RunError,
    ScriptError,
};
