/// End-to-end tests: script text in, output and messages out, through the
/// public API only.
use std::sync::{Arc, Mutex};

use mscript::script::{
    run, CommandSender, CompileError, Environment, ExceptionKind, RunError, Server,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Player {
    name: &'static str,
    op: bool,
    heard: Mutex<Vec<String>>,
}

impl Player {
    fn new(name: &'static str, op: bool) -> Arc<Self> {
        Arc::new(Player { name, op, heard: Mutex::default() })
    }

    fn heard(&self) -> Vec<String> {
        self.heard.lock().unwrap().clone()
    }
}

impl CommandSender for Player {
    fn name(&self) -> &str {
        self.name
    }
    fn has_privilege(&self) -> bool {
        self.op
    }
    fn send_message(&self, message: &str) {
        self.heard.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
struct Host {
    online: Vec<&'static str>,
    dispatched: Mutex<Vec<String>>,
}

impl Server for Host {
    fn dispatch_command(&self, player: &str, command: &str) -> bool {
        self.dispatched.lock().unwrap().push(format!("{player}: {command}"));
        true
    }
    fn is_online(&self, player: &str) -> bool {
        self.online.contains(&player)
    }
}

/// Run `text` and return its joined output.
fn output(text: &str, env: &mut Environment) -> Result<String, RunError> {
    let mut out = String::new();
    run(text, env, Some(&mut |s: &str| out = s.to_owned()))?;
    Ok(out)
}

fn script_kind(result: Result<String, RunError>) -> ExceptionKind {
    match result {
        Err(RunError::Script(e)) => e.kind,
        other => panic!("expected a script error, got {other:?}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn alias_with_positional_argument() {
    let steve = Player::new("steve", false);
    let mut env = Environment::new().with_sender(steve.clone());
    env.set_positional(&["world".to_owned()]);
    output("msg(hello $1)", &mut env).unwrap();
    assert_eq!(steve.heard(), vec!["hello world"]);
}

#[test]
fn player_names_the_sender() {
    let mut env = Environment::new().with_sender(Player::new("alex", false));
    assert_eq!(output("sconcat(hi, player())", &mut env).unwrap(), "hi alex");
}

#[test]
fn arithmetic_and_folding_agree() {
    let mut env = Environment::new();
    let folded = output("add(2, multiply(3, 4))", &mut env).unwrap();
    let runtime = output("assign(@three, 3)\nadd(2, multiply(@three, 4))", &mut env).unwrap();
    assert_eq!(folded, "14");
    assert_eq!(runtime, "3 14");
    assert_eq!(output("divide(7, 2)\ndivide(8, 2)", &mut env).unwrap(), "3.5 4");
}

#[test]
fn string_and_crypto_builtins() {
    let mut env = Environment::new();
    assert_eq!(output("to_upper(rot13(uryyb))", &mut env).unwrap(), "HELLO");
    assert_eq!(output("md5('')", &mut env).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    assert_eq!(
        output("reg_match('(\\\\d+)-(\\\\d+)', 'call 555-1234')", &mut env).unwrap(),
        "{555-1234, 555, 1234}"
    );
    assert_eq!(output("char_at(hello, 4)", &mut env).unwrap(), "o");
}

#[test]
fn arrays_and_indexing() {
    let mut env = Environment::new();
    let script = "assign(@a, array(x, y))\narray_push(@a, z)\n@a[2]\narray_size(@a)";
    assert_eq!(output(script, &mut env).unwrap(), "{x, y} z 3");
}

#[test]
fn array_pushed_into_itself() {
    let mut env = Environment::new();
    let script = "assign(@a, array())\narray_push(@a, @a)\n@a\narray_size(@a)";
    assert_eq!(output(script, &mut env).unwrap(), "{} {*recursion*} 1");
}

#[test]
fn loops_and_procedures() {
    let mut env = Environment::new();
    let script = "proc(_sum, @list,\n\
                    assign(@total, 0)\n\
                    foreach(@list, @n, assign(@total, add(@total, @n)))\n\
                    return(@total))\n\
                  _sum(array(1, 2, 3, 4))";
    // A statement break inside a call is just whitespace.
    let result = output(script, &mut env);
    assert_eq!(result.unwrap(), "10");
}

#[test]
fn runas_with_privilege() {
    let op = Player::new("wraithaven", true);
    let host = Arc::new(Host { online: vec!["wraithaven"], ..Host::default() });
    let mut env = Environment::new().with_sender(op).with_server(host.clone());
    output("runas(player(), '/cmd yay')", &mut env).unwrap();
    assert_eq!(host.dispatched.lock().unwrap().as_slice(), ["wraithaven: cmd yay"]);
}

#[test]
fn runas_without_privilege_is_security() {
    let guest = Player::new("guest", false);
    let host = Arc::new(Host { online: vec!["guest"], ..Host::default() });
    let mut env = Environment::new().with_sender(guest.clone()).with_server(host.clone());
    assert_eq!(script_kind(output("runas(guest, '/op guest')", &mut env)), ExceptionKind::Security);
    assert!(host.dispatched.lock().unwrap().is_empty());
    assert_eq!(guest.heard().len(), 1);
}

#[test]
fn runtime_errors_stop_the_script() {
    let p = Player::new("p", false);
    let mut env = Environment::new().with_sender(p.clone());
    let result = output("msg(before)\nassign(@i, hi)\nadd(@i, 1)\nmsg(after)", &mut env);
    assert_eq!(script_kind(result), ExceptionKind::Cast);
    let heard = p.heard();
    assert_eq!(heard[0], "before");
    assert_eq!(heard.len(), 2);
    assert!(heard[1].starts_with("CastException"));
}

#[test]
fn compile_errors_run_nothing() {
    let p = Player::new("p", false);
    let mut env = Environment::new().with_sender(p.clone());
    let result = output("msg(one)\nmsg(two", &mut env);
    assert!(matches!(result, Err(RunError::Compile(CompileError::Unclosed { open: '(', .. }))));
    assert!(p.heard().is_empty());
}

#[test]
fn die_sends_its_message() {
    let p = Player::new("p", false);
    let mut env = Environment::new().with_sender(p.clone());
    assert_eq!(output("first\ndie(gone)\nsecond", &mut env).unwrap(), "first");
    assert_eq!(p.heard(), vec!["gone"]);
}

#[test]
fn eval_sees_the_caller_scope() {
    let mut env = Environment::new();
    let script = "assign(@name, bob)\neval('sconcat(hi, @name)')";
    assert_eq!(output(script, &mut env).unwrap(), "bob hi bob");
}
