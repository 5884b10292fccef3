//! Per-invocation execution state and the host boundary.
//!
//! An [`Environment`] is created for each script run and owned exclusively
//! by it.  It carries the invoking actor, the host server handle, the
//! ivariable scopes, alias variables (`$1`, `$name`…) and the procedures a
//! script has defined so far.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::compiler::ParseNode;
use super::construct::{Construct, Variable};

// ── Host traits ───────────────────────────────────────────────────────────────

/// The actor a script runs on behalf of (a player, the console…).
pub trait CommandSender: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the actor may call restricted functions.
    fn has_privilege(&self) -> bool;

    fn send_message(&self, message: &str);
}

/// The host application, as far as the builtins need to see it.
pub trait Server: Send + Sync {
    /// Run `command` as `player`; returns `false` if the host refused it.
    fn dispatch_command(&self, player: &str, command: &str) -> bool;

    fn is_online(&self, player: &str) -> bool;
}

// ── Procedure ─────────────────────────────────────────────────────────────────

/// A user procedure defined with `proc()`.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: String,
    /// Parameter ivariable names with their default values.
    pub params: Vec<(String, Construct)>,
    pub body: ParseNode,
}

// ── Environment ───────────────────────────────────────────────────────────────

pub struct Environment {
    sender: Option<Arc<dyn CommandSender>>,
    server: Option<Arc<dyn Server>>,
    /// Ivariable scopes; the last frame is the innermost.
    frames: Vec<HashMap<String, Construct>>,
    /// Values bound to `$name` variables by the host (alias arguments).
    alias_vars: HashMap<String, Construct>,
    procs: HashMap<String, Procedure>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("sender", &self.sender.as_ref().map(|s| s.name().to_owned()))
            .field("frames", &self.frames.len())
            .field("procs", &self.procs.len())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            sender: None,
            server: None,
            frames: vec![HashMap::new()],
            alias_vars: HashMap::new(),
            procs: HashMap::new(),
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn CommandSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_server(mut self, server: Arc<dyn Server>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn sender(&self) -> Option<&dyn CommandSender> {
        self.sender.as_deref()
    }

    pub fn server(&self) -> Option<&dyn Server> {
        self.server.as_deref()
    }

    /// Whether the invoking actor may call restricted functions.  With no
    /// actor at all the call is not privileged.
    pub fn is_privileged(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| s.has_privilege())
    }

    /// Send `message` to the invoking actor, if there is one.
    pub fn send(&self, message: &str) -> bool {
        match &self.sender {
            Some(s) => {
                s.send_message(message);
                true
            }
            None => false,
        }
    }

    // ── Ivariables ────────────────────────────────────────────────────────────

    /// Value of `@name` in the innermost scope.
    pub fn ivar(&self, name: &str) -> Option<&Construct> {
        self.frames.last().and_then(|f| f.get(name))
    }

    pub fn set_ivar(&mut self, name: impl Into<String>, value: Construct) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Enter a fresh ivariable scope (procedure call).
    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    // ── Alias variables ───────────────────────────────────────────────────────

    pub fn set_alias_var(&mut self, name: impl Into<String>, value: Construct) {
        self.alias_vars.insert(name.into(), value);
    }

    /// Value for `$name`: the host-supplied binding, else the variable's
    /// own bound default.
    pub fn alias_var(&self, var: &Variable) -> Construct {
        self.alias_vars
            .get(var.name())
            .cloned()
            .unwrap_or_else(|| var.bound().clone())
    }

    /// Bind `$1..$n` from positional arguments.
    pub fn set_positional(&mut self, args: &[String]) {
        for (i, arg) in args.iter().enumerate() {
            let value = Construct::resolve(arg, &super::target::Target::UNKNOWN);
            self.alias_vars.insert((i + 1).to_string(), value);
        }
    }

    // ── Procedures ────────────────────────────────────────────────────────────

    pub fn define_proc(&mut self, proc: Procedure) {
        self.procs.insert(proc.name.clone(), proc);
    }

    pub fn proc(&self, name: &str) -> Option<&Procedure> {
        self.procs.get(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::script::target::Target;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl CommandSender for Recorder {
        fn name(&self) -> &str {
            "rec"
        }
        fn has_privilege(&self) -> bool {
            false
        }
        fn send_message(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_owned());
        }
    }

    #[test]
    fn frames_isolate_ivars() {
        let mut env = Environment::new();
        env.set_ivar("x", 1i64.into());
        env.push_frame();
        assert!(env.ivar("x").is_none());
        env.set_ivar("x", 2i64.into());
        env.pop_frame();
        assert_eq!(env.ivar("x").map(Construct::value), Some("1".into()));
        env.pop_frame();
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn alias_vars_override_defaults() {
        let mut env = Environment::new();
        let var = Variable::simple("1", "fallback", Target::UNKNOWN);
        assert_eq!(env.alias_var(&var).value(), "fallback");
        env.set_positional(&["steve".into()]);
        assert_eq!(env.alias_var(&var).value(), "steve");
    }

    #[test]
    fn send_reaches_sender() {
        let rec = Arc::new(Recorder::default());
        let env = Environment::new().with_sender(rec.clone());
        assert!(env.send("hello"));
        assert!(!env.is_privileged());
        assert_eq!(rec.lines.lock().unwrap().as_slice(), ["hello"]);
        assert!(!Environment::new().send("lost"));
    }
}
