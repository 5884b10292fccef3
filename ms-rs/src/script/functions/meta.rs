//! Functions that talk to the invoking actor and the host.

use tracing::debug;

use super::{arg, require_env, Builtin};
use crate::script::construct::Construct;
use crate::script::env::Environment;
use crate::script::error::{ExceptionKind, Flow, ScriptError};
use crate::script::registry::{Arity, Function};
use crate::script::target::Target;

pub fn functions() -> Vec<Box<dyn Function>> {
    vec![
        Builtin::new(
            "msg",
            Arity::Fixed(&[1]),
            "void {message} Sends message to the player that ran the script.",
            msg,
        )
        .throws(&[ExceptionKind::NullPointer])
        .boxed(),
        Builtin::new(
            "player",
            Arity::Fixed(&[0]),
            "string {} Returns the name of the player running the script, or null if there is none.",
            player,
        )
        .boxed(),
        Builtin::new(
            "runas",
            Arity::Fixed(&[2]),
            "void {player, command} Runs command as if player had typed it. The command must start with a slash and the player must be online. A command the server refuses is a FormatException.",
            runas,
        )
        .throws(&[ExceptionKind::Format, ExceptionKind::NullPointer])
        .restricted()
        .on_main_thread()
        .boxed(),
    ]
}

fn msg(t: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let env = require_env(env, "msg", t)?;
    if !env.send(&arg(args, 0).value()) {
        return Err(ScriptError::new(
            ExceptionKind::NullPointer,
            "msg() has nobody to send to",
            t.clone(),
        )
        .into());
    }
    Ok(Construct::Void(t.clone()))
}

fn player(t: &Target, env: Option<&mut Environment>, _: &[Construct]) -> Flow {
    let name = env.and_then(|e| e.sender().map(|s| s.name().to_owned()));
    Ok(match name {
        Some(name) => Construct::string(name, t.clone()),
        None => Construct::Null(t.clone()),
    })
}

fn runas(t: &Target, env: Option<&mut Environment>, args: &[Construct]) -> Flow {
    let env = require_env(env, "runas", t)?;
    let server = env.server().ok_or_else(|| {
        ScriptError::new(ExceptionKind::NullPointer, "runas() has no server to run on", t.clone())
    })?;
    let who = arg(args, 0).value();
    let command = arg(args, 1).value();
    let Some(stripped) = command.strip_prefix('/') else {
        return Err(ScriptError::format("runas() commands must start with a /", t.clone()).into());
    };
    if !server.is_online(&who) {
        return Err(ScriptError::format(format!("player {who} is not online"), t.clone()).into());
    }
    debug!(player = %who, command = stripped, "runas");
    if !server.dispatch_command(&who, stripped) {
        return Err(ScriptError::format(format!("the server refused to run /{stripped} as {who}"), t.clone()).into());
    }
    Ok(Construct::Void(t.clone()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
