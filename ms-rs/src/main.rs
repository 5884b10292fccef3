use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use mscript::cli::{self, CliArgs, ScriptSource};
use mscript::config::Preferences;
use mscript::script::{self, registry, validate, CommandSender, Environment, RunError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The actor for scripts run from the command line.
struct Console {
    name: String,
    privileged: bool,
}

impl CommandSender for Console {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_privilege(&self) -> bool {
        self.privileged
    }

    fn send_message(&self, message: &str) {
        println!("{message}");
    }
}

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("mscript: {e}");
            eprintln!("Usage: mscript [-p<prefs>] [-dDV] [-c<script> | -f<file>] [--] [<arg>...]");
            std::process::exit(1);
        }
    };

    let (prefs, warnings) = match Preferences::load(args.prefs.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("mscript: preferences: {e}");
            std::process::exit(1);
        }
    };

    // ── Logging ───────────────────────────────────────────────────────────────
    let default_level = if args.debug || prefs.debug_mode { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if prefs.show_warnings {
        for w in &warnings {
            eprintln!("mscript: preferences: {w}");
        }
    }

    if args.dump_docs {
        for info in registry::global().describe() {
            let restricted = if info.restricted { " (restricted)" } else { "" };
            println!("{}: {} args{restricted}, since {}", info.name, info.arity, info.since);
            println!("    {}", info.docs);
        }
        return;
    }

    if args.validate {
        let violations = validate::check_registry(registry::global());
        for v in &violations {
            eprintln!("mscript: {v}");
        }
        if !violations.is_empty() {
            std::process::exit(1);
        }
        println!("{} functions validated", registry::global().len());
        return;
    }

    if let Err(e) = run(&args, &prefs) {
        eprintln!("mscript: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs, prefs: &Preferences) -> Result<(), Box<dyn std::error::Error>> {
    let (text, source) = match &args.script {
        ScriptSource::Inline(text) => (text.clone(), None),
        ScriptSource::File(path) => (std::fs::read_to_string(path)?, Some(display_name(path))),
        ScriptSource::Stdin => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            (text, None)
        }
    };

    let tokens = script::lex(&text, source.as_deref()).map_err(RunError::from)?;
    let tree = script::compile_with(registry::global(), &tokens, prefs.optimize).map_err(RunError::from)?;

    let console = Arc::new(Console {
        name: prefs.sender_name.clone(),
        privileged: prefs.console_privileged,
    });
    let mut env = Environment::new().with_sender(console);
    env.set_positional(&args.positional);

    let mut print = |out: &str| {
        if !out.is_empty() {
            println!("{out}");
        }
    };
    script::execute(&tree, &mut env, Some(&mut print)).map_err(RunError::from)?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}
