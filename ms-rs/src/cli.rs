//! Command-line argument parsing.
//!
//! Usage:
//!   mscript [-p<prefs>] [-dDV] [-c<script> | -f<file>] [--] [<arg>...]
//!
//! Positional arguments are bound to `$1`..`$n` inside the script.

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Where the script comes from.
    pub script: ScriptSource,
    /// Preferences file override (`-p<file>`).
    pub prefs: Option<PathBuf>,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Print every function's documentation and exit (`-D`).
    pub dump_docs: bool,
    /// Run the builtin validation contract and exit (`-V`).
    pub validate: bool,
    /// Values for `$1`..`$n`.
    pub positional: Vec<String>,
}

/// Where to read the script from.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ScriptSource {
    /// Standard input (default).
    #[default]
    Stdin,
    /// `-c<script>`: the script text itself.
    Inline(String),
    /// `-f<file>`: a script file.
    File(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            args.positional.extend(argv[i + 1..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            args.positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'D' => args.dump_docs = true,
                'V' => args.validate = true,

                // Flags taking a value, attached (-cfoo) or separate (-c foo).
                flag @ ('c' | 'f' | 'p') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        'c' => args.script = set_source(&args.script, ScriptSource::Inline(value))?,
                        'f' => args.script = set_source(&args.script, ScriptSource::File(PathBuf::from(value)))?,
                        _ => args.prefs = Some(PathBuf::from(value)),
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

fn set_source(current: &ScriptSource, next: ScriptSource) -> Result<ScriptSource, String> {
    match current {
        ScriptSource::Stdin => Ok(next),
        _ => Err("only one of -c and -f may be given".to_owned()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert_eq!(a.script, ScriptSource::Stdin);
        assert!(a.positional.is_empty());
        assert!(!a.debug);
    }

    #[test]
    fn bool_flags() {
        let a = parse_argv(&argv(&["-d", "-DV"])).unwrap();
        assert!(a.debug);
        assert!(a.dump_docs);
        assert!(a.validate);
    }

    #[test]
    fn inline_script_attached_and_separate() {
        let a = parse_argv(&argv(&["-cmsg(hi)"])).unwrap();
        assert_eq!(a.script, ScriptSource::Inline("msg(hi)".into()));
        let b = parse_argv(&argv(&["-c", "msg(hi)"])).unwrap();
        assert_eq!(b.script, ScriptSource::Inline("msg(hi)".into()));
    }

    #[test]
    fn file_and_prefs() {
        let a = parse_argv(&argv(&["-ptest.ini", "-f", "run.ms"])).unwrap();
        assert_eq!(a.prefs, Some(PathBuf::from("test.ini")));
        assert_eq!(a.script, ScriptSource::File(PathBuf::from("run.ms")));
    }

    #[test]
    fn positional_and_double_dash() {
        let a = parse_argv(&argv(&["-c", "x", "one", "--", "-d", "two"])).unwrap();
        assert_eq!(a.positional, vec!["one", "-d", "two"]);
        assert!(!a.debug);
    }

    #[test]
    fn errors() {
        assert!(parse_argv(&argv(&["-c"])).is_err());
        assert!(parse_argv(&argv(&["-x"])).is_err());
        assert!(parse_argv(&argv(&["-c", "a", "-f", "b"])).is_err());
    }
}
