use proptest::prelude::*;
use mscript::script::functions::crypto::rot13_str;
use mscript::script::registry;
use mscript::script::compiler::MAX_NESTING;
use mscript::script::{compile, lex, CString, CompileError, ExceptionKind, NodeKind, Target};

proptest! {
    /// Lexing and compiling arbitrary text returns Ok or Err but never
    /// panics.
    #[test]
    fn lexer_and_compiler_do_not_panic(s in "\\PC*") {
        if let Ok(tokens) = lex(&s, None) {
            let _ = compile(&tokens);
        }
    }

    /// Same, biased towards script-shaped input.
    #[test]
    fn scriptish_input_does_not_panic(s in "[a-z_@$()\\[\\],'\" 0-9\n#-]{0,60}") {
        if let Ok(tokens) = lex(&s, None) {
            let _ = compile(&tokens);
        }
    }

    /// Nesting of any depth either compiles or is rejected as too deep.
    #[test]
    fn deep_nesting_is_rejected_not_fatal(
        wrappers in prop::collection::vec(prop::sample::select(vec!["not", "sconcat", "array", "length"]), 0..2_000)
    ) {
        let open: String = wrappers.iter().map(|w| format!("{w}(")).collect();
        let text = format!("{open}x{}", ")".repeat(wrappers.len()));
        let result = compile(&lex(&text, None).unwrap());
        if wrappers.len() < MAX_NESTING {
            prop_assert!(result.is_ok(), "{:?}", result.err());
        } else {
            prop_assert!(matches!(result, Err(CompileError::TooDeep { .. })), "{:?}", result);
        }
    }
}

proptest! {
    /// rot13 is its own inverse and leaves non-letters alone.
    #[test]
    fn rot13_involution(s in "[ -~]*") {
        let once = rot13_str(&s);
        prop_assert_eq!(rot13_str(&once), s.clone());
        for (a, b) in s.chars().zip(once.chars()) {
            if !a.is_ascii_alphabetic() {
                prop_assert_eq!(a, b);
            }
        }
    }
}

proptest! {
    /// Every in-range index returns that character.
    #[test]
    fn cstring_get_in_range(
        (s, i) in "\\PC{1,20}".prop_flat_map(|s| {
            let n = s.chars().count();
            (Just(s), 0..n)
        })
    ) {
        let c = CString::new(s.as_str(), Target::UNKNOWN);
        let got = c.get(&i.to_string(), &Target::UNKNOWN).unwrap();
        prop_assert_eq!(got.value(), s.chars().nth(i).unwrap().to_string());
    }

    /// A non-numeric index is a Format error.
    #[test]
    fn cstring_get_non_numeric(s in "\\PC{0,20}", index in "[a-z]{1,5}") {
        let c = CString::new(s.as_str(), Target::UNKNOWN);
        let err = c.get(&index, &Target::UNKNOWN).unwrap_err();
        prop_assert_eq!(err.kind, ExceptionKind::Format);
    }
}

proptest! {
    /// Folding a pure call gives the same value as calling it at runtime.
    #[test]
    fn folding_matches_exec(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        for name in ["add", "subtract", "multiply", "sconcat"] {
            let tokens = lex(&format!("{name}({a}, {b})"), None).unwrap();
            let tree = compile(&tokens).unwrap();
            let folded = match &tree.roots[0].kind {
                NodeKind::Literal(c) => c.value(),
                other => panic!("{name} was not folded: {other:?}"),
            };
            let f = registry::global().get(name).unwrap();
            let direct = f.exec(&Target::UNKNOWN, None, &[a.into(), b.into()]).unwrap();
            prop_assert_eq!(folded, direct.value());
        }
    }
}
