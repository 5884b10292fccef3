//! MethodScript lexer.
//!
//! Turns script text into a flat token list.  Whitespace separates tokens
//! and is otherwise dropped, except that a line break outside any bracket
//! produces a [`TokenKind::Newline`]: the compiler uses it to split the top
//! level of a script into independent statements.

use std::sync::Arc;

use tracing::trace;

use super::construct::Construct;
use super::error::CompileError;
use super::target::Target;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier immediately followed by `(`.
    FuncName(String),
    /// Any other run of non-special characters.
    BareWord(String),
    /// Quoted string with escapes already applied.
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Null,
    /// `@name`
    IVar(String),
    /// `$name`
    Var(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    /// Line break at bracket depth zero.
    Newline,
    /// Control character that cannot start any token.
    Unknown(char),
}

impl TokenKind {
    /// Short human description used in compile errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::FuncName(n) => format!("function name {n}"),
            TokenKind::BareWord(w) => format!("word '{w}'"),
            TokenKind::Str(_) => "string literal".to_owned(),
            TokenKind::Int(n) => format!("number {n}"),
            TokenKind::Double(x) => format!("number {x}"),
            TokenKind::Bool(b) => format!("keyword {b}"),
            TokenKind::Null => "keyword null".to_owned(),
            TokenKind::IVar(n) => format!("@{n}"),
            TokenKind::Var(n) => format!("${n}"),
            TokenKind::LParen => "'('".to_owned(),
            TokenKind::RParen => "')'".to_owned(),
            TokenKind::LBracket => "'['".to_owned(),
            TokenKind::RBracket => "']'".to_owned(),
            TokenKind::Comma => "','".to_owned(),
            TokenKind::Newline => "line break".to_owned(),
            TokenKind::Unknown(c) => format!("character {c:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub target: Target,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    source: Option<Arc<str>>,
    /// Open brackets awaiting their closer.
    open: Vec<(char, Target)>,
    tokens: Vec<Token>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that end a bare word.
fn is_word_break(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | '"' | '\'')
}

impl Lexer {
    fn new(text: &str, source: Option<Arc<str>>) -> Self {
        Lexer {
            src: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            source,
            open: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn here(&self) -> Target {
        Target::new(self.source.clone(), self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn push(&mut self, kind: TokenKind, target: Target) {
        trace!(?kind, %target, "token");
        self.tokens.push(Token { kind, target });
    }

    fn push_newline(&mut self, target: Target) {
        let redundant = match self.tokens.last() {
            None => true,
            Some(t) => t.kind == TokenKind::Newline,
        };
        if !redundant {
            self.push(TokenKind::Newline, target);
        }
    }

    fn run(mut self) -> Result<Vec<Token>, CompileError> {
        while let Some(ch) = self.peek() {
            let start = self.here();
            match ch {
                '\n' => {
                    self.advance();
                    if self.open.is_empty() {
                        self.push_newline(start);
                    }
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' => self.skip_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment(start)?,
                '"' | '\'' => {
                    self.advance();
                    let s = self.read_string(ch, &start)?;
                    self.push(TokenKind::Str(s), start);
                }
                '(' | '[' => {
                    self.advance();
                    self.open.push((ch, start.clone()));
                    let kind = if ch == '(' { TokenKind::LParen } else { TokenKind::LBracket };
                    self.push(kind, start);
                }
                ')' | ']' => {
                    self.advance();
                    let opener = if ch == ')' { '(' } else { '[' };
                    if self.open.last().map(|(c, _)| *c) == Some(opener) {
                        self.open.pop();
                    }
                    let kind = if ch == ')' { TokenKind::RParen } else { TokenKind::RBracket };
                    self.push(kind, start);
                }
                ',' => {
                    self.advance();
                    self.push(TokenKind::Comma, start);
                }
                '@' | '$' if self.peek_at(1).is_some_and(is_ident_char) => {
                    self.advance();
                    let name = self.read_while(is_ident_char);
                    let kind = if ch == '@' { TokenKind::IVar(name) } else { TokenKind::Var(name) };
                    self.push(kind, start);
                }
                c if c.is_control() => {
                    self.advance();
                    self.push(TokenKind::Unknown(c), start);
                }
                _ => self.read_word(start),
            }
        }
        if let Some((open, target)) = self.open.pop() {
            return Err(CompileError::Unclosed { open, target });
        }
        if self.tokens.last().map(|t| &t.kind) == Some(&TokenKind::Newline) {
            self.tokens.pop();
        }
        Ok(self.tokens)
    }

    fn read_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek().filter(|&c| keep(c)) {
            s.push(c);
            self.advance();
        }
        s
    }

    fn skip_line_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, start: Target) -> Result<(), CompileError> {
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                None => return Err(CompileError::UnterminatedComment { target: start }),
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn read_string(&mut self, quote: char, start: &Target) -> Result<String, CompileError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(CompileError::UnterminatedString { target: start.clone() }),
                Some('\\') => match self.advance() {
                    None => return Err(CompileError::UnterminatedString { target: start.clone() }),
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => s.push(c),
                    Some('u') => s.push_str(&self.read_unicode_escape()),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                },
                Some(c) if c == quote => return Ok(s),
                Some(c) => s.push(c),
            }
        }
    }

    /// `\uXXXX`; anything malformed is kept verbatim.
    fn read_unicode_escape(&mut self) -> String {
        let hex: String = (0..4).map_while(|i| self.peek_at(i)).collect();
        let decoded = (hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32))
            .flatten();
        match decoded {
            Some(c) => {
                for _ in 0..4 {
                    self.advance();
                }
                c.to_string()
            }
            None => "\\u".to_owned(),
        }
    }

    fn read_word(&mut self, start: Target) {
        let word = self.read_while(|c| !is_word_break(c));
        let is_ident = word.starts_with(is_ident_start) && word.chars().all(is_ident_char);
        if is_ident && self.peek() == Some('(') {
            self.push(TokenKind::FuncName(word), start);
            return;
        }
        let kind = match Construct::resolve(&word, &start) {
            Construct::Int(n, _) => TokenKind::Int(n),
            Construct::Double(x, _) => TokenKind::Double(x),
            Construct::Boolean(b, _) => TokenKind::Bool(b),
            Construct::Null(_) => TokenKind::Null,
            _ => TokenKind::BareWord(word),
        };
        self.push(kind, start);
    }
}

/// Tokenize `text`.  `source` names the file or stream for diagnostics.
pub fn lex(text: &str, source: Option<&str>) -> Result<Vec<Token>, CompileError> {
    Lexer::new(text, source.map(Arc::from)).run()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text, None).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn call_with_literals() {
        assert_eq!(
            kinds("add(1, -2.5)"),
            vec![
                TokenKind::FuncName("add".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Double(-2.5),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn keywords_and_variables() {
        assert_eq!(
            kinds("true null @x $name false"),
            vec![
                TokenKind::Bool(true),
                TokenKind::Null,
                TokenKind::IVar("x".into()),
                TokenKind::Var("name".into()),
                TokenKind::Bool(false),
            ]
        );
    }

    #[test]
    fn bare_words_keep_punctuation() {
        assert_eq!(
            kinds("hello world!"),
            vec![TokenKind::BareWord("hello".into()), TokenKind::BareWord("world!".into())]
        );
        // A name followed by a space is not a function call.
        assert_eq!(kinds("msg ()")[0], TokenKind::BareWord("msg".into()));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tbA\\""#),
            vec![TokenKind::Str("it's".into()), TokenKind::Str("a\tbA\\".into())]
        );
        assert_eq!(kinds(r"'\q'"), vec![TokenKind::Str("\\q".into())]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a # trailing\n/* block\n comment */ b"),
            vec![
                TokenKind::BareWord("a".into()),
                TokenKind::Newline,
                TokenKind::BareWord("b".into()),
            ]
        );
    }

    #[test]
    fn newlines_only_at_depth_zero() {
        assert_eq!(
            kinds("f(\n1\n)\n\n\ng()\n"),
            vec![
                TokenKind::FuncName("f".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::FuncName("g".into()),
                TokenKind::LParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn targets_are_one_based() {
        let toks = lex("a\n  b", Some("t.ms")).unwrap();
        assert_eq!(toks[0].target.to_string(), "t.ms:1:1");
        assert_eq!(toks[2].target.line, 2);
        assert_eq!(toks[2].target.column, 3);
    }

    #[test]
    fn unterminated_string() {
        let e = lex("msg('oops)", None).unwrap_err();
        assert!(matches!(e, CompileError::UnterminatedString { ref target } if target.column == 5));
    }

    #[test]
    fn unterminated_comment() {
        assert!(matches!(lex("/* never", None), Err(CompileError::UnterminatedComment { .. })));
    }

    #[test]
    fn unclosed_bracket_names_opener() {
        match lex("f(g(1)", None) {
            Err(CompileError::Unclosed { open, target }) => {
                assert_eq!(open, '(');
                assert_eq!(target.column, 2);
            }
            other => panic!("expected Unclosed, got {other:?}"),
        }
    }

    #[test]
    fn control_char_is_unknown() {
        assert_eq!(kinds("\u{7}"), vec![TokenKind::Unknown('\u{7}')]);
    }
}
