//! Recursive-descent compiler: tokens → parse tree.
//!
//! Grammar (informal):
//!
//! ```text
//! script    := statement (NEWLINE statement)*
//! statement := expr+                      juxtaposed → sconcat(...)
//! expr      := primary ('[' slot ']')*    x[i]       → array_get(x, i)
//! primary   := NAME '(' [slot (',' slot)*] ')'
//!            | STRING | INT | DOUBLE | BOOL | NULL | WORD | @ivar | $var
//! slot      := expr+                      juxtaposed → sconcat(...)
//! ```
//!
//! The compiler checks that every called function exists and accepts the
//! number of arguments given.  Procedure calls (`_name(...)`) are resolved
//! at runtime.  Calls and index expressions may nest at most
//! [`MAX_NESTING`] levels deep.

use tracing::trace;

use super::construct::{Construct, Variable};
use super::error::CompileError;
use super::lexer::{Token, TokenKind};
use super::registry::Registry;
use super::target::Target;

/// Deepest nesting of calls and index expressions a script may use.
pub const MAX_NESTING: usize = 128;

// ── Parse tree ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum NodeKind {
    Literal(Construct),
    /// `@name`
    IVariable(String),
    /// `$name`
    Variable(Variable),
    Call { name: String, args: Vec<ParseNode> },
}

#[derive(Debug, Clone)]
pub struct ParseNode {
    pub kind: NodeKind,
    pub target: Target,
}

impl ParseNode {
    pub fn literal(value: Construct) -> Self {
        let target = value.target().clone();
        ParseNode { kind: NodeKind::Literal(value), target }
    }

    pub fn call(name: impl Into<String>, args: Vec<ParseNode>, target: Target) -> Self {
        ParseNode { kind: NodeKind::Call { name: name.into(), args }, target }
    }

    /// A literal whose value cannot change at runtime.
    pub fn is_static_literal(&self) -> bool {
        matches!(&self.kind, NodeKind::Literal(c) if !c.is_dynamic())
    }

    /// Name of the function this node calls, if it is a call.
    pub fn call_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Call { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Total number of nodes in this sub-tree.
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::Call { args, .. } => 1 + args.iter().map(ParseNode::size).sum::<usize>(),
            _ => 1,
        }
    }
}

/// Procedure calls are written `_name(...)`.
pub fn is_proc_name(name: &str) -> bool {
    name.starts_with('_')
}

/// A compiled script: independent statements run in order.
#[derive(Debug, Clone, Default)]
pub struct ParseTree {
    pub roots: Vec<ParseNode>,
}

impl ParseTree {
    pub fn size(&self) -> usize {
        self.roots.iter().map(ParseNode::size).sum()
    }
}

// ── Compiler ──────────────────────────────────────────────────────────────────

/// Parses tokens against a specific function registry.
pub struct Compiler<'r> {
    registry: &'r Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Compiler { registry }
    }

    pub fn parse(&self, tokens: &[Token]) -> Result<ParseTree, CompileError> {
        let mut parser = Parser { tokens, pos: 0, depth: 0, registry: self.registry };
        let roots = parser.script()?;
        trace!(statements = roots.len(), "parsed");
        Ok(ParseTree { roots })
    }
}

struct Parser<'t, 'r> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    registry: &'r Registry,
}

impl<'t> Parser<'t, '_> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(tok: &Token) -> CompileError {
        CompileError::Unexpected { found: tok.kind.describe(), target: tok.target.clone() }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<(), CompileError> {
        match self.advance() {
            Some(t) if t.kind == kind => Ok(()),
            Some(t) => Err(Self::unexpected(t)),
            None => Err(CompileError::UnexpectedEof { context: context.to_owned() }),
        }
    }

    fn script(&mut self) -> Result<Vec<ParseNode>, CompileError> {
        let mut roots = Vec::new();
        while let Some(kind) = self.peek_kind() {
            if *kind == TokenKind::Newline {
                self.pos += 1;
                continue;
            }
            roots.push(self.sequence(|k| *k == TokenKind::Newline)?);
        }
        Ok(roots)
    }

    /// Enter one more level of nesting.
    fn descend(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_NESTING {
            let target = self.peek().map_or(Target::UNKNOWN, |t| t.target.clone());
            return Err(CompileError::TooDeep { limit: MAX_NESTING, target });
        }
        self.depth += 1;
        Ok(())
    }

    /// One or more juxtaposed expressions up to (not including) a token
    /// matching `stop`, or end of input.
    fn sequence(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Result<ParseNode, CompileError> {
        self.descend()?;
        let node = self.juxtaposed(stop)?;
        self.depth -= 1;
        Ok(node)
    }

    fn juxtaposed(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Result<ParseNode, CompileError> {
        let mut parts = Vec::new();
        while let Some(kind) = self.peek_kind() {
            if stop(kind) {
                break;
            }
            parts.push(self.expr()?);
        }
        match parts.len() {
            0 => match self.peek() {
                Some(t) => Err(Self::unexpected(t)),
                None => Err(CompileError::UnexpectedEof { context: "expected an expression".into() }),
            },
            1 => Ok(parts.remove(0)),
            _ => {
                let target = parts[0].target.clone();
                self.checked_call("sconcat", parts, target)
            }
        }
    }

    fn expr(&mut self) -> Result<ParseNode, CompileError> {
        let mut node = self.primary()?;
        let mut wraps = 0;
        while self.peek_kind() == Some(&TokenKind::LBracket) {
            self.descend()?;
            wraps += 1;
            self.pos += 1;
            let index = self.sequence(|k| *k == TokenKind::RBracket)?;
            self.expect(TokenKind::RBracket, "expected ']'")?;
            let target = node.target.clone();
            node = self.checked_call("array_get", vec![node, index], target)?;
        }
        self.depth -= wraps;
        Ok(node)
    }

    fn primary(&mut self) -> Result<ParseNode, CompileError> {
        let Some(tok) = self.advance() else {
            return Err(CompileError::UnexpectedEof { context: "expected an expression".into() });
        };
        let t = tok.target.clone();
        let literal = |c: Construct| Ok(ParseNode::literal(c));
        match &tok.kind {
            TokenKind::FuncName(name) => self.call(name.clone(), t),
            TokenKind::Str(s) | TokenKind::BareWord(s) => literal(Construct::string(s.as_str(), t)),
            TokenKind::Int(n) => literal(Construct::Int(*n, t)),
            TokenKind::Double(x) => literal(Construct::Double(*x, t)),
            TokenKind::Bool(b) => literal(Construct::Boolean(*b, t)),
            TokenKind::Null => literal(Construct::Null(t)),
            TokenKind::IVar(name) => {
                Ok(ParseNode { kind: NodeKind::IVariable(name.clone()), target: t })
            }
            TokenKind::Var(name) => {
                let var = Variable::simple(name.as_str(), "", t.clone());
                Ok(ParseNode { kind: NodeKind::Variable(var), target: t })
            }
            _ => Err(Self::unexpected(tok)),
        }
    }

    fn call(&mut self, name: String, target: Target) -> Result<ParseNode, CompileError> {
        self.expect(TokenKind::LParen, "expected '('")?;
        let mut args = Vec::new();
        if self.peek_kind() == Some(&TokenKind::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.sequence(|k| matches!(k, TokenKind::Comma | TokenKind::RParen))?);
                match self.advance() {
                    Some(t) if t.kind == TokenKind::Comma => continue,
                    Some(t) if t.kind == TokenKind::RParen => break,
                    Some(t) => return Err(Self::unexpected(t)),
                    None => {
                        return Err(CompileError::UnexpectedEof {
                            context: format!("unclosed call to {name}()"),
                        })
                    }
                }
            }
        }
        self.checked_call(name, args, target)
    }

    fn checked_call(
        &self,
        name: impl Into<String>,
        args: Vec<ParseNode>,
        target: Target,
    ) -> Result<ParseNode, CompileError> {
        let name = name.into();
        if !is_proc_name(&name) {
            let Some(f) = self.registry.get(&name) else {
                return Err(CompileError::UnknownFunction { name, target });
            };
            let arity = f.arity();
            if !arity.accepts(args.len()) {
                return Err(CompileError::Arity { name, got: args.len(), expected: arity, target });
            }
        }
        Ok(ParseNode::call(name, args, target))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
