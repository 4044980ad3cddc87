//! Recursive descent parser for formulas.
//!
//! Precedence, loosest first:
//!
//! | level          | operators        | assoc |
//! |----------------|------------------|-------|
//! | additive       | `+` `-`          | left  |
//! | multiplicative | `*` `/`          | left  |
//! | unary          | prefix `-` `+`   |       |
//! | power          | `^` `**`         | right |
//!
//! Unary minus binds looser than power, so `-x^2` is `-(x^2)`, and the
//! exponent may itself carry a sign (`2^-1`).

use tracing::trace;

use crate::builtins::{Builtin, Constant};
use crate::error::{ParseError, ParseErrorKind};
use crate::ir::{ExprArena, ExprId, Formula};
use crate::lexer::{lex, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use crate::Span;

/// Parse formula text into a folded [`Formula`].
pub fn parse(source: &str) -> Result<Formula, ParseError> {
    let tokens = lex(source)?;
    if tokens.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, Span::default()));
    }

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        arena: ExprArena::new(),
    };
    let root = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected(token, "operator or end of formula"));
    }

    trace!(source, nodes = parser.arena.len(), "parsed formula");
    Ok(Formula::new(parser.arena, root))
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    arena: ExprArena,
}

impl<'src> Parser<'src> {
    #[inline]
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    #[inline]
    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    #[inline]
    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn text(&self, token: Token) -> &'src str {
        &self.source[token.span.to_range()]
    }

    fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map_or(Span::default(), |token| Span::point(token.span.end))
    }

    fn unexpected(&self, token: Token, expected: &'static str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected,
                found: self.text(token).to_owned(),
            },
            token.span,
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        match self.bump() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(token, expected)),
            None => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof { expected },
                self.end_span(),
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| self.parse_additive())
    }

    fn parse_additive(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Plus) => {
                    self.bump();
                    let right = self.parse_multiplicative()?;
                    left = self.arena.add(left, right);
                }
                Some(TokenKind::Minus) => {
                    self.bump();
                    let right = self.parse_multiplicative()?;
                    left = self.arena.sub(left, right);
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Star) => {
                    self.bump();
                    let right = self.parse_unary()?;
                    left = self.arena.mul(left, right);
                }
                Some(TokenKind::Slash) => {
                    self.bump();
                    let right = self.parse_unary()?;
                    left = self.arena.div(left, right);
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(self.arena.neg(operand))
            }
            Some(TokenKind::Plus) => {
                self.bump();
                self.parse_unary()
            }
            _ => self.parse_power(),
        })
    }

    fn parse_power(&mut self) -> Result<ExprId, ParseError> {
        let base = self.parse_primary()?;
        if self.peek_kind() == Some(TokenKind::Caret) {
            self.bump();
            let exponent = self.parse_unary()?;
            return Ok(self.arena.pow(base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let Some(token) = self.bump() else {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedEof {
                    expected: "expression",
                },
                self.end_span(),
            ));
        };

        match token.kind {
            TokenKind::Number(value) => Ok(self.arena.num(value)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident => {
                let name = self.text(token);
                if self.peek_kind() == Some(TokenKind::LParen) {
                    self.bump();
                    return self.parse_call(name, token.span);
                }
                if let Some(constant) = Constant::from_name(name) {
                    return Ok(self.arena.constant(constant));
                }
                Ok(self.arena.named(name))
            }
            _ => Err(self.unexpected(token, "expression")),
        }
    }

    /// Arguments after the opening parenthesis of `name(`.
    fn parse_call(&mut self, name: &str, name_span: Span) -> Result<ExprId, ParseError> {
        let mut args: Vec<ExprId> = Vec::new();
        if self.peek_kind() == Some(TokenKind::RParen) {
            self.bump();
        } else {
            loop {
                args.push(self.parse_expr()?);
                match self.bump() {
                    Some(Token {
                        kind: TokenKind::Comma,
                        ..
                    }) => {}
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => break,
                    Some(other) => return Err(self.unexpected(other, "`,` or `)`")),
                    None => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedEof { expected: "`)`" },
                            self.end_span(),
                        ))
                    }
                }
            }
        }

        if name == "pow" {
            return match args.as_slice() {
                &[base, exponent] => Ok(self.arena.pow(base, exponent)),
                _ => Err(ParseError::new(
                    ParseErrorKind::WrongArity {
                        name: "pow",
                        expected: 2,
                        found: args.len(),
                    },
                    name_span,
                )),
            };
        }

        let Some(func) = Builtin::from_name(name) else {
            return Err(ParseError::new(
                ParseErrorKind::UnknownFunction {
                    name: name.to_owned(),
                },
                name_span,
            ));
        };
        if args.len() != func.arity() {
            return Err(ParseError::new(
                ParseErrorKind::WrongArity {
                    name: func.name(),
                    expected: func.arity(),
                    found: args.len(),
                },
                name_span,
            ));
        }
        Ok(self.arena.call(func, &args))
    }
}
