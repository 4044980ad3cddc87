//! Formula lexer built on logos.
//!
//! Besides producing tokens for the parser, the lexer backs the binder's
//! placeholder substitution: [`rewrite_identifiers`] swaps whole identifier
//! tokens, so a placeholder `a1` never matches inside `a10`.

use logos::Logos;

use crate::error::LexError;
use crate::Span;

/// Raw token from logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("**")]
    StarStar,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

/// Token kinds seen by the parser.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    /// Identifier; the text is recovered from the span.
    Ident,
    Plus,
    Minus,
    Star,
    Slash,
    /// `^` or `**`.
    Caret,
    LParen,
    RParen,
    Comma,
}

impl TokenKind {
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Number(_) => "number",
            TokenKind::Ident => "identifier",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Caret => "`^`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Comma => "`,`",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

fn convert(raw: RawToken) -> TokenKind {
    match raw {
        RawToken::Number(value) => TokenKind::Number(value),
        RawToken::Ident => TokenKind::Ident,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Caret | RawToken::StarStar => TokenKind::Caret,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::Comma => TokenKind::Comma,
    }
}

/// Tokenize a formula.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    if u32::try_from(source.len()).is_err() {
        return Err(LexError::TooLong { len: source.len() });
    }

    let mut tokens = Vec::new();
    let mut logos = RawToken::lexer(source);

    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        match result {
            Ok(raw) => tokens.push(Token {
                kind: convert(raw),
                span,
            }),
            Err(()) => {
                return Err(LexError::InvalidToken {
                    text: logos.slice().to_owned(),
                    span,
                });
            }
        }
    }

    Ok(tokens)
}

/// Rebuild `source` with identifiers replaced by `replace`.
///
/// `replace` returns `None` to keep an identifier unchanged. Text between
/// tokens is copied verbatim. The flag is true if anything was replaced.
pub fn rewrite_identifiers<F>(source: &str, mut replace: F) -> Result<(String, bool), LexError>
where
    F: FnMut(&str) -> Option<String>,
{
    let tokens = lex(source)?;
    let mut out = String::with_capacity(source.len() + 16);
    let mut cursor = 0usize;
    let mut changed = false;

    for token in tokens.iter().filter(|token| token.kind == TokenKind::Ident) {
        let range = token.span.to_range();
        out.push_str(&source[cursor..range.start]);
        let text = &source[range.clone()];
        match replace(text) {
            Some(replacement) => {
                out.push_str(&replacement);
                changed = true;
            }
            None => out.push_str(text),
        }
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);

    Ok((out, changed))
}

#[cfg(test)]
mod tests;
