#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use pretty_assertions::assert_eq;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .unwrap_or_default()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_lex_arithmetic() {
    assert_eq!(
        kinds("a1 * 2 + (b - .5)"),
        vec![
            TokenKind::Ident,
            TokenKind::Star,
            TokenKind::Number(2.0),
            TokenKind::Plus,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::Minus,
            TokenKind::Number(0.5),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn test_lex_exponent_numbers() {
    assert_eq!(kinds("1e3"), vec![TokenKind::Number(1000.0)]);
    assert_eq!(kinds("2.5E-1"), vec![TokenKind::Number(0.25)]);
    assert_eq!(kinds("3."), vec![TokenKind::Number(3.0)]);
}

#[test]
fn test_double_star_is_power() {
    assert_eq!(
        kinds("x**2"),
        vec![TokenKind::Ident, TokenKind::Caret, TokenKind::Number(2.0)]
    );
}

#[test]
fn test_invalid_character() {
    let err = lex("a1 $ 2").unwrap_err();
    assert_eq!(
        err,
        LexError::InvalidToken {
            text: "$".to_owned(),
            span: Span::new(3, 4),
        }
    );
}

#[test]
fn test_rewrite_matches_whole_tokens_only() {
    let (out, changed) = rewrite_identifiers("a1*a10 + a1", |id| {
        (id == "a1").then(|| "g1_duration".to_owned())
    })
    .unwrap_or_default();
    assert!(changed);
    assert_eq!(out, "g1_duration*a10 + g1_duration");
}

#[test]
fn test_rewrite_without_match_reports_unchanged() {
    let (out, changed) = rewrite_identifiers("2 * x", |_| None).unwrap_or_default();
    assert!(!changed);
    assert_eq!(out, "2 * x");
}
