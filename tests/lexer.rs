//! Lexer tests: token classification, byte spans and lexical errors.

use seanode::error::ParseError;
use seanode::parser::lexer::{Lexer, Span, Token};

fn kinds(src: &str) -> Vec<Token> {
    Lexer::new(src)
        .tokenize()
        .unwrap_or_else(|e| panic!("lex failed for {:?}: {}", src, e))
        .into_iter()
        .map(|t| t.node)
        .collect()
}

fn ident(name: &str) -> Token {
    Token::Ident(name.to_owned())
}

// ---------------------------------------------------------------------------
// 1. Classification
// ---------------------------------------------------------------------------

#[test]
fn test_function_header_tokens() {
    assert_eq!(
        kinds("main:= (arg:int)->int {}"),
        vec![
            ident("main"),
            Token::ColonEq,
            Token::LParen,
            ident("arg"),
            Token::Colon,
            Token::Int,
            Token::RParen,
            Token::Arrow,
            Token::Int,
            Token::LBrace,
            Token::RBrace,
            Token::Eof,
        ]
    );
}

#[test]
fn test_two_char_operators_win_over_prefixes() {
    assert_eq!(
        kinds("<= < >= > == = != ! -> -"),
        vec![
            Token::LtEq,
            Token::Lt,
            Token::GtEq,
            Token::Gt,
            Token::EqEq,
            Token::Eq,
            Token::NotEq,
            Token::Bang,
            Token::Arrow,
            Token::Minus,
            Token::Eof,
        ]
    );
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        kinds("return if else while break continue returned iffy _x1"),
        vec![
            Token::Return,
            Token::If,
            Token::Else,
            Token::While,
            Token::Break,
            Token::Continue,
            ident("returned"),
            ident("iffy"),
            ident("_x1"),
            Token::Eof,
        ]
    );
}

#[test]
fn test_integer_literals() {
    assert_eq!(
        kinds("0 42 9223372036854775807"),
        vec![
            Token::IntLit(0),
            Token::IntLit(42),
            Token::IntLit(i64::MAX),
            Token::Eof,
        ]
    );
}

#[test]
fn test_comments_and_separators() {
    assert_eq!(
        kinds("a // the rest is ignored ( }\n, b; // trailing"),
        vec![ident("a"), Token::Comma, ident("b"), Token::Semi, Token::Eof]
    );
}

// ---------------------------------------------------------------------------
// 2. Spans and the one-token-at-a-time interface
// ---------------------------------------------------------------------------

#[test]
fn test_spans_are_byte_ranges() {
    let tokens = Lexer::new("a := 42").tokenize().expect("lex");
    let spans: Vec<Span> = tokens.iter().map(|t| t.span).collect();
    assert_eq!(
        spans,
        vec![Span::new(0, 1), Span::new(2, 4), Span::new(5, 7), Span::at(7)]
    );
}

#[test]
fn test_next_token_stays_at_eof() {
    let mut lexer = Lexer::new("x 1");
    assert_eq!(lexer.next_token().expect("x").node, ident("x"));
    assert_eq!(lexer.next_token().expect("1").node, Token::IntLit(1));
    assert_eq!(lexer.next_token().expect("eof").node, Token::Eof);
    assert_eq!(lexer.next_token().expect("eof again").node, Token::Eof);
}

#[test]
fn test_empty_source_is_just_eof() {
    assert_eq!(kinds(""), vec![Token::Eof]);
    assert_eq!(kinds("   // nothing\n"), vec![Token::Eof]);
}

// ---------------------------------------------------------------------------
// 3. Errors
// ---------------------------------------------------------------------------

#[test]
fn test_unexpected_char_reports_position() {
    let err = Lexer::new("a @ b").tokenize().unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedChar { ch: '@', pos: 2 }),
        "got {:?}",
        err
    );
}

#[test]
fn test_unexpected_multibyte_char_is_reported_whole() {
    let err = Lexer::new("x é").tokenize().unwrap_err();
    assert!(
        matches!(err, ParseError::UnexpectedChar { ch: 'é', pos: 2 }),
        "got {:?}",
        err
    );
}

#[test]
fn test_overflowing_literal_is_invalid() {
    let err = Lexer::new("99999999999999999999").tokenize().unwrap_err();
    match err {
        ParseError::InvalidLiteral { text, span } => {
            assert_eq!(text, "99999999999999999999");
            assert_eq!(span, Span::new(0, 20));
        }
        other => panic!("expected InvalidLiteral, got {:?}", other),
    }
}
