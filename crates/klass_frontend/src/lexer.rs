// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::fmt;

use logos::Logos;

/// Reserved words. `this` is included so the `this` primary is reachable.
pub const KEYWORDS: &[&str] = &[
    "if", "while", "else", "break", "return", "true", "false", "println", "new", "for", "method",
    "struct", "class", "init", "extends", "super", "this",
];

/// Built-in type names that lex as `TokenKind::Type`.
pub const TYPES: &[&str] = &["Int", "Void", "Boolean", "String"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Type,
    IntegerLiteral,
    StringLiteral,
    LParen,
    RParen,
    LCurlyBracket,
    RCurlyBracket,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Equals,
    EqualsEquals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Pipe,
    LogicalOr,
    Op,
}

/// A lexeme and its classification. String literal data excludes the quotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub data: String,
}

impl Token {
    pub fn new(kind: TokenKind, data: impl Into<String>) -> Self {
        Token {
            kind,
            data: data.into(),
        }
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.data == word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} '{}'", self.kind, self.data)
    }
}

// Raw scan classes. Words are reclassified by `classify_word` afterwards.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum Lexeme {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Word,
    #[regex(r"[0-9]+")]
    Integer,

    // closing quote is optional so an unterminated literal runs to end of input
    #[regex(r#""[^"]*"?"#)]
    DoubleQuoted,
    #[regex(r"'[^']*'?")]
    SingleQuoted,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LCurly,
    #[token("}")]
    RCurly,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,

    #[token("=")]
    Equals,
    #[token("==")]
    EqualsEquals,
    #[token("!=")]
    NotEquals,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanOrEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanOrEqual,
    #[token("|")]
    Pipe,
    #[token("||")]
    LogicalOr,

    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    Op,
}

/// Reclassify an identifier-shaped lexeme. Depends only on the lexeme itself.
pub fn classify_word(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if TYPES.contains(&word) {
        TokenKind::Type
    } else {
        TokenKind::Identifier
    }
}

fn quoted_literal(slice: &str, quote: char) -> String {
    let body = &slice[quote.len_utf8()..];
    match body.strip_suffix(quote) {
        Some(inner) => inner.to_string(),
        None => {
            log::warn!("unterminated string literal starting with {:?}", slice);
            body.to_string()
        }
    }
}

/// Tokenize source text. Never fails: unsupported characters are skipped and an
/// unterminated string literal swallows the rest of the input, both with a warning.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut toks = Vec::new();
    let mut lx = Lexeme::lexer(input);

    while let Some(res) = lx.next() {
        let slice = lx.slice();
        let lexeme = match res {
            Ok(lexeme) => lexeme,
            Err(()) => {
                log::warn!("skipping unsupported character {:?} at {:?}", slice, lx.span());
                continue;
            }
        };

        let tok = match lexeme {
            Lexeme::Word => Token::new(classify_word(slice), slice),
            Lexeme::Integer => Token::new(TokenKind::IntegerLiteral, slice),
            Lexeme::DoubleQuoted => Token::new(TokenKind::StringLiteral, quoted_literal(slice, '"')),
            Lexeme::SingleQuoted => Token::new(TokenKind::StringLiteral, quoted_literal(slice, '\'')),
            Lexeme::LParen => Token::new(TokenKind::LParen, slice),
            Lexeme::RParen => Token::new(TokenKind::RParen, slice),
            Lexeme::LCurly => Token::new(TokenKind::LCurlyBracket, slice),
            Lexeme::RCurly => Token::new(TokenKind::RCurlyBracket, slice),
            Lexeme::LBracket => Token::new(TokenKind::LBracket, slice),
            Lexeme::RBracket => Token::new(TokenKind::RBracket, slice),
            Lexeme::Comma => Token::new(TokenKind::Comma, slice),
            Lexeme::Dot => Token::new(TokenKind::Dot, slice),
            Lexeme::Colon => Token::new(TokenKind::Colon, slice),
            Lexeme::Semicolon => Token::new(TokenKind::Semicolon, slice),
            Lexeme::Equals => Token::new(TokenKind::Equals, slice),
            Lexeme::EqualsEquals => Token::new(TokenKind::EqualsEquals, slice),
            Lexeme::NotEquals => Token::new(TokenKind::NotEquals, slice),
            Lexeme::LessThan => Token::new(TokenKind::LessThan, slice),
            Lexeme::LessThanOrEqual => Token::new(TokenKind::LessThanOrEqual, slice),
            Lexeme::GreaterThan => Token::new(TokenKind::GreaterThan, slice),
            Lexeme::GreaterThanOrEqual => Token::new(TokenKind::GreaterThanOrEqual, slice),
            Lexeme::Pipe => Token::new(TokenKind::Pipe, slice),
            Lexeme::LogicalOr => Token::new(TokenKind::LogicalOr, slice),
            Lexeme::Op => Token::new(TokenKind::Op, slice),
        };
        toks.push(tok);
    }

    toks
}
