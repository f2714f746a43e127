use std::fmt;

use crate::error::ParseError;

/// A byte offset within the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BytePos(pub u32);

/// A half-open `[start, end)` byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: BytePos,
    pub end: BytePos,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: BytePos(start),
            end: BytePos(end),
        }
    }

    /// Creates a zero-length span at position `pos`.
    pub fn at(pos: u32) -> Self {
        Self::new(pos, pos)
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Keywords
    Return,
    If,
    Else,
    While,
    Break,
    Continue,
    /// `int`, the only type name.
    Int,

    // Literals
    IntLit(i64),
    Ident(String),

    // Punctuation
    LParen,  // (
    RParen,  // )
    LBrace,  // {
    RBrace,  // }
    Comma,   // ,
    Colon,   // :
    ColonEq, // :=
    Semi,    // ;
    Arrow,   // ->
    Eq,      // =

    // Comparison operators
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,

    /// `!` (logical NOT prefix)
    Bang,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Return => write!(f, "return"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Int => write!(f, "int"),
            Token::IntLit(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::ColonEq => write!(f, ":="),
            Token::Semi => write!(f, ";"),
            Token::Arrow => write!(f, "->"),
            Token::Eq => write!(f, "="),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Bang => write!(f, "!"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

/// Cursor-based scanner. Holds no state beyond the current byte offset.
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self { src, pos: 0 }
    }

    /// Tokenizes the full source and returns a flat `Vec` of spanned tokens,
    /// always terminated by `Token::Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned<Token>>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.node == Token::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    /// Scans and classifies the next token. Returns `Token::Eof` once the
    /// input is exhausted (and on every call after that).
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        self.skip_whitespace_and_comments();
        let start = self.pos as u32;
        let Some(ch) = self.peek() else {
            return Ok(Spanned {
                node: Token::Eof,
                span: Span::at(start),
            });
        };

        // Two-character tokens
        let two = match (ch, self.peek2()) {
            (b'-', Some(b'>')) => Some(Token::Arrow),
            (b':', Some(b'=')) => Some(Token::ColonEq),
            (b'=', Some(b'=')) => Some(Token::EqEq),
            (b'!', Some(b'=')) => Some(Token::NotEq),
            (b'<', Some(b'=')) => Some(Token::LtEq),
            (b'>', Some(b'=')) => Some(Token::GtEq),
            _ => None,
        };
        if let Some(tok) = two {
            self.pos += 2;
            return Ok(self.spanned(tok, start));
        }

        // Single-character punctuation
        let maybe_punct = match ch {
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b',' => Some(Token::Comma),
            b':' => Some(Token::Colon),
            b';' => Some(Token::Semi),
            b'=' => Some(Token::Eq),
            b'<' => Some(Token::Lt),
            b'>' => Some(Token::Gt),
            b'+' => Some(Token::Plus),
            b'-' => Some(Token::Minus),
            b'*' => Some(Token::Star),
            b'/' => Some(Token::Slash),
            b'!' => Some(Token::Bang),
            _ => None,
        };
        if let Some(tok) = maybe_punct {
            self.pos += 1;
            return Ok(self.spanned(tok, start));
        }

        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Ok(self.lex_ident_or_keyword(start));
        }

        // Report the full character, not just its first byte.
        let ch = self.src[self.pos..].chars().next().unwrap_or(ch as char);
        Err(ParseError::UnexpectedChar { ch, pos: start })
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.src[self.pos..].starts_with("//") {
                while self.peek().map_or(false, |b| b != b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos + 1).copied()
    }

    fn spanned(&self, node: Token, start: u32) -> Spanned<Token> {
        Spanned {
            node,
            span: Span::new(start, self.pos as u32),
        }
    }

    fn lex_number(&mut self, start: u32) -> Result<Spanned<Token>, ParseError> {
        while self.peek().map_or(false, |b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = &self.src[start as usize..self.pos];
        let value: i64 = text.parse().map_err(|_| ParseError::InvalidLiteral {
            text: text.to_owned(),
            span: Span::new(start, self.pos as u32),
        })?;
        Ok(self.spanned(Token::IntLit(value), start))
    }

    fn lex_ident_or_keyword(&mut self, start: u32) -> Spanned<Token> {
        while self
            .peek()
            .map_or(false, |b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        let text = &self.src[start as usize..self.pos];
        let tok = match text {
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "int" => Token::Int,
            _ => Token::Ident(text.to_owned()),
        };
        self.spanned(tok, start)
    }
}
