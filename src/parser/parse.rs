//! Handwritten recursive-descent parser that builds the graph directly.
//!
//! The parser consumes a flat `&[Spanned<Token>]` produced by the lexer.
//! There is no AST: each expression and statement is turned into
//! peepholed nodes through a `FunctionBuilder` as soon as it is recognized.
//!
//! Grammar (informal):
//! ```text
//! unit      := function*
//! function  := IDENT ":=" "(" (param ","?)* ")" "->" type block
//! param     := IDENT ":" type
//! type      := "int"
//! block     := "{" stmt* "}"
//! stmt      := block
//!            | "return" expr
//!            | "if" expr stmt ("else" stmt)?
//!            | "while" expr stmt
//!            | "break" | "continue" | ";"
//!            | IDENT ":=" expr
//!            | IDENT ":" type "=" expr
//!            | IDENT "=" expr
//! expr      := eq_expr
//! eq_expr   := cmp_expr (("==" | "!=") cmp_expr)*
//! cmp_expr  := add_expr (("<" | "<=" | ">" | ">=") add_expr)*
//! add_expr  := mul_expr (("+" | "-") mul_expr)*
//! mul_expr  := unary (("*" | "/") unary)*
//! unary     := ("-" | "!") unary | primary
//! primary   := INT_LIT | IDENT | IDENT "(" (expr ","?)* ")" | "(" expr ")"
//! ```

use indexmap::IndexMap;

use crate::error::{BuildError, Error, ParseError};
use crate::ir::graph::Graph;
use crate::ir::node::{BinOp, NodeId, UnOp};
use crate::ir::unit::Unit;
use crate::lower::FunctionBuilder;
use crate::parser::lexer::{Span, Spanned, Token};

pub struct Parser<'t> {
    tokens: &'t [Spanned<Token>],
    pos: usize,
    graph: Graph,
    exports: IndexMap<String, NodeId>,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Spanned<Token>]) -> Self {
        Self {
            tokens,
            pos: 0,
            graph: Graph::new(),
            exports: IndexMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Token stream helpers
    // -----------------------------------------------------------------------

    fn peek_tok(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        match self.tokens.get(self.pos + offset) {
            Some(t) => &t.node,
            None => &Token::Eof,
        }
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(t) => t.span,
            None => Span::at(0),
        }
    }

    fn advance(&mut self) -> Span {
        let span = self.current_span();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_tok(), Token::Eof)
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek_tok() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.at_eof() {
            ParseError::UnexpectedEof {
                context: expected.to_owned(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_owned(),
                found: format!("{}", self.peek_tok()),
                span: self.current_span(),
            }
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, ParseError> {
        if self.peek_tok() == expected {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek_tok().clone() {
            Token::Ident(name) => Ok((name, self.advance())),
            _ => Err(self.unexpected("identifier")),
        }
    }

    // -----------------------------------------------------------------------
    // Top-level
    // -----------------------------------------------------------------------

    /// Parses every function definition and returns the finished unit.
    pub fn parse_unit(mut self) -> Result<Unit, Error> {
        while !self.at_eof() {
            self.parse_function()?;
        }
        Ok(Unit {
            graph: self.graph,
            exports: self.exports,
        })
    }

    fn parse_function(&mut self) -> Result<(), Error> {
        let (name, name_span) = self.expect_ident()?;
        self.expect(&Token::ColonEq)?;
        self.expect(&Token::LParen)?;
        let mut params: Vec<(String, Span)> = Vec::new();
        while !matches!(self.peek_tok(), Token::RParen) {
            let (param, span) = self.expect_ident()?;
            self.expect(&Token::Colon)?;
            self.parse_type()?;
            if self.exports.contains_key(&param) || param == name {
                return Err(BuildError::Redeclaration { name: param, span }.into());
            }
            params.push((param, span));
            self.eat(&Token::Comma);
        }
        self.expect(&Token::RParen)?;
        self.expect(&Token::Arrow)?;
        self.parse_type()?;

        if self.exports.contains_key(&name) {
            return Err(BuildError::Redeclaration {
                name,
                span: name_span,
            }
            .into());
        }

        let mut b = FunctionBuilder::new(&mut self.graph, &name, &params)?;
        // Visible to its own body so it can recurse.
        let term = self.graph.function_ref(b.stop(), params.len() as u32);
        self.exports.insert(name.clone(), term);

        self.parse_block(&mut b)?;
        let end = self.tokens[..self.pos]
            .last()
            .map(|t| t.span)
            .unwrap_or(name_span);
        b.finish(&self.graph, end)?;
        Ok(())
    }

    fn parse_type(&mut self) -> Result<(), Error> {
        match self.peek_tok().clone() {
            Token::Int => {
                self.advance();
                Ok(())
            }
            Token::Ident(name) => Err(BuildError::UnknownType {
                name,
                span: self.current_span(),
            }
            .into()),
            _ => Err(self.unexpected("type").into()),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn parse_block(&mut self, b: &mut FunctionBuilder) -> Result<(), Error> {
        self.expect(&Token::LBrace)?;
        let depth = b.enter_block();
        while !matches!(self.peek_tok(), Token::RBrace) {
            if self.at_eof() {
                return Err(self.unexpected("block").into());
            }
            self.parse_statement(b)?;
        }
        self.expect(&Token::RBrace)?;
        b.leave_block(depth);
        Ok(())
    }

    fn parse_statement(&mut self, b: &mut FunctionBuilder) -> Result<(), Error> {
        match self.peek_tok().clone() {
            Token::LBrace => self.parse_block(b),
            Token::Semi => {
                self.advance();
                Ok(())
            }
            Token::Return => {
                self.advance();
                let value = self.parse_expr(b)?;
                b.ret(&mut self.graph, value);
                Ok(())
            }
            Token::If => self.parse_if(b),
            Token::While => self.parse_while(b),
            Token::Break => {
                let span = self.advance();
                b.break_(&mut self.graph, span)?;
                Ok(())
            }
            Token::Continue => {
                let span = self.advance();
                b.continue_(&mut self.graph, span)?;
                Ok(())
            }
            Token::Ident(name) => self.parse_binding(b, name),
            _ => Err(self.unexpected("statement").into()),
        }
    }

    fn parse_if(&mut self, b: &mut FunctionBuilder) -> Result<(), Error> {
        self.expect(&Token::If)?;
        let cond = self.parse_expr(b)?;
        let mut state = b.begin_if(&mut self.graph, cond);
        self.parse_statement(b)?;
        if self.eat(&Token::Else) {
            b.begin_else(&mut state);
            self.parse_statement(b)?;
        }
        b.end_if(&mut self.graph, state);
        Ok(())
    }

    fn parse_while(&mut self, b: &mut FunctionBuilder) -> Result<(), Error> {
        self.expect(&Token::While)?;
        let mut state = b.begin_loop(&mut self.graph);
        let cond = self.parse_expr(b)?;
        b.loop_condition(&mut self.graph, &mut state, cond);
        self.parse_statement(b)?;
        b.end_loop(&mut self.graph, state);
        Ok(())
    }

    /// `x := e`, `x: int = e` or `x = e`.
    fn parse_binding(&mut self, b: &mut FunctionBuilder, name: String) -> Result<(), Error> {
        let span = self.advance();
        match self.peek_tok() {
            Token::ColonEq => {
                self.advance();
                self.check_not_function(&name, span)?;
                let value = self.parse_expr(b)?;
                b.declare(&name, value, span)?;
            }
            Token::Colon => {
                self.advance();
                self.parse_type()?;
                self.expect(&Token::Eq)?;
                self.check_not_function(&name, span)?;
                let value = self.parse_expr(b)?;
                b.declare(&name, value, span)?;
            }
            Token::Eq => {
                self.advance();
                if b.lookup(&name).is_none() && self.exports.contains_key(&name) {
                    return Err(BuildError::NotAVariable { name, span }.into());
                }
                let value = self.parse_expr(b)?;
                b.update(&name, value, span)?;
            }
            _ => return Err(self.unexpected("':=', ':' or '=' after identifier").into()),
        }
        Ok(())
    }

    fn check_not_function(&self, name: &str, span: Span) -> Result<(), BuildError> {
        if self.exports.contains_key(name) {
            return Err(BuildError::Redeclaration {
                name: name.to_owned(),
                span,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions (lowest to highest precedence)
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        self.parse_eq_expr(b)
    }

    fn parse_eq_expr(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        let mut lhs = self.parse_cmp_expr(b)?;
        loop {
            let op = match self.peek_tok() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::Neq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_cmp_expr(b)?;
            lhs = b.binary(&mut self.graph, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_cmp_expr(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        let mut lhs = self.parse_add_expr(b)?;
        loop {
            let op = match self.peek_tok() {
                Token::Lt => BinOp::Lt,
                Token::LtEq => BinOp::Leq,
                Token::Gt => BinOp::Gt,
                Token::GtEq => BinOp::Geq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_add_expr(b)?;
            lhs = b.binary(&mut self.graph, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_add_expr(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        let mut lhs = self.parse_mul_expr(b)?;
        loop {
            let op = match self.peek_tok() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul_expr(b)?;
            lhs = b.binary(&mut self.graph, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_mul_expr(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        let mut lhs = self.parse_unary(b)?;
        loop {
            let op = match self.peek_tok() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary(b)?;
            lhs = b.binary(&mut self.graph, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        let op = match self.peek_tok() {
            Token::Minus => UnOp::Neg,
            Token::Bang => UnOp::Not,
            _ => return self.parse_primary(b),
        };
        self.advance();
        let operand = self.parse_unary(b)?;
        Ok(b.unary(&mut self.graph, op, operand))
    }

    fn parse_primary(&mut self, b: &mut FunctionBuilder) -> Result<NodeId, Error> {
        match self.peek_tok().clone() {
            Token::IntLit(v) => {
                self.advance();
                Ok(b.constant(&mut self.graph, v))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr(b)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                let span = self.advance();
                if matches!(self.peek_tok(), Token::LParen) {
                    return self.parse_call(b, name, span);
                }
                if let Some(value) = b.lookup(&name) {
                    return Ok(value);
                }
                if self.exports.contains_key(&name) {
                    return Err(BuildError::NotAVariable { name, span }.into());
                }
                Err(BuildError::UndeclaredVariable { name, span }.into())
            }
            _ => Err(self.unexpected("expression").into()),
        }
    }

    fn parse_call(&mut self, b: &mut FunctionBuilder, name: String, span: Span) -> Result<NodeId, Error> {
        let callee = match self.exports.get(&name) {
            Some(&term) => term,
            None if b.lookup(&name).is_some() => {
                return Err(BuildError::NotAFunction { name, span }.into())
            }
            None => return Err(BuildError::UndeclaredVariable { name, span }.into()),
        };
        let Some(func) = self.graph.function_of(callee) else {
            return Err(BuildError::NotAFunction { name, span }.into());
        };
        let args = self.parse_call_args(b)?;
        let call_span = span.merge(self.tokens[..self.pos].last().map_or(span, |t| t.span));
        Ok(b.call(&mut self.graph, &name, callee, func, args, call_span)?)
    }

    fn parse_call_args(&mut self, b: &mut FunctionBuilder) -> Result<Vec<NodeId>, Error> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !matches!(self.peek_tok(), Token::RParen) {
            if self.at_eof() {
                return Err(self.unexpected("')'").into());
            }
            args.push(self.parse_expr(b)?);
            self.eat(&Token::Comma);
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }
}
