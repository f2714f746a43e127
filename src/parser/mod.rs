pub mod lexer;
pub mod parse;

pub use lexer::{Lexer, Span, Spanned, Token};
pub use parse::Parser;

use crate::error::Error;
use crate::ir::unit::Unit;

/// Lexes and parses `source` into a graph unit.
pub fn parse_unit(source: &str) -> Result<Unit, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(&tokens).parse_unit()
}
