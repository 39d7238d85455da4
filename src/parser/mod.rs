//! G-code line parser
//!
//! Reads emitted lines back into commands with named parameters, the way a
//! downstream time estimator or viewer does.

pub mod ast;
pub mod lexer;
pub mod replay;

pub use ast::{Command, Comment, Parameter, ParsedLine};
pub use lexer::{Token, TokenKind, tokenize_line};
pub use replay::Replay;

/// Parse a single line of G-code
pub fn parse_line(line: &str) -> ParsedLine {
    ast::tokens_to_parsed_line(lexer::tokenize_line(line))
}

/// Parse every command of a stream, skipping comments and blank lines
pub fn parse_commands(text: &str) -> Vec<Command> {
    text.lines()
        .filter_map(|line| match parse_line(line) {
            ParsedLine::Command(cmd) => Some(cmd),
            _ => None,
        })
        .collect()
}
