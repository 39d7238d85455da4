//! Parsed representation of one G-code line.

use crate::parser::lexer::{Token, TokenKind};

/// A parsed line of G-code
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Command(Command),
    /// A comment-only line
    Comment(Comment),
    /// An empty or whitespace-only line
    Empty,
}

/// A command like "G1", "M104" or "SET_PRESSURE_ADVANCE"
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub comment: Option<Comment>,
}

impl Command {
    /// First parameter called `name` (case-insensitive)
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Numeric value of parameter `name`
    pub fn value(&self, name: &str) -> Option<f64> {
        self.parameter(name).and_then(Parameter::number)
    }

    pub fn has(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A command parameter: `X10` has name "X", `ADVANCE=0.04` has name "ADVANCE"
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    /// Raw value text; empty for bare flags such as `P1` without digits
    pub value: String,
}

impl Parameter {
    pub fn number(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

/// A comment (semicolon or parenthetical)
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Comment text without the delimiters
    pub text: String,
}

/// Convert tokens into a parsed line
pub fn tokens_to_parsed_line(tokens: Vec<Token>) -> ParsedLine {
    let comment = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Comment)
        .map(|t| Comment {
            text: extract_comment_text(&t.text),
        });

    let Some(command) = tokens.iter().find(|t| t.kind == TokenKind::Command) else {
        return match comment {
            Some(comment) => ParsedLine::Comment(comment),
            None => ParsedLine::Empty,
        };
    };

    let parameters = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Parameter)
        .filter_map(|t| parse_parameter_token(&t.text))
        .collect();

    ParsedLine::Command(Command {
        name: command.text.to_ascii_uppercase(),
        parameters,
        comment,
    })
}

/// Split "X10.5" or "ADVANCE=0.04" into name and value
fn parse_parameter_token(text: &str) -> Option<Parameter> {
    if let Some((name, value)) = text.split_once('=') {
        if name.is_empty() {
            return None;
        }
        return Some(Parameter {
            name: name.to_ascii_uppercase(),
            value: value.to_string(),
        });
    }

    let mut chars = text.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    Some(Parameter {
        name: letter.to_ascii_uppercase().to_string(),
        value: chars.as_str().to_string(),
    })
}

fn extract_comment_text(text: &str) -> String {
    let text = if let Some(stripped) = text.strip_prefix(';') {
        stripped
    } else if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        inner
    } else {
        text
    };
    text.trim().to_string()
}
