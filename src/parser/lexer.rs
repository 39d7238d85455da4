//! Line tokenizer for emitted G-code.
//!
//! The first word of a line is the command (`G1`, `M104`, `T1`,
//! `SET_VELOCITY_LIMIT`); every following word is a parameter. Parameters are
//! either a letter followed by a number (`X-.05`) or a Klipper style
//! `KEY=value` pair.

/// Token types in a G-code line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    /// Command like "G1", "M104" or "SET_PRESSURE_ADVANCE"
    Command,
    /// Parameter like "X10", "S255" or "ADVANCE=0.04"
    Parameter,
    /// Comment (semicolon or parenthetical)
    Comment,
}

/// A token with its text content
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '+' | '_' | '=')
}

/// Tokenize one line
pub fn tokenize_line(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some((start_idx, ch)) = chars.next() {
        match ch {
            ' ' | '\t' | '\r' | '\n' => continue,

            // Rest of the line
            ';' => {
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: line[start_idx..].to_string(),
                });
                break;
            }

            '(' => {
                let mut end_idx = line.len();
                for (idx, ch) in chars.by_ref() {
                    if ch == ')' {
                        end_idx = idx + 1;
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Comment,
                    text: line[start_idx..end_idx].to_string(),
                });
            }

            c if c.is_ascii_alphabetic() => {
                let mut end_idx = start_idx + 1;
                while let Some(&(idx, next_ch)) = chars.peek() {
                    if !is_word_char(next_ch) {
                        break;
                    }
                    end_idx = idx + 1;
                    chars.next();
                }

                let seen_command = tokens.iter().any(|t| t.kind == TokenKind::Command);
                let kind = if seen_command {
                    TokenKind::Parameter
                } else {
                    TokenKind::Command
                };
                tokens.push(Token {
                    kind,
                    text: line[start_idx..end_idx].to_string(),
                });
            }

            // Stray characters are ignored
            _ => continue,
        }
    }

    tokens
}
