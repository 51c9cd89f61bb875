//! Tokenizer for the expression language.

use super::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Integer(i64),
    Float(f64),
    Text(String),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source.
    pub position: usize,
}

/// Splits `source` into tokens, always terminated by [`TokenKind::End`].
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, EvaluationError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, character)) = chars.peek() {
        if character.is_whitespace() {
            chars.next();
            continue;
        }

        if character.is_ascii_digit() || (character == '.' && next_is_digit(source, position)) {
            let end = scan_number_end(source, position);
            let literal = &source[position..end];
            while chars.peek().is_some_and(|&(index, _)| index < end) {
                chars.next();
            }
            tokens.push(Token {
                kind: parse_number(literal, position)?,
                position,
            });
            continue;
        }

        if character == '_' || character.is_alphabetic() {
            let mut identifier = String::new();
            while let Some(&(_, next_character)) = chars.peek() {
                if next_character == '_' || next_character.is_alphanumeric() {
                    identifier.push(next_character);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Identifier(identifier),
                position,
            });
            continue;
        }

        if character == '\'' || character == '"' {
            chars.next();
            let text = scan_string(&mut chars, character, position)?;
            tokens.push(Token {
                kind: TokenKind::Text(text),
                position,
            });
            continue;
        }

        chars.next();
        let following = chars.peek().map(|&(_, next_character)| next_character);
        let (kind, consumed_pair) = match (character, following) {
            ('/', Some('/')) => (TokenKind::DoubleSlash, true),
            ('=', Some('=')) => (TokenKind::EqualEqual, true),
            ('!', Some('=')) => (TokenKind::NotEqual, true),
            ('<', Some('=')) => (TokenKind::LessEqual, true),
            ('>', Some('=')) => (TokenKind::GreaterEqual, true),
            ('+', _) => (TokenKind::Plus, false),
            ('-', _) => (TokenKind::Minus, false),
            ('*', _) => (TokenKind::Star, false),
            ('/', _) => (TokenKind::Slash, false),
            ('%', _) => (TokenKind::Percent, false),
            ('<', _) => (TokenKind::Less, false),
            ('>', _) => (TokenKind::Greater, false),
            ('(', _) => (TokenKind::LeftParen, false),
            (')', _) => (TokenKind::RightParen, false),
            ('[', _) => (TokenKind::LeftBracket, false),
            (']', _) => (TokenKind::RightBracket, false),
            (',', _) => (TokenKind::Comma, false),
            (other, _) => {
                return Err(EvaluationError::syntax(format!("unexpected character '{other}'"), position));
            }
        };
        if consumed_pair {
            chars.next();
        }
        tokens.push(Token { kind, position });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        position: source.len(),
    });
    Ok(tokens)
}

fn next_is_digit(source: &str, position: usize) -> bool {
    source[position + 1..].chars().next().is_some_and(|character| character.is_ascii_digit())
}

fn scan_number_end(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut index = start;
    let mut seen_dot = false;
    let mut seen_exponent = false;
    while index < bytes.len() {
        match bytes[index] {
            b'0'..=b'9' => index += 1,
            b'.' if !seen_dot && !seen_exponent => {
                seen_dot = true;
                index += 1;
            }
            b'e' | b'E' if !seen_exponent => {
                let mut lookahead = index + 1;
                if lookahead < bytes.len() && matches!(bytes[lookahead], b'+' | b'-') {
                    lookahead += 1;
                }
                if lookahead < bytes.len() && bytes[lookahead].is_ascii_digit() {
                    seen_exponent = true;
                    index = lookahead;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    index
}

fn parse_number(literal: &str, position: usize) -> Result<TokenKind, EvaluationError> {
    let is_float = literal.contains(['.', 'e', 'E']);
    if is_float {
        literal
            .parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| EvaluationError::syntax(format!("invalid number '{literal}'"), position))
    } else {
        literal
            .parse::<i64>()
            .map(TokenKind::Integer)
            .map_err(|_| EvaluationError::syntax(format!("integer literal '{literal}' is out of range"), position))
    }
}

fn scan_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, EvaluationError> {
    let mut text = String::new();
    while let Some((_, character)) = chars.next() {
        match character {
            '\\' => {
                let Some((escape_position, escaped)) = chars.next() else {
                    break;
                };
                let resolved = match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '\\' | '\'' | '"' => escaped,
                    other => {
                        return Err(EvaluationError::syntax(format!("unknown escape sequence '\\{other}'"), escape_position));
                    }
                };
                text.push(resolved);
            }
            character if character == quote => return Ok(text),
            other => text.push(other),
        }
    }
    Err(EvaluationError::syntax("unterminated string literal", start))
}
