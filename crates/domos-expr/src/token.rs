//! Formula tokenizer
//!
//! Hand-written scanner producing the token stream the parser consumes.
//! The grammar is ASCII: numbers are runs of digits and dots, strings are
//! double-quoted without escapes, and references are `__sens<digits>__`,
//! `__trig<digits>__` or `__macr<digits>__`.

use crate::error::{ParseError, ParseResult};
use domos_core::{fmt_double, EdgeId};
use std::fmt;

/// One lexical element of a formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Bool(bool),
    SensorRef(EdgeId),
    TriggerRef(EdgeId),
    MacroRef(i64),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Lt,
    Gt,
    OrOr,
    AndAnd,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", fmt_double(*n)),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Bool(b) => write!(f, "boolean {}", b),
            Token::SensorRef(id) => write!(f, "reference __sens{}__", id),
            Token::TriggerRef(id) => write!(f, "reference __trig{}__", id),
            Token::MacroRef(id) => write!(f, "reference __macr{}__", id),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::StarStar => write!(f, "'**'"),
            Token::Slash => write!(f, "'/'"),
            Token::SlashSlash => write!(f, "'//'"),
            Token::Percent => write!(f, "'%'"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::LtEq => write!(f, "'<='"),
            Token::GtEq => write!(f, "'>='"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::OrOr => write!(f, "'||'"),
            Token::AndAnd => write!(f, "'&&'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

/// Scan formula text into tokens.
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::StarStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::LtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::GtEq);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '=', offset: i });
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '!', offset: i });
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '|', offset: i });
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '&', offset: i });
                }
            }
            '"' => {
                let start = i;
                i += 1;
                let mut text = String::new();
                loop {
                    match chars.get(i) {
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(ParseError::UnterminatedString { offset: start });
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Number(n)),
                    Err(_) => {
                        return Err(ParseError::InvalidNumber {
                            text,
                            offset: start,
                        })
                    }
                }
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(classify_word(&word, start)?);
            }
            other => {
                return Err(ParseError::UnexpectedChar {
                    ch: other,
                    offset: i,
                })
            }
        }
    }

    Ok(tokens)
}

fn classify_word(word: &str, offset: usize) -> ParseResult<Token> {
    match word {
        "True" | "true" | "Yes" | "yes" => Ok(Token::Bool(true)),
        "False" | "false" | "No" | "no" => Ok(Token::Bool(false)),
        w if w.starts_with("__") => parse_reference(w, offset),
        w => Err(ParseError::UnknownWord {
            word: w.to_string(),
            offset,
        }),
    }
}

fn parse_reference(text: &str, offset: usize) -> ParseResult<Token> {
    let malformed = || ParseError::MalformedReference {
        text: text.to_string(),
        offset,
    };

    let inner = text
        .strip_prefix("__")
        .and_then(|t| t.strip_suffix("__"))
        .ok_or_else(malformed)?;

    if inner.len() < 5 {
        return Err(malformed());
    }
    let (kind, digits) = inner.split_at(4);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let id: i64 = digits.parse().map_err(|_| malformed())?;

    match kind {
        "sens" => Ok(Token::SensorRef(EdgeId::new(id))),
        "trig" => Ok(Token::TriggerRef(EdgeId::new(id))),
        "macr" => Ok(Token::MacroRef(id)),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_lex_longest_first() {
        let tokens = tokenize("2**4//3<=1!=0").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Number(2.0),
                Token::StarStar,
                Token::Number(4.0),
                Token::SlashSlash,
                Token::Number(3.0),
                Token::LtEq,
                Token::Number(1.0),
                Token::NotEq,
                Token::Number(0.0),
            ]
        );
    }

    #[test]
    fn references_carry_their_edge_id() {
        let tokens = tokenize("__sens3532__ + __trig23__").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::SensorRef(EdgeId::new(3532)),
                Token::Plus,
                Token::TriggerRef(EdgeId::new(23)),
            ]
        );
    }

    #[test]
    fn boolean_words_in_both_cases() {
        assert_eq!(tokenize("True").unwrap(), vec![Token::Bool(true)]);
        assert_eq!(tokenize("yes").unwrap(), vec![Token::Bool(true)]);
        assert_eq!(tokenize("False").unwrap(), vec![Token::Bool(false)]);
        assert_eq!(tokenize("no").unwrap(), vec![Token::Bool(false)]);
    }

    #[test]
    fn malformed_numbers_fail_at_lex_time() {
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            tokenize("."),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn string_literals_take_everything_up_to_the_quote() {
        assert_eq!(
            tokenize("\"door open\"").unwrap(),
            vec![Token::Str("door open".to_string())]
        );
        assert!(matches!(
            tokenize("\"no end"),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn stray_words_and_bad_references_are_rejected() {
        assert!(matches!(
            tokenize("foo"),
            Err(ParseError::UnknownWord { .. })
        ));
        assert!(matches!(
            tokenize("__sens__"),
            Err(ParseError::MalformedReference { .. })
        ));
        assert!(matches!(
            tokenize("__bogus12__"),
            Err(ParseError::MalformedReference { .. })
        ));
        assert!(matches!(
            tokenize("__sens12_"),
            Err(ParseError::MalformedReference { .. })
        ));
    }

    #[test]
    fn single_ampersand_or_pipe_is_an_error() {
        assert!(matches!(
            tokenize("1 & 2"),
            Err(ParseError::UnexpectedChar { ch: '&', .. })
        ));
        assert!(matches!(
            tokenize("1 | 2"),
            Err(ParseError::UnexpectedChar { ch: '|', .. })
        ));
        assert!(matches!(
            tokenize("1 = 2"),
            Err(ParseError::UnexpectedChar { ch: '=', .. })
        ));
    }
}
