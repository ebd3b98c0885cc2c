//! Error types for formula parsing and evaluation

use thiserror::Error;

/// Result type for parse operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while turning formula text into an AST.
///
/// These surface at definition time: a formula that does not parse is
/// rejected before anything is persisted.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("'{text}' is not a valid number (offset {offset})")]
    InvalidNumber { text: String, offset: usize },

    #[error("unknown word '{word}' at offset {offset}")]
    UnknownWord { word: String, offset: usize },

    #[error("malformed reference token '{text}' at offset {offset}")]
    MalformedReference { text: String, offset: usize },

    #[error("formula ended unexpectedly")]
    UnexpectedEnd,

    #[error("unexpected {found}")]
    UnexpectedToken { found: String },

    #[error("unexpected trailing {found}")]
    TrailingInput { found: String },
}

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while evaluating a parsed formula.
///
/// Any of these fails the single evaluation they occur in; the engines log
/// and move on to the next trigger or action.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    BinaryMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("unsupported operand type for unary {op}: {operand}")]
    UnaryMismatch {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result '{value}' is not numeric")]
    NonNumericResult { value: String },

    #[error("macro reference __macr{id}__ is not supported")]
    MacroUnsupported { id: i64 },
}
