//! Formula language
//!
//! This crate implements the expression language triggers and actions are
//! written in: a small infix grammar over numbers, strings, booleans, and
//! reference tokens that stand for dependency edges (`__sens<edge>__`,
//! `__trig<edge>__`).
//!
//! # Architecture
//!
//! ```text
//! text --lexer--> tokens --parser--> Expr --evaluator--> Value
//! ```
//!
//! Parsing and evaluation are pure. The [`ExprParser`] is an explicit value
//! handed to whichever component parses formulas; stored formulas are
//! validated at creation time, so an expression read back from the store
//! always parses.
//!
//! # Key Types
//!
//! - [`ExprParser`] - turns formula text into an [`Expr`]
//! - [`Bindings`] - edge-id to value maps an evaluation reads from
//! - [`evaluate`] - native number-or-string result (action arguments)
//! - [`evaluate_numeric`] - canonical numeric text (trigger recomputation)

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod token;

pub use ast::{BinOp, Expr};
pub use error::{EvalError, ParseError};
pub use eval::{evaluate, evaluate_numeric, Bindings};
pub use parser::ExprParser;
