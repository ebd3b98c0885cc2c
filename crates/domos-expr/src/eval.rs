//! Formula evaluation
//!
//! One recursive walk over the AST with an exhaustive match per node. The
//! arithmetic keeps the semantics the formula language has always had:
//! `//` floors, `%` takes the sign of the divisor, comparisons return
//! `1.0`/`0.0`, equality across number and string is simply false, and both
//! sides of `||`/`&&` are evaluated before their truthiness is combined.
//!
//! Two entry points cover the two callers:
//!
//! - [`evaluate`] returns the native [`Value`] - action arguments may
//!   legitimately be strings.
//! - [`evaluate_numeric`] coerces the result to a number and renders the
//!   canonical text a trigger persists as its last value.

use crate::ast::{BinOp, Expr};
use crate::error::{EvalError, EvalResult};
use domos_core::{fmt_double, EdgeId, Value};
use std::collections::HashMap;

/// Edge-id to value maps an evaluation reads its references from.
///
/// Sensor and trigger edges live in separate id spaces, hence two maps.
/// A reference whose edge id is missing evaluates to `0`.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub sensors: HashMap<EdgeId, Value>,
    pub triggers: HashMap<EdgeId, Value>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sensor(&mut self, edge: EdgeId, value: Value) {
        self.sensors.insert(edge, value);
    }

    pub fn insert_trigger(&mut self, edge: EdgeId, value: Value) {
        self.triggers.insert(edge, value);
    }

    #[must_use]
    pub fn with_sensor(mut self, edge: EdgeId, value: impl Into<Value>) -> Self {
        self.sensors.insert(edge, value.into());
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, edge: EdgeId, value: impl Into<Value>) -> Self {
        self.triggers.insert(edge, value.into());
        self
    }
}

/// Evaluate to the native number-or-string result.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> EvalResult<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Num(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::from(*b)),
        Expr::Sensor(edge) => Ok(bindings
            .sensors
            .get(edge)
            .cloned()
            .unwrap_or(Value::Num(0.0))),
        Expr::Trigger(edge) => Ok(bindings
            .triggers
            .get(edge)
            .cloned()
            .unwrap_or(Value::Num(0.0))),
        Expr::Macro(id) => Err(EvalError::MacroUnsupported { id: *id }),
        Expr::Neg(inner) => match evaluate(inner, bindings)? {
            Value::Num(n) => Ok(Value::Num(-n)),
            other => Err(EvalError::UnaryMismatch {
                op: "-",
                operand: other.kind(),
            }),
        },
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, bindings)?;
            let rhs = evaluate(rhs, bindings)?;
            apply(*op, lhs, rhs)
        }
    }
}

/// Evaluate and coerce to the canonical numeric text (`"53.0"`) used for
/// trigger change detection and storage. A string result that does not parse
/// as a number is an error.
pub fn evaluate_numeric(expr: &Expr, bindings: &Bindings) -> EvalResult<String> {
    match evaluate(expr, bindings)? {
        Value::Num(n) => Ok(fmt_double(n)),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(n) => Ok(fmt_double(n)),
            Err(_) => Err(EvalError::NonNumericResult { value: s }),
        },
    }
}

fn apply(op: BinOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match op {
        BinOp::Or => Ok(Value::from(lhs.truthy() || rhs.truthy())),
        BinOp::And => Ok(Value::from(lhs.truthy() && rhs.truthy())),
        BinOp::Eq => Ok(Value::from(value_eq(&lhs, &rhs))),
        BinOp::Ne => Ok(Value::from(!value_eq(&lhs, &rhs))),
        BinOp::Le => compare(op, lhs, rhs, std::cmp::Ordering::is_le),
        BinOp::Ge => compare(op, lhs, rhs, std::cmp::Ordering::is_ge),
        BinOp::Lt => compare(op, lhs, rhs, std::cmp::Ordering::is_lt),
        BinOp::Gt => compare(op, lhs, rhs, std::cmp::Ordering::is_gt),
        BinOp::Add => match (lhs, rhs) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (lhs, rhs) => Err(mismatch(op, &lhs, &rhs)),
        },
        BinOp::Sub => numeric(op, lhs, rhs, |a, b| Ok(a - b)),
        BinOp::Mul => numeric(op, lhs, rhs, |a, b| Ok(a * b)),
        BinOp::Div => numeric(op, lhs, rhs, |a, b| {
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }),
        BinOp::FloorDiv => numeric(op, lhs, rhs, |a, b| {
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok((a / b).floor())
            }
        }),
        BinOp::Mod => numeric(op, lhs, rhs, |a, b| {
            if b == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                // Remainder with the sign of the divisor.
                Ok(a - b * (a / b).floor())
            }
        }),
        BinOp::Pow => numeric(op, lhs, rhs, |a, b| Ok(a.powf(b))),
    }
}

/// Equality is type-strict: a string never equals a number.
fn value_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}

fn compare(
    op: BinOp,
    lhs: Value,
    rhs: Value,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Num(a), Value::Num(b)) => Ok(Value::from(
            a.partial_cmp(b).map(&accept).unwrap_or(false),
        )),
        (Value::Str(a), Value::Str(b)) => Ok(Value::from(accept(a.cmp(b)))),
        _ => Err(mismatch(op, &lhs, &rhs)),
    }
}

fn numeric(
    op: BinOp,
    lhs: Value,
    rhs: Value,
    f: impl Fn(f64, f64) -> EvalResult<f64>,
) -> EvalResult<Value> {
    match (&lhs, &rhs) {
        (Value::Num(a), Value::Num(b)) => f(*a, *b).map(Value::Num),
        _ => Err(mismatch(op, &lhs, &rhs)),
    }
}

fn mismatch(op: BinOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::BinaryMismatch {
        op: op.symbol(),
        lhs: lhs.kind(),
        rhs: rhs.kind(),
    }
}
