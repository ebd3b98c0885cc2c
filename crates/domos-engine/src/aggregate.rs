//! Aggregation functions over value history
//!
//! Every dependency edge names one of these functions; binding construction
//! applies it to a newest-first history slice to produce the edge's value.
//! `last` is the only function that tolerates non-numeric history: string
//! sensors are legal in guards and action arguments, but averaging them is
//! a configuration mistake and surfaces as an error.

use domos_core::Value;
use domos_store::HistoryRecord;
use thiserror::Error;

/// Errors from parsing or applying an aggregation spec.
#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("unknown aggregation function '{0}'")]
    UnknownFunction(String),

    #[error("{function} takes {expected} argument(s), got {got}")]
    BadArity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("argument of {function} is not a whole number: '{arg}'")]
    BadArgument {
        function: &'static str,
        arg: String,
    },

    #[error("non-numeric history value '{0}'")]
    NonNumeric(String),
}

/// A parsed aggregation spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `last(n)`: the n-th newest record, `0` beyond history.
    Last(usize),
    /// `avg(n)`: mean of up to n newest records.
    Avg(usize),
    /// `sum(n)`: sum of up to n newest records.
    Sum(usize),
    /// `diff()`: newest minus previous, `0` with fewer than two records.
    Diff,
    /// `tdiff()`: `diff()` per elapsed second, `0` when no time has passed.
    Tdiff,
}

impl AggregateFn {
    /// Parse a stored edge's function name and argument list.
    pub fn parse(name: &str, args: &[String]) -> Result<Self, AggregateError> {
        match name {
            "last" => Ok(Self::Last(one_index_arg("last", args)?)),
            "avg" => Ok(Self::Avg(one_index_arg("avg", args)?)),
            "sum" => Ok(Self::Sum(one_index_arg("sum", args)?)),
            "diff" => {
                no_args("diff", args)?;
                Ok(Self::Diff)
            }
            "tdiff" => {
                no_args("tdiff", args)?;
                Ok(Self::Tdiff)
            }
            other => Err(AggregateError::UnknownFunction(other.to_string())),
        }
    }

    /// How many newest-first records the function can make use of.
    pub fn required_depth(&self) -> usize {
        match self {
            Self::Last(n) => n + 1,
            Self::Avg(n) | Self::Sum(n) => *n,
            Self::Diff | Self::Tdiff => 2,
        }
    }

    /// Reduce a newest-first history slice to one value.
    pub fn apply(&self, history: &[HistoryRecord]) -> Result<Value, AggregateError> {
        match self {
            Self::Last(n) => Ok(history
                .get(*n)
                .map(|record| Value::coerce(&record.value))
                .unwrap_or(Value::Num(0.0))),
            Self::Avg(n) => {
                let nums = numbers(&history[..history.len().min(*n)])?;
                if nums.is_empty() {
                    return Ok(Value::Num(0.0));
                }
                Ok(Value::Num(nums.iter().sum::<f64>() / nums.len() as f64))
            }
            Self::Sum(n) => {
                let nums = numbers(&history[..history.len().min(*n)])?;
                Ok(Value::Num(nums.iter().sum()))
            }
            Self::Diff => {
                if history.len() < 2 {
                    return Ok(Value::Num(0.0));
                }
                let nums = numbers(&history[..2])?;
                Ok(Value::Num(nums[0] - nums[1]))
            }
            Self::Tdiff => {
                if history.len() < 2 {
                    return Ok(Value::Num(0.0));
                }
                let elapsed = (history[0].at - history[1].at).num_milliseconds() as f64 / 1000.0;
                if elapsed <= 0.0 {
                    return Ok(Value::Num(0.0));
                }
                let nums = numbers(&history[..2])?;
                Ok(Value::Num((nums[0] - nums[1]) / elapsed))
            }
        }
    }
}

fn one_index_arg(function: &'static str, args: &[String]) -> Result<usize, AggregateError> {
    if args.len() != 1 {
        return Err(AggregateError::BadArity {
            function,
            expected: 1,
            got: args.len(),
        });
    }
    args[0]
        .trim()
        .parse()
        .map_err(|_| AggregateError::BadArgument {
            function,
            arg: args[0].clone(),
        })
}

fn no_args(function: &'static str, args: &[String]) -> Result<(), AggregateError> {
    if !args.is_empty() {
        return Err(AggregateError::BadArity {
            function,
            expected: 0,
            got: args.len(),
        });
    }
    Ok(())
}

fn numbers(history: &[HistoryRecord]) -> Result<Vec<f64>, AggregateError> {
    history
        .iter()
        .map(|record| {
            record
                .value
                .trim()
                .parse()
                .map_err(|_| AggregateError::NonNumeric(record.value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn history(values: &[&str]) -> Vec<HistoryRecord> {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, value)| HistoryRecord {
                value: value.to_string(),
                // newest first, five seconds apart
                at: t0 - Duration::seconds(5 * i as i64),
            })
            .collect()
    }

    #[test]
    fn last_indexes_newest_first_and_defaults_beyond_history() {
        let h = history(&["21.5", "20.0"]);
        assert_eq!(AggregateFn::Last(0).apply(&h).unwrap(), Value::Num(21.5));
        assert_eq!(AggregateFn::Last(1).apply(&h).unwrap(), Value::Num(20.0));
        assert_eq!(AggregateFn::Last(5).apply(&h).unwrap(), Value::Num(0.0));
    }

    #[test]
    fn last_passes_strings_through() {
        let h = history(&["on"]);
        assert_eq!(
            AggregateFn::Last(0).apply(&h).unwrap(),
            Value::Str("on".into())
        );
    }

    #[test]
    fn avg_and_sum_use_what_is_available() {
        let h = history(&["4", "8"]);
        assert_eq!(AggregateFn::Avg(5).apply(&h).unwrap(), Value::Num(6.0));
        assert_eq!(AggregateFn::Sum(5).apply(&h).unwrap(), Value::Num(12.0));
        assert_eq!(AggregateFn::Avg(1).apply(&h).unwrap(), Value::Num(4.0));
        assert_eq!(AggregateFn::Avg(3).apply(&[]).unwrap(), Value::Num(0.0));
    }

    #[test]
    fn numeric_functions_reject_corrupt_history() {
        let h = history(&["4", "broken"]);
        assert_eq!(
            AggregateFn::Avg(2).apply(&h).unwrap_err(),
            AggregateError::NonNumeric("broken".into())
        );
        assert_eq!(
            AggregateFn::Diff.apply(&h).unwrap_err(),
            AggregateError::NonNumeric("broken".into())
        );
    }

    #[test]
    fn diff_needs_two_records() {
        assert_eq!(
            AggregateFn::Diff.apply(&history(&["5", "2"])).unwrap(),
            Value::Num(3.0)
        );
        assert_eq!(
            AggregateFn::Diff.apply(&history(&["5"])).unwrap(),
            Value::Num(0.0)
        );
    }

    #[test]
    fn tdiff_is_per_second_and_guards_elapsed_time() {
        // records are five seconds apart
        let h = history(&["20", "10"]);
        assert_eq!(AggregateFn::Tdiff.apply(&h).unwrap(), Value::Num(2.0));

        let mut same_instant = history(&["20", "10"]);
        same_instant[1].at = same_instant[0].at;
        assert_eq!(
            AggregateFn::Tdiff.apply(&same_instant).unwrap(),
            Value::Num(0.0)
        );

        assert_eq!(
            AggregateFn::Tdiff.apply(&history(&["20"])).unwrap(),
            Value::Num(0.0)
        );
    }

    #[test]
    fn parse_validates_names_and_arguments() {
        assert_eq!(
            AggregateFn::parse("last", &["2".into()]).unwrap(),
            AggregateFn::Last(2)
        );
        assert_eq!(AggregateFn::parse("diff", &[]).unwrap(), AggregateFn::Diff);
        assert_eq!(
            AggregateFn::parse("median", &[]).unwrap_err(),
            AggregateError::UnknownFunction("median".into())
        );
        assert_eq!(
            AggregateFn::parse("avg", &[]).unwrap_err(),
            AggregateError::BadArity {
                function: "avg",
                expected: 1,
                got: 0
            }
        );
        assert_eq!(
            AggregateFn::parse("sum", &["1.5".into()]).unwrap_err(),
            AggregateError::BadArgument {
                function: "sum",
                arg: "1.5".into()
            }
        );
        assert_eq!(
            AggregateFn::parse("tdiff", &["1".into()]).unwrap_err(),
            AggregateError::BadArity {
                function: "tdiff",
                expected: 0,
                got: 1
            }
        );
    }
}
