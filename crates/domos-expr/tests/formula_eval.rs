//! End-to-end formula tests: text in, evaluated value out.

use domos_core::{EdgeId, Value};
use domos_expr::{evaluate, evaluate_numeric, Bindings, EvalError, ExprParser, ParseError};

fn bindings() -> Bindings {
    Bindings::new()
        .with_sensor(EdgeId::new(3532), 3.0)
        .with_trigger(EdgeId::new(23), 2.0)
}

#[test]
fn trigger_contract_renders_canonical_numeric_text() {
    let parser = ExprParser::new();
    let b = bindings();

    for (formula, expected) in [
        ("2**4*3+5", "53.0"),
        ("2*(3+5)", "16.0"),
        ("13//4", "3.0"),
        ("5 >= 5", "1.0"),
        ("True && False", "0.0"),
        ("2 && 6", "1.0"),
        ("2 || False", "1.0"),
        ("3 == 5", "0.0"),
        ("__sens3532__", "3.0"),
        ("__trig23__", "2.0"),
        ("\"test\" == \"test\"", "1.0"),
        ("\"5\" == 5", "0.0"),
    ] {
        let expr = parser.parse(formula).unwrap();
        assert_eq!(
            evaluate_numeric(&expr, &b).unwrap(),
            expected,
            "formula: {formula}"
        );
    }
}

#[test]
fn argument_contract_keeps_native_types() {
    let parser = ExprParser::new();
    let b = Bindings::new().with_sensor(EdgeId::new(7), "heating");

    let expr = parser.parse("10").unwrap();
    assert_eq!(evaluate(&expr, &b).unwrap(), Value::Num(10.0));

    let expr = parser.parse("__sens7__").unwrap();
    assert_eq!(
        evaluate(&expr, &b).unwrap(),
        Value::Str("heating".to_string())
    );

    let expr = parser.parse("\"mode \" + __sens7__").unwrap();
    assert_eq!(
        evaluate(&expr, &b).unwrap(),
        Value::Str("mode heating".to_string())
    );
}

#[test]
fn malformed_formulas_fail_before_evaluation() {
    let parser = ExprParser::new();

    assert!(matches!(
        parser.parse("1.2.3 + 1"),
        Err(ParseError::InvalidNumber { .. })
    ));
    assert!(matches!(
        parser.parse("__sens__ + 1"),
        Err(ParseError::MalformedReference { .. })
    ));
    assert!(matches!(
        parser.parse("2 ++"),
        Err(ParseError::UnexpectedToken { .. })
    ));
    assert!(matches!(parser.parse("2 +"), Err(ParseError::UnexpectedEnd)));
}

#[test]
fn evaluation_errors_carry_readable_messages() {
    let parser = ExprParser::new();
    let b = Bindings::new();

    let expr = parser.parse("\"on\" * 2").unwrap();
    let err = evaluate(&expr, &b).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unsupported operand types for *: string and number"
    );

    let expr = parser.parse("__macr1__").unwrap();
    assert_eq!(
        evaluate(&expr, &b).unwrap_err(),
        EvalError::MacroUnsupported { id: 1 }
    );
}

#[test]
fn live_style_bindings_shadow_nothing_else() {
    // The same sensor wired through two different edges gets two independent
    // bindings; resolving one must not leak into the other.
    let parser = ExprParser::new();
    let b = Bindings::new()
        .with_sensor(EdgeId::new(1), 20.0)
        .with_sensor(EdgeId::new(2), 24.0);

    let expr = parser.parse("__sens2__ - __sens1__").unwrap();
    assert_eq!(evaluate_numeric(&expr, &b).unwrap(), "4.0");
}
