//! Recursive-descent formula parser
//!
//! Precedence, lowest to highest binding: `||`/`&&`, comparisons, `+`/`-`,
//! `*`/`/`/`//`/`%`, `**`, unary `-`, atoms. Every binary level is
//! left-associative, `**` included. Unary minus binds tighter than `**`,
//! so `-2**2` is `(-2)**2`.

use crate::ast::{BinOp, Expr};
use crate::error::{ParseError, ParseResult};
use crate::token::{tokenize, Token};

/// The formula parser.
///
/// Holds no state between parses; it exists as a value so the components
/// that parse formulas receive one explicitly at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprParser;

impl ExprParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse formula text into an AST.
    pub fn parse(&self, input: &str) -> ParseResult<Expr> {
        let mut cursor = Cursor {
            tokens: tokenize(input)?,
            pos: 0,
        };
        let expr = cursor.expression()?;
        cursor.expect_end()?;
        Ok(expr)
    }
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::TrailingInput {
                found: token.to_string(),
            }),
        }
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.logical()
    }

    fn logical(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.equality()?;
        loop {
            let op = match self.peek() {
                Some(Token::OrOr) => BinOp::Or,
                Some(Token::AndAnd) => BinOp::And,
                _ => break,
            };
            self.advance();
            let rhs = self.equality()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                Some(Token::LtEq) => BinOp::Le,
                Some(Token::GtEq) => BinOp::Ge,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Gt) => BinOp::Gt,
                _ => break,
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.power()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn power(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(Token::StarStar)) {
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::binary(BinOp::Pow, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.atom()
    }

    fn atom(&mut self) -> ParseResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::SensorRef(id)) => Ok(Expr::Sensor(id)),
            Some(Token::TriggerRef(id)) => Ok(Expr::Trigger(id)),
            Some(Token::MacroRef(id)) => Ok(Expr::Macro(id)),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(token) => Err(ParseError::UnexpectedToken {
                        found: token.to_string(),
                    }),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.to_string(),
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domos_core::EdgeId;

    fn parse(input: &str) -> Expr {
        ExprParser::new().parse(input).unwrap()
    }

    #[test]
    fn power_binds_tighter_than_multiplication() {
        // 2**4*3 is (2**4)*3
        let expr = parse("2**4*3");
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::Mul,
                Expr::binary(BinOp::Pow, Expr::Number(2.0), Expr::Number(4.0)),
                Expr::Number(3.0),
            )
        );
    }

    #[test]
    fn power_is_left_associative() {
        // 2**3**2 is (2**3)**2
        let expr = parse("2**3**2");
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::Pow,
                Expr::binary(BinOp::Pow, Expr::Number(2.0), Expr::Number(3.0)),
                Expr::Number(2.0),
            )
        );
    }

    #[test]
    fn comparison_sits_between_logic_and_arithmetic() {
        // 1 + 1 == 2 && 1 parses as ((1+1) == 2) && 1
        let expr = parse("1 + 1 == 2 && 1");
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::And,
                Expr::binary(
                    BinOp::Eq,
                    Expr::binary(BinOp::Add, Expr::Number(1.0), Expr::Number(1.0)),
                    Expr::Number(2.0),
                ),
                Expr::Number(1.0),
            )
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse("2*(3+5)");
        assert_eq!(
            expr,
            Expr::binary(
                BinOp::Mul,
                Expr::Number(2.0),
                Expr::binary(BinOp::Add, Expr::Number(3.0), Expr::Number(5.0)),
            )
        );
    }

    #[test]
    fn unary_minus_nests_and_binds_tighter_than_power() {
        assert_eq!(
            parse("--3"),
            Expr::Neg(Box::new(Expr::Neg(Box::new(Expr::Number(3.0)))))
        );
        assert_eq!(
            parse("-2**2"),
            Expr::binary(
                BinOp::Pow,
                Expr::Neg(Box::new(Expr::Number(2.0))),
                Expr::Number(2.0),
            )
        );
    }

    #[test]
    fn reference_atoms_parse_to_their_edge() {
        assert_eq!(parse("__sens3532__"), Expr::Sensor(EdgeId::new(3532)));
        assert_eq!(parse("__trig23__"), Expr::Trigger(EdgeId::new(23)));
        assert_eq!(parse("__macr4__"), Expr::Macro(4));
    }

    #[test]
    fn dangling_operator_is_an_error() {
        assert_eq!(
            ExprParser::new().parse("2 +"),
            Err(ParseError::UnexpectedEnd)
        );
    }

    #[test]
    fn unbalanced_parenthesis_is_an_error() {
        assert_eq!(
            ExprParser::new().parse("(2 + 3"),
            Err(ParseError::UnexpectedEnd)
        );
        assert!(matches!(
            ExprParser::new().parse("2 + 3)"),
            Err(ParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn adjacent_atoms_are_rejected() {
        assert!(matches!(
            ExprParser::new().parse("2 3"),
            Err(ParseError::TrailingInput { .. })
        ));
    }

    #[test]
    fn empty_formula_is_an_error() {
        assert_eq!(
            ExprParser::new().parse(""),
            Err(ParseError::UnexpectedEnd)
        );
        assert_eq!(
            ExprParser::new().parse("   "),
            Err(ParseError::UnexpectedEnd)
        );
    }
}
