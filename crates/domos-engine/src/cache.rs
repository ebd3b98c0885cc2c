//! Parse-once cache for stored expressions

use std::collections::HashMap;
use std::sync::Arc;

use domos_core::ExpressionId;
use domos_expr::{Expr, ExprParser};
use domos_store::Store;

use crate::error::EngineResult;

/// Caches the parsed form of stored expressions.
///
/// Expressions are immutable after their defining transaction commits, so
/// entries never invalidate. Each worker owns its own cache.
pub struct ExprCache {
    parser: ExprParser,
    entries: HashMap<ExpressionId, Arc<Expr>>,
}

impl ExprCache {
    pub fn new(parser: ExprParser) -> Self {
        Self {
            parser,
            entries: HashMap::new(),
        }
    }

    /// The parsed form of a stored expression, parsing on first use.
    pub fn get(&mut self, store: &Store, id: ExpressionId) -> EngineResult<Arc<Expr>> {
        if let Some(expr) = self.entries.get(&id) {
            return Ok(expr.clone());
        }
        let text = store.expression_text(id)?;
        let expr = Arc::new(self.parser.parse(&text)?);
        self.entries.insert(id, expr.clone());
        Ok(expr)
    }
}

impl Default for ExprCache {
    fn default() -> Self {
        Self::new(ExprParser::new())
    }
}
