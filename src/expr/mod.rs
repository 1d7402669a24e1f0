// ABOUTME: Restricted interpolation-expression language used by template bodies
// ABOUTME: Parses `${...}` spans into a syntax tree and evaluates them against a context

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod value;

use indexmap::IndexMap;

pub use error::{EvalError, Result};
pub use eval::{Evaluator, MAX_CALL_DEPTH};
pub use parser::{parse_expression, parse_template, MAX_NESTING_DEPTH};
pub use value::{Function, NativeFn, Value};

use ast::Segment;

/// A template body parsed once and ready to be evaluated against any context.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    pub fn compile(source: &str) -> Result<Self> {
        Ok(Self {
            segments: parse_template(source)?,
        })
    }

    pub fn render(&self, context: &IndexMap<String, Value>) -> Result<String> {
        Evaluator::new(context).render(&self.segments)
    }

    /// Number of `${...}` spans in the body.
    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Expr(_)))
            .count()
    }
}

/// Evaluate a standalone expression with no bindings in scope.
pub fn evaluate_constant(source: &str) -> Result<Value> {
    let expr = parse_expression(source)?;
    Evaluator::new(&IndexMap::new()).eval(&expr)
}
