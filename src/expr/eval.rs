// ABOUTME: Tree-walking evaluator for parsed interpolation expressions
// ABOUTME: Resolves identifiers through closure frames, then the render context

use indexmap::IndexMap;
use std::cell::Cell;
use std::sync::Arc;

use super::ast::{BinaryOp, Expr, LogicalOp, Segment, UnaryOp};
use super::error::{EvalError, Result};
use super::value::{Closure, Function, Value};

/// Nested calls deeper than this abort the render instead of overflowing the stack.
pub const MAX_CALL_DEPTH: usize = 128;

/// Local bindings introduced by arrow-function calls.
pub(crate) type Scope = Option<Arc<Frame>>;

pub(crate) struct Frame {
    vars: IndexMap<String, Value>,
    parent: Scope,
}

pub struct Evaluator<'a> {
    globals: &'a IndexMap<String, Value>,
    depth: Cell<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(globals: &'a IndexMap<String, Value>) -> Self {
        Self {
            globals,
            depth: Cell::new(0),
        }
    }

    /// Evaluate template segments and concatenate their string forms.
    pub fn render(&self, segments: &[Segment]) -> Result<String> {
        self.render_in(segments, &None)
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        self.eval_in(expr, &None)
    }

    /// Invoke a callable value with already-evaluated arguments.
    pub fn call(&self, func: &Function, args: &[Value]) -> Result<Value> {
        let depth = self.depth.get() + 1;
        if depth > MAX_CALL_DEPTH {
            return Err(EvalError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        self.depth.set(depth);
        let result = match func {
            Function::Native { func, .. } => func(args),
            Function::Closure(closure) => {
                let vars = closure
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or_default()))
                    .collect();
                let scope = Some(Arc::new(Frame {
                    vars,
                    parent: closure.scope.clone(),
                }));
                self.eval_in(&closure.body, &scope)
            }
        };
        self.depth.set(depth - 1);
        result
    }

    fn render_in(&self, segments: &[Segment], scope: &Scope) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(expr) => out.push_str(&self.eval_in(expr, scope)?.to_string()),
            }
        }
        Ok(out)
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<Value> {
        let mut frame = scope.as_deref();
        while let Some(current) = frame {
            if let Some(value) = current.vars.get(name) {
                return Ok(value.clone());
            }
            frame = current.parent.as_deref();
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    fn eval_in(&self, expr: &Expr, scope: &Scope) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Template(segments) => self.render_in(segments, scope).map(Value::String),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.eval_in(item, scope))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval_in(object, scope)?;
                if target.is_nullish() {
                    return nullish_access(&target, property, *optional);
                }
                Ok(get_property(&target, property))
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let target = self.eval_in(object, scope)?;
                let key = self.eval_in(index, scope)?;
                if target.is_nullish() {
                    return nullish_access(&target, &key.to_string(), *optional);
                }
                Ok(get_index(&target, &key))
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, scope),
            Expr::Unary { op, operand } => {
                let value = self.eval_in(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_in(left, scope)?;
                let right = self.eval_in(right, scope)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval_in(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval_in(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_in(test, scope)?.is_truthy() {
                    self.eval_in(consequent, scope)
                } else {
                    self.eval_in(alternate, scope)
                }
            }
            Expr::Arrow { params, body } => Ok(Value::Function(Function::Closure(Arc::new(
                Closure {
                    params: params.clone(),
                    body: Arc::clone(body),
                    scope: scope.clone(),
                },
            )))),
        }
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Scope) -> Result<Value> {
        let eval_args = || {
            args.iter()
                .map(|arg| self.eval_in(arg, scope))
                .collect::<Result<Vec<_>>>()
        };

        if let Expr::Member {
            object,
            property,
            optional,
        } = callee
        {
            let target = self.eval_in(object, scope)?;
            if target.is_nullish() {
                if *optional {
                    return Ok(Value::Undefined);
                }
                return nullish_access(&target, property, false);
            }
            return self.call_method(&target, property, &eval_args()?, callee);
        }

        let func = self.eval_in(callee, scope)?;
        let args = eval_args()?;
        match func {
            Value::Function(func) => self.call(&func, &args),
            _ => Err(EvalError::NotCallable(callee.describe())),
        }
    }

    fn call_method(
        &self,
        target: &Value,
        method: &str,
        args: &[Value],
        callee: &Expr,
    ) -> Result<Value> {
        if let Value::Function(func) = get_property(target, method) {
            return self.call(&func, args);
        }

        let arg_str = |i: usize| args.get(i).map(Value::to_string).unwrap_or_default();

        match (target, method) {
            (Value::Array(items), "map") => {
                let func = callback(args, callee)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.call(func, &[item.clone(), Value::from(i as i64)]))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            (Value::Array(items), "filter") => {
                let func = callback(args, callee)?;
                let mut kept = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if self
                        .call(func, &[item.clone(), Value::from(i as i64)])?
                        .is_truthy()
                    {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::Array(kept))
            }
            (Value::Array(items), "join") => {
                let separator = match args.first() {
                    None | Some(Value::Undefined) => ",".to_string(),
                    Some(sep) => sep.to_string(),
                };
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() {
                            String::new()
                        } else {
                            item.to_string()
                        }
                    })
                    .collect();
                Ok(Value::String(parts.join(&separator)))
            }
            (Value::Array(items), "includes") => {
                let needle = args.first().cloned().unwrap_or_default();
                Ok(Value::Bool(items.iter().any(|item| item.strict_equals(&needle))))
            }
            (Value::String(s), "toUpperCase") => Ok(Value::String(s.to_uppercase())),
            (Value::String(s), "toLowerCase") => Ok(Value::String(s.to_lowercase())),
            (Value::String(s), "trim") => Ok(Value::String(s.trim().to_string())),
            (Value::String(s), "includes") => Ok(Value::Bool(s.contains(&arg_str(0)))),
            (Value::String(s), "startsWith") => Ok(Value::Bool(s.starts_with(&arg_str(0)))),
            (Value::String(s), "endsWith") => Ok(Value::Bool(s.ends_with(&arg_str(0)))),
            (Value::String(s), "replace") => {
                Ok(Value::String(s.replacen(&arg_str(0), &arg_str(1), 1)))
            }
            (Value::String(s), "split") => {
                let parts = match args.first() {
                    None | Some(Value::Undefined) => vec![Value::String(s.clone())],
                    Some(sep) => {
                        let sep = sep.to_string();
                        if sep.is_empty() {
                            s.chars().map(|c| Value::String(c.to_string())).collect()
                        } else {
                            s.split(sep.as_str()).map(Value::from).collect()
                        }
                    }
                };
                Ok(Value::Array(parts))
            }
            _ => Err(EvalError::NotCallable(callee.describe())),
        }
    }
}

fn callback<'v>(args: &'v [Value], callee: &Expr) -> Result<&'v Function> {
    match args.first() {
        Some(Value::Function(func)) => Ok(func),
        Some(other) => Err(EvalError::Type(format!(
            "{} expects a function, got {}",
            callee.describe(),
            other.type_name()
        ))),
        None => Err(EvalError::Type(format!(
            "{} expects a function",
            callee.describe()
        ))),
    }
}

fn nullish_access(target: &Value, property: &str, optional: bool) -> Result<Value> {
    if optional {
        Ok(Value::Undefined)
    } else {
        Err(EvalError::Type(format!(
            "cannot read property '{}' of {}",
            property, target
        )))
    }
}

fn get_property(target: &Value, property: &str) -> Value {
    match (target, property) {
        (Value::Object(map), _) => map.get(property).cloned().unwrap_or_default(),
        (Value::Array(items), "length") => Value::from(items.len() as i64),
        (Value::String(s), "length") => Value::from(s.chars().count() as i64),
        _ => Value::Undefined,
    }
}

fn get_index(target: &Value, key: &Value) -> Value {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
            items.get(*n as usize).cloned().unwrap_or_default()
        }
        (Value::String(s), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => s
            .chars()
            .nth(*n as usize)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => get_property(target, &key.to_string()),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concat = |v: &Value| {
                matches!(
                    v,
                    Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
                )
            };
            if concat(left) || concat(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_equals(left, right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::LtEq => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            });
            Value::Bool(result)
        }
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    (left.is_nullish() && right.is_nullish()) || left.strict_equals(right)
}
