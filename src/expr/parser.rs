// ABOUTME: Recursive-descent parser for interpolation literals and embedded expressions
// ABOUTME: Works directly on the source text so nested template literals need no separate lexer

use std::sync::Arc;

use super::ast::{BinaryOp, Expr, LogicalOp, Segment, UnaryOp};
use super::error::{EvalError, Result};
use super::value::Value;

/// Deepest nesting of sub-expressions, calls and template literals the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parse a whole template body. Backticks at the top level are plain text.
pub fn parse_template(source: &str) -> Result<Vec<Segment>> {
    let mut parser = Parser::new(source);
    let segments = parser.template_body(false)?;
    Ok(segments)
}

/// Parse a standalone expression, e.g. a helper module export.
pub fn parse_expression(source: &str) -> Result<Expr> {
    let mut parser = Parser::new(source);
    let expr = parser.expression()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `parse` one nesting level deeper, refusing input that would exhaust the stack.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Count one more operator or postfix wrapped around the current expression.
    fn deepen(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(EvalError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    /// `?.` starts an optional chain unless a digit follows, as in `c ?.5 : 1`.
    fn at_optional_chain(&mut self) -> bool {
        self.skip_ws();
        self.rest().starts_with("?.") && !self.peek_nth(2).is_some_and(|c| c.is_ascii_digit())
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::syntax(self.pos, message)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Consume `token` after optional whitespace.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Like `eat`, but refuses when the token is the prefix of a longer operator.
    fn eat_op(&mut self, token: &str, not_followed_by: &[char]) -> bool {
        self.skip_ws();
        if !self.rest().starts_with(token) {
            return false;
        }
        let next = self.rest()[token.len()..].chars().next();
        if next.is_some_and(|c| not_followed_by.contains(&c)) {
            return false;
        }
        self.pos += token.len();
        true
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn template_body(&mut self, nested: bool) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut text = String::new();

        loop {
            let Some(c) = self.peek() else {
                if nested {
                    return Err(self.error("unterminated template literal"));
                }
                break;
            };

            match c {
                '`' if nested => {
                    self.bump();
                    break;
                }
                '\\' => {
                    self.bump();
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated escape sequence"))?;
                    text.push(unescape(escaped));
                }
                '$' if self.peek_nth(1) == Some('{') => {
                    self.pos += 2;
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    let start = self.pos;
                    let expr = self.expression()?;
                    if !self.eat("}") {
                        return Err(EvalError::syntax(
                            start,
                            "unterminated '${' placeholder",
                        ));
                    }
                    segments.push(Segment::Expr(expr));
                }
                _ => {
                    self.bump();
                    text.push(c);
                }
            }
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(segments)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.nested(|parser| {
            if let Some(params) = parser.arrow_params() {
                let body = parser.expression()?;
                return Ok(Expr::Arrow {
                    params,
                    body: Arc::new(body),
                });
            }
            parser.conditional()
        })
    }

    /// Recognise `x =>` or `(a, b) =>`, rewinding when the input is something else.
    fn arrow_params(&mut self) -> Option<Vec<String>> {
        let start = self.pos;
        self.skip_ws();

        let params = if self.peek() == Some('(') {
            self.bump();
            let mut params = Vec::new();
            if !self.eat(")") {
                loop {
                    self.skip_ws();
                    match self.identifier() {
                        Some(name) => params.push(name),
                        None => {
                            self.pos = start;
                            return None;
                        }
                    }
                    if self.eat(")") {
                        break;
                    }
                    if !self.eat(",") {
                        self.pos = start;
                        return None;
                    }
                }
            }
            params
        } else {
            match self.identifier() {
                Some(name) => vec![name],
                None => {
                    self.pos = start;
                    return None;
                }
            }
        };

        if self.eat("=>") {
            Some(params)
        } else {
            self.pos = start;
            None
        }
    }

    fn conditional(&mut self) -> Result<Expr> {
        let test = self.logical_or()?;
        if !self.at_optional_chain() && self.eat_op("?", &['?']) {
            let consequent = self.expression()?;
            self.expect(":")?;
            let alternate = self.expression()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }
        Ok(test)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut left = self.logical_and()?;
        let base = self.depth;
        loop {
            let op = if self.eat("||") {
                LogicalOp::Or
            } else if self.eat("??") {
                LogicalOp::Nullish
            } else {
                break;
            };
            self.deepen()?;
            let right = self.logical_and()?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;
        let base = self.depth;
        while self.eat("&&") {
            self.deepen()?;
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = base;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut left = self.relational()?;
        let base = self.depth;
        loop {
            let op = if self.eat("===") || self.eat("==") {
                BinaryOp::Eq
            } else if self.eat("!==") || self.eat("!=") {
                BinaryOp::NotEq
            } else {
                break;
            };
            self.deepen()?;
            let right = self.relational()?;
            left = binary(op, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        let base = self.depth;
        loop {
            let op = if self.eat("<=") {
                BinaryOp::LtEq
            } else if self.eat(">=") {
                BinaryOp::GtEq
            } else if self.eat("<") {
                BinaryOp::Lt
            } else if self.eat(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            self.deepen()?;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        let base = self.depth;
        loop {
            let op = if self.eat("+") {
                BinaryOp::Add
            } else if self.eat("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.deepen()?;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        let base = self.depth;
        loop {
            let op = if self.eat("*") {
                BinaryOp::Mul
            } else if self.eat("/") {
                BinaryOp::Div
            } else if self.eat("%") {
                BinaryOp::Rem
            } else {
                break;
            };
            self.deepen()?;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
        self.depth = base;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = if self.eat_op("!", &['=']) {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else {
            return self.postfix();
        };
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        let base = self.depth;
        loop {
            if self.at_optional_chain() {
                self.pos += 2;
                if self.eat("[") {
                    expr = self.index(expr, true)?;
                } else {
                    expr = self.member(expr, true)?;
                }
            } else if self.eat(".") {
                expr = self.member(expr, false)?;
            } else if self.eat("[") {
                expr = self.index(expr, false)?;
            } else if self.eat("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
            self.deepen()?;
        }
        self.depth = base;
        Ok(expr)
    }

    fn member(&mut self, object: Expr, optional: bool) -> Result<Expr> {
        self.skip_ws();
        let property = self
            .identifier()
            .ok_or_else(|| self.error("expected property name"))?;
        Ok(Expr::Member {
            object: Box::new(object),
            property,
            optional,
        })
    }

    fn index(&mut self, object: Expr, optional: bool) -> Result<Expr> {
        let index = self.expression()?;
        self.expect("]")?;
        Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            optional,
        })
    }

    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(")") {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of expression"));
        };

        match c {
            '(' => {
                self.bump();
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            '[' => {
                self.bump();
                let mut items = Vec::new();
                if !self.eat("]") {
                    loop {
                        items.push(self.expression()?);
                        if self.eat("]") {
                            break;
                        }
                        self.expect(",")?;
                    }
                }
                Ok(Expr::Array(items))
            }
            '`' => {
                self.bump();
                Ok(Expr::Template(self.template_body(true)?))
            }
            '\'' | '"' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            '.' if self.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => self.number(),
            _ => {
                let name = self
                    .identifier()
                    .ok_or_else(|| self.error(format!("unexpected character '{}'", c)))?;
                Ok(match name.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    "undefined" => Expr::Literal(Value::Undefined),
                    _ => Expr::Ident(name),
                })
            }
        }
    }

    fn identifier(&mut self) -> Option<String> {
        let mut chars = self.rest().char_indices();
        let (_, first) = chars.next()?;
        if !(first.is_alphabetic() || first == '_' || first == '$') {
            return None;
        }
        let mut end = first.len_utf8();
        for (i, c) in chars {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let name = self.rest()[..end].to_string();
        self.pos += end;
        Some(name)
    }

    fn number(&mut self) -> Result<Expr> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.pos = mark;
            }
        }
        let literal = &self.src[start..self.pos];
        literal
            .parse::<f64>()
            .map(|n| Expr::Literal(Value::Number(n)))
            .map_err(|_| EvalError::syntax(start, format!("invalid number '{}'", literal)))
    }

    fn string(&mut self, quote: char) -> Result<Expr> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(EvalError::syntax(start, "unterminated string literal")),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| EvalError::syntax(start, "unterminated string literal"))?;
                    value.push(unescape(escaped));
                }
                Some(c) => value.push(c),
            }
        }
        Ok(Expr::Literal(Value::String(value)))
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
