//! Expression engine for rule guards
//!
//! Expressions are plain data (serde-deserializable, typically from RON) and
//! are evaluated against the current working memory.

use crate::{Error, FunctionTable, Result, Value, ValueMap};
use serde::{Deserialize, Serialize};

/// An expression that can be evaluated to produce a Value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // === Literals ===
    /// A literal value
    Literal(Value),

    // === Fact Access ===
    /// Read a fact from working memory (`Null` if absent)
    Fact(String),
    /// Check whether a fact is present
    IsSet(String),

    // === Arithmetic ===
    /// Add two expressions
    Add(Box<Expr>, Box<Expr>),
    /// Subtract second from first
    Sub(Box<Expr>, Box<Expr>),
    /// Multiply two expressions
    Mul(Box<Expr>, Box<Expr>),
    /// Divide first by second
    Div(Box<Expr>, Box<Expr>),
    /// Modulo
    Mod(Box<Expr>, Box<Expr>),
    /// Negate a numeric value
    Neg(Box<Expr>),
    /// Absolute value
    Abs(Box<Expr>),
    /// Minimum of two values
    Min(Box<Expr>, Box<Expr>),
    /// Maximum of two values
    Max(Box<Expr>, Box<Expr>),
    /// Clamp value between min and max
    Clamp(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Floor (round down)
    Floor(Box<Expr>),
    /// Ceiling (round up)
    Ceil(Box<Expr>),
    /// Round to nearest integer
    Round(Box<Expr>),

    // === Comparison ===
    /// Equal
    Eq(Box<Expr>, Box<Expr>),
    /// Not equal
    Ne(Box<Expr>, Box<Expr>),
    /// Less than
    Lt(Box<Expr>, Box<Expr>),
    /// Less than or equal
    Le(Box<Expr>, Box<Expr>),
    /// Greater than
    Gt(Box<Expr>, Box<Expr>),
    /// Greater than or equal
    Ge(Box<Expr>, Box<Expr>),

    // === Logical ===
    /// Logical AND (all must be true)
    And(Vec<Expr>),
    /// Logical OR (at least one must be true)
    Or(Vec<Expr>),
    /// Logical NOT
    Not(Box<Expr>),

    // === Conditionals ===
    /// If-then-else
    If(Box<Expr>, Box<Expr>, Box<Expr>),

    // === Helpers ===
    /// Call a helper from the injected function table
    Call(String, Vec<Expr>),

    // === String ===
    /// Concatenate strings
    Concat(Vec<Expr>),
    /// Format a string with values (`{0}`, `{1}`, ...)
    Format(String, Vec<Expr>),
}

/// Context for evaluating expressions
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Working memory facts
    pub facts: &'a ValueMap,
    /// Helper functions, if the rule has been initialized with a table
    pub functions: Option<&'a FunctionTable>,
}

impl<'a> EvalContext<'a> {
    /// Create a new evaluation context
    pub fn new(facts: &'a ValueMap) -> Self {
        Self {
            facts,
            functions: None,
        }
    }

    /// Make a helper function table available to `Call`
    pub fn with_functions(mut self, functions: &'a FunctionTable) -> Self {
        self.functions = Some(functions);
        self
    }
}

impl Expr {
    /// Evaluate this expression in the given context
    pub fn eval(&self, ctx: &EvalContext) -> Result<Value> {
        match self {
            // Literals
            Expr::Literal(v) => Ok(v.clone()),

            // Fact access
            Expr::Fact(name) => Ok(ctx.facts.get(name).cloned().unwrap_or(Value::Null)),
            Expr::IsSet(name) => Ok(Value::Bool(ctx.facts.contains_key(name))),

            // Arithmetic
            Expr::Add(a, b) => numeric_op(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x + y),
            Expr::Sub(a, b) => numeric_op(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x - y),
            Expr::Mul(a, b) => numeric_op(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x * y),
            Expr::Div(a, b) => {
                let va = a.eval(ctx)?;
                let vb = b.eval(ctx)?;
                if vb.expect_number()? == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                numeric_op(&va, &vb, |x, y| x / y)
            }
            Expr::Mod(a, b) => {
                let va = a.eval(ctx)?;
                let vb = b.eval(ctx)?;
                if vb.expect_number()? == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                numeric_op(&va, &vb, |x, y| x % y)
            }
            Expr::Neg(a) => Ok(Value::Float(-a.eval(ctx)?.expect_number()?)),
            Expr::Abs(a) => Ok(Value::Float(a.eval(ctx)?.expect_number()?.abs())),
            Expr::Min(a, b) => numeric_op(&a.eval(ctx)?, &b.eval(ctx)?, f64::min),
            Expr::Max(a, b) => numeric_op(&a.eval(ctx)?, &b.eval(ctx)?, f64::max),
            Expr::Clamp(val, min, max) => {
                let fv = val.eval(ctx)?.expect_number()?;
                let fmin = min.eval(ctx)?.expect_number()?;
                let fmax = max.eval(ctx)?.expect_number()?;
                if fmin > fmax {
                    return Err(Error::InvalidOperation(format!(
                        "clamp bounds out of order: {} > {}",
                        fmin, fmax
                    )));
                }
                Ok(Value::Float(fv.clamp(fmin, fmax)))
            }
            Expr::Floor(a) => Ok(Value::Int(a.eval(ctx)?.expect_number()?.floor() as i64)),
            Expr::Ceil(a) => Ok(Value::Int(a.eval(ctx)?.expect_number()?.ceil() as i64)),
            Expr::Round(a) => Ok(Value::Int(a.eval(ctx)?.expect_number()?.round() as i64)),

            // Comparison
            Expr::Eq(a, b) => Ok(Value::Bool(values_equal(&a.eval(ctx)?, &b.eval(ctx)?))),
            Expr::Ne(a, b) => Ok(Value::Bool(!values_equal(&a.eval(ctx)?, &b.eval(ctx)?))),
            Expr::Lt(a, b) => compare_values(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x < y),
            Expr::Le(a, b) => compare_values(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x <= y),
            Expr::Gt(a, b) => compare_values(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x > y),
            Expr::Ge(a, b) => compare_values(&a.eval(ctx)?, &b.eval(ctx)?, |x, y| x >= y),

            // Logical
            Expr::And(exprs) => {
                for expr in exprs {
                    if !expr.eval(ctx)?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expr::Or(exprs) => {
                for expr in exprs {
                    if expr.eval(ctx)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expr::Not(a) => Ok(Value::Bool(!a.eval(ctx)?.is_truthy())),

            // Conditionals
            Expr::If(cond, then_expr, else_expr) => {
                if cond.eval(ctx)?.is_truthy() {
                    then_expr.eval(ctx)
                } else {
                    else_expr.eval(ctx)
                }
            }

            // Helpers
            Expr::Call(name, args) => {
                let functions = ctx.functions.ok_or_else(|| {
                    Error::EvaluationError(format!(
                        "no function table available to call '{}'",
                        name
                    ))
                })?;
                let args = args
                    .iter()
                    .map(|arg| arg.eval(ctx))
                    .collect::<Result<Vec<_>>>()?;
                functions.call(name, &args)
            }

            // String
            Expr::Concat(exprs) => {
                let mut result = String::new();
                for expr in exprs {
                    match expr.eval(ctx)? {
                        Value::String(s) => result.push_str(&s),
                        other => result.push_str(&other.to_string()),
                    }
                }
                Ok(Value::String(result))
            }
            Expr::Format(template, args) => {
                let mut result = template.clone();
                for (i, expr) in args.iter().enumerate() {
                    let rendered = match expr.eval(ctx)? {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    result = result.replace(&format!("{{{}}}", i), &rendered);
                }
                Ok(Value::String(result))
            }
        }
    }

    /// Evaluate this expression as a guard, using its truthiness
    pub fn test(&self, ctx: &EvalContext) -> Result<bool> {
        Ok(self.eval(ctx)?.is_truthy())
    }

    /// Create a literal expression
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a fact access expression
    pub fn fact(name: impl Into<String>) -> Self {
        Expr::Fact(name.into())
    }

    /// Create a helper call expression
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(name.into(), args)
    }

    /// `self == other`
    pub fn equals(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    /// `self > other`
    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    /// `self >= other`
    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    /// `self < other`
    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    /// `!self`
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Helper to perform numeric operations
///
/// Two integers stay integral for `+ - *` and exact `%`; anything else is a float.
fn numeric_op(a: &Value, b: &Value, op: fn(f64, f64) -> f64) -> Result<Value> {
    let fa = a.expect_number()?;
    let fb = b.expect_number()?;
    let result = op(fa, fb);
    match (a, b) {
        (Value::Int(_), Value::Int(_)) if result.fract() == 0.0 && result.is_finite() => {
            Ok(Value::Int(result as i64))
        }
        _ => Ok(Value::Float(result)),
    }
}

/// Helper to compare values
fn compare_values(a: &Value, b: &Value, cmp: fn(f64, f64) -> bool) -> Result<Value> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        return Ok(Value::Bool(cmp_strings(x, y, cmp)));
    }
    Ok(Value::Bool(cmp(a.expect_number()?, b.expect_number()?)))
}

fn cmp_strings(x: &str, y: &str, cmp: fn(f64, f64) -> bool) -> bool {
    let ord = x.cmp(y) as i8;
    cmp(ord as f64, 0.0)
}

/// Check if two values are equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => (x - y).abs() < f64::EPSILON,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            (*x as f64 - y).abs() < f64::EPSILON
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> ValueMap {
        let mut facts = ValueMap::new();
        facts.insert("age".to_string(), Value::Int(34));
        facts.insert("name".to_string(), Value::from("ada"));
        facts.insert("balance".to_string(), Value::Float(120.5));
        facts
    }

    #[test]
    fn test_literal() {
        let facts = ValueMap::new();
        let ctx = EvalContext::new(&facts);

        assert_eq!(Expr::lit(42i64).eval(&ctx).unwrap(), Value::Int(42));
        assert_eq!(Expr::lit(3.14).eval(&ctx).unwrap(), Value::Float(3.14));
    }

    #[test]
    fn test_fact_access() {
        let facts = facts();
        let ctx = EvalContext::new(&facts);

        assert_eq!(Expr::fact("age").eval(&ctx).unwrap(), Value::Int(34));
        assert_eq!(Expr::fact("missing").eval(&ctx).unwrap(), Value::Null);
        assert_eq!(Expr::IsSet("name".into()).eval(&ctx).unwrap(), Value::Bool(true));
        assert_eq!(Expr::IsSet("missing".into()).eval(&ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_arithmetic() {
        let facts = facts();
        let ctx = EvalContext::new(&facts);

        let expr = Expr::Add(Box::new(Expr::fact("age")), Box::new(Expr::lit(1i64)));
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Int(35));

        let expr = Expr::Mul(Box::new(Expr::lit(3.0)), Box::new(Expr::lit(4.0)));
        assert_eq!(expr.eval(&ctx).unwrap().as_float(), Some(12.0));

        let expr = Expr::Div(Box::new(Expr::lit(1i64)), Box::new(Expr::lit(0i64)));
        assert!(matches!(expr.eval(&ctx), Err(Error::DivisionByZero)));

        let expr = Expr::Add(Box::new(Expr::fact("name")), Box::new(Expr::lit(1i64)));
        assert!(matches!(expr.eval(&ctx), Err(Error::TypeError { .. })));
    }

    #[test]
    fn test_comparison() {
        let facts = facts();
        let ctx = EvalContext::new(&facts);

        assert!(Expr::fact("age").ge(Expr::lit(18i64)).test(&ctx).unwrap());
        assert!(!Expr::fact("balance").lt(Expr::lit(100i64)).test(&ctx).unwrap());
        assert!(Expr::fact("name").equals(Expr::lit("ada")).test(&ctx).unwrap());
        assert!(Expr::lit(2i64).equals(Expr::lit(2.0)).test(&ctx).unwrap());
        assert!(Expr::lit("abc").lt(Expr::lit("abd")).test(&ctx).unwrap());
    }

    #[test]
    fn test_logical() {
        let facts = ValueMap::new();
        let ctx = EvalContext::new(&facts);

        let expr = Expr::And(vec![Expr::lit(true), Expr::lit(true)]);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Bool(true));

        let expr = Expr::And(vec![Expr::lit(true), Expr::lit(false)]);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Bool(false));

        let expr = Expr::Or(vec![Expr::lit(false), Expr::lit(true)]);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Bool(true));

        // Short-circuit: the failing division is never evaluated
        let boom = Expr::Div(Box::new(Expr::lit(1i64)), Box::new(Expr::lit(0i64)));
        let expr = Expr::And(vec![Expr::lit(false), boom]);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_call_requires_table() {
        let facts = facts();
        let table = FunctionTable::with_builtins();

        let expr = Expr::call("len", vec![Expr::fact("name")]);
        assert!(matches!(
            expr.eval(&EvalContext::new(&facts)),
            Err(Error::EvaluationError(_))
        ));

        let ctx = EvalContext::new(&facts).with_functions(&table);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_format() {
        let facts = facts();
        let ctx = EvalContext::new(&facts);

        let expr = Expr::Format(
            "{0} is {1}".to_string(),
            vec![Expr::fact("name"), Expr::fact("age")],
        );
        assert_eq!(expr.eval(&ctx).unwrap(), Value::from("ada is 34"));

        let expr = Expr::Concat(vec![Expr::lit("n="), Expr::lit(2i64)]);
        assert_eq!(expr.eval(&ctx).unwrap(), Value::from("n=2"));
    }
}
