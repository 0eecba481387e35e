//! Effect types for modifying working memory
//!
//! Effects are the "write" side of the expression engine. Every write goes
//! through [`DataContext`]'s mutators, so a rule built from effects always
//! reports its changes to the engine.

use crate::{DataContext, Error, EvalContext, Expr, FunctionTable, Result, Value};
use serde::{Deserialize, Serialize};

/// An operation to modify a numeric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModifyOp {
    /// Set to the value
    Set,
    /// Add the value
    Add,
    /// Subtract the value
    Sub,
    /// Multiply by the value
    Mul,
    /// Divide by the value
    Div,
    /// Set to minimum of current and value
    Min,
    /// Set to maximum of current and value
    Max,
}

impl ModifyOp {
    /// Apply this operation to a current value
    pub fn apply(&self, current: f64, operand: f64) -> f64 {
        match self {
            ModifyOp::Set => operand,
            ModifyOp::Add => current + operand,
            ModifyOp::Sub => current - operand,
            ModifyOp::Mul => current * operand,
            ModifyOp::Div => {
                if operand != 0.0 {
                    current / operand
                } else {
                    current
                }
            }
            ModifyOp::Min => current.min(operand),
            ModifyOp::Max => current.max(operand),
        }
    }
}

/// An effect that modifies working memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    // === Fact Modification ===
    /// Set a fact
    Set { fact: String, value: Expr },
    /// Modify a numeric fact
    Modify {
        fact: String,
        op: ModifyOp,
        value: Expr,
    },
    /// Retract a fact
    Remove(String),

    // === Control Flow ===
    /// Execute effects conditionally
    If {
        condition: Expr,
        then_effects: Vec<Effect>,
        else_effects: Vec<Effect>,
    },
    /// Execute multiple effects
    Sequence(Vec<Effect>),

    // === Helpers ===
    /// Call a helper for its side effects, discarding the result
    Call(String, Vec<Expr>),

    // === Output ===
    /// Log a message
    Log { level: LogLevel, message: Expr },
}

/// Log level for rule output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Effect {
    /// Create a set effect
    pub fn set(fact: impl Into<String>, value: Expr) -> Self {
        Effect::Set {
            fact: fact.into(),
            value,
        }
    }

    /// Create an add effect (adds to a numeric fact)
    pub fn add(fact: impl Into<String>, value: Expr) -> Self {
        Effect::Modify {
            fact: fact.into(),
            op: ModifyOp::Add,
            value,
        }
    }

    /// Create a multiply effect
    pub fn multiply(fact: impl Into<String>, value: Expr) -> Self {
        Effect::Modify {
            fact: fact.into(),
            op: ModifyOp::Mul,
            value,
        }
    }

    /// Create a retract effect
    pub fn remove(fact: impl Into<String>) -> Self {
        Effect::Remove(fact.into())
    }

    /// Create a sequence of effects
    pub fn seq(effects: Vec<Effect>) -> Self {
        Effect::Sequence(effects)
    }

    /// Create a conditional effect
    pub fn when(condition: Expr, then_effects: Vec<Effect>) -> Self {
        Effect::If {
            condition,
            then_effects,
            else_effects: Vec::new(),
        }
    }

    /// Create an info log effect
    pub fn log(message: Expr) -> Self {
        Effect::Log {
            level: LogLevel::Info,
            message,
        }
    }

    /// Apply this effect to working memory
    ///
    /// Child effects run in order and each one sees the writes of the ones
    /// before it.
    pub fn apply(&self, ctx: &mut DataContext, functions: Option<&FunctionTable>) -> Result<()> {
        match self {
            Effect::Set { fact, value } => {
                let v = eval(value, ctx, functions)?;
                ctx.set(fact.as_str(), v);
            }
            Effect::Modify { fact, op, value } => {
                let operand = eval(value, ctx, functions)?.expect_number()?;
                ctx.modify(fact.as_str(), op, operand)?;
            }
            Effect::Remove(fact) => {
                ctx.remove(fact);
            }
            Effect::If {
                condition,
                then_effects,
                else_effects,
            } => {
                let branch = if eval(condition, ctx, functions)?.is_truthy() {
                    then_effects
                } else {
                    else_effects
                };
                for effect in branch {
                    effect.apply(ctx, functions)?;
                }
            }
            Effect::Sequence(effects) => {
                for effect in effects {
                    effect.apply(ctx, functions)?;
                }
            }
            Effect::Call(name, args) => {
                let functions = functions.ok_or_else(|| {
                    Error::EvaluationError(format!(
                        "no function table available to call '{}'",
                        name
                    ))
                })?;
                let args = args
                    .iter()
                    .map(|arg| eval(arg, ctx, Some(functions)))
                    .collect::<Result<Vec<_>>>()?;
                functions.call(name, &args)?;
            }
            Effect::Log { level, message } => {
                let message = match eval(message, ctx, functions)? {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                match level {
                    LogLevel::Debug => tracing::debug!(target: "salience::rules", "{}", message),
                    LogLevel::Info => tracing::info!(target: "salience::rules", "{}", message),
                    LogLevel::Warn => tracing::warn!(target: "salience::rules", "{}", message),
                    LogLevel::Error => tracing::error!(target: "salience::rules", "{}", message),
                }
            }
        }
        Ok(())
    }
}

fn eval(expr: &Expr, ctx: &DataContext, functions: Option<&FunctionTable>) -> Result<Value> {
    let mut eval_ctx = EvalContext::new(ctx.facts());
    if let Some(functions) = functions {
        eval_ctx = eval_ctx.with_functions(functions);
    }
    expr.eval(&eval_ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modify_op() {
        assert_eq!(ModifyOp::Set.apply(10.0, 5.0), 5.0);
        assert_eq!(ModifyOp::Add.apply(10.0, 5.0), 15.0);
        assert_eq!(ModifyOp::Sub.apply(10.0, 5.0), 5.0);
        assert_eq!(ModifyOp::Mul.apply(10.0, 5.0), 50.0);
        assert_eq!(ModifyOp::Div.apply(10.0, 5.0), 2.0);
        assert_eq!(ModifyOp::Min.apply(10.0, 5.0), 5.0);
        assert_eq!(ModifyOp::Max.apply(10.0, 5.0), 10.0);
    }

    #[test]
    fn test_effect_builders() {
        let effect = Effect::set("status", Expr::lit("gold"));
        assert!(matches!(effect, Effect::Set { .. }));

        let effect = Effect::add("points", Expr::lit(50.0));
        assert!(matches!(effect, Effect::Modify { op: ModifyOp::Add, .. }));

        let effect = Effect::remove("pending");
        assert!(matches!(effect, Effect::Remove(_)));
    }

    #[test]
    fn test_apply_counts_changes() {
        let mut ctx = DataContext::new();
        ctx.add("points", 10i64);

        Effect::add("points", Expr::lit(5i64)).apply(&mut ctx, None).unwrap();
        assert_eq!(ctx.get("points"), Some(&Value::Float(15.0)));
        assert_eq!(ctx.change_count(), 1);

        // Writing the value already stored is not a change
        ctx.reset_change_count();
        Effect::set("points", Expr::lit(15.0)).apply(&mut ctx, None).unwrap();
        assert_eq!(ctx.change_count(), 0);

        // Logging never touches working memory
        Effect::log(Expr::lit("hello")).apply(&mut ctx, None).unwrap();
        assert_eq!(ctx.change_count(), 0);
    }

    #[test]
    fn test_sequence_sees_earlier_writes() {
        let mut ctx = DataContext::new();

        let effect = Effect::seq(vec![
            Effect::set("a", Expr::lit(2i64)),
            Effect::set(
                "b",
                Expr::Mul(Box::new(Expr::fact("a")), Box::new(Expr::lit(10i64))),
            ),
        ]);
        effect.apply(&mut ctx, None).unwrap();

        assert_eq!(ctx.get("b"), Some(&Value::Int(20)));
        assert_eq!(ctx.change_count(), 2);
    }

    #[test]
    fn test_conditional() {
        let mut ctx = DataContext::new();
        ctx.add("age", 15i64);

        let effect = Effect::If {
            condition: Expr::fact("age").ge(Expr::lit(18i64)),
            then_effects: vec![Effect::set("adult", Expr::lit(true))],
            else_effects: vec![Effect::set("adult", Expr::lit(false))],
        };
        effect.apply(&mut ctx, None).unwrap();
        assert_eq!(ctx.get("adult"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_call_and_errors() {
        let mut ctx = DataContext::new();
        let table = FunctionTable::with_builtins();

        let call = Effect::Call("log".to_string(), vec![Expr::lit("fired")]);
        assert!(call.apply(&mut ctx, Some(&table)).is_ok());
        assert!(matches!(
            call.apply(&mut ctx, None),
            Err(Error::EvaluationError(_))
        ));

        let div = Effect::Modify {
            fact: "x".to_string(),
            op: ModifyOp::Div,
            value: Expr::lit(0i64),
        };
        assert!(matches!(div.apply(&mut ctx, None), Err(Error::DivisionByZero)));
        assert_eq!(ctx.change_count(), 0);
    }
}
