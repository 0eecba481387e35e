//! Salience Core - Forward-chaining rule engine
//!
//! This crate provides the execution core of a forward-chaining rule engine:
//! - Working memory with a change counter (`DataContext`)
//! - A rule capability trait (`RuleEntry`) and ordered rule sets (`KnowledgeBase`)
//! - A salience-ordered conflict-resolution loop that runs to a fixpoint (`Engine`)
//!
//! Two ready-made rule representations are included: `ExprRule`, a
//! data-driven rule built from `Expr` guards and `Effect` actions (loadable
//! from RON), and `FnRule`, built from closures.
//!
//! ## Example
//!
//! ```
//! use salience_core::{DataContext, Effect, Engine, Expr, ExprRule, KnowledgeBase};
//!
//! let mut kb = KnowledgeBase::new("loans", "1.0");
//! kb.add(ExprRule::new(
//!     "approve",
//!     10,
//!     Expr::And(vec![
//!         Expr::fact("score").ge(Expr::lit(700i64)),
//!         Expr::IsSet("decision".into()).negate(),
//!     ]),
//!     vec![Effect::set("decision", Expr::lit("approved"))],
//! ))
//! .unwrap();
//!
//! let mut ctx = DataContext::new();
//! ctx.add("score", 720i64);
//!
//! let execution = Engine::new().execute(&mut ctx, &mut kb).unwrap();
//! assert_eq!(ctx.get("decision").and_then(|v| v.as_str()), Some("approved"));
//! assert_eq!(execution.fired, vec!["approve"]);
//! ```

mod config;
mod context;
pub mod effect;
pub mod engine;
mod error;
mod expr;
mod expr_rule;
mod functions;
mod knowledge;
mod rule;
mod value;

pub use config::{EngineConfig, DEFAULT_MAX_CYCLE};
pub use context::DataContext;
pub use effect::{Effect, LogLevel, ModifyOp};
pub use engine::{Engine, Execution, FUNCTION_TABLE_KEY};
pub use error::{Error, Result};
pub use expr::{EvalContext, Expr};
pub use expr_rule::ExprRule;
pub use functions::{Function, FunctionTable};
pub use knowledge::KnowledgeBase;
pub use rule::{FnRule, InitContext, RuleEntry};
pub use value::{Value, ValueMap};
