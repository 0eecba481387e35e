//! Data-driven rules: an expression guard plus a list of effects

use crate::{DataContext, Effect, EvalContext, Expr, FunctionTable, InitContext, Result, RuleEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A rule whose guard is an [`Expr`] and whose action is a list of [`Effect`]s
///
/// Deserializable from RON:
///
/// ```
/// use salience_core::ExprRule;
///
/// let rule: ExprRule = ron::from_str(r#"(
///     name: "adult",
///     salience: 10,
///     when: Ge(Fact("age"), Literal(Int(18))),
///     then: [Set(fact: "adult", value: Literal(Bool(true)))],
/// )"#).unwrap();
/// assert_eq!(rule.name, "adult");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprRule {
    /// Unique rule name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Priority among simultaneously eligible rules
    #[serde(default)]
    pub salience: i32,
    /// Guard
    pub when: Expr,
    /// Action
    pub then: Vec<Effect>,
    /// Helper table captured at initialization
    #[serde(skip)]
    functions: Option<Arc<FunctionTable>>,
}

impl ExprRule {
    /// Create a new rule
    pub fn new(name: impl Into<String>, salience: i32, when: Expr, then: Vec<Effect>) -> Self {
        Self {
            name: name.into(),
            description: None,
            salience,
            when,
            then,
            functions: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl RuleEntry for ExprRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn salience(&self) -> i32 {
        self.salience
    }

    fn initialize(&mut self, _ctx: &mut DataContext, init: &InitContext<'_>) -> Result<()> {
        self.functions = Some(Arc::clone(&init.functions));
        Ok(())
    }

    fn can_execute(&self, ctx: &DataContext) -> Result<bool> {
        let mut eval_ctx = EvalContext::new(ctx.facts());
        if let Some(functions) = &self.functions {
            eval_ctx = eval_ctx.with_functions(functions);
        }
        self.when.test(&eval_ctx)
    }

    fn execute(&mut self, ctx: &mut DataContext) -> Result<()> {
        let functions = self.functions.as_deref();
        for effect in &self.then {
            effect.apply(ctx, functions)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_guard_and_action() {
        let mut rule = ExprRule::new(
            "adult",
            10,
            Expr::And(vec![
                Expr::fact("age").ge(Expr::lit(18i64)),
                Expr::IsSet("adult".into()).negate(),
            ]),
            vec![Effect::set("adult", Expr::lit(true))],
        );
        let mut ctx = DataContext::new();
        ctx.add("age", 21i64);

        assert!(rule.can_execute(&ctx).unwrap());
        rule.execute(&mut ctx).unwrap();
        assert_eq!(ctx.get("adult"), Some(&Value::Bool(true)));
        assert!(!rule.can_execute(&ctx).unwrap());
    }

    #[test]
    fn test_initialize_captures_functions() {
        let mut rule = ExprRule::new(
            "long_name",
            0,
            Expr::call("len", vec![Expr::fact("name")]).gt(Expr::lit(3i64)),
            vec![],
        );
        let mut ctx = DataContext::new();
        ctx.add("name", "margaret");

        // Without a table the call cannot resolve
        assert!(rule.can_execute(&ctx).is_err());

        let init = InitContext {
            knowledge_base: "people",
            version: "1",
            index: 0,
            functions: Arc::new(FunctionTable::with_builtins()),
        };
        rule.initialize(&mut ctx, &init).unwrap();
        assert!(rule.can_execute(&ctx).unwrap());
    }

    #[test]
    fn test_from_ron() {
        let rule: ExprRule = ron::from_str(
            r#"(
                name: "bonus",
                description: Some("Reward big spenders"),
                when: Gt(Fact("spent"), Literal(Float(1000.0))),
                then: [
                    Modify(fact: "points", op: Add, value: Literal(Int(50))),
                    Log(level: Info, message: Literal(String("bonus applied"))),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(rule.name, "bonus");
        assert_eq!(rule.salience, 0);
        assert_eq!(rule.description.as_deref(), Some("Reward big spenders"));
        assert_eq!(rule.then.len(), 2);
    }
}
