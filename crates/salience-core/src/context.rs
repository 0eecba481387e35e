//! Working memory shared by all rules during an execution
//!
//! Besides the facts themselves, [`DataContext`] carries a change counter.
//! The engine resets it right before each rule fires and reads it right
//! after, which is the only signal it has that a firing changed anything.
//! This is a heuristic, not dependency tracking: every mutator on this type
//! bumps the counter when it alters a stored value, and rule implementations
//! that change observable state by other means must call
//! [`DataContext::mark_changed`] themselves.

use crate::effect::ModifyOp;
use crate::{Error, FunctionTable, Result, Value, ValueMap};
use indexmap::IndexMap;
use std::sync::Arc;

/// Working memory: named facts plus a change counter
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    facts: ValueMap,
    functions: IndexMap<String, Arc<FunctionTable>>,
    change_count: u64,
}

impl DataContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with the given facts
    pub fn with_facts(facts: ValueMap) -> Self {
        Self {
            facts,
            ..Self::default()
        }
    }

    /// Register a fact without counting it as a change
    ///
    /// Used to seed working memory before an execution.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.facts.insert(name.into(), value.into());
    }

    /// Register a helper function table under a well-known name
    pub fn add_functions(&mut self, name: impl Into<String>, table: Arc<FunctionTable>) {
        self.functions.insert(name.into(), table);
    }

    /// Look up a registered helper function table
    pub fn functions(&self, name: &str) -> Option<&Arc<FunctionTable>> {
        self.functions.get(name)
    }

    /// Get a fact
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.facts.get(name)
    }

    /// Get a fact, failing if it is absent
    pub fn require(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| Error::FactNotFound(name.to_string()))
    }

    /// Check if a fact is present
    pub fn contains(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    /// All facts, in insertion order
    pub fn facts(&self) -> &ValueMap {
        &self.facts
    }

    /// Number of facts
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Check if working memory holds no facts
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Set a fact, counting a change if the stored value differs
    ///
    /// Values are compared with [`Value::same_as`], so writing NaN over NaN
    /// is not a change. Returns `true` if working memory changed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        let value = value.into();
        if self.facts.get(&name).is_some_and(|current| current.same_as(&value)) {
            return false;
        }
        self.facts.insert(name, value);
        self.mark_changed();
        true
    }

    /// Apply a numeric operation to a fact
    ///
    /// A missing fact is treated as `0`. Dividing by zero fails with
    /// [`Error::DivisionByZero`] and leaves the fact untouched. Returns `true`
    /// if working memory changed.
    pub fn modify(&mut self, name: impl Into<String>, op: &ModifyOp, operand: f64) -> Result<bool> {
        if matches!(op, ModifyOp::Div) && operand == 0.0 {
            return Err(Error::DivisionByZero);
        }
        let name = name.into();
        let current = match self.facts.get(&name) {
            Some(v) => Some(v.expect_number()?),
            None => None,
        };
        let next = op.apply(current.unwrap_or(0.0), operand);
        // An unchanged number keeps its original representation (Int stays Int)
        if current.is_some_and(|c| c == next || (c.is_nan() && next.is_nan())) {
            return Ok(false);
        }
        Ok(self.set(name, next))
    }

    /// Remove a fact, counting a change if it was present
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let removed = self.facts.shift_remove(name);
        if removed.is_some() {
            self.mark_changed();
        }
        removed
    }

    /// Number of changes recorded since the last reset
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Reset the change counter to zero
    pub fn reset_change_count(&mut self) {
        self.change_count = 0;
    }

    /// Record an observable change made outside the built-in mutators
    pub fn mark_changed(&mut self) {
        self.change_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_does_not_count() {
        let mut ctx = DataContext::new();
        ctx.add("age", 30i64);

        assert_eq!(ctx.get("age"), Some(&Value::Int(30)));
        assert_eq!(ctx.change_count(), 0);
    }

    #[test]
    fn test_set_counts_only_real_changes() {
        let mut ctx = DataContext::new();

        assert!(ctx.set("status", "new"));
        assert_eq!(ctx.change_count(), 1);

        // Same value again is not a change
        assert!(!ctx.set("status", "new"));
        assert_eq!(ctx.change_count(), 1);

        assert!(ctx.set("status", "approved"));
        assert_eq!(ctx.change_count(), 2);

        ctx.reset_change_count();
        assert_eq!(ctx.change_count(), 0);
    }

    #[test]
    fn test_rewriting_nan_is_not_a_change() {
        let mut ctx = DataContext::new();

        assert!(ctx.set("risk_score", f64::NAN));
        assert!(!ctx.set("risk_score", f64::NAN));
        assert_eq!(ctx.change_count(), 1);

        // Same through modify: NaN stays NaN
        assert!(!ctx.modify("risk_score", &ModifyOp::Add, 1.0).unwrap());
        assert_eq!(ctx.change_count(), 1);

        assert!(ctx.set("risk_score", 0.5));
        assert_eq!(ctx.change_count(), 2);
    }

    #[test]
    fn test_modify() {
        let mut ctx = DataContext::new();
        ctx.add("score", 10i64);

        assert!(ctx.modify("score", &ModifyOp::Add, 5.0).unwrap());
        assert_eq!(ctx.get("score"), Some(&Value::Float(15.0)));

        // Missing facts start at zero
        assert!(ctx.modify("bonus", &ModifyOp::Add, 2.0).unwrap());
        assert_eq!(ctx.get("bonus"), Some(&Value::Float(2.0)));

        // Max with a smaller operand leaves the value alone
        ctx.reset_change_count();
        assert!(!ctx.modify("score", &ModifyOp::Max, 1.0).unwrap());
        assert_eq!(ctx.change_count(), 0);

        ctx.add("name", "bob");
        assert!(matches!(
            ctx.modify("name", &ModifyOp::Add, 1.0),
            Err(Error::TypeError { .. })
        ));
    }

    #[test]
    fn test_modify_rejects_division_by_zero() {
        let mut ctx = DataContext::new();
        ctx.add("spent", 120i64);

        assert!(matches!(
            ctx.modify("spent", &ModifyOp::Div, 0.0),
            Err(Error::DivisionByZero)
        ));
        assert_eq!(ctx.get("spent"), Some(&Value::Int(120)));
        assert_eq!(ctx.change_count(), 0);

        // Missing facts are not created either
        assert!(ctx.modify("ratio", &ModifyOp::Div, 0.0).is_err());
        assert!(!ctx.contains("ratio"));

        assert!(ctx.modify("spent", &ModifyOp::Div, 4.0).unwrap());
        assert_eq!(ctx.get("spent"), Some(&Value::Float(30.0)));
    }

    #[test]
    fn test_remove() {
        let mut ctx = DataContext::new();
        ctx.add("flag", true);

        assert_eq!(ctx.remove("flag"), Some(Value::Bool(true)));
        assert_eq!(ctx.change_count(), 1);
        assert_eq!(ctx.remove("flag"), None);
        assert_eq!(ctx.change_count(), 1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_require() {
        let mut ctx = DataContext::new();
        ctx.add("a", 1i64);

        assert!(ctx.require("a").is_ok());
        assert!(matches!(ctx.require("b"), Err(Error::FactNotFound(name)) if name == "b"));
    }

    #[test]
    fn test_functions_registration() {
        let mut ctx = DataContext::new();
        assert!(ctx.functions("DEFUNC").is_none());

        ctx.add_functions("DEFUNC", Arc::new(FunctionTable::with_builtins()));
        let table = ctx.functions("DEFUNC").unwrap();
        assert!(table.contains("len"));
    }
}
