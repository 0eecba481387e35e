//! The rule capability consumed by the engine

use crate::{DataContext, FunctionTable, Result};
use std::fmt;
use std::sync::Arc;

/// Engine-provided handles passed to each rule when it is initialized
#[derive(Debug, Clone)]
pub struct InitContext<'a> {
    /// Name of the knowledge base being executed
    pub knowledge_base: &'a str,
    /// Version of the knowledge base being executed
    pub version: &'a str,
    /// Position of the rule within the knowledge base
    pub index: usize,
    /// Helper functions shared by every rule in this execution
    pub functions: Arc<FunctionTable>,
}

/// A named, prioritized rule the engine can test and fire
///
/// Implementations must bump the context's change counter for every
/// observable mutation their action makes. Writes through [`DataContext::set`],
/// [`DataContext::modify`] and [`DataContext::remove`] do this already; any
/// other mutation needs an explicit [`DataContext::mark_changed`]. The engine
/// has no other way to tell that a firing changed anything.
pub trait RuleEntry {
    /// Rule name, used in diagnostics
    fn name(&self) -> &str;

    /// Priority among simultaneously eligible rules (higher fires first)
    fn salience(&self) -> i32;

    /// Bind the rule to the working memory; called once per execution
    fn initialize(&mut self, _ctx: &mut DataContext, _init: &InitContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Whether the rule is currently eligible to fire
    fn can_execute(&self, ctx: &DataContext) -> Result<bool>;

    /// Fire the rule
    fn execute(&mut self, ctx: &mut DataContext) -> Result<()>;
}

type Guard = Box<dyn Fn(&DataContext) -> Result<bool>>;
type Action = Box<dyn FnMut(&mut DataContext) -> Result<()>>;

/// A rule built from a guard closure and an action closure
pub struct FnRule {
    name: String,
    salience: i32,
    when: Guard,
    then: Action,
}

impl FnRule {
    /// Create a new closure rule
    pub fn new<W, T>(name: impl Into<String>, salience: i32, when: W, then: T) -> Self
    where
        W: Fn(&DataContext) -> Result<bool> + 'static,
        T: FnMut(&mut DataContext) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            salience,
            when: Box::new(when),
            then: Box::new(then),
        }
    }
}

impl RuleEntry for FnRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn salience(&self) -> i32 {
        self.salience
    }

    fn can_execute(&self, ctx: &DataContext) -> Result<bool> {
        (self.when)(ctx)
    }

    fn execute(&mut self, ctx: &mut DataContext) -> Result<()> {
        (self.then)(ctx)
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("name", &self.name)
            .field("salience", &self.salience)
            .finish_non_exhaustive()
    }
}
