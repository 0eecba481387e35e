//! Ordered rule collections

use crate::{Error, Result, RuleEntry};
use std::fmt;

/// An ordered set of rules evaluated together
///
/// Insertion order is the scan order of every cycle and the tie-break
/// between rules of equal salience. It carries no priority on its own.
pub struct KnowledgeBase {
    name: String,
    version: String,
    entries: Vec<Box<dyn RuleEntry>>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            entries: Vec::new(),
        }
    }

    /// Knowledge base name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Knowledge base version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Append a rule, rejecting names already present
    pub fn add(&mut self, rule: impl RuleEntry + 'static) -> Result<()> {
        if self.contains(rule.name()) {
            return Err(Error::DuplicateRule(rule.name().to_string()));
        }
        self.entries.push(Box::new(rule));
        Ok(())
    }

    /// Builder form of [`KnowledgeBase::add`]
    pub fn with_rule(mut self, rule: impl RuleEntry + 'static) -> Result<Self> {
        self.add(rule)?;
        Ok(self)
    }

    /// Check whether a rule with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name() == name)
    }

    /// Get a rule by name
    pub fn get(&self, name: &str) -> Option<&dyn RuleEntry> {
        self.entries
            .iter()
            .find(|e| e.name() == name)
            .map(|e| &**e)
    }

    /// Rule names in knowledge-base order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    /// Iterate over rules in knowledge-base order
    pub fn iter(&self) -> impl Iterator<Item = &dyn RuleEntry> {
        self.entries.iter().map(|e| &**e)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no rules
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Box<dyn RuleEntry>] {
        &mut self.entries
    }
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("rules", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
