//! Forward-chaining conflict-resolution loop
//!
//! Each cycle re-tests every rule's guard, sorts the eligible rules by
//! descending salience (ties keep knowledge-base order) and fires them one
//! at a time. The first firing that changes working memory ends the cycle,
//! because the eligibility of the remaining rules may no longer hold. The
//! loop stops at a fixpoint: either nothing is eligible, or everything that
//! was eligible fired without changing anything.
//!
//! There is no dependency tracking. The context's change counter is the only
//! signal that a firing mattered, and `max_cycle` is the only guard against
//! rules that never settle.

use crate::{
    DataContext, EngineConfig, Error, FunctionTable, InitContext, KnowledgeBase, Result,
};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Name under which the helper function table is registered in working memory
pub const FUNCTION_TABLE_KEY: &str = "DEFUNC";

/// Summary of a successful execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Number of cycles run, including the final one that found the fixpoint
    pub cycles: u64,
    /// Names of the rules fired, in firing order
    pub fired: Vec<String>,
}

/// The rule engine
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    functions: Arc<FunctionTable>,
}

impl Engine {
    /// Create an engine with the default configuration and built-in helpers
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration and built-in helpers
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            functions: Arc::new(FunctionTable::with_builtins()),
        }
    }

    /// Replace the helper function table
    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.functions = Arc::new(functions);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the cycle bound
    pub fn max_cycle(&self) -> u64 {
        self.config.max_cycle()
    }

    /// Set the cycle bound used by subsequent executions
    pub fn set_max_cycle(&mut self, max_cycle: u64) {
        self.config.set_max_cycle(max_cycle);
    }

    /// Get the helper function table
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Mutable access to the helper function table, to register more helpers
    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        Arc::make_mut(&mut self.functions)
    }

    /// Run the knowledge base against the context until it reaches a fixpoint
    ///
    /// Any rule error aborts the whole execution and is returned annotated
    /// with the rule's name. Exceeding `max_cycle` returns
    /// [`Error::RunawayLoop`].
    pub fn execute(&self, ctx: &mut DataContext, kb: &mut KnowledgeBase) -> Result<Execution> {
        ctx.add_functions(FUNCTION_TABLE_KEY, Arc::clone(&self.functions));

        let kb_name = kb.name().to_string();
        let kb_version = kb.version().to_string();
        let entries = kb.entries_mut();

        for (index, entry) in entries.iter_mut().enumerate() {
            let init = InitContext {
                knowledge_base: &kb_name,
                version: &kb_version,
                index,
                functions: Arc::clone(&self.functions),
            };
            entry.initialize(ctx, &init).map_err(|e| {
                error!("Failed initializing rule '{}': {}", entry.name(), e);
                Error::Initialize {
                    rule: entry.name().to_string(),
                    source: Box::new(e),
                }
            })?;
        }

        let max_cycle = self.config.max_cycle();
        let mut execution = Execution::default();
        let mut runnable: Vec<usize> = Vec::with_capacity(entries.len());

        loop {
            execution.cycles += 1;
            if execution.cycles > max_cycle {
                warn!(
                    "Knowledge base '{}' did not settle within {} cycles",
                    kb_name, max_cycle
                );
                return Err(Error::RunawayLoop { max_cycle });
            }

            runnable.clear();
            for (index, entry) in entries.iter().enumerate() {
                let eligible = entry.can_execute(ctx).map_err(|e| {
                    error!("Failed testing condition for rule '{}': {}", entry.name(), e);
                    Error::Condition {
                        rule: entry.name().to_string(),
                        source: Box::new(e),
                    }
                })?;
                if eligible {
                    runnable.push(index);
                }
            }

            debug!(
                cycle = execution.cycles,
                runnable = runnable.len(),
                "conflict set selected"
            );

            if runnable.is_empty() {
                break;
            }

            if runnable.len() > 1 {
                // sort_by_key is stable: equal salience keeps scan order
                runnable.sort_by_key(|&index| Reverse(entries[index].salience()));
            }

            let mut cycle_done = true;
            for &index in &runnable {
                let entry = &mut entries[index];
                ctx.reset_change_count();

                trace!(rule = entry.name(), salience = entry.salience(), "firing rule");
                entry.execute(ctx).map_err(|e| {
                    error!("Failed executing rule '{}': {}", entry.name(), e);
                    Error::Action {
                        rule: entry.name().to_string(),
                        source: Box::new(e),
                    }
                })?;
                execution.fired.push(entry.name().to_string());

                if ctx.change_count() > 0 {
                    debug!(
                        rule = entry.name(),
                        changes = ctx.change_count(),
                        "working memory changed, re-evaluating"
                    );
                    cycle_done = false;
                    break;
                }
            }

            if cycle_done {
                break;
            }
        }

        info!(
            "Finished rules execution for '{}'. Total #{} cycles.",
            kb_name, execution.cycles
        );
        Ok(execution)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
