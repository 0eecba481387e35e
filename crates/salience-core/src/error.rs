//! Error types for salience-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The conflict-resolution loop did not reach a fixpoint within the cycle budget
    #[error(
        "rule engine still selected rules for execution after {max_cycle} cycles; \
         a rule stays eligible while its action keeps changing working memory. \
         Check that the rules involved eventually disable their own guards, \
         or raise `max_cycle` on the engine configuration"
    )]
    RunawayLoop { max_cycle: u64 },

    /// A rule failed while binding itself to the working memory
    #[error("failed to initialize rule '{rule}': {source}")]
    Initialize {
        rule: String,
        #[source]
        source: Box<Error>,
    },

    /// A rule's guard failed while testing eligibility
    #[error("failed testing condition for rule '{rule}': {source}")]
    Condition {
        rule: String,
        #[source]
        source: Box<Error>,
    },

    /// A rule's action failed while firing
    #[error("failed executing rule '{rule}': {source}")]
    Action {
        rule: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Fact not found: {0}")]
    FactNotFound(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Duplicate rule: {0}")]
    DuplicateRule(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ron::error::SpannedError),
}

impl Error {
    /// Build a type mismatch error from the expected type and the offending value's type
    pub(crate) fn type_error(expected: &str, got: &str) -> Self {
        Error::TypeError {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    /// Name of the rule this error was raised for, if it came out of a rule
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            Error::Initialize { rule, .. }
            | Error::Condition { rule, .. }
            | Error::Action { rule, .. } => Some(rule),
            _ => None,
        }
    }

    /// Whether the loop gave up because it hit the cycle limit
    pub fn is_runaway_loop(&self) -> bool {
        matches!(self, Error::RunawayLoop { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Compile-time check that Error is Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
