//! Engine configuration
//!
//! Configuration can be built in code or loaded from RON:
//!
//! ```
//! use salience_core::EngineConfig;
//!
//! let config = EngineConfig::from_ron("(max_cycle: 250)").unwrap();
//! assert_eq!(config.max_cycle(), 250);
//! ```

use crate::Result;
use serde::{Deserialize, Serialize};

/// Default upper bound on conflict-resolution cycles
pub const DEFAULT_MAX_CYCLE: u64 = 5000;

/// Configuration for [`Engine`](crate::Engine) execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of cycles before execution fails as a runaway loop
    ///
    /// Termination cannot be proven for arbitrary guards and actions, so this
    /// is the only thing that stops rules which stay eligible while still
    /// reporting changes.
    max_cycle: u64,
}

impl EngineConfig {
    /// Create a configuration with the given cycle bound
    pub fn with_max_cycle(max_cycle: u64) -> Self {
        Self { max_cycle }
    }

    /// Parse a configuration from a RON string
    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Get the cycle bound
    pub fn max_cycle(&self) -> u64 {
        self.max_cycle
    }

    /// Set the cycle bound
    pub fn set_max_cycle(&mut self, max_cycle: u64) {
        self.max_cycle = max_cycle;
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycle: DEFAULT_MAX_CYCLE,
        }
    }
}
