// ─────────────────────────────────────────────────────────────────────
// Lunar Lander — Touchdown Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Touchdown Kernel failures.
///
/// Everything except `Protocol` is raised at construction time. A
/// controller that was built successfully only fails at runtime when an
/// externally produced transition table breaks its output contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TouchdownError {
    /// Invalid threshold or rule-table configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed caller input (wrong observation length, unknown preset).
    #[error("validation error: {0}")]
    Validation(String),

    /// Transition table rejected at load time (gap, overlap, dangling state).
    #[error("transition table error: {0}")]
    Table(String),

    /// Transition table violated its runtime contract.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl TouchdownError {
    /// True for errors that can only surface while stepping a controller.
    pub fn is_runtime(&self) -> bool {
        matches!(self, TouchdownError::Protocol(_))
    }
}

pub type TouchdownResult<T> = Result<T, TouchdownError>;
