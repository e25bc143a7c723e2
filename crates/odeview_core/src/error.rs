//! Error taxonomy of the solve pipeline.
//!
//! Every stage has its own error type; [`SolveError`] wraps them at the session boundary.
//! None of these are fatal to the process.

use thiserror::Error;

/// The equation text could not be turned into an [`Equation`](crate::equation_engine::Equation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}{}", near(.token))]
pub struct ParseError {
    pub message: String,
    /// 0-based character offset into the input.
    pub position: usize,
    /// Offending token text, when the failure is tied to one.
    pub token: Option<String>,
}

fn near(token: &Option<String>) -> String {
    token
        .as_ref()
        .map(|token| format!(" (near '{token}')"))
        .unwrap_or_default()
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize, token: Option<String>) -> Self {
        Self {
            message: message.into(),
            position,
            token,
        }
    }

    pub(crate) fn at_token(message: impl Into<String>, position: usize, token: &str) -> Self {
        Self::new(message, position, Some(token.to_string()))
    }

    pub(crate) fn at(message: impl Into<String>, position: usize) -> Self {
        Self::new(message, position, None)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("Unbound parameter(s): {}", .names.join(", "))]
    UnboundParameter { names: Vec<String> },
    #[error("Parameter '{name}' must be finite, got {value}")]
    NonFiniteParameter { name: String, value: f64 },
}

/// A bound value the equation never references. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parameter '{name}' is not used by the equation")]
pub struct UnusedParameter {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("Integration diverged at t = {t}: {reason}")]
    Diverged { t: f64, reason: String },
    #[error("Step limit of {max_steps} exceeded at t = {t}")]
    StepLimitExceeded { t: f64, max_steps: usize },
    #[error("Invalid time span: {0}")]
    InvalidTimeSpan(String),
    #[error("Invalid integrator configuration: {0}")]
    InvalidConfig(String),
}

/// Everything a Solve can fail with, as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("Equation parsing error: {0}")]
    Parse(#[from] ParseError),
    #[error("Input error in {field}: {message}")]
    InvalidInput { field: String, message: String },
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl SolveError {
    pub(crate) fn input(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_mentions_token_only_when_known() {
        let err = ParseError::at_token("Unknown function", 4, "foo");
        assert_eq!(err.to_string(), "Unknown function at position 4 (near 'foo')");
        let err = ParseError::at("Unexpected end of expression", 3);
        assert_eq!(err.to_string(), "Unexpected end of expression at position 3");
    }

    #[test]
    fn solve_error_wraps_stage_errors() {
        let err: SolveError = ParseError::at("Expression is empty", 0).into();
        assert_eq!(
            err.to_string(),
            "Equation parsing error: Expression is empty at position 0"
        );
        let warning = UnusedParameter {
            name: "k".to_string(),
        };
        assert_eq!(warning.to_string(), "Parameter 'k' is not used by the equation");
    }
}
