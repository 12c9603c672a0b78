//! Error types for the LLM decision-makers.
//!
//! Uses `thiserror` for typed errors that surface through the whole
//! pipeline: configuration, prompt rendering, LLM calls, response parsing.
//! At the decision-maker boundary every variant becomes a
//! [`DecisionError::Failed`], so the power contributes nothing this round.

use entente_core::error::DecisionError;
use entente_types::Power;

/// Errors that can occur while an LLM decides for a power.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    Backend(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// The LLM response could not be parsed.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AgentError {
    /// Convert into the decision error reported for `power`.
    pub fn into_decision_error(self, power: Power) -> DecisionError {
        DecisionError::failed(power, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_errors_become_failed_decisions() {
        let err = AgentError::Backend("503 Service Unavailable".to_owned());
        let decision = err.into_decision_error(Power::Italy);
        assert_eq!(decision.power(), Power::Italy);
        assert!(matches!(
            decision,
            DecisionError::Failed { ref message, .. } if message.contains("503")
        ));
    }
}
