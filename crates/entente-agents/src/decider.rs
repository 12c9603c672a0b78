//! The LLM-backed decision-maker.
//!
//! [`LlmDecider`] renders the power's view into a prompt, asks the backend
//! for a reply constrained to the legal set, and parses the reply back into
//! catalog orders or a press draft. Any failure along the way becomes a
//! [`DecisionError::Failed`] for that power; the collector then treats the
//! power as silent for the round.

use std::time::Instant;

use entente_core::decision::DecisionMaker;
use entente_core::error::DecisionError;
use entente_types::{ActorView, Order, PressDraft};
use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::AgentError;
use crate::llm::{LlmBackend, create_backend};
use crate::parse::{parse_orders, parse_press};
use crate::prompt::PromptEngine;
use crate::schema::{order_schema, press_schema};

/// A decision-maker that asks an LLM.
pub struct LlmDecider {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl LlmDecider {
    /// Create a decider from a backend and a prompt engine.
    pub const fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self { backend, prompts }
    }

    /// Create a decider from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if the configured template
    /// directory cannot be loaded.
    pub fn from_config(config: &LlmConfig, victory_centers: usize) -> Result<Self, AgentError> {
        let prompts = match &config.templates_dir {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::builtin()?,
        };
        Ok(Self::new(
            create_backend(config),
            prompts.with_victory_centers(victory_centers),
        ))
    }

    async fn orders(&self, view: &ActorView) -> Result<Vec<Order>, AgentError> {
        let prompt = self.prompts.render_orders(view)?;
        let schema = order_schema(&view.legal_actions);
        let started = Instant::now();
        let reply = self.backend.complete(&prompt, &schema).await?;
        let parsed = parse_orders(&reply, &view.legal_actions)?;
        info!(
            power = %view.power,
            phase = %view.phase,
            backend = self.backend.name(),
            model = self.backend.model(),
            strict = schema.strict,
            orders = parsed.orders.len(),
            dropped = parsed.dropped.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "LLM orders"
        );
        Ok(parsed.orders)
    }

    async fn press(&self, view: &ActorView) -> Result<Option<PressDraft>, AgentError> {
        let prompt = self.prompts.render_press(view)?;
        let reply = self
            .backend
            .complete(&prompt, &press_schema(view.power))
            .await?;
        let draft = parse_press(&reply)?;
        debug!(
            power = %view.power,
            phase = %view.phase,
            silent = draft.is_none(),
            "LLM press"
        );
        Ok(draft)
    }
}

impl DecisionMaker for LlmDecider {
    fn name(&self) -> &str {
        "llm"
    }

    fn decide<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Vec<Order>, DecisionError>> {
        Box::pin(async move {
            self.orders(view)
                .await
                .map_err(|e| e.into_decision_error(view.power))
        })
    }

    fn negotiate<'a>(
        &'a self,
        view: &'a ActorView,
    ) -> BoxFuture<'a, Result<Option<PressDraft>, DecisionError>> {
        Box::pin(async move {
            self.press(view)
                .await
                .map_err(|e| e.into_decision_error(view.power))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{BackendType, LlmBackendConfig};

    fn config(templates_dir: Option<String>) -> LlmConfig {
        LlmConfig {
            backend: LlmBackendConfig {
                backend_type: BackendType::OpenAi,
                api_url: "http://127.0.0.1:9".to_owned(),
                api_key: "test".to_owned(),
                model: "test-model".to_owned(),
            },
            temperature: 0.7,
            max_tokens: 64,
            templates_dir,
        }
    }

    #[test]
    fn builds_from_config() {
        let decider = LlmDecider::from_config(&config(None), 18).unwrap();
        assert_eq!(decider.name(), "llm");
        assert!(LlmDecider::from_config(&config(Some("/nonexistent/dir".to_owned())), 18).is_err());
    }
}
