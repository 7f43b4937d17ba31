//! Runs one stage: render, call with timeout and retry, parse.

use std::time::{Duration, Instant};

use chrono::Utc;
use firmaudit_llm::{ProviderError, RetryConfig, RetryPolicy};
use firmaudit_types::{AuditError, ModelBinding, PipelineConfig, StageResult};
use tracing::{debug, info, warn};

use crate::factory::ModelClient;
use crate::stages::{Handoff, StageTemplate};

/// Executes a stage against a client.
///
/// The prompt is rendered once and the identical text is sent on every
/// attempt. Only transient transport errors are retried; a reply that
/// fails to parse is final.
#[derive(Debug, Clone)]
pub struct StageExecutor {
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl StageExecutor {
    pub fn new(policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            policy,
            call_timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            RetryPolicy::new(RetryConfig::from(&config.retry)),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub async fn run(
        &self,
        template: &dyn StageTemplate,
        client: &ModelClient,
        handoff: &Handoff,
    ) -> StageResult {
        let stage = template.stage();
        let binding = client.binding();
        let started_at = Utc::now();
        let clock = Instant::now();
        let elapsed = || clock.elapsed().as_millis() as u64;

        let prompt = match template.render(handoff) {
            Ok(p) => p,
            Err(err) => {
                return StageResult::failed(stage, Some(binding.clone()), &err, 0, started_at, elapsed());
            }
        };

        info!(stage = %stage, binding = %binding, prompt_chars = prompt.len(), "calling model");
        let label = binding.to_string();
        let timeout = self.call_timeout;
        let outcome = self
            .policy
            .run(&label, |attempt| {
                let prompt = prompt.as_str();
                async move {
                    debug!(stage = %stage, attempt, "provider call");
                    match tokio::time::timeout(timeout, client.generate(prompt)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout),
                    }
                }
            })
            .await;
        let attempts = outcome.attempts;

        let text = match outcome.result {
            Ok(text) => text,
            Err(err) => {
                let err = classify(binding, err, attempts);
                warn!(stage = %stage, binding = %binding, attempts, error = %err, "stage call failed");
                return StageResult::failed(stage, Some(binding.clone()), &err, attempts, started_at, elapsed());
            }
        };

        match template.parse(&text) {
            Ok(payload) => {
                info!(stage = %stage, attempts, elapsed_ms = elapsed(), "stage succeeded");
                StageResult::success(stage, payload, binding.clone(), attempts, started_at, elapsed())
            }
            Err(err) => {
                warn!(stage = %stage, binding = %binding, error = %err, "reply did not match stage schema");
                StageResult::failed_with_raw(stage, binding.clone(), &err, text, attempts, started_at, elapsed())
            }
        }
    }
}

/// Map a final transport error onto the taxonomy.
fn classify(binding: &ModelBinding, err: ProviderError, attempts: u32) -> AuditError {
    if err.is_setup_rejection() {
        AuditError::ClientInit {
            provider: binding.provider.clone(),
            model: binding.model.clone(),
            reason: err.to_string(),
        }
    } else {
        AuditError::Provider {
            message: err.to_string(),
            attempts,
        }
    }
}
