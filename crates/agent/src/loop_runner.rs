//! The orchestration loop implementation.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolpilot_config::{AppConfig, DispatchPolicy};
use toolpilot_core::error::{Error, ModelError, Result};
use toolpilot_core::message::{Conversation, Turn};
use toolpilot_core::provider::{ModelClient, ModelRequest, ModelResponse, ToolDeclaration};
use toolpilot_core::tool::{ToolCallRequest, ToolRegistry};
use tracing::{debug, info, warn};

use crate::dispatch::{self, DispatchMode};
use crate::executor::ToolExecutor;
use crate::retry::RetryPolicy;

/// Where an exchange currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingUserInput,
    AwaitingModel,
    DispatchingTools(Vec<ToolCallRequest>),
    Done(String),
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::AwaitingUserInput => "awaiting_user_input",
            LoopState::AwaitingModel => "awaiting_model",
            LoopState::DispatchingTools(_) => "dispatching_tools",
            LoopState::Done(_) => "done",
        }
    }
}

/// What one exchange produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeOutcome {
    /// The model's final text reply
    pub reply: String,

    /// Model calls that returned a response
    pub model_calls: u32,

    /// Tool calls dispatched, successful or not
    pub tool_calls: u32,

    /// Model calls re-sent after a retryable failure
    pub retries: u32,
}

/// The orchestration loop: user input → model → tools → model → … → reply.
pub struct AgentLoop {
    /// The remote model
    client: Arc<dyn ModelClient>,

    /// Runs tool calls against the registry
    executor: ToolExecutor,

    /// Tool declarations sent with every request
    declarations: Vec<ToolDeclaration>,

    /// The model to use
    model: String,

    system_prompt: Option<String>,
    max_tokens: u32,
    temperature: f32,

    /// Maximum model calls per exchange
    max_iterations: u32,

    retry: RetryPolicy,
    dispatch: DispatchPolicy,
}

impl AgentLoop {
    /// Create a new loop with default limits.
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        let defaults = AppConfig::default();
        Self {
            client,
            declarations: registry.declarations(),
            executor: ToolExecutor::new(registry),
            model: model.into(),
            system_prompt: None,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            max_iterations: defaults.agent.max_iterations,
            retry: RetryPolicy::default(),
            dispatch: DispatchPolicy::default(),
        }
    }

    /// Build a loop with every knob taken from `config`.
    pub fn from_config(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        let mut agent = Self::new(client, registry, config.model.clone())
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
            .with_max_iterations(config.agent.max_iterations)
            .with_retry(RetryPolicy::from(&config.retry))
            .with_dispatch(config.agent.dispatch)
            .with_tool_timeout(config.agent.tool_timeout_secs.map(Duration::from_secs));
        agent.system_prompt = config.system_prompt.clone();
        agent
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of model calls per exchange.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchPolicy) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Run one exchange: append `input`, then alternate between the model and
    /// the tools until the model answers with text.
    ///
    /// On error the conversation keeps every turn appended so far and stays
    /// usable for the next exchange.
    pub async fn run_exchange(
        &self,
        conversation: &mut Conversation,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeOutcome> {
        info!(
            conversation_id = %conversation.id(),
            model = %self.model,
            "Processing user input"
        );

        let mut outcome = ExchangeOutcome::default();
        let mut state = LoopState::AwaitingUserInput;

        loop {
            debug!(state = state.name(), "Loop state");
            state = match state {
                LoopState::AwaitingUserInput => {
                    conversation.append(Turn::user(input));
                    LoopState::AwaitingModel
                }

                LoopState::AwaitingModel => {
                    if outcome.model_calls >= self.max_iterations {
                        warn!(
                            conversation_id = %conversation.id(),
                            limit = self.max_iterations,
                            "Max iterations reached"
                        );
                        return Err(Error::IterationLimit {
                            limit: self.max_iterations,
                        });
                    }

                    let response = self
                        .call_model(conversation.snapshot(), cancel, &mut outcome)
                        .await?;
                    outcome.model_calls += 1;

                    match response {
                        ModelResponse::TextReply { text } => {
                            conversation.append(Turn::assistant(text.clone()));
                            LoopState::Done(text)
                        }
                        ModelResponse::ToolCallBatch { text, requests } => {
                            debug!(count = requests.len(), "Model requested tools");
                            conversation.append(Turn::tool_calls(text, requests.clone()));
                            LoopState::DispatchingTools(requests)
                        }
                    }
                }

                LoopState::DispatchingTools(requests) => {
                    self.dispatch_batch(conversation, &requests).await;
                    outcome.tool_calls += requests.len() as u32;
                    LoopState::AwaitingModel
                }

                LoopState::Done(reply) => {
                    info!(
                        conversation_id = %conversation.id(),
                        model_calls = outcome.model_calls,
                        tool_calls = outcome.tool_calls,
                        retries = outcome.retries,
                        "Exchange complete"
                    );
                    outcome.reply = reply;
                    return Ok(outcome);
                }
            };
        }
    }

    /// Send the transcript, retrying transient failures with backoff.
    /// Both the request and the backoff sleep end early on cancellation.
    async fn call_model(
        &self,
        transcript: &[Turn],
        cancel: &CancellationToken,
        outcome: &mut ExchangeOutcome,
    ) -> Result<ModelResponse> {
        let request = ModelRequest {
            model: &self.model,
            system: self.system_prompt.as_deref(),
            transcript,
            tools: &self.declarations,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let result: std::result::Result<ModelResponse, ModelError> = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = self.client.send(request) => result,
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        client = self.client.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    attempt += 1;
                    outcome.retries += 1;

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    warn!(client = self.client.name(), error = %e, "Model call failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Execute a batch and append one result turn per request, in request order.
    async fn dispatch_batch(&self, conversation: &mut Conversation, requests: &[ToolCallRequest]) {
        match dispatch::plan(self.dispatch, self.executor.registry(), requests) {
            DispatchMode::Sequential => {
                for request in requests {
                    let result = self.executor.execute(request).await;
                    conversation.append(Turn::tool_result(result));
                }
            }
            DispatchMode::Concurrent => {
                debug!(count = requests.len(), "Dispatching tools concurrently");
                let results = join_all(requests.iter().map(|r| self.executor.execute(r))).await;
                for result in results {
                    conversation.append(Turn::tool_result(result));
                }
            }
        }
    }
}
