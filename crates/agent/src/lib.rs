//! The orchestration loop: the heart of toolpilot.
//!
//! One exchange follows a **Model → Tools → Model** cycle:
//!
//! 1. **Receive** a line of user input and append it to the conversation
//! 2. **Send** the whole transcript plus tool declarations to the model
//! 3. **If tool calls**: execute them, append one result per call, go to step 2
//! 4. **If text**: append the reply and hand it back to the caller
//!
//! Transient model failures are retried with backoff. The exchange ends
//! early on cancellation or when the model-call limit is reached.

pub mod dispatch;
pub mod executor;
pub mod loop_runner;
pub mod retry;

#[cfg(test)]
mod test_helpers;

pub use dispatch::DispatchMode;
pub use executor::ToolExecutor;
pub use loop_runner::{AgentLoop, ExchangeOutcome, LoopState};
pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
