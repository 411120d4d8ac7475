//! # Counterpoint Flows
//!
//! Typed prompt flows: each flow renders a structured prompt, sends it to a
//! generative model backend, validates the structured reply and retries with
//! linear backoff until it gets a complete answer or runs out of attempts.
//!
//! ## Core Concepts
//! - **Flow**: a named, schema-typed operation wrapping one backend call
//! - **Backend**: the opaque text-generation service (`StructuredBackend`)
//! - **Provider**: HTTP clients for OpenAI-compatible and Anthropic APIs
//! - **Retry**: bounded attempts, `base_delay * attempt` between them
//! - **Registry**: flows built explicitly from a `FlowConfig` at startup

pub mod backend;
pub mod config;
pub mod debate;
pub mod error;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{LlmBackend, StructuredBackend};
pub use config::{FlowConfig, ProviderConfig, ProviderType};
pub use debate::{
    Category, DebateCandidate, DebateClaimFlow, DebateRequest, DebateRequestInput, DebateResponse,
    Prompt, DEBATE_CLAIM_FLOW,
};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    LlmProvider, OpenAIProvider, Provider, ProviderError, ResponseFormat, Role, Usage,
};
pub use registry::{builtin_descriptors, Flow, FlowDescriptor, FlowRegistry};
pub use retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use schema::{OutputSchema, TextField};
pub use validate::Validation;

pub use tokio_util::sync::CancellationToken;
