//! Agent layer - LLM-backed intent extraction and reply composition
//!
//! This crate is the boundary between free-form chat and the typed
//! consultation core:
//! 1. **Intent Extraction** (`extractor`) - Parse NL → `UpdateIntent`s
//! 2. **Turn Orchestration** (`runtime`) - Apply intents through the core
//! 3. **Reply Composition** (`messages`) - Select the next prompt or summary
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It NEVER decides grant amounts,
//! question order, or completion. Those are deterministic decisions made by
//! the consultation core; a model that hallucinates an intent can at worst
//! set a field the user did not mention, never corrupt the formula.

pub mod extractor;
pub mod llm;
pub mod messages;
pub mod runtime;

pub use extractor::{IntentExtractor, LlmIntentExtractor};
pub use llm::{GeminiClient, LlmClient};
pub use messages::MessageComposer;
pub use runtime::{AgentReply, AgentRuntime};
