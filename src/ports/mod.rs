//! Ports layer: interfaces the pipeline depends on.
//!
//! Adapters implement these traits; the application layer consumes them.

pub mod ai_provider;
pub mod turn_archive;

pub use ai_provider::{
    AIProvider, CompletionRequest, CompletionResponse, ProviderError, ProviderInfo, TokenUsage,
};
pub use turn_archive::{
    ArchiveError, InvocationRecord, PromptRole, TurnArchive, TurnOutcome, TurnRecord,
};
