/// Domain layer - core business models
///
/// These models are transport-agnostic and represent core business entities.
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod terms;

pub use models::{
    AudioClip, DocumentSource, KeyTerm, ProcessResult, SessionRecord, StoredResult,
    TermDefinition, UploadedDocument, DEFAULT_DISCLAIMER,
};
pub use normalize::{normalize, normalize_with_mode, NormalizeMode, Normalized};
pub use prompts::PromptTemplates;
