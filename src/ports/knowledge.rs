/// Knowledge lookup port trait
///
/// Reference definitions for medical terms, used to ground prompts.
/// Implementations: Snowflake SQL API, local SQLite table.
use crate::domain::models::TermDefinition;
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for term definition lookups
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgePort: Send + Sync {
    /// Definitions whose term contains any of the given (lowercase) terms
    async fn lookup_terms(&self, terms: &[String]) -> Result<Vec<TermDefinition>>;

    /// Get the backing source name
    fn source_name(&self) -> &'static str;
}
