use async_trait::async_trait;

use crate::core::errors::GenerationError;
use super::types::GenerationRequest;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// return the provider name (e.g. "groq")
    fn name(&self) -> &str;

    /// single-shot completion; no retries at this layer
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
