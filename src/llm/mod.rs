//! Generation boundary.
//!
//! The pipeline only sees the `GenerationProvider` trait; the concrete
//! client talks to an OpenAI-compatible chat-completions endpoint.

pub mod groq;
pub mod provider;
pub mod types;

pub use groq::GroqProvider;
pub use provider::GenerationProvider;
pub use types::GenerationRequest;
