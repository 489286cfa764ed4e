// Embedding generation for content chunks.
// The chunker produces text; this module turns it into vectors via a local
// Ollama server, respecting a sliding-window rate limit.

pub mod ollama;
pub mod rate_limit;

pub use ollama::{EmbeddingResult, OllamaClient};
pub use rate_limit::RateLimiter;
