pub mod completion;
pub mod embedding;
pub mod error;

pub use completion::{HttpLlmClient, LlmClient};
pub use embedding::{cosine_similarity, EmbeddingClient, HttpEmbeddingClient};
pub use error::Error;
