#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("KV store operation failed: {0}")]
    Kv(#[from] redis::RedisError),
}
