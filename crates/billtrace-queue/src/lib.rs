//! Job submission, bounded-concurrency admission control, and Redis-backed
//! liveness tracking (Stage H, spec.md §4.8).

pub mod error;
pub mod kv;
pub mod queue;

pub use error::Error;
pub use kv::{KvStore, RedisKvStore};
pub use queue::JobQueue;
