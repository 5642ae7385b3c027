//! The key-value liveness store, per spec.md §6's external-collaborator
//! contract: `SET`, `GET`, `DEL`, `SCAN`, no persistence requirement beyond
//! one orchestrator process's lifetime.

use futures::StreamExt;
use redis::AsyncCommands;

use crate::error::Error;

pub trait KvStore: std::fmt::Debug + Send + Sync + 'static {
    fn set<'s>(
        &'s self,
        key: &'s str,
        value: &'s str,
    ) -> impl std::future::Future<Output = Result<(), Error>> + Send + 's;

    fn get<'s>(
        &'s self,
        key: &'s str,
    ) -> impl std::future::Future<Output = Result<Option<String>, Error>> + Send + 's;

    fn del<'s>(&'s self, key: &'s str) -> impl std::future::Future<Output = Result<(), Error>> + Send + 's;

    fn scan<'s>(
        &'s self,
        pattern: &'s str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, Error>> + Send + 's;
}

/// Redis-backed liveness store. `job:*` keys are written on job admission
/// and deleted on completion — the admission gate's count of matching keys
/// *is* the concurrency bound (spec.md §4.8).
#[derive(Debug, Clone)]
pub struct RedisKvStore {
    connection: redis::aio::ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(address: &str) -> Result<Self, Error> {
        let client = redis::Client::open(format!("redis://{address}"))?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

impl KvStore for RedisKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.connection.clone();
        Ok(conn.get(key).await?)
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.scan_match(pattern).await?.collect().await;
        Ok(keys)
    }
}
