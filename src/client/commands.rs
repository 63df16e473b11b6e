//! Typed command helpers.
//!
//! Available on anything implementing [`CommandExecutor`]: the failover
//! client, or a single instance's handle. Commands that can legitimately find
//! nothing return `Option`, mapping the nil sentinel to `None`.

use async_trait::async_trait;
use redis::{Cmd, FromRedisValue, ToRedisArgs};
use std::collections::HashMap;

use crate::client::executor::CommandExecutor;
use crate::error::{Error, Result};

#[async_trait]
pub trait Commands: CommandExecutor {
    /// Run `cmd` and convert the reply.
    async fn query<T: FromRedisValue + Send>(&self, cmd: &Cmd) -> Result<T> {
        let value = self.execute(cmd).await?;
        Ok(redis::from_redis_value(&value)?)
    }

    /// Like [`query`](Commands::query), with a nil reply mapped to `None`.
    async fn query_opt<T: FromRedisValue + Send>(&self, cmd: &Cmd) -> Result<Option<T>> {
        match self.execute(cmd).await {
            Ok(value) => Ok(Some(redis::from_redis_value(&value)?)),
            Err(Error::Nil) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn ping(&self) -> Result<String> {
        self.query(&redis::cmd("PING")).await
    }

    async fn get<T: FromRedisValue + Send>(&self, key: &str) -> Result<Option<T>> {
        self.query_opt(redis::cmd("GET").arg(key)).await
    }

    async fn set<V: ToRedisArgs + Send + Sync>(&self, key: &str, value: V) -> Result<()> {
        self.execute(redis::cmd("SET").arg(key).arg(value)).await?;
        Ok(())
    }

    async fn set_ex<V: ToRedisArgs + Send + Sync>(
        &self,
        key: &str,
        value: V,
        seconds: u64,
    ) -> Result<()> {
        self.execute(redis::cmd("SET").arg(key).arg(value).arg("EX").arg(seconds))
            .await?;
        Ok(())
    }

    /// `SET key value NX`. Returns whether the key was set.
    async fn set_nx<V: ToRedisArgs + Send + Sync>(&self, key: &str, value: V) -> Result<bool> {
        match self.execute(redis::cmd("SET").arg(key).arg(value).arg("NX")).await {
            Ok(_) => Ok(true),
            Err(Error::Nil) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the number of keys removed.
    async fn del(&self, keys: &[&str]) -> Result<u64> {
        self.query(redis::cmd("DEL").arg(keys)).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.query(redis::cmd("EXISTS").arg(key)).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        self.query(redis::cmd("INCRBY").arg(key).arg(delta)).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, 1).await
    }

    /// Returns whether the timeout was set.
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        self.query(redis::cmd("EXPIRE").arg(key).arg(seconds)).await
    }

    /// Remaining time to live in seconds (-1 without expiry, -2 when missing).
    async fn ttl(&self, key: &str) -> Result<i64> {
        self.query(redis::cmd("TTL").arg(key)).await
    }

    async fn hget<T: FromRedisValue + Send>(&self, key: &str, field: &str) -> Result<Option<T>> {
        self.query_opt(redis::cmd("HGET").arg(key).arg(field)).await
    }

    async fn hset<V: ToRedisArgs + Send + Sync>(
        &self,
        key: &str,
        field: &str,
        value: V,
    ) -> Result<u64> {
        self.query(redis::cmd("HSET").arg(key).arg(field).arg(value))
            .await
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.query(redis::cmd("HGETALL").arg(key)).await
    }

    async fn lpush<V: ToRedisArgs + Send + Sync>(&self, key: &str, value: V) -> Result<u64> {
        self.query(redis::cmd("LPUSH").arg(key).arg(value)).await
    }

    async fn rpop<T: FromRedisValue + Send>(&self, key: &str) -> Result<Option<T>> {
        self.query_opt(redis::cmd("RPOP").arg(key)).await
    }

    async fn sadd<V: ToRedisArgs + Send + Sync>(&self, key: &str, member: V) -> Result<u64> {
        self.query(redis::cmd("SADD").arg(key).arg(member)).await
    }

    async fn smembers<T: FromRedisValue + Send>(&self, key: &str) -> Result<Vec<T>> {
        self.query(redis::cmd("SMEMBERS").arg(key)).await
    }
}

impl<E: CommandExecutor + ?Sized> Commands for E {}
