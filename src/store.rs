use std::collections::HashMap;

use deadpool_redis::redis::AsyncCommands;

use crate::error::ForemanError;

/// Thin contract over the Redis primitives the scheduler uses. Each method
/// maps 1:1 onto one Redis command; commands issued on one connection keep
/// their ordering, which is the only ordering guarantee the scheduler
/// relies on.
#[derive(Clone)]
pub struct Store {
    pool: deadpool_redis::Pool,
}

impl Store {
    pub fn connect(redis_url: &str) -> Result<Self, ForemanError> {
        let cfg = deadpool_redis::Config::from_url(redis_url);
        let pool = cfg.create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, ForemanError> {
        self.pool.get().await.map_err(ForemanError::Pool)
    }

    pub async fn set_nx(&self, key: &str, value: &str) -> Result<bool, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.set_nx(key, value).await?)
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<(), ForemanError> {
        let mut redis = self.connection().await?;
        let _: () = redis.set_ex(key, value, ttl).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.get(key).await?)
    }

    pub async fn expire(&self, key: &str, ttl: i64) -> Result<bool, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.expire(key, ttl).await?)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.exists(key).await?)
    }

    pub async fn del(&self, key: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.del(key).await?)
    }

    /// Pattern scan backing the admin's cross-host view. Deliberately
    /// outside the per-command contract above; nothing on the hot path may
    /// use it.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.keys(pattern).await?)
    }

    pub async fn del_many(&self, keys: &[String]) -> Result<i64, ForemanError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut redis = self.connection().await?;
        Ok(redis.del(keys).await?)
    }

    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), ForemanError> {
        let mut redis = self.connection().await?;
        let _: () = redis.hset(key, field, value).await?;
        Ok(())
    }

    pub async fn hset_nx(&self, key: &str, field: &str, value: &str) -> Result<bool, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.hset_nx(key, field, value).await?)
    }

    pub async fn hdel(&self, key: &str, field: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.hdel(key, field).await?)
    }

    pub async fn hdel_many(&self, key: &str, fields: &[String]) -> Result<i64, ForemanError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut redis = self.connection().await?;
        Ok(redis.hdel(key, fields).await?)
    }

    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.hgetall(key).await?)
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.hkeys(key).await?)
    }

    pub async fn sadd(&self, key: &str, member: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.sadd(key, member).await?)
    }

    pub async fn srem(&self, key: &str, member: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.srem(key, member).await?)
    }

    pub async fn srandmember(&self, key: &str) -> Result<Option<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.srandmember(key).await?)
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.smembers(key).await?)
    }

    /// Returns the new list length, which `Producer::add` reports back.
    pub async fn lpush(&self, key: &str, value: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.lpush(key, value).await?)
    }

    pub async fn rpop(&self, key: &str) -> Result<Option<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.rpop(key, None).await?)
    }

    pub async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.lrange(key, start as isize, stop as isize).await?)
    }

    pub async fn llen(&self, key: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.llen(key).await?)
    }

    pub async fn lrem(&self, key: &str, count: i64, value: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.lrem(key, count as isize, value).await?)
    }

    pub async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), ForemanError> {
        let mut redis = self.connection().await?;
        let _: () = redis.ltrim(key, start as isize, stop as isize).await?;
        Ok(())
    }

    /// Blocks up to `timeout` seconds; `None` on timeout.
    pub async fn brpop(&self, key: &str, timeout: f64) -> Result<Option<(String, String)>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.brpop(key, timeout).await?)
    }

    pub async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<(), ForemanError> {
        let mut redis = self.connection().await?;
        let _: () = redis.zadd(key, member, score).await?;
        Ok(())
    }

    pub async fn zrangebyscore(&self, key: &str, min: i64, max: i64) -> Result<Vec<String>, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.zrangebyscore(key, min, max).await?)
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<i64, ForemanError> {
        let mut redis = self.connection().await?;
        Ok(redis.zrem(key, member).await?)
    }
}
