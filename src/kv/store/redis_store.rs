use async_trait::async_trait;
use garde::Validate;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use smart_default::SmartDefault;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::core::{check_batch_len, KvError, SetOptions, Store};
use crate::cfg::HumanDur;
use crate::kv::serializer::{Serializer, SerializerConfig};

/// Redis 存储配置
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, SmartDefault, Validate)]
#[serde(default)]
pub struct RedisStoreConfig {
    /// host:port 地址（如 "localhost:6379"）
    #[garde(length(min = 1))]
    #[default = "localhost:6379"]
    pub endpoint: String,

    /// Redis 6.0+ ACL 用户名
    #[garde(skip)]
    pub username: Option<String>,

    #[garde(skip)]
    pub password: Option<String>,

    /// 数据库编号
    #[garde(range(min = 0))]
    pub db: i64,

    /// 调用未指定过期时间时使用的默认 TTL，0 表示不过期
    #[serde_as(as = "HumanDur")]
    #[garde(skip)]
    #[default(Duration::ZERO)]
    pub default_ttl: Duration,

    /// 键序列化器，默认 JsonSerializer
    #[garde(skip)]
    pub key_serializer: SerializerConfig,

    /// 值序列化器，默认 JsonSerializer
    #[garde(skip)]
    pub val_serializer: SerializerConfig,
}

impl RedisStoreConfig {
    fn url(&self) -> String {
        match &self.password {
            Some(password) => {
                let username = self.username.as_deref().unwrap_or("default");
                format!(
                    "redis://{}:{}@{}/{}",
                    username, password, self.endpoint, self.db
                )
            }
            None => format!("redis://{}/{}", self.endpoint, self.db),
        }
    }
}

/// 远端 Redis 存储
///
/// 键和值都经过序列化器转换为字节，键序列化结果必须是合法 UTF-8。
/// 连接在第一次调用时建立，之后复用同一个多路复用连接。
pub struct RedisStore<K, V> {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
    key_serializer: Box<dyn Serializer<K, Vec<u8>>>,
    val_serializer: Box<dyn Serializer<V, Vec<u8>>>,
    default_ttl: Duration,
}

impl<K, V> RedisStore<K, V>
where
    K: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static,
    V: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static,
{
    pub fn new(config: RedisStoreConfig) -> Result<Self, KvError> {
        config
            .validate()
            .map_err(|e| KvError::InvalidArgument(format!("invalid RedisStore config: {}", e)))?;

        let client = redis::Client::open(config.url())
            .map_err(|e| KvError::InvalidArgument(format!("invalid redis url: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            key_serializer: config.key_serializer.build::<K>(),
            val_serializer: config.val_serializer.build::<V>(),
            default_ttl: config.default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl<K, V> RedisStore<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn conn(&self) -> Result<MultiplexedConnection, KvError> {
        let con = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| KvError::Backend(format!("failed to connect redis: {}", e)))
            })
            .await?;
        Ok(con.clone())
    }

    fn encode_key(&self, key: &K) -> Result<String, KvError> {
        let bytes = self
            .key_serializer
            .serialize(key)
            .map_err(|e| KvError::Backend(format!("key serialization failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| KvError::Backend(format!("invalid key UTF-8: {}", e)))
    }

    fn encode_val(&self, value: &V) -> Result<Vec<u8>, KvError> {
        self.val_serializer
            .serialize(value)
            .map_err(|e| KvError::Backend(format!("value serialization failed: {}", e)))
    }

    fn decode_val(&self, bytes: Vec<u8>) -> Result<V, KvError> {
        self.val_serializer
            .deserialize(&bytes)
            .map_err(|e| KvError::Backend(format!("value deserialization failed: {}", e)))
    }

    fn expiration(&self, options: &SetOptions) -> Duration {
        options.expiration.unwrap_or(self.default_ttl)
    }

    /// 构造 SET 命令，`NX` 保证检查与写入原子
    fn set_cmd(key: &str, val: &[u8], expiration: Duration, if_not_exist: bool) -> redis::Cmd {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(val);
        if if_not_exist {
            cmd.arg("NX");
        }
        if expiration > Duration::ZERO {
            // 不足 1ms 的过期时间按 1ms 处理，PX 0 会被服务端拒绝
            cmd.arg("PX").arg((expiration.as_millis() as u64).max(1));
        }
        cmd
    }
}

#[async_trait]
impl<K, V> Store<K, V> for RedisStore<K, V>
where
    K: Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn set(&self, key: &K, value: &V, options: &SetOptions) -> Result<(), KvError> {
        let key = self.encode_key(key)?;
        let val = self.encode_val(value)?;
        let mut con = self.conn().await?;

        // NX 未写入时返回 nil
        let reply: Option<String> =
            Self::set_cmd(&key, &val, self.expiration(options), options.if_not_exist)
                .query_async(&mut con)
                .await
                .map_err(|e| KvError::Backend(format!("SET failed: {}", e)))?;

        match reply {
            Some(_) => Ok(()),
            None => Err(KvError::ConditionFailed),
        }
    }

    async fn get(&self, key: &K) -> Result<V, KvError> {
        let key = self.encode_key(key)?;
        let mut con = self.conn().await?;

        let result: Option<Vec<u8>> = con
            .get(&key)
            .await
            .map_err(|e| KvError::Backend(format!("GET failed: {}", e)))?;

        match result {
            Some(bytes) => self.decode_val(bytes),
            None => Err(KvError::KeyNotFound),
        }
    }

    async fn del(&self, key: &K) -> Result<(), KvError> {
        let key = self.encode_key(key)?;
        let mut con = self.conn().await?;

        let _: i64 = con
            .del(&key)
            .await
            .map_err(|e| KvError::Backend(format!("DEL failed: {}", e)))?;
        Ok(())
    }

    async fn batch_set(
        &self,
        keys: &[K],
        vals: &[V],
        options: &SetOptions,
    ) -> Result<Vec<Result<(), KvError>>, KvError> {
        check_batch_len(keys, vals)?;
        if keys.is_empty() {
            return Ok(vec![]);
        }

        // 编码失败的键不进入 pipeline，单独记录错误
        let mut results: Vec<Result<(), KvError>> = Vec::with_capacity(keys.len());
        let mut pending = Vec::new();
        let mut pipe = redis::pipe();
        let expiration = self.expiration(options);

        for (i, (key, value)) in keys.iter().zip(vals.iter()).enumerate() {
            match self.encode_key(key).and_then(|k| Ok((k, self.encode_val(value)?))) {
                Ok((key, val)) => {
                    pipe.add_command(Self::set_cmd(&key, &val, expiration, options.if_not_exist));
                    pending.push(i);
                    results.push(Ok(()));
                }
                Err(e) => results.push(Err(e)),
            }
        }

        if pending.is_empty() {
            return Ok(results);
        }

        let mut con = self.conn().await?;
        let replies: Vec<Option<String>> = pipe
            .query_async(&mut con)
            .await
            .map_err(|e| KvError::Backend(format!("pipeline SET failed: {}", e)))?;

        for (i, reply) in pending.into_iter().zip(replies) {
            if reply.is_none() {
                results[i] = Err(KvError::ConditionFailed);
            }
        }

        Ok(results)
    }

    async fn batch_get(&self, keys: &[K]) -> Result<Vec<Result<V, KvError>>, KvError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let key_strs = keys
            .iter()
            .map(|key| self.encode_key(key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut con = self.conn().await?;
        // MGET 对单个键也返回数组
        let replies: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(&key_strs)
            .query_async(&mut con)
            .await
            .map_err(|e| KvError::Backend(format!("MGET failed: {}", e)))?;

        Ok(replies
            .into_iter()
            .map(|reply| match reply {
                Some(bytes) => self.decode_val(bytes),
                None => Err(KvError::KeyNotFound),
            })
            .collect())
    }

    async fn batch_del(&self, keys: &[K]) -> Result<Vec<Result<(), KvError>>, KvError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let key_strs = keys
            .iter()
            .map(|key| self.encode_key(key))
            .collect::<Result<Vec<_>, _>>()?;

        let mut con = self.conn().await?;
        let _: i64 = con
            .del(&key_strs)
            .await
            .map_err(|e| KvError::Backend(format!("DEL failed: {}", e)))?;

        Ok(key_strs.iter().map(|_| Ok(())).collect())
    }

    async fn close(&self) -> Result<(), KvError> {
        // 多路复用连接在 drop 时释放
        Ok(())
    }
}
