//! Task broker over Redis Streams: two named queues, priority-first.
//!
//! `enqueue`/`ack`/`dlq`/`consume`/`claim_pending` over
//! `XADD`/`XACK`/`XDEL`/`XREADGROUP`/`XPENDING`/`XCLAIM`, run across two
//! queues under a single priority discipline.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};
use vod_models::{QueueName, TaskEnvelope};

use crate::error::{QueueError, QueueResult};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub priority_stream: String,
    pub default_stream: String,
    pub consumer_group: String,
    pub dlq_stream: String,
    pub max_retries: u32,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            priority_stream: "caption_priority".to_string(),
            default_stream: "default".to_string(),
            consumer_group: "archivist:workers".to_string(),
            dlq_stream: "archivist:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    /// Builds config from the environment: `BROKER_URL` and
    /// `CITIES_CONFIG` are required elsewhere; queue names default to
    /// `caption_priority`/`default` per the same table.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("BROKER_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            priority_stream: std::env::var("PRIORITY_QUEUE_NAME")
                .unwrap_or_else(|_| "caption_priority".to_string()),
            default_stream: std::env::var("DEFAULT_QUEUE_NAME")
                .unwrap_or_else(|_| "default".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "archivist:workers".to_string()),
            dlq_stream: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "archivist:dlq".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Redis Streams-backed task broker implementing the two-queue priority
/// discipline: the consume loop polls `priority` first and only falls
/// through to `default` when that poll is empty, never prefetching more
/// than the single task it is about to hand to a worker.
pub struct TaskBroker {
    client: redis::Client,
    config: QueueConfig,
}

impl TaskBroker {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    pub fn redis_client(&self) -> redis::Client {
        self.client.clone()
    }

    fn stream_name(&self, queue: QueueName) -> &str {
        match queue {
            QueueName::Priority => &self.config.priority_stream,
            QueueName::Default => &self.config.default_stream,
        }
    }

    /// Creates the consumer group on both streams. Ignores `BUSYGROUP`.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        for stream in [&self.config.priority_stream, &self.config.default_stream] {
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(stream)
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;

            match result {
                Ok(_) => info!(stream = %stream, "created consumer group"),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!(stream = %stream, "consumer group already exists");
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }
        Ok(())
    }

    /// Enqueues a task envelope onto its target queue. When the envelope
    /// carries an idempotency key (only `PipelineProcessSingle` does),
    /// rejects a submission that duplicates one still inside the TTL window.
    /// Other task kinds have no key and are always enqueued: they're fired
    /// on the scheduler's own cadence, which the dedup TTL can't be sized
    /// against without silently dropping legitimate periodic fires.
    pub async fn enqueue(&self, envelope: TaskEnvelope) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let idempotency_key = envelope.idempotency_key();
        let dedup_key = idempotency_key.as_ref().map(|key| format!("vod:dedup:{}", key));
        if let Some(dedup_key) = &dedup_key {
            let exists: bool = conn.exists(dedup_key).await?;
            if exists {
                warn!(key = %idempotency_key.as_deref().unwrap_or_default(), "duplicate task rejected");
                return Err(QueueError::enqueue_failed("duplicate task"));
            }
        }

        let payload = serde_json::to_string(&envelope)?;
        let stream = self.stream_name(envelope.queue).to_string();
        let log_key = idempotency_key.as_deref().unwrap_or_else(|| envelope.kind.name());

        let message_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("task")
            .arg(&payload)
            .arg("key")
            .arg(log_key)
            .query_async(&mut conn)
            .await?;

        if let Some(dedup_key) = &dedup_key {
            conn.set_ex::<_, _, ()>(dedup_key, "1", 3600).await?;
        }

        info!(task_id = %envelope.id, queue = envelope.queue.as_str(), message_id = %message_id, "enqueued task");
        Ok(message_id)
    }

    pub async fn ack(&self, queue: QueueName, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_name(queue).to_string();

        redis::cmd("XACK")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(message_id = %message_id, "acknowledged task");
        Ok(())
    }

    pub async fn dlq(
        &self,
        queue: QueueName,
        message_id: &str,
        envelope: &TaskEnvelope,
        error: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(envelope)?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg("task")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(queue, message_id).await?;
        warn!(task_id = %envelope.id, error = %error, "moved task to dlq");
        Ok(())
    }

    pub async fn len(&self, queue: QueueName) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(self.stream_name(queue)).await?;
        Ok(len)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream).await?;
        Ok(len)
    }

    /// Reads up to `count` new messages from one queue.
    pub async fn consume(
        &self,
        queue: QueueName,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, TaskEnvelope)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_name(queue).to_string();

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        Ok(self.parse_stream_reply(result, queue).await)
    }

    /// The priority-router entry point: polls `priority` with a short block
    /// and, only if that yields nothing, polls `default`. Never fetches more
    /// than one task ahead of what the caller is about to run.
    pub async fn consume_next(
        &self,
        consumer_name: &str,
        priority_block_ms: u64,
    ) -> QueueResult<Option<(QueueName, String, TaskEnvelope)>> {
        let priority = self
            .consume(QueueName::Priority, consumer_name, priority_block_ms, 1)
            .await?;
        if let Some((id, envelope)) = priority.into_iter().next() {
            return Ok(Some((QueueName::Priority, id, envelope)));
        }

        let default = self.consume(QueueName::Default, consumer_name, 0, 1).await?;
        Ok(default
            .into_iter()
            .next()
            .map(|(id, envelope)| (QueueName::Default, id, envelope)))
    }

    async fn parse_stream_reply(
        &self,
        result: redis::streams::StreamReadReply,
        queue: QueueName,
    ) -> Vec<(String, TaskEnvelope)> {
        let mut tasks = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("task") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<TaskEnvelope>(&payload_str) {
                        Ok(envelope) => {
                            debug!(task_id = %envelope.id, "consumed task");
                            tasks.push((message_id, envelope));
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to parse task payload, acking to drop");
                            self.ack(queue, &message_id).await.ok();
                        }
                    }
                }
            }
        }
        tasks
    }

    /// Claims pending messages idle longer than `min_idle_ms` (crashed-worker recovery).
    pub async fn claim_pending(
        &self,
        queue: QueueName,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, TaskEnvelope)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let stream = self.stream_name(queue).to_string();

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);

        if pending_count == 0 {
            return Ok(Vec::new());
        }

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&stream)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut message_ids_to_claim = Vec::new();
        for detail in pending_details {
            if detail.len() >= 4 {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms))) =
                    (detail.first(), detail.get(2))
                {
                    if *idle_ms as u64 >= min_idle_ms {
                        if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                            message_ids_to_claim.push(id);
                        }
                    }
                }
            }
        }

        if message_ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for msg_id in &message_ids_to_claim {
            cmd.arg(msg_id);
        }

        let claimed_messages: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut tasks = Vec::new();
        for message in claimed_messages {
            if message.len() < 2 {
                continue;
            }
            let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) =
                (message.first(), message.get(1))
            else {
                continue;
            };
            let Ok(message_id) = String::from_utf8(id_bytes.clone()) else {
                continue;
            };

            let mut task_payload: Option<String> = None;
            let mut i = 0;
            while i + 1 < fields.len() {
                if let (Some(redis::Value::BulkString(field_bytes)), Some(redis::Value::BulkString(value_bytes))) =
                    (fields.get(i), fields.get(i + 1))
                {
                    if let (Ok(field), Ok(value)) = (
                        String::from_utf8(field_bytes.clone()),
                        String::from_utf8(value_bytes.clone()),
                    ) {
                        if field == "task" {
                            task_payload = Some(value);
                            break;
                        }
                    }
                }
                i += 2;
            }

            if let Some(payload) = task_payload {
                match serde_json::from_str::<TaskEnvelope>(&payload) {
                    Ok(envelope) => {
                        info!(task_id = %envelope.id, "claimed pending task");
                        tasks.push((message_id, envelope));
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to parse claimed task payload");
                        self.ack(queue, &message_id).await.ok();
                    }
                }
            }
        }

        Ok(tasks)
    }

    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("vod:retry:{}", message_id);
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("vod:retry:{}", message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Resets the idle timer for a still-processing task so the claim loop
    /// does not reclaim it mid-flight.
    pub async fn refresh_visibility(
        &self,
        queue: QueueName,
        consumer_name: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _res: redis::Value = redis::cmd("XCLAIM")
            .arg(self.stream_name(queue))
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
