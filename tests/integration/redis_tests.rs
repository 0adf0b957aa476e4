//! Broker integration tests.

/// Test broker connection and basic operations.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_broker_connection() {
    dotenvy::dotenv().ok();

    let broker = vod_broker::TaskBroker::from_env().expect("failed to create broker");
    broker.init().await.expect("failed to initialize broker");

    let len = broker
        .len(vod_models::QueueName::Default)
        .await
        .expect("failed to get queue length");
    println!("default queue length: {}", len);
}

/// Test task enqueue and consume cycle on the default queue.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_task_enqueue_consume() {
    use vod_models::{CityId, QueueName, TaskEnvelope, TaskKind};

    dotenvy::dotenv().ok();

    let broker = vod_broker::TaskBroker::from_env().expect("failed to create broker");
    broker.init().await.expect("failed to initialize broker");

    let envelope = TaskEnvelope::new(
        TaskKind::PipelineProcessSingle {
            video_id: "flex_flex3_0".to_string(),
            city_id: CityId::new("flex3"),
            local_path: None,
        },
        QueueName::Default,
    );
    let task_id = envelope.id.clone();

    broker.enqueue(envelope).await.expect("failed to enqueue");

    let consumer_name = "test-consumer";
    let tasks = broker
        .consume(QueueName::Default, consumer_name, 1000, 1)
        .await
        .expect("failed to consume");

    assert_eq!(tasks.len(), 1);
    let (message_id, consumed) = &tasks[0];
    assert_eq!(consumed.id, task_id);

    broker.ack(QueueName::Default, message_id).await.expect("failed to ack");
}

/// Test DLQ functionality.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_dlq() {
    use vod_models::{QueueName, TaskEnvelope, TaskKind};

    dotenvy::dotenv().ok();

    let broker = vod_broker::TaskBroker::from_env().expect("failed to create broker");
    broker.init().await.expect("failed to initialize broker");

    let envelope = TaskEnvelope::new(TaskKind::MaintenanceCleanupTemp, QueueName::Default);

    broker.enqueue(envelope.clone()).await.expect("failed to enqueue");

    let consumer_name = "test-dlq-consumer";
    let tasks = broker
        .consume(QueueName::Default, consumer_name, 1000, 1)
        .await
        .expect("failed to consume");
    assert!(!tasks.is_empty());
    let (message_id, consumed) = &tasks[0];

    broker
        .dlq(QueueName::Default, message_id, consumed, "test error")
        .await
        .expect("failed to move to dlq");

    let dlq_len = broker.dlq_len().await.expect("failed to get dlq length");
    assert!(dlq_len > 0);
}

/// Test the dedup ledger rejects a duplicate idempotency key.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_duplicate_enqueue_rejected() {
    use vod_models::{CityId, QueueName, TaskEnvelope, TaskKind};

    dotenvy::dotenv().ok();

    let broker = vod_broker::TaskBroker::from_env().expect("failed to create broker");
    broker.init().await.expect("failed to initialize broker");

    let kind = TaskKind::PipelineProcessSingle {
        video_id: "flex_flex3_dedup_test".to_string(),
        city_id: CityId::new("flex3"),
        local_path: None,
    };

    broker
        .enqueue(TaskEnvelope::new(kind.clone(), QueueName::Default))
        .await
        .expect("first enqueue should succeed");

    let result = broker.enqueue(TaskEnvelope::new(kind, QueueName::Priority)).await;
    assert!(result.is_err(), "duplicate idempotency key should be rejected");
}
