//! Task executor: broker-driven dispatch over the closed task catalogue.
//!
//! A semaphore-gated consume loop, a periodic pending-claim sweep for
//! crashed-worker recovery, and retry-count/DLQ bookkeeping on failure,
//! running over the broker's two-queue priority discipline and the
//! nine-variant task kind.
//! The scheduler's fires are bridged onto the broker through a channel since
//! `Scheduler::run`'s callback is synchronous.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vod_broker::{DedupLedger, DownloadCache, TaskBroker};
use vod_client::VodClient;
use vod_models::{AlertLevel, CityDescriptor, PipelineContext, QueueName, TaskEnvelope, TaskKind};
use vod_storage::CityRegistry;

use crate::alerts::AlertSink;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::health;
use crate::metrics;
use crate::pipeline::{self, PipelineDeps};
use crate::scheduler::Scheduler;

/// "up to K (default 1)" per `discover.all_cities`.
const DISCOVERY_SUBMIT_LIMIT_PER_CITY: usize = 1;
/// "up to M default-queue candidates" per `maintenance.backfill`; M is
/// otherwise unbounded, so this is a conservative per-run cap.
const BACKFILL_SUBMIT_LIMIT: usize = 10;
const TEMP_FILE_PREFIX: &str = "vod_";
const TEMP_FILE_STALE_AFTER: Duration = Duration::from_secs(3600);

/// Owns the broker consume loop, the pending-claim sweep, and the scheduler.
pub struct Executor {
    config: WorkerConfig,
    broker: Arc<TaskBroker>,
    dedup: DedupLedger,
    deps: PipelineDeps,
    cities: CityRegistry,
    client: VodClient,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl Executor {
    pub fn new(
        config: WorkerConfig,
        broker: TaskBroker,
        client: VodClient,
        cities: CityRegistry,
        alerts: Arc<AlertSink>,
    ) -> WorkerResult<Self> {
        let broker = Arc::new(broker);
        let dedup = DedupLedger::from_env(broker.redis_client());
        let download_cache = DownloadCache::new(broker.redis_client());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WorkerError::config_error(format!("failed to build http client: {e}")))?;

        let deps = PipelineDeps {
            cities: Arc::clone(&cities),
            client: client.clone(),
            http,
            download_cache,
            alerts,
            work_dir: PathBuf::from(&config.work_dir),
            transcribing: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        };

        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Ok(Self {
            config,
            broker,
            dedup,
            deps,
            cities,
            client,
            job_semaphore,
            shutdown,
            consumer_name,
        })
    }

    /// Runs the executor: scheduler, pending-claim sweep, and main consume
    /// loop concurrently, all torn down together on shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            consumer = %self.consumer_name,
            max_jobs = self.config.max_concurrent_jobs,
            "starting executor"
        );

        self.broker.init().await?;
        if let Err(e) = tokio::fs::create_dir_all(&self.deps.work_dir).await {
            warn!(dir = %self.deps.work_dir.display(), error = %e, "failed to create work dir");
        }

        let mut shutdown_rx = self.shutdown.subscribe();

        // The scheduler's on_fire callback is synchronous; bridge its fires
        // onto the broker through a channel drained by an async task.
        let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<(TaskKind, String)>();
        let enqueue_broker = Arc::clone(&self.broker);
        let enqueue_task = tokio::spawn(async move {
            while let Some((kind, name)) = fire_rx.recv().await {
                let queue = match &kind {
                    TaskKind::DiscoverAllCities { priority: true } => QueueName::Priority,
                    _ => QueueName::Default,
                };
                let envelope = TaskEnvelope::new(kind, queue);
                if let Err(e) = enqueue_broker.enqueue(envelope).await {
                    debug!(entry = %name, error = %e, "scheduled task not enqueued");
                }
            }
        });

        let mut scheduler = Scheduler::new(&self.config);
        let scheduler_task = tokio::spawn(async move {
            scheduler
                .run(move |kind, name| {
                    let _ = fire_tx.send((kind.clone(), name.to_string()));
                })
                .await;
        });

        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_once() => {
                    if let Err(e) = result {
                        error!(error = %e, "error consuming tasks");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        scheduler_task.abort();
        claim_task.abort();
        enqueue_task.abort();

        info!("waiting for in-flight tasks to complete");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_tasks()).await;
        info!("executor stopped");
        Ok(())
    }

    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let broker = Arc::clone(&self.broker);
        let dedup = self.dedup.clone();
        let deps = self.deps.clone();
        let cities = Arc::clone(&self.cities);
        let client = self.client.clone();
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let claim_interval = self.config.claim_interval;
        let claim_min_idle_ms = self.config.claim_min_idle.as_millis() as u64;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(claim_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        for queue in [QueueName::Priority, QueueName::Default] {
                            match broker.claim_pending(queue, &consumer_name, claim_min_idle_ms, 5).await {
                                Ok(tasks) if !tasks.is_empty() => {
                                    info!(queue = queue.as_str(), count = tasks.len(), "claimed pending tasks");
                                    for (message_id, envelope) in tasks {
                                        let Ok(permit) = semaphore.clone().acquire_owned().await else {
                                            break;
                                        };
                                        let broker = Arc::clone(&broker);
                                        let dedup = dedup.clone();
                                        let deps = deps.clone();
                                        let cities = Arc::clone(&cities);
                                        let client = client.clone();
                                        tokio::spawn(async move {
                                            let _permit = permit;
                                            execute_task(broker, dedup, deps, cities, client, queue, message_id, envelope)
                                                .await;
                                        });
                                    }
                                }
                                Ok(_) => {}
                                Err(e) => warn!(error = %e, "failed to claim pending tasks"),
                            }
                        }
                    }
                }
            }
        })
    }

    async fn consume_once(&self) -> WorkerResult<()> {
        health::touch_heartbeat(&self.broker).await;

        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let Some((queue, message_id, envelope)) = self.broker.consume_next(&self.consumer_name, 1000).await?
        else {
            return Ok(());
        };

        let permit = self
            .job_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::task_failed("semaphore closed"))?;

        let broker = Arc::clone(&self.broker);
        let dedup = self.dedup.clone();
        let deps = self.deps.clone();
        let cities = Arc::clone(&self.cities);
        let client = self.client.clone();

        tokio::spawn(async move {
            let _permit = permit;
            execute_task(broker, dedup, deps, cities, client, queue, message_id, envelope).await;
        });

        Ok(())
    }

    async fn wait_for_tasks(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Executes one task outside the holder's lock: dispatches, then acks or
/// retries/DLQs. `pipeline.process_single` always acks — `run_pipeline`
/// resolves every outcome to a terminal, alerted result on its own.
async fn execute_task(
    broker: Arc<TaskBroker>,
    dedup: DedupLedger,
    deps: PipelineDeps,
    cities: CityRegistry,
    client: VodClient,
    queue: QueueName,
    message_id: String,
    envelope: TaskEnvelope,
) {
    let task_name = envelope.kind.name();
    debug!(task_id = %envelope.id, task = task_name, "executing task");

    let result = dispatch(&envelope.kind, &deps, &cities, &client, &broker, &dedup).await;

    match result {
        Ok(()) => {
            if let Err(e) = broker.ack(queue, &message_id).await {
                error!(task_id = %envelope.id, error = %e, "failed to ack task");
            }
        }
        Err(e) => {
            warn!(task_id = %envelope.id, task = task_name, error = %e, "task failed");
            let retry_count = broker.increment_retry(&message_id).await.unwrap_or(u32::MAX);
            if retry_count >= broker.max_retries() {
                warn!(task_id = %envelope.id, retries = retry_count, "exceeded max retries, moving to dlq");
                if let Err(dlq_err) = broker.dlq(queue, &message_id, &envelope, &e.to_string()).await {
                    error!(task_id = %envelope.id, error = %dlq_err, "failed to move task to dlq");
                }
            }
        }
    }
}

async fn dispatch(
    kind: &TaskKind,
    deps: &PipelineDeps,
    cities: &CityRegistry,
    client: &VodClient,
    broker: &TaskBroker,
    dedup: &DedupLedger,
) -> WorkerResult<()> {
    match kind {
        TaskKind::DiscoverAllCities { priority } => discover_all_cities(*priority, cities, broker, dedup).await,
        TaskKind::PipelineProcessSingle { video_id, city_id, local_path } => {
            let ctx = PipelineContext::new(video_id.clone(), city_id.clone(), local_path.as_ref().map(PathBuf::from));
            pipeline::run_pipeline(ctx, deps).await;
            Ok(())
        }
        TaskKind::MediaTranscribe { video_path } => vod_media::transcribe(Path::new(video_path))
            .await
            .map(|_| ())
            .map_err(WorkerError::from),
        TaskKind::MediaRemuxWithCaptions { video_path, caption_path, output_path } => {
            vod_media::remux_with_captions(Path::new(video_path), Path::new(caption_path), Path::new(output_path))
                .await
                .map(|_| ())
                .map_err(WorkerError::from)
        }
        TaskKind::VodUpload { video_id, captioned_path, caption_path } => {
            client.upload_video_file(video_id, Path::new(captioned_path)).await?;
            client.upload_caption_file(video_id, Path::new(caption_path)).await?;
            Ok(())
        }
        TaskKind::VodValidateQuality { video_path } => vod_media::probe_video(Path::new(video_path))
            .await
            .map(|_| ())
            .map_err(WorkerError::from),
        TaskKind::MaintenanceCleanupTemp => cleanup_temp(deps).await,
        TaskKind::MaintenanceBackfill => maintenance_backfill(deps, cities, broker, dedup).await,
        TaskKind::HealthAggregate => health_aggregate(cities, broker, client, deps).await,
    }
}

/// Scans every city, filters by caption predicate and dedup ledger, submits
/// up to `DISCOVERY_SUBMIT_LIMIT_PER_CITY` candidates each onto `queue`.
async fn discover_all_cities(
    priority: bool,
    cities: &CityRegistry,
    broker: &TaskBroker,
    dedup: &DedupLedger,
) -> WorkerResult<()> {
    let queue = if priority { QueueName::Priority } else { QueueName::Default };

    for city in cities.values() {
        metrics::record_counter(metrics::names::AUTOPRIORITIZE_SCANNED);
        let candidates = vod_storage::scan_mount(&city.mount_path, &city.id, 5000);
        let global_output_dir = city.mount_path.join("vod_processed");
        let mut submitted = 0usize;

        for (idx, candidate) in candidates.iter().enumerate() {
            if submitted >= DISCOVERY_SUBMIT_LIMIT_PER_CITY {
                break;
            }
            if !city.title_matches(&candidate.basename()) {
                continue;
            }
            if vod_storage::has_caption(&candidate.path, Some(global_output_dir.as_path())) {
                metrics::record_counter(metrics::names::AUTOPRIORITIZE_SKIPPED_CAPTIONED);
                continue;
            }

            let dedup_key = candidate.path.display().to_string();
            if dedup.has(&dedup_key).await {
                metrics::record_counter(metrics::names::AUTOPRIORITIZE_SKIPPED_ALREADYQUEUED);
                continue;
            }

            let envelope = TaskEnvelope::new(
                TaskKind::PipelineProcessSingle {
                    video_id: format!("flex_{}_{}", city.id, idx),
                    city_id: city.id.clone(),
                    local_path: Some(candidate.path.display().to_string()),
                },
                queue,
            );

            match broker.enqueue(envelope).await {
                Ok(_) => {
                    dedup.add(&dedup_key).await.ok();
                    metrics::record_city_enqueued(city.id.as_str());
                    submitted += 1;
                }
                Err(e) => warn!(city = %city.id, error = %e, "failed to enqueue discovered candidate"),
            }
        }
    }
    Ok(())
}

/// Deletes temp files under the work dir older than an hour whose names
/// carry the worker's download prefix. Never fails the task on I/O error.
async fn cleanup_temp(deps: &PipelineDeps) -> WorkerResult<()> {
    let mut entries = match tokio::fs::read_dir(&deps.work_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %deps.work_dir.display(), error = %e, "cannot read work dir for cleanup");
            return Ok(());
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(TEMP_FILE_PREFIX) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else { continue };
        let Ok(modified) = meta.modified() else { continue };
        let stale = modified.elapsed().map(|age| age >= TEMP_FILE_STALE_AFTER).unwrap_or(false);
        if stale {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed stale temp file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale temp file"),
            }
        }
    }
    Ok(())
}

/// Gated on no active transcription in this process and both queues empty;
/// submits from writable, surface-level-scanned mounts only.
async fn maintenance_backfill(
    deps: &PipelineDeps,
    cities: &CityRegistry,
    broker: &TaskBroker,
    dedup: &DedupLedger,
) -> WorkerResult<()> {
    if deps.transcribing.load(Ordering::SeqCst) > 0 {
        debug!("skipping backfill: a transcription is active in this process");
        return Ok(());
    }

    let priority_len = broker.len(QueueName::Priority).await.unwrap_or(0);
    let default_len = broker.len(QueueName::Default).await.unwrap_or(0);
    if priority_len > 0 || default_len > 0 {
        debug!(priority_len, default_len, "skipping backfill: queues not empty");
        return Ok(());
    }

    let mut submitted = 0usize;
    for city in cities.values() {
        if submitted >= BACKFILL_SUBMIT_LIMIT {
            break;
        }
        if !vod_storage::is_mountpoint(&city.mount_path) || !vod_storage::is_writable(&city.mount_path) {
            continue;
        }

        let candidates = vod_storage::scan_mount(&city.mount_path, &city.id, 5000);
        let global_output_dir = city.mount_path.join("vod_processed");

        for (idx, candidate) in candidates.iter().enumerate() {
            if submitted >= BACKFILL_SUBMIT_LIMIT {
                break;
            }
            if vod_storage::has_caption(&candidate.path, Some(global_output_dir.as_path())) {
                continue;
            }
            let dedup_key = candidate.path.display().to_string();
            if dedup.has(&dedup_key).await {
                continue;
            }

            let envelope = TaskEnvelope::new(
                TaskKind::PipelineProcessSingle {
                    video_id: format!("flex_{}_{}", city.id, idx),
                    city_id: city.id.clone(),
                    local_path: Some(candidate.path.display().to_string()),
                },
                QueueName::Default,
            );
            if broker.enqueue(envelope).await.is_ok() {
                dedup.add(&dedup_key).await.ok();
                submitted += 1;
            }
        }
    }
    Ok(())
}

async fn health_aggregate(
    cities: &CityRegistry,
    broker: &TaskBroker,
    client: &VodClient,
    deps: &PipelineDeps,
) -> WorkerResult<()> {
    let city_list: Vec<CityDescriptor> = cities.values().cloned().collect();
    let report = health::run_health_checks(&city_list, broker, client).await;

    if report.status != health::CheckState::Healthy {
        let unhealthy: Vec<String> = report
            .checks
            .iter()
            .filter(|c| c.status != health::CheckState::Healthy)
            .map(|c| c.name.clone())
            .collect();
        let mut context = BTreeMap::new();
        context.insert("status".to_string(), format!("{:?}", report.status));
        context.insert("checks".to_string(), unhealthy.join(", "));
        deps.alerts.emit(AlertLevel::Warning, "health check degraded", context).await;
    }
    Ok(())
}
