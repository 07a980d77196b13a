//! Delivery task queue and its fixed-cadence drain loop.
//!
//! Producers (restock fan-outs) append tasks at any time; a single consumer
//! pops one task per tick and hands it to a [`TaskHandler`]. Delivery is
//! at-most-once: a task is removed from the store before its handler runs,
//! and a failed handler drops the task instead of requeuing it.
//!
//! The backing store is swappable behind [`TaskStore`]:
//! - [`MemoryTaskStore`] — mutex-guarded `VecDeque`, lost on restart
//! - [`RedisTaskStore`] — Redis list (`RPUSH` / `LPOP`), survives restarts

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use bwr_common::error::AppError;
use bwr_common::types::DeliveryTask;

use crate::handler::{HandlerError, TaskHandler};

/// Default drain loop period.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Task codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Drain loop already started for this queue")]
    AlreadyDraining,

    #[error("Drain loop period must be greater than zero")]
    ZeroTick,
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Redis(e) => AppError::Redis(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Ordered storage for pending tasks. `push` appends to the tail and `pop`
/// removes from the head; both must be atomic with respect to each other.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn push(&self, task: DeliveryTask) -> Result<(), QueueError>;

    async fn pop(&self) -> Result<Option<DeliveryTask>, QueueError>;

    async fn len(&self) -> Result<usize, QueueError>;
}

/// Process-local FIFO store.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<VecDeque<DeliveryTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<DeliveryTask>> {
        // A panicking holder cannot leave the deque half-mutated.
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn push(&self, task: DeliveryTask) -> Result<(), QueueError> {
        self.lock().push_back(task);
        Ok(())
    }

    async fn pop(&self) -> Result<Option<DeliveryTask>, QueueError> {
        Ok(self.lock().pop_front())
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.lock().len())
    }
}

/// Redis list store. Tasks are JSON-encoded `DeliveryTask` values.
#[derive(Clone)]
pub struct RedisTaskStore {
    redis: ConnectionManager,
    key: String,
}

impl RedisTaskStore {
    pub fn new(redis: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            redis,
            key: key.into(),
        }
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn push(&self, task: DeliveryTask) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&task)?;
        let mut redis = self.redis.clone();
        redis.rpush::<_, _, ()>(&self.key, payload).await?;
        Ok(())
    }

    async fn pop(&self) -> Result<Option<DeliveryTask>, QueueError> {
        let mut redis = self.redis.clone();
        let payload: Option<String> = redis.lpop(&self.key, None).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        let mut redis = self.redis.clone();
        let len: usize = redis.llen(&self.key).await?;
        Ok(len)
    }
}

/// Result of a single drain tick that found a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Handled,
    Dropped(HandlerError),
}

/// A task whose handler failed. Reported to the failure sink, never retried.
#[derive(Debug, Clone)]
pub struct DroppedTask {
    pub task: DeliveryTask,
    pub error: HandlerError,
}

/// FIFO delivery queue with a single fixed-cadence consumer.
///
/// Cloning shares the same store and drain guard.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn TaskStore>,
    tick: Duration,
    handler_timeout: Option<Duration>,
    failure_sink: Option<mpsc::UnboundedSender<DroppedTask>>,
    draining: Arc<AtomicBool>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            tick: DEFAULT_TICK,
            handler_timeout: None,
            failure_sink: None,
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue backed by a fresh [`MemoryTaskStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTaskStore::new()))
    }

    /// Set the drain loop period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Bound each handler invocation. `None` lets a handler run forever.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Receive every task the drain loop drops.
    pub fn with_failure_sink(mut self, sink: mpsc::UnboundedSender<DroppedTask>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Append a task to the tail of the queue.
    pub async fn enqueue(&self, task: DeliveryTask) -> Result<(), QueueError> {
        tracing::debug!(
            kind = %task.kind,
            entry_id = %task.entry.id,
            "Task enqueued"
        );
        self.store.push(task).await
    }

    pub async fn len(&self) -> Result<usize, QueueError> {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.store.len().await? == 0)
    }

    /// Run one drain step: pop the head task, if any, and hand it to `handler`.
    ///
    /// Returns `Ok(None)` when the queue is empty. Handler failures are
    /// logged, reported to the failure sink and returned as
    /// [`TaskOutcome::Dropped`]; they never surface as `Err`.
    pub async fn tick(&self, handler: &dyn TaskHandler) -> Result<Option<TaskOutcome>, QueueError> {
        let Some(task) = self.store.pop().await? else {
            return Ok(None);
        };

        let result = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, handler.handle(&task)).await {
                Ok(result) => result,
                Err(_) => Err(HandlerError::TimedOut(limit)),
            },
            None => handler.handle(&task).await,
        };

        match result {
            Ok(()) => Ok(Some(TaskOutcome::Handled)),
            Err(error) => {
                tracing::error!(
                    kind = %task.kind,
                    entry_id = %task.entry.id,
                    error = %error,
                    "Delivery task failed, dropping"
                );
                if let Some(sink) = &self.failure_sink {
                    // A closed sink only means nobody is listening any more.
                    let _ = sink.send(DroppedTask {
                        task,
                        error: error.clone(),
                    });
                }
                Ok(Some(TaskOutcome::Dropped(error)))
            }
        }
    }

    /// Start the background drain loop.
    ///
    /// The first tick fires one period after the call. Each tick handles at
    /// most one task and the handler is awaited inline, so a slow handler
    /// delays the next tick instead of overlapping it. A queue can only be
    /// drained once; a second call returns [`QueueError::AlreadyDraining`].
    /// A zero period is rejected with [`QueueError::ZeroTick`].
    pub fn drain(&self, handler: Arc<dyn TaskHandler>) -> Result<JoinHandle<()>, QueueError> {
        if self.tick.is_zero() {
            return Err(QueueError::ZeroTick);
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyDraining);
        }

        let queue = self.clone();
        let period = self.tick;

        tracing::info!(
            tick_ms = period.as_millis() as u64,
            handler_timeout_secs = self.handler_timeout.map(|d| d.as_secs()),
            "Drain loop started"
        );

        Ok(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if let Err(e) = queue.tick(handler.as_ref()).await {
                    tracing::error!(error = %e, "Failed to pop delivery task");
                }
            }
        }))
    }
}
