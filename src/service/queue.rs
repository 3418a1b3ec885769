// service/queue.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::staffmodel::{AttendanceStatus, ReminderKind},
    service::error::ServiceError,
};

/// Task broker on Redis. Ready tasks sit on a list consumed with BRPOP;
/// delayed and retrying tasks sit on a sorted set scored by their fire-at
/// time in epoch milliseconds. Delivery is at-least-once under retry, and a
/// retried task may complete after one enqueued later, so nothing may depend
/// on per-worker ordering. Exhausted tasks are parked on a failed list for
/// inspection rather than dropped.
const BRPOP_TIMEOUT_SECS: usize = 5;
const PROMOTE_BATCH: isize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskPayload {
    ReliabilityUpdate {
        user_id: Uuid,
        job_id: Option<Uuid>,
        status: AttendanceStatus,
    },
    JobReminder {
        job_id: Uuid,
        kind: ReminderKind,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub task: TaskPayload,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureAction {
    Retry(Duration),
    Fail,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next attempt, doubling per completed attempt.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exp))
    }
}

impl TaskEnvelope {
    pub fn new(task: TaskPayload, max_attempts: u32) -> Self {
        TaskEnvelope {
            id: Uuid::new_v4(),
            task,
            enqueued_at: Utc::now(),
            attempts: 0,
            max_attempts,
        }
    }

    /// Account for a failed execution and decide what happens next.
    pub fn record_failure(&mut self, policy: &RetryPolicy) -> FailureAction {
        self.attempts += 1;
        if self.attempts < self.max_attempts {
            FailureAction::Retry(policy.backoff(self.attempts))
        } else {
            FailureAction::Fail
        }
    }
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &TaskPayload) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    db_client: Arc<DBClient>,
    prefix: String,
    policy: RetryPolicy,
}

impl TaskQueue {
    pub fn new(db_client: Arc<DBClient>, prefix: &str, policy: RetryPolicy) -> Self {
        TaskQueue {
            db_client,
            prefix: prefix.to_string(),
            policy,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub(crate) fn redis(&self) -> Option<&Arc<ConnectionManager>> {
        self.db_client.redis_client.as_ref()
    }

    fn ready_key(&self) -> String {
        format!("{}:ready", self.prefix)
    }

    fn delayed_key(&self) -> String {
        format!("{}:delayed", self.prefix)
    }

    fn failed_key(&self) -> String {
        format!("{}:failed", self.prefix)
    }

    fn bad_key(&self) -> String {
        format!("{}:bad_payloads", self.prefix)
    }

    pub async fn enqueue(&self, task: TaskPayload) -> Result<(), ServiceError> {
        self.enqueue_in(task, Duration::ZERO).await
    }

    /// Enqueue a task to run after `delay`. Without a configured broker this
    /// is a logged no-op so the triggering request still succeeds.
    pub async fn enqueue_in(&self, task: TaskPayload, delay: Duration) -> Result<(), ServiceError> {
        let Some(rc) = self.redis() else {
            tracing::warn!(
                "TaskQueue[{}]: Redis not configured; dropping task {:?}",
                self.prefix,
                task
            );
            return Ok(());
        };

        let envelope = TaskEnvelope::new(task, self.policy.max_attempts);
        let payload = serde_json::to_string(&envelope)?;
        let mut conn = ConnectionManager::clone(rc);

        if delay.is_zero() {
            let _: () = conn.lpush(self.ready_key(), &payload).await?;
        } else {
            let fire_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
            let _: () = conn.zadd(self.delayed_key(), &payload, fire_at).await?;
        }

        tracing::debug!(
            "TaskQueue[{}]: enqueued task {} (delay {:?})",
            self.prefix,
            envelope.id,
            delay
        );
        Ok(())
    }

    async fn requeue_after(
        &self,
        conn: &mut ConnectionManager,
        envelope: &TaskEnvelope,
        delay: Duration,
    ) -> Result<(), ServiceError> {
        let payload = serde_json::to_string(envelope)?;
        let fire_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let _: () = conn.zadd(self.delayed_key(), &payload, fire_at).await?;
        Ok(())
    }

    async fn park_failed(
        &self,
        conn: &mut ConnectionManager,
        envelope: &TaskEnvelope,
    ) -> Result<(), ServiceError> {
        let payload = serde_json::to_string(envelope)?;
        let _: () = conn.lpush(self.failed_key(), &payload).await?;
        Ok(())
    }
}

/// Queue consumer. One instance per queue, spawned by the worker binary;
/// polls Redis with BRPOP and dispatches decoded tasks to its handler.
pub struct TaskWorker {
    queue: TaskQueue,
    handler: Arc<dyn TaskHandler>,
    pub idle_sleep: Duration,
}

impl TaskWorker {
    pub fn new(queue: TaskQueue, handler: Arc<dyn TaskHandler>) -> Self {
        TaskWorker {
            queue,
            handler,
            idle_sleep: Duration::from_secs(2),
        }
    }

    /// Run the consumer loop until the provided shutdown signal triggers.
    pub async fn run_forever(&self, shutdown: impl std::future::Future<Output = ()>) {
        let mut shutdown = Box::pin(shutdown);

        loop {
            if futures::future::poll_immediate(&mut shutdown).await.is_some() {
                tracing::info!(
                    "TaskWorker[{}]: shutdown requested, exiting loop",
                    self.queue.prefix()
                );
                break;
            }

            let Some(rc) = self.queue.redis() else {
                tracing::warn!(
                    "TaskWorker[{}]: Redis not configured; sleeping before retrying",
                    self.queue.prefix()
                );
                sleep(self.idle_sleep).await;
                continue;
            };
            let mut conn = ConnectionManager::clone(rc);

            if let Err(e) = self.promote_due(&mut conn).await {
                tracing::error!(
                    "TaskWorker[{}]: failed to promote delayed tasks: {}",
                    self.queue.prefix(),
                    e
                );
            }

            match redis::cmd("BRPOP")
                .arg(self.queue.ready_key())
                .arg(BRPOP_TIMEOUT_SECS)
                .query_async::<_, Option<(String, String)>>(&mut conn)
                .await
            {
                Ok(Some((_key, payload))) => self.process(&mut conn, &payload).await,
                Ok(None) => {
                    // timeout, no data
                }
                Err(e) => {
                    tracing::error!(
                        "TaskWorker[{}]: redis brpop error: {}",
                        self.queue.prefix(),
                        e
                    );
                    sleep(self.idle_sleep).await;
                }
            }
        }

        tracing::info!("TaskWorker[{}]: stopped", self.queue.prefix());
    }

    /// Move delayed tasks whose fire-at time has passed onto the ready list.
    /// ZREM decides the winner when several consumers race on the same task.
    async fn promote_due(&self, conn: &mut ConnectionManager) -> Result<(), redis::RedisError> {
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore_limit(self.queue.delayed_key(), 0i64, now, 0, PROMOTE_BATCH)
            .await?;

        for payload in due {
            let removed: i64 = conn.zrem(self.queue.delayed_key(), &payload).await?;
            if removed > 0 {
                let _: () = conn.lpush(self.queue.ready_key(), &payload).await?;
            }
        }

        Ok(())
    }

    async fn process(&self, conn: &mut ConnectionManager, payload: &str) {
        let mut envelope = match serde_json::from_str::<TaskEnvelope>(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    "TaskWorker[{}]: invalid task payload: {} ; payload: {}",
                    self.queue.prefix(),
                    e,
                    payload
                );
                let _: Result<(), _> = conn.lpush(self.queue.bad_key(), payload).await;
                return;
            }
        };

        match self.handler.handle(&envelope.task).await {
            Ok(()) => {
                tracing::info!(
                    "TaskWorker[{}]: task {} completed",
                    self.queue.prefix(),
                    envelope.id
                );
            }
            Err(e) => match envelope.record_failure(&self.queue.policy()) {
                FailureAction::Retry(delay) => {
                    tracing::warn!(
                        "TaskWorker[{}]: task {} failed (attempt {}/{}): {}; retrying in {:?}",
                        self.queue.prefix(),
                        envelope.id,
                        envelope.attempts,
                        envelope.max_attempts,
                        e,
                        delay
                    );
                    if let Err(re) = self.queue.requeue_after(conn, &envelope, delay).await {
                        tracing::error!(
                            "TaskWorker[{}]: failed to requeue task {}: {}",
                            self.queue.prefix(),
                            envelope.id,
                            re
                        );
                    }
                }
                FailureAction::Fail => {
                    tracing::error!(
                        "TaskWorker[{}]: task {} failed after {} attempts: {}; parking on failed list",
                        self.queue.prefix(),
                        envelope.id,
                        envelope.attempts,
                        e
                    );
                    if let Err(pe) = self.queue.park_failed(conn, &envelope).await {
                        tracing::error!(
                            "TaskWorker[{}]: failed to park task {}: {}",
                            self.queue.prefix(),
                            envelope.id,
                            pe
                        );
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn reliability_task() -> TaskPayload {
        TaskPayload::ReliabilityUpdate {
            user_id: Uuid::nil(),
            job_id: None,
            status: AttendanceStatus::Completed,
        }
    }

    #[test]
    fn always_failing_task_is_attempted_exactly_three_times() {
        let policy = RetryPolicy::default();
        let mut envelope = TaskEnvelope::new(reliability_task(), policy.max_attempts);

        // first two failed executions schedule a retry
        assert!(matches!(
            envelope.record_failure(&policy),
            FailureAction::Retry(_)
        ));
        assert!(matches!(
            envelope.record_failure(&policy),
            FailureAction::Retry(_)
        ));
        // the third is terminal
        assert_eq!(envelope.record_failure(&policy), FailureAction::Fail);
        assert_eq!(envelope.attempts, 3);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 30_000,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(30_000));
        assert_eq!(policy.backoff(2), Duration::from_millis(60_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(120_000));
    }

    #[test]
    fn retry_delays_follow_the_policy() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1_000,
        };
        let mut envelope = TaskEnvelope::new(reliability_task(), policy.max_attempts);

        assert_eq!(
            envelope.record_failure(&policy),
            FailureAction::Retry(Duration::from_millis(1_000))
        );
        assert_eq!(
            envelope.record_failure(&policy),
            FailureAction::Retry(Duration::from_millis(2_000))
        );
        assert_eq!(envelope.record_failure(&policy), FailureAction::Fail);
    }

    #[test]
    fn payloads_are_tagged_by_task_type() {
        let reliability = serde_json::to_value(reliability_task()).unwrap();
        assert_eq!(reliability["type"], "reliability-update");
        assert_eq!(reliability["status"], "completed");

        let reminder = serde_json::to_value(TaskPayload::JobReminder {
            job_id: Uuid::nil(),
            kind: ReminderKind::PreShift,
        })
        .unwrap();
        assert_eq!(reminder["type"], "job-reminder");
    }

    #[tokio::test]
    async fn enqueue_without_broker_is_a_noop() {
        let pool = PgPool::connect_lazy("postgres://localhost/crewnest").unwrap();
        let db_client = Arc::new(DBClient::new(pool));
        let queue = TaskQueue::new(db_client, "tasks:test", RetryPolicy::default());

        assert!(queue.enqueue(reliability_task()).await.is_ok());
    }
}
