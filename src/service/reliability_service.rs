// service/reliability_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, staffdb::StaffExt},
    models::staffmodel::AttendanceStatus,
    service::{
        error::ServiceError,
        queue::{TaskPayload, TaskQueue},
    },
};

/// Keeps worker reliability scores in step with their attendance history.
/// The triggering request only enqueues; the queue consumer does the
/// counter bump and recompute.
#[derive(Debug, Clone)]
pub struct ReliabilityService {
    db_client: Arc<DBClient>,
    queue: TaskQueue,
    dedup_enabled: bool,
}

impl ReliabilityService {
    pub fn new(db_client: Arc<DBClient>, queue: TaskQueue, dedup_enabled: bool) -> Self {
        Self {
            db_client,
            queue,
            dedup_enabled,
        }
    }

    /// Queue a reliability update for a worker. Called by the check-out and
    /// no-show handlers; the job id is only needed when redelivery dedup is
    /// switched on.
    pub async fn enqueue_update(
        &self,
        worker_id: Uuid,
        job_id: Option<Uuid>,
        status: AttendanceStatus,
    ) -> Result<(), ServiceError> {
        self.queue
            .enqueue(TaskPayload::ReliabilityUpdate {
                user_id: worker_id,
                job_id,
                status,
            })
            .await
    }

    /// Task-handler path: bump the attendance counter atomically and refresh
    /// the stored score from the post-increment values. The queue delivers
    /// at-least-once, so without dedup a redelivered event double-counts.
    pub async fn apply_attendance_event(
        &self,
        user_id: Uuid,
        job_id: Option<Uuid>,
        status: AttendanceStatus,
    ) -> Result<(), ServiceError> {
        if self.dedup_enabled {
            if let Some(job_id) = job_id {
                let first_delivery = self
                    .db_client
                    .mark_attendance_event_processed(user_id, job_id, status.as_str())
                    .await?;
                if !first_delivery {
                    tracing::info!(
                        "ReliabilityService: duplicate {} event for worker {} on job {}; skipping",
                        status.as_str(),
                        user_id,
                        job_id
                    );
                    return Ok(());
                }
            }
        }

        let (completed, no_show) = self
            .db_client
            .increment_attendance_counter(user_id, status)
            .await?;

        let score = reliability_from_counts(completed, no_show);
        self.db_client.set_reliability_score(user_id, score).await?;

        tracing::info!(
            "ReliabilityService: worker {} reliability now {} ({} completed / {} no-shows)",
            user_id,
            score,
            completed,
            no_show
        );
        Ok(())
    }

    /// Recompute from the currently stored counters. Backfill/repair path;
    /// the event path goes through apply_attendance_event.
    pub async fn recompute(&self, user_id: Uuid) -> Result<i32, ServiceError> {
        let stats = self.db_client.get_worker_stats(user_id).await?;
        let score = reliability_from_counts(
            stats.completed_jobs_count.unwrap_or(0),
            stats.no_show_count.unwrap_or(0),
        );
        self.db_client.set_reliability_score(user_id, score).await?;
        Ok(score)
    }
}

/// 0-100 reliability score from completed-vs-no-show counts. Workers with no
/// history start at full trust rather than zero.
pub fn reliability_from_counts(completed: i32, no_show: i32) -> i32 {
    let total = completed + no_show;
    if total == 0 {
        return 100;
    }
    ((completed as f64 / total as f64) * 100.0).round().max(0.0) as i32
}
