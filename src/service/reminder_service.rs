// service/reminder_service.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, staffdb::StaffExt},
    models::staffmodel::{JobPosting, JobStatus, ReminderKind},
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        queue::{TaskPayload, TaskQueue},
    },
};

pub const REMINDER_LEAD_HOURS: i64 = 24;

/// Schedules and delivers pre-shift reminders through the delayed queue.
#[derive(Debug, Clone)]
pub struct ReminderService {
    db_client: Arc<DBClient>,
    queue: TaskQueue,
    notification_service: Arc<NotificationService>,
}

impl ReminderService {
    pub fn new(
        db_client: Arc<DBClient>,
        queue: TaskQueue,
        notification_service: Arc<NotificationService>,
    ) -> Self {
        Self {
            db_client,
            queue,
            notification_service,
        }
    }

    /// Queue a reminder for a job after the given delay. Called by the
    /// application-acceptance handler.
    pub async fn schedule(
        &self,
        job_id: Uuid,
        kind: ReminderKind,
        delay: std::time::Duration,
    ) -> Result<(), ServiceError> {
        self.queue
            .enqueue_in(TaskPayload::JobReminder { job_id, kind }, delay)
            .await
    }

    /// Queue the standard reminder 24 hours before the shift starts. Jobs
    /// already inside the lead window get the reminder immediately; jobs
    /// without a start time get none.
    pub async fn schedule_pre_shift(&self, job: &JobPosting) -> Result<(), ServiceError> {
        let Some(start) = job.date_start else {
            return Ok(());
        };

        let fire_at = start - Duration::hours(REMINDER_LEAD_HOURS);
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        self.schedule(job.id, ReminderKind::PreShift, delay).await
    }

    /// Task-handler path: fan the reminder out to every accepted applicant.
    /// A stale reminder whose job was cancelled or already ran is a no-op;
    /// delayed tasks are never proactively removed.
    pub async fn handle_job_reminder(
        &self,
        job_id: Uuid,
        kind: ReminderKind,
    ) -> Result<(), ServiceError> {
        let Some(job) = self.db_client.get_job_by_id(job_id).await? else {
            tracing::warn!(
                "ReminderService: job {} no longer exists; dropping reminder",
                job_id
            );
            return Ok(());
        };

        if !reminder_still_relevant(&job) {
            tracing::info!(
                "ReminderService: job {} is {:?}; skipping reminder",
                job_id,
                job.status
            );
            return Ok(());
        }

        let applications = self.db_client.get_accepted_applications(job_id).await?;
        if applications.is_empty() {
            tracing::info!(
                "ReminderService: job {} has no accepted applications; nothing to send",
                job_id
            );
            return Ok(());
        }

        for application in &applications {
            self.notification_service
                .notify_shift_reminder(application.worker_id, &job, kind)
                .await?;
        }

        tracing::info!(
            "ReminderService: sent {} {} reminders for job {}",
            applications.len(),
            kind.as_str(),
            job_id
        );
        Ok(())
    }
}

/// Whether a reminder for this job is still worth sending.
pub fn reminder_still_relevant(job: &JobPosting) -> bool {
    matches!(
        job.status,
        Some(JobStatus::Open) | Some(JobStatus::InProgress) | None
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::BigDecimal;

    fn job_with_status(status: Option<JobStatus>) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Festival gate".to_string(),
            category: None,
            required_skills: vec![],
            lat: None,
            lng: None,
            pay_per_person: BigDecimal::from(20),
            date_start: None,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn upcoming_jobs_still_get_reminders() {
        assert!(reminder_still_relevant(&job_with_status(Some(
            JobStatus::Open
        ))));
        assert!(reminder_still_relevant(&job_with_status(Some(
            JobStatus::InProgress
        ))));
        assert!(reminder_still_relevant(&job_with_status(None)));
    }

    #[test]
    fn finished_jobs_do_not() {
        assert!(!reminder_still_relevant(&job_with_status(Some(
            JobStatus::Cancelled
        ))));
        assert!(!reminder_still_relevant(&job_with_status(Some(
            JobStatus::Completed
        ))));
    }
}
