// service/notification_service.rs
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::staffmodel::{JobPosting, ReminderKind},
    service::error::ServiceError,
};

/// Stores the notification rows the platform's delivery pipeline consumes.
/// Push/email/chat delivery itself lives with the platform.
#[derive(Debug, Clone)]
pub struct NotificationService {
    db_client: Arc<DBClient>,
}

impl NotificationService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn notify_shift_reminder(
        &self,
        worker_id: Uuid,
        job: &JobPosting,
        kind: ReminderKind,
    ) -> Result<(), ServiceError> {
        tracing::info!(
            "Shift reminder: worker {} for job {} ({})",
            worker_id,
            job.id,
            kind.as_str()
        );

        self.store_notification(
            Some(worker_id),
            "shift_reminder".to_string(),
            Some(job.id),
            Some(serde_json::json!({
                "job_title": job.title,
                "starts_at": job.date_start,
                "kind": kind.as_str(),
            })),
            format!("Upcoming shift: {}", job.title),
        )
        .await
    }

    async fn store_notification(
        &self,
        user_id: Option<Uuid>,
        notification_type: String,
        job_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
        message: String,
    ) -> Result<(), ServiceError> {
        if let Some(uid) = user_id {
            sqlx::query(
                r#"
                INSERT INTO notifications
                (user_id, type, job_id, metadata, message, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                "#,
            )
            .bind(uid)
            .bind(notification_type)
            .bind(job_id)
            .bind(metadata)
            .bind(message)
            .execute(&self.db_client.pool)
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;
        }

        Ok(())
    }
}
