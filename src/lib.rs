pub mod config;
pub mod db;
pub mod models;
pub mod service;
pub mod utils;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::Config,
    db::db::DBClient,
    service::{
        badge_service::BadgeService,
        error::ServiceError,
        matching_service::MatchingService,
        notification_service::NotificationService,
        queue::{RetryPolicy, TaskHandler, TaskPayload, TaskQueue},
        reliability_service::ReliabilityService,
        reminder_service::ReminderService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub matching_service: Arc<MatchingService>,
    pub reliability_service: Arc<ReliabilityService>,
    pub badge_service: Arc<BadgeService>,
    pub reminder_service: Arc<ReminderService>,
    pub notification_service: Arc<NotificationService>,
    // Queues (one consumer each in the worker binary)
    pub reliability_queue: TaskQueue,
    pub reminder_queue: TaskQueue,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client = Arc::new(db_client);

        let policy = RetryPolicy {
            max_attempts: config.queue_max_attempts,
            base_delay_ms: config.queue_retry_base_ms,
        };
        let reliability_queue =
            TaskQueue::new(db_client.clone(), &config.reliability_queue_prefix, policy);
        let reminder_queue =
            TaskQueue::new(db_client.clone(), &config.reminder_queue_prefix, policy);

        let notification_service = Arc::new(NotificationService::new(db_client.clone()));
        let matching_service = Arc::new(MatchingService::new(db_client.clone()));
        let badge_service = Arc::new(BadgeService::new(db_client.clone()));
        let reliability_service = Arc::new(ReliabilityService::new(
            db_client.clone(),
            reliability_queue.clone(),
            config.reliability_dedup,
        ));
        let reminder_service = Arc::new(ReminderService::new(
            db_client.clone(),
            reminder_queue.clone(),
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client,
            matching_service,
            reliability_service,
            badge_service,
            reminder_service,
            notification_service,
            reliability_queue,
            reminder_queue,
        }
    }

    pub fn task_dispatcher(&self) -> Arc<TaskDispatcher> {
        Arc::new(TaskDispatcher {
            reliability_service: self.reliability_service.clone(),
            reminder_service: self.reminder_service.clone(),
        })
    }
}

/// Routes decoded queue tasks to their handling service. Both queues share
/// one dispatcher; the payload tag decides.
pub struct TaskDispatcher {
    reliability_service: Arc<ReliabilityService>,
    reminder_service: Arc<ReminderService>,
}

#[async_trait]
impl TaskHandler for TaskDispatcher {
    async fn handle(&self, task: &TaskPayload) -> Result<(), ServiceError> {
        match task {
            TaskPayload::ReliabilityUpdate {
                user_id,
                job_id,
                status,
            } => {
                self.reliability_service
                    .apply_attendance_event(*user_id, *job_id, *status)
                    .await
            }
            TaskPayload::JobReminder { job_id, kind } => {
                self.reminder_service
                    .handle_job_reminder(*job_id, *kind)
                    .await
            }
        }
    }
}
