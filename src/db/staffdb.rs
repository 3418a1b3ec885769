// db/staffdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::staffmodel::*;

#[async_trait]
pub trait StaffExt {
    async fn get_worker_profile(&self, user_id: Uuid) -> Result<WorkerProfile, Error>;

    async fn get_worker_stats(&self, user_id: Uuid) -> Result<WorkerStats, Error>;

    /// Distinct categories of jobs the worker has a completed application in.
    async fn get_completed_application_categories(&self, worker_id: Uuid)
        -> Result<Vec<String>, Error>;

    /// Bump the counter for the given attendance outcome and return the
    /// post-increment (completed, no_show) pair in one statement.
    async fn increment_attendance_counter(
        &self,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<(i32, i32), Error>;

    async fn set_reliability_score(&self, user_id: Uuid, score: i32) -> Result<(), Error>;

    /// (total hours, distinct events) over the worker's finalized sessions.
    async fn get_worker_session_totals(&self, worker_id: Uuid) -> Result<(f64, i64), Error>;

    async fn get_recent_sessions(
        &self,
        worker_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WorkSession>, Error>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<JobPosting>, Error>;

    async fn get_accepted_applications(&self, job_id: Uuid)
        -> Result<Vec<JobApplication>, Error>;

    /// Record a (worker, job, event) delivery. Returns false when the tuple
    /// was already recorded, i.e. this is a redelivery.
    async fn mark_attendance_event_processed(
        &self,
        worker_id: Uuid,
        job_id: Uuid,
        event_type: &str,
    ) -> Result<bool, Error>;
}

#[async_trait]
impl StaffExt for DBClient {
    async fn get_worker_profile(&self, user_id: Uuid) -> Result<WorkerProfile, Error> {
        sqlx::query_as::<_, WorkerProfile>(
            r#"
            SELECT
                id, user_id,
                skills, lat, lng,
                available_weekdays, available_weekends, is_flexible,
                reliability_score,
                created_at, updated_at
            FROM worker_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_worker_stats(&self, user_id: Uuid) -> Result<WorkerStats, Error> {
        sqlx::query_as::<_, WorkerStats>(
            r#"
            SELECT id, completed_jobs_count, no_show_count, rating_avg, total_ratings
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_completed_application_categories(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<String>, Error> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT DISTINCT j.category
            FROM job_applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.worker_id = $1
              AND a.status = 'completed'
              AND j.category IS NOT NULL
            "#,
        )
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(category,)| category).collect())
    }

    async fn increment_attendance_counter(
        &self,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<(i32, i32), Error> {
        let query = match status {
            AttendanceStatus::Completed => {
                r#"
                UPDATE users
                SET completed_jobs_count = completed_jobs_count + 1, updated_at = NOW()
                WHERE id = $1
                RETURNING completed_jobs_count, no_show_count
                "#
            }
            AttendanceStatus::NoShow => {
                r#"
                UPDATE users
                SET no_show_count = no_show_count + 1, updated_at = NOW()
                WHERE id = $1
                RETURNING completed_jobs_count, no_show_count
                "#
            }
        };

        sqlx::query_as::<_, (i32, i32)>(query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn set_reliability_score(&self, user_id: Uuid, score: i32) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE worker_profiles
            SET reliability_score = $1, updated_at = NOW()
            WHERE user_id = $2
            "#,
        )
        .bind(score)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_worker_session_totals(&self, worker_id: Uuid) -> Result<(f64, i64), Error> {
        sqlx::query_as::<_, (f64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(total_hours), 0)::DOUBLE PRECISION,
                COUNT(DISTINCT event_id)
            FROM work_sessions
            WHERE worker_id = $1
              AND checked_out_at IS NOT NULL
            "#,
        )
        .bind(worker_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_recent_sessions(
        &self,
        worker_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WorkSession>, Error> {
        sqlx::query_as::<_, WorkSession>(
            r#"
            SELECT id, event_id, job_id, worker_id, total_hours, checked_in_at, checked_out_at
            FROM work_sessions
            WHERE worker_id = $1
              AND checked_out_at IS NOT NULL
            ORDER BY checked_out_at DESC
            LIMIT $2
            "#,
        )
        .bind(worker_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<JobPosting>, Error> {
        sqlx::query_as::<_, JobPosting>(
            r#"
            SELECT
                id, organizer_id, title, category, required_skills,
                lat, lng, pay_per_person, date_start, status,
                created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_accepted_applications(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<JobApplication>, Error> {
        sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT id, job_id, worker_id, status, created_at
            FROM job_applications
            WHERE job_id = $1
              AND status = 'accepted'
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_attendance_event_processed(
        &self,
        worker_id: Uuid,
        job_id: Uuid,
        event_type: &str,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_attendance_events (worker_id, job_id, event_type, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (worker_id, job_id, event_type) DO NOTHING
            "#,
        )
        .bind(worker_id)
        .bind(job_id)
        .bind(event_type)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
