use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

/// Attendance outcome reported at check-out (or by the no-show sweep).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AttendanceStatus {
    Completed,
    NoShow,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Completed => "completed",
            AttendanceStatus::NoShow => "no-show",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    PreShift,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::PreShift => "pre_shift",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WorkerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skills: Option<Vec<String>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub available_weekdays: Option<bool>,  // Database has DEFAULT FALSE, can be NULL
    pub available_weekends: Option<bool>,  // Database has DEFAULT FALSE, can be NULL
    pub is_flexible: Option<bool>,         // Database has DEFAULT FALSE, can be NULL
    pub reliability_score: Option<i32>,    // 0-100, database has DEFAULT 100
    pub created_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
    pub updated_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
}

/// Attendance and rating counters off the users table.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WorkerStats {
    pub id: Uuid,
    pub completed_jobs_count: Option<i32>, // Database has DEFAULT 0, can be NULL
    pub no_show_count: Option<i32>,        // Database has DEFAULT 0, can be NULL
    pub rating_avg: Option<f32>,           // Database has DEFAULT 0.0, can be NULL
    pub total_ratings: Option<i32>,        // Database has DEFAULT 0, can be NULL
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobPosting {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub required_skills: Vec<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub pay_per_person: BigDecimal,
    pub date_start: Option<DateTime<Utc>>,
    pub status: Option<JobStatus>,         // Database has DEFAULT 'open', can be NULL
    pub created_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
    pub updated_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub status: Option<String>,            // Database has DEFAULT 'applied', can be NULL
    pub created_at: Option<DateTime<Utc>>, // Database has DEFAULT NOW(), can be NULL
}

/// One worked shift. Created at check-in, finalized at check-out; the badge
/// engine only ever reads finalized sessions in aggregate.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkSession {
    pub id: Uuid,
    pub event_id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub total_hours: Option<f64>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
}
