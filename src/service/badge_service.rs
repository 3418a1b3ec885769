// service/badge_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        cache::{Clock, SystemClock, TtlCache, SESSION_TOTALS_TTL},
        db::DBClient,
        staffdb::StaffExt,
    },
    models::staffmodel::WorkSession,
    service::error::ServiceError,
};

#[derive(Debug, Clone, Copy)]
pub struct BadgeTier {
    pub name: &'static str,
    pub min_hours: f64,
    pub min_events: i64,
    pub icon: &'static str,
    pub color: &'static str,
}

/// Tier ladder, lowest to highest. A tier is earned when both the hours and
/// the distinct-events thresholds are met.
pub const BADGE_TIERS: [BadgeTier; 9] = [
    BadgeTier { name: "Bronze III", min_hours: 0.0, min_events: 0, icon: "🥉", color: "#B08D57" },
    BadgeTier { name: "Bronze II", min_hours: 20.0, min_events: 2, icon: "🥉", color: "#A97142" },
    BadgeTier { name: "Bronze I", min_hours: 50.0, min_events: 5, icon: "🥉", color: "#CD7F32" },
    BadgeTier { name: "Silver III", min_hours: 100.0, min_events: 10, icon: "🥈", color: "#D7D7D7" },
    BadgeTier { name: "Silver II", min_hours: 200.0, min_events: 20, icon: "🥈", color: "#C4C4C4" },
    BadgeTier { name: "Silver I", min_hours: 350.0, min_events: 35, icon: "🥈", color: "#C0C0C0" },
    BadgeTier { name: "Gold III", min_hours: 500.0, min_events: 50, icon: "🥇", color: "#E5C100" },
    BadgeTier { name: "Gold II", min_hours: 750.0, min_events: 75, icon: "🥇", color: "#F2CA30" },
    BadgeTier { name: "Gold I", min_hours: 1000.0, min_events: 100, icon: "🥇", color: "#FFD700" },
];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub tier: String,
    pub icon: String,
    pub color: String,
    pub progress: BadgeProgress,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    pub hours_progress: i32,
    pub events_progress: i32,
    pub next_tier: Option<String>,
    pub hours_needed: f64,
    pub events_needed: i64,
}

/// Badge for the given lifetime totals. Pure: same inputs, same badge.
pub fn calculate_badge(total_hours: f64, total_events: i64) -> Badge {
    let mut tier_idx = 0;
    for (idx, tier) in BADGE_TIERS.iter().enumerate().rev() {
        if total_hours >= tier.min_hours && total_events >= tier.min_events {
            tier_idx = idx;
            break;
        }
    }
    let tier = &BADGE_TIERS[tier_idx];

    let progress = match BADGE_TIERS.get(tier_idx + 1) {
        Some(next) => BadgeProgress {
            hours_progress: (total_hours / next.min_hours * 100.0).min(100.0).round() as i32,
            events_progress: (total_events as f64 / next.min_events as f64 * 100.0)
                .min(100.0)
                .round() as i32,
            next_tier: Some(next.name.to_string()),
            hours_needed: (next.min_hours - total_hours).max(0.0),
            events_needed: (next.min_events - total_events).max(0),
        },
        None => BadgeProgress {
            hours_progress: 100,
            events_progress: 100,
            next_tier: None,
            hours_needed: 0.0,
            events_needed: 0,
        },
    };

    Badge {
        tier: tier.name.to_string(),
        icon: tier.icon.to_string(),
        color: tier.color.to_string(),
        progress,
    }
}

/// Work summary for profile and event read paths.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    pub total_hours: f64,
    pub total_events: i64,
    pub badge: Badge,
    pub recent_sessions: Vec<WorkSession>,
}

/// Read-side badge derivation. The badge itself is never stored; only the
/// session-total aggregate is memoised, briefly, per process.
pub struct BadgeService {
    db_client: Arc<DBClient>,
    totals_cache: TtlCache<Uuid, (f64, i64)>,
}

impl BadgeService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self::with_clock(db_client, Arc::new(SystemClock))
    }

    pub fn with_clock(db_client: Arc<DBClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db_client,
            totals_cache: TtlCache::new(SESSION_TOTALS_TTL, clock),
        }
    }

    /// Current badge for a worker. Badge displays never fail: if the totals
    /// cannot be loaded the worker shows the lowest tier until they can.
    pub async fn worker_badge(&self, worker_id: Uuid) -> Badge {
        let (hours, events) = self.session_totals(worker_id).await;
        calculate_badge(hours, events)
    }

    /// Badge plus the recent finalized sessions for the work-summary view.
    pub async fn worker_work_summary(
        &self,
        worker_id: Uuid,
        session_limit: i64,
    ) -> Result<WorkSummary, ServiceError> {
        let (total_hours, total_events) = self.session_totals(worker_id).await;
        let recent_sessions = self
            .db_client
            .get_recent_sessions(worker_id, session_limit)
            .await?;

        Ok(WorkSummary {
            total_hours,
            total_events,
            badge: calculate_badge(total_hours, total_events),
            recent_sessions,
        })
    }

    async fn session_totals(&self, worker_id: Uuid) -> (f64, i64) {
        if let Some(totals) = self.totals_cache.get(&worker_id) {
            return totals;
        }
        match self.db_client.get_worker_session_totals(worker_id).await {
            Ok(totals) => {
                self.totals_cache.insert(worker_id, totals);
                totals
            }
            Err(e) => {
                tracing::warn!(
                    "BadgeService: failed to load session totals for worker {}: {}; defaulting to zero",
                    worker_id,
                    e
                );
                (0.0, 0)
            }
        }
    }
}
