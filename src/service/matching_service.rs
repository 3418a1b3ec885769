// service/matching_service.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc, Weekday};
use num_traits::ToPrimitive;
use serde::Serialize;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{db::DBClient, staffdb::StaffExt},
    models::staffmodel::{JobPosting, WorkerProfile, WorkerStats},
    service::error::ServiceError,
    utils::{fuzzy::similarity, geo::distance_km},
};

/// Score weights, buckets and cutoffs in one place. Tuning the ranking is a
/// data edit here, not a code edit.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub skill_weight: f64,
    /// (max distance km, points), nearest bucket first
    pub location_buckets: [(f64, f64); 5],
    pub completed_jobs_tiers: [(i32, f64); 4],
    pub reliability_weight: f64,
    pub experience_cap: f64,
    pub rating_tiers: [(f32, f64); 4],
    pub category_bonus: f64,
    pub availability_match_bonus: f64,
    pub flexible_bonus: f64,
    pub overqualified_penalty: f64,
    pub high_rating_threshold: f32,
    pub low_pay_threshold: f64,
}

pub const WEIGHTS: ScoringWeights = ScoringWeights {
    skill_weight: 50.0,
    location_buckets: [
        (5.0, 25.0),
        (15.0, 20.0),
        (30.0, 15.0),
        (50.0, 10.0),
        (100.0, 5.0),
    ],
    completed_jobs_tiers: [(20, 10.0), (10, 8.0), (5, 6.0), (1, 4.0)],
    reliability_weight: 5.0,
    experience_cap: 15.0,
    rating_tiers: [(4.5, 10.0), (4.0, 8.0), (3.5, 6.0), (3.0, 4.0)],
    category_bonus: 5.0,
    availability_match_bonus: 3.0,
    flexible_bonus: 2.0,
    overqualified_penalty: 10.0,
    high_rating_threshold: 4.5,
    low_pay_threshold: 15.0,
};

/// Everything the scoring pass needs about one worker, fetched up front so
/// the pass itself does no I/O.
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub profile: WorkerProfile,
    pub stats: WorkerStats,
    pub completed_categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobMatch {
    #[serde(flatten)]
    pub job: JobPosting,
    #[serde(rename = "matchScore", skip_serializing_if = "Option::is_none")]
    pub match_score: Option<i32>,
    #[serde(rename = "matchDetails", skip_serializing_if = "Option::is_none")]
    pub match_details: Option<MatchDetails>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    pub skill: f64,
    pub location: f64,
    pub experience: f64,
    pub rating: f64,
    pub category: f64,
    pub availability: f64,
    pub penalty: f64,
}

#[derive(Debug, Clone)]
pub struct MatchingService {
    db_client: Arc<DBClient>,
}

impl MatchingService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Score and rank an already-filtered page of open jobs for one worker.
    /// The page comes back with the same cardinality, reordered by descending
    /// match score. If the worker's context cannot be loaded the page is
    /// returned unscored in its original order; discovery never fails on a
    /// matching error.
    pub async fn match_and_rank(&self, jobs: Vec<JobPosting>, worker_id: Uuid) -> Vec<JobMatch> {
        match self.load_match_context(worker_id).await {
            Ok(ctx) => rank_jobs(jobs, &ctx),
            Err(e) => {
                tracing::warn!(
                    "MatchingService: unscored feed for worker {}: {}",
                    worker_id,
                    e
                );
                unscored(jobs)
            }
        }
    }

    pub async fn load_match_context(&self, worker_id: Uuid) -> Result<MatchContext, ServiceError> {
        let profile = self
            .db_client
            .get_worker_profile(worker_id)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => ServiceError::WorkerProfileNotFound(worker_id),
                other => ServiceError::Database(other),
            })?;
        let stats = self.db_client.get_worker_stats(worker_id).await?;
        let completed_categories = self
            .db_client
            .get_completed_application_categories(worker_id)
            .await?;

        Ok(MatchContext {
            profile,
            stats,
            completed_categories,
        })
    }
}

/// Score every job against the worker and sort best-first. The sort is
/// stable, so tied scores keep their input order.
pub fn rank_jobs(jobs: Vec<JobPosting>, ctx: &MatchContext) -> Vec<JobMatch> {
    let mut scored: Vec<JobMatch> = jobs
        .into_iter()
        .map(|job| {
            let (score, details) = score_job(&job, ctx);
            JobMatch {
                job,
                match_score: Some(score),
                match_details: Some(details),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored
}

/// Fallback shape for a failed context load: same jobs, same order, no scores.
pub fn unscored(jobs: Vec<JobPosting>) -> Vec<JobMatch> {
    jobs.into_iter()
        .map(|job| JobMatch {
            job,
            match_score: None,
            match_details: None,
        })
        .collect()
}

pub fn score_job(job: &JobPosting, ctx: &MatchContext) -> (i32, MatchDetails) {
    let skill = skill_score(
        &job.required_skills,
        ctx.profile.skills.as_deref().unwrap_or(&[]),
    );
    let location = location_score(job, &ctx.profile);
    let experience = experience_score(&ctx.stats, &ctx.profile);
    let rating = rating_score(ctx.stats.rating_avg);
    let category = category_score(job.category.as_deref(), &ctx.completed_categories);
    let availability = availability_score(job.date_start, &ctx.profile);
    let penalty = overqualification_penalty(ctx.stats.rating_avg, &job.pay_per_person);

    let details = MatchDetails {
        skill,
        location,
        experience,
        rating,
        category,
        availability,
        penalty,
    };

    let total = skill + location + experience + rating + category + availability - penalty;
    // Malformed coordinates can surface as NaN; those jobs score zero and
    // sink to the bottom instead of corrupting the sort.
    let total = if total.is_nan() {
        0.0
    } else {
        total.clamp(0.0, 100.0)
    };

    (total.round() as i32, details)
}

/// Mean best-similarity across required skills, weighted to 50.
fn skill_score(required: &[String], declared: &[String]) -> f64 {
    if required.is_empty() || declared.is_empty() {
        return 0.0;
    }

    let best_sum: f64 = required
        .iter()
        .map(|req| {
            declared
                .iter()
                .map(|skill| similarity(req, skill))
                .fold(0.0, f64::max)
        })
        .sum();

    best_sum / required.len() as f64 * WEIGHTS.skill_weight
}

fn location_score(job: &JobPosting, profile: &WorkerProfile) -> f64 {
    let (Some(job_lat), Some(job_lng), Some(lat), Some(lng)) =
        (job.lat, job.lng, profile.lat, profile.lng)
    else {
        return 0.0;
    };

    let km = distance_km(lat, lng, job_lat, job_lng);
    for (max_km, points) in WEIGHTS.location_buckets {
        if km <= max_km {
            return points;
        }
    }
    0.0
}

/// Completed-jobs tier plus the reliability ratio, capped at 15. The stored
/// 0-100 reliability score becomes a 0-1 ratio only here.
fn experience_score(stats: &WorkerStats, profile: &WorkerProfile) -> f64 {
    let completed = stats.completed_jobs_count.unwrap_or(0);
    let mut points = 0.0;
    for (min_jobs, tier_points) in WEIGHTS.completed_jobs_tiers {
        if completed >= min_jobs {
            points = tier_points;
            break;
        }
    }

    let ratio = profile.reliability_score.unwrap_or(100) as f64 / 100.0;
    (points + ratio * WEIGHTS.reliability_weight).min(WEIGHTS.experience_cap)
}

fn rating_score(rating_avg: Option<f32>) -> f64 {
    let Some(rating) = rating_avg else {
        return 0.0;
    };
    for (min_rating, points) in WEIGHTS.rating_tiers {
        if rating >= min_rating {
            return points;
        }
    }
    0.0
}

fn category_score(job_category: Option<&str>, completed_categories: &[String]) -> f64 {
    let Some(category) = job_category else {
        return 0.0;
    };
    if completed_categories
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category))
    {
        WEIGHTS.category_bonus
    } else {
        0.0
    }
}

fn availability_score(date_start: Option<DateTime<Utc>>, profile: &WorkerProfile) -> f64 {
    let Some(start) = date_start else {
        return 0.0;
    };
    let weekend = matches!(start.weekday(), Weekday::Sat | Weekday::Sun);
    let window_matches = if weekend {
        profile.available_weekends.unwrap_or(false)
    } else {
        profile.available_weekdays.unwrap_or(false)
    };

    let mut points = 0.0;
    if window_matches {
        points += WEIGHTS.availability_match_bonus;
    }
    if profile.is_flexible.unwrap_or(false) {
        points += WEIGHTS.flexible_bonus;
    }
    points
}

/// Highly-rated workers are steered away from underpaying jobs.
fn overqualification_penalty(rating_avg: Option<f32>, pay_per_person: &BigDecimal) -> f64 {
    let rating = rating_avg.unwrap_or(0.0);
    let pay = pay_per_person.to_f64().unwrap_or(0.0);
    if rating >= WEIGHTS.high_rating_threshold && pay < WEIGHTS.low_pay_threshold {
        WEIGHTS.overqualified_penalty
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn worker_profile() -> WorkerProfile {
        WorkerProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            skills: Some(vec!["Security".to_string(), "First Aid".to_string()]),
            lat: Some(40.71),
            lng: Some(-74.00),
            available_weekdays: Some(false),
            available_weekends: Some(false),
            is_flexible: Some(false),
            reliability_score: Some(90),
            created_at: None,
            updated_at: None,
        }
    }

    fn worker_stats() -> WorkerStats {
        WorkerStats {
            id: Uuid::new_v4(),
            completed_jobs_count: Some(12),
            no_show_count: Some(1),
            rating_avg: Some(4.6),
            total_ratings: Some(30),
        }
    }

    fn context() -> MatchContext {
        MatchContext {
            profile: worker_profile(),
            stats: worker_stats(),
            completed_categories: vec![],
        }
    }

    fn job(title: &str, required_skills: Vec<&str>, pay: i32) -> JobPosting {
        JobPosting {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: title.to_string(),
            category: None,
            required_skills: required_skills.into_iter().map(String::from).collect(),
            lat: Some(40.72),
            lng: Some(-74.01),
            pay_per_person: BigDecimal::from(pay),
            // a Tuesday evening
            date_start: Some(Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap()),
            status: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn security_worker_scores_high_on_security_job() {
        let ctx = context();
        let (score, details) = score_job(&job("Door security", vec!["Security"], 28), &ctx);

        // exact skill match, within 5 km, 12 completed jobs + 0.9 reliability,
        // 4.6 rating, no category or availability bonus, no penalty
        assert_eq!(details.skill, 50.0);
        assert_eq!(details.location, 25.0);
        assert_eq!(details.experience, 12.5);
        assert_eq!(details.rating, 10.0);
        assert_eq!(details.penalty, 0.0);
        assert!((90..=100).contains(&score), "got {}", score);
    }

    #[test]
    fn matched_skills_beat_unmatched_skills() {
        let ctx = context();
        let security = job("Door security", vec!["Security"], 28);
        let catering = job("Wait staff", vec!["Catering"], 28);

        let (security_score, _) = score_job(&security, &ctx);
        let (catering_score, details) = score_job(&catering, &ctx);

        assert_eq!(details.skill, 0.0);
        assert!(security_score > catering_score);
    }

    #[test]
    fn ranked_feed_is_sorted_descending() {
        let ctx = context();
        let ranked = rank_jobs(
            vec![
                job("Wait staff", vec!["Catering"], 28),
                job("Door security", vec!["Security"], 28),
            ],
            &ctx,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].job.title, "Door security");
        assert!(ranked[0].match_score >= ranked[1].match_score);
    }

    #[test]
    fn tied_scores_keep_input_order() {
        let ctx = context();
        let ranked = rank_jobs(
            vec![
                job("First shift", vec!["Security"], 28),
                job("Second shift", vec!["Security"], 28),
                job("Third shift", vec!["Security"], 28),
            ],
            &ctx,
        );

        let scores: Vec<_> = ranked.iter().map(|m| m.match_score).collect();
        assert_eq!(scores[0], scores[1]);
        assert_eq!(scores[1], scores[2]);
        assert_eq!(ranked[0].job.title, "First shift");
        assert_eq!(ranked[1].job.title, "Second shift");
        assert_eq!(ranked[2].job.title, "Third shift");
    }

    #[test]
    fn scores_stay_within_bounds() {
        let mut ctx = context();
        ctx.profile.available_weekdays = Some(true);
        ctx.profile.is_flexible = Some(true);
        ctx.completed_categories = vec!["events".to_string()];

        let mut best = job("Everything matches", vec!["Security", "First Aid"], 50);
        best.category = Some("Events".to_string());
        let (score, _) = score_job(&best, &ctx);
        assert!(score <= 100, "got {}", score);

        // penalty case: top rating, underpaying job, nothing else in its favor
        let mut worst_ctx = context();
        worst_ctx.profile.skills = Some(vec![]);
        worst_ctx.profile.lat = None;
        worst_ctx.profile.reliability_score = Some(0);
        worst_ctx.stats.completed_jobs_count = Some(0);
        let mut cheap = job("Underpaid", vec!["Security"], 10);
        cheap.date_start = None;
        let (score, details) = score_job(&cheap, &worst_ctx);
        assert_eq!(details.penalty, 10.0);
        assert!(score >= 0, "got {}", score);
    }

    #[test]
    fn missing_locations_contribute_nothing() {
        let mut ctx = context();
        ctx.profile.lat = None;
        ctx.profile.lng = None;

        let (_, details) = score_job(&job("Door security", vec!["Security"], 28), &ctx);
        assert_eq!(details.location, 0.0);
    }

    #[test]
    fn nan_coordinates_sink_instead_of_corrupting_the_sort() {
        let ctx = context();
        let mut broken = job("Broken coords", vec!["Security"], 28);
        broken.lat = Some(f64::NAN);

        let good = job("Door security", vec!["Security"], 28);
        let ranked = rank_jobs(vec![broken, good], &ctx);

        assert_eq!(ranked[0].job.title, "Door security");
        let broken_score = ranked[1].match_score.unwrap();
        assert!((0..=100).contains(&broken_score));
    }

    #[test]
    fn weekend_job_matches_weekend_availability() {
        let mut ctx = context();
        ctx.profile.available_weekends = Some(true);

        let mut saturday = job("Festival gate", vec!["Security"], 28);
        // a Saturday
        saturday.date_start = Some(Utc.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap());

        let (_, details) = score_job(&saturday, &ctx);
        assert_eq!(details.availability, 3.0);

        ctx.profile.is_flexible = Some(true);
        let (_, details) = score_job(&saturday, &ctx);
        assert_eq!(details.availability, 5.0);
    }

    #[test]
    fn weekday_flag_does_not_cover_weekend_jobs() {
        let mut ctx = context();
        ctx.profile.available_weekdays = Some(true);

        let mut saturday = job("Festival gate", vec!["Security"], 28);
        saturday.date_start = Some(Utc.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap());

        let (_, details) = score_job(&saturday, &ctx);
        assert_eq!(details.availability, 0.0);
    }

    #[test]
    fn category_affinity_is_case_insensitive() {
        let mut ctx = context();
        ctx.completed_categories = vec!["security".to_string()];

        let mut gig = job("Door security", vec!["Security"], 28);
        gig.category = Some("SECURITY".to_string());

        let (_, details) = score_job(&gig, &ctx);
        assert_eq!(details.category, 5.0);
    }

    #[test]
    fn empty_skill_lists_score_zero_on_skills() {
        let mut ctx = context();
        ctx.profile.skills = Some(vec![]);

        let (_, details) = score_job(&job("Door security", vec!["Security"], 28), &ctx);
        assert_eq!(details.skill, 0.0);

        let ctx = context();
        let (_, details) = score_job(&job("Anything goes", vec![], 28), &ctx);
        assert_eq!(details.skill, 0.0);
    }

    #[test]
    fn experience_is_capped_at_fifteen() {
        let mut ctx = context();
        ctx.stats.completed_jobs_count = Some(50);
        ctx.profile.reliability_score = Some(100);

        let (_, details) = score_job(&job("Door security", vec!["Security"], 28), &ctx);
        assert_eq!(details.experience, 15.0);
    }

    #[test]
    fn unscored_feed_preserves_order_and_cardinality() {
        let jobs = vec![
            job("First", vec!["Security"], 28),
            job("Second", vec!["Catering"], 28),
            job("Third", vec![], 28),
        ];
        let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();

        let fallback = unscored(jobs);
        assert_eq!(fallback.len(), 3);
        for (matched, id) in fallback.iter().zip(ids) {
            assert_eq!(matched.job.id, id);
            assert!(matched.match_score.is_none());
            assert!(matched.match_details.is_none());
        }
    }

    #[test]
    fn scored_feed_serializes_wire_field_names() {
        let ctx = context();
        let ranked = rank_jobs(vec![job("Door security", vec!["Security"], 28)], &ctx);
        let json = serde_json::to_value(&ranked[0]).unwrap();

        assert!(json["matchScore"].is_number());
        assert!(json["matchDetails"]["skill"].is_number());

        let fallback = unscored(vec![job("Door security", vec!["Security"], 28)]);
        let json = serde_json::to_value(&fallback[0]).unwrap();
        assert!(json.get("matchScore").is_none());
        assert!(json.get("matchDetails").is_none());
    }
}
