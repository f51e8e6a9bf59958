//! Operational statistics, recomputed on demand.
//!
//! The reporter owns no state: every snapshot is derived from the chair
//! registry, the queue, and the treatment history as of one read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::ChairStatus;

/// How many trailing clock hours the hourly breakdown covers.
pub const HOURLY_WINDOW_HOURS: i64 = 8;

/// Aggregated clinic statistics at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Treatments completed today (counted at release)
    pub total_treatments: i64,
    /// Chairs currently treating a patient
    pub active_chairs: i64,
    /// Patients currently waiting
    pub waiting_count: i64,
    /// Mean minutes the queued patients have been waiting; 0 when empty
    pub avg_wait_minutes: f64,
    /// Active chairs as a percentage of all chairs, rounded
    pub equipment_usage: u32,
    /// Per-hour activity over the trailing window, oldest first
    pub hourly: Vec<HourlyActivity>,
}

impl StatsSnapshot {
    /// Export as JSON, ready for a polling response body.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Treatments completed within one clock hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HourlyActivity {
    /// Hour label, "HH:00"
    pub hour: String,
    /// Treatments completed in that hour
    pub treatments: i64,
    /// Derived utilization score, 0..=100
    pub efficiency: u32,
}

/// Read-only stats aggregator over a database.
pub struct StatsReporter<'a> {
    db: &'a Database,
}

impl<'a> StatsReporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Compute a snapshot as of now.
    pub fn snapshot(&self) -> DbResult<StatsSnapshot> {
        self.snapshot_at(Utc::now())
    }

    /// Compute a snapshot as of a given instant (injectable for tests).
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> DbResult<StatsSnapshot> {
        let chairs = self.db.list_chairs()?;
        let total_chairs = chairs.len() as i64;
        let active_chairs = chairs
            .iter()
            .filter(|c| c.status == ChairStatus::Active)
            .count() as i64;

        let queue = self.db.list_queue()?;
        let waiting_count = queue.len() as i64;
        let avg_wait_minutes = if queue.is_empty() {
            0.0
        } else {
            let total_secs: i64 = queue
                .iter()
                .map(|p| (now - p.arrival_time).num_seconds().max(0))
                .sum();
            total_secs as f64 / 60.0 / queue.len() as f64
        };

        let equipment_usage = if total_chairs == 0 {
            0
        } else {
            ((active_chairs * 100) as f64 / total_chairs as f64).round() as u32
        };

        let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
        let total_treatments = self.db.treatments_between(midnight, now + Duration::seconds(1))?;

        let current_hour = truncate_to_hour(now);
        let mut hourly = Vec::with_capacity(HOURLY_WINDOW_HOURS as usize);
        for i in 0..HOURLY_WINDOW_HOURS {
            let hour_start = current_hour - Duration::hours(HOURLY_WINDOW_HOURS - 1 - i);
            let hour_end = hour_start + Duration::hours(1);
            let treatments = self.db.treatments_between(hour_start, hour_end)?;
            let efficiency = if treatments > 0 {
                (treatments * 20).min(100) as u32
            } else {
                0
            };
            hourly.push(HourlyActivity {
                hour: hour_start.format("%H:00").to_string(),
                treatments,
                efficiency,
            });
        }

        Ok(StatsSnapshot {
            total_treatments,
            active_chairs,
            waiting_count,
            avg_wait_minutes,
            equipment_usage,
            hourly,
        })
    }
}

fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    let secs = t.timestamp();
    let hour_epoch = secs - secs.rem_euclid(3600);
    DateTime::from_timestamp(hour_epoch, 0).unwrap_or(t)
}
