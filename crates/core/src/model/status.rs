use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watched fraction at which a video unit is considered complete.
pub const COMPLETION_THRESHOLD_PERCENT: f64 = 95.0;

/// Per-(student, unit) viewing status.
///
/// The record is owned by the server side of the sync boundary: clients only
/// ever observe it through authoritative responses. A missing record reads
/// as [`UnitStatus::not_started`], never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStatus {
    watched_seconds: u32,
    total_seconds: u32,
    progress_percentage: f64,
    is_completed: bool,
    last_observed_at: Option<DateTime<Utc>>,
}

impl Default for UnitStatus {
    fn default() -> Self {
        Self::not_started()
    }
}

impl UnitStatus {
    /// Status for a unit with no recorded activity.
    #[must_use]
    pub fn not_started() -> Self {
        Self {
            watched_seconds: 0,
            total_seconds: 0,
            progress_percentage: 0.0,
            is_completed: false,
            last_observed_at: None,
        }
    }

    /// Rehydrates a status from persisted storage, normalizing legacy rows
    /// where a completed unit carried a sub-100 percentage.
    #[must_use]
    pub fn from_persisted(
        watched_seconds: u32,
        total_seconds: u32,
        progress_percentage: f64,
        is_completed: bool,
        last_observed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let progress_percentage = if is_completed {
            100.0
        } else {
            progress_percentage.clamp(0.0, 100.0)
        };
        Self {
            watched_seconds: watched_seconds.min(total_seconds.max(1)),
            total_seconds,
            progress_percentage,
            is_completed,
            last_observed_at,
        }
    }

    /// Marks a non-video unit (test, reference) as complete for aggregation.
    #[must_use]
    pub fn completed_at(at: DateTime<Utc>) -> Self {
        Self {
            watched_seconds: 0,
            total_seconds: 0,
            progress_percentage: 100.0,
            is_completed: true,
            last_observed_at: Some(at),
        }
    }

    /// Applies one progress report and returns the resulting status.
    ///
    /// This is the authoritative completion rule:
    /// - the stored total only ever grows (and is at least one second);
    /// - the stored watched value never regresses and is clamped to the total;
    /// - percentage is `round(watched / total * 100, 2)` capped at 100;
    /// - completion fires at 95% watched and is sticky from then on.
    ///
    /// Applying the identical report twice yields an identical status.
    #[must_use]
    pub fn apply_update(&self, watched_seconds: u32, total_seconds: u32, now: DateTime<Utc>) -> Self {
        let total = total_seconds.max(self.total_seconds).max(1);
        let watched = watched_seconds.max(self.watched_seconds).min(total);

        let raw_percentage = round2(f64::from(watched) / f64::from(total) * 100.0).min(100.0);
        let is_completed = self.is_completed || raw_percentage >= COMPLETION_THRESHOLD_PERCENT;
        let progress_percentage = if is_completed { 100.0 } else { raw_percentage };

        Self {
            watched_seconds: watched,
            total_seconds: total,
            progress_percentage,
            is_completed,
            last_observed_at: Some(now),
        }
    }

    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.watched_seconds
    }

    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn last_observed_at(&self) -> Option<DateTime<Utc>> {
        self.last_observed_at
    }
}

/// Rounds to two decimal places, matching the wire percentage format.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn not_started_is_zeroed() {
        let status = UnitStatus::not_started();
        assert_eq!(status.watched_seconds(), 0);
        assert!(!status.is_completed());
        assert_eq!(status.progress_percentage(), 0.0);
        assert!(status.last_observed_at().is_none());
    }

    #[test]
    fn completion_fires_at_95_percent_boundary() {
        let base = UnitStatus::not_started();

        let below = base.apply_update(569, 600, fixed_now());
        assert!(!below.is_completed());
        assert_eq!(below.progress_percentage(), 94.83);

        let at = base.apply_update(570, 600, fixed_now());
        assert!(at.is_completed());
        assert_eq!(at.progress_percentage(), 100.0);
    }

    #[test]
    fn watched_value_never_regresses() {
        let first = UnitStatus::not_started().apply_update(120, 600, fixed_now());
        let second = first.apply_update(40, 600, fixed_now());
        assert_eq!(second.watched_seconds(), 120);
    }

    #[test]
    fn identical_update_is_idempotent() {
        let first = UnitStatus::not_started().apply_update(250, 600, fixed_now());
        let second = first.apply_update(250, 600, fixed_now());
        assert_eq!(first.progress_percentage(), second.progress_percentage());
        assert_eq!(first.watched_seconds(), second.watched_seconds());
        assert_eq!(first.is_completed(), second.is_completed());
    }

    #[test]
    fn completion_is_sticky() {
        let completed = UnitStatus::not_started().apply_update(600, 600, fixed_now());
        assert!(completed.is_completed());

        let later = completed.apply_update(10, 600, fixed_now());
        assert!(later.is_completed());
        assert_eq!(later.progress_percentage(), 100.0);
    }

    #[test]
    fn total_only_grows_and_watched_is_clamped() {
        let first = UnitStatus::not_started().apply_update(30, 600, fixed_now());
        let second = first.apply_update(700, 10, fixed_now());
        assert_eq!(second.total_seconds(), 600);
        assert_eq!(second.watched_seconds(), 600);
    }

    #[test]
    fn zero_total_is_guarded() {
        let status = UnitStatus::not_started().apply_update(0, 0, fixed_now());
        assert_eq!(status.total_seconds(), 1);
        assert!(!status.is_completed());
    }

    #[test]
    fn persisted_completed_row_is_normalized_to_100() {
        let status = UnitStatus::from_persisted(570, 600, 95.0, true, Some(fixed_now()));
        assert_eq!(status.progress_percentage(), 100.0);
    }
}
