use std::collections::{HashMap, HashSet};

use academy_core::model::UnitId;

use super::telemetry::ProgressSample;
use crate::sync::ProgressUpdate;

/// Minimum watched-time delta, in seconds, between two throttled sends.
pub const MIN_DELTA_SECONDS: u32 = 5;

/// Throttles samples into durable progress updates and detects the
/// completion edge.
///
/// The per-unit trackers live inside the instance, created on view
/// activation and discarded with it on teardown; nothing here is ambient
/// state. `last_sent` only moves when the server acknowledges a send, so a
/// failed update retries with an equal-or-larger delta on the next natural
/// sampling tick.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    last_sent: HashMap<UnitId, u32>,
    completion_fired: HashSet<UnitId>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primes a unit's tracker from the last acknowledged watched value,
    /// so resuming mid-video does not re-send the whole prefix.
    pub fn activate_unit(&mut self, unit_id: UnitId, acknowledged_watched: u32) {
        self.last_sent.insert(unit_id, acknowledged_watched);
    }

    /// Send policy: report at session start (watched == 0), at the boundary
    /// (watched >= total), or once at least five seconds of new watch time
    /// accumulated. Bounds traffic to roughly one update per five seconds
    /// of real playback while both boundaries always get through.
    #[must_use]
    pub fn should_send(&self, unit_id: UnitId, sample: ProgressSample) -> bool {
        let last = self.last_sent.get(&unit_id).copied().unwrap_or(0);
        sample.watched_seconds == 0
            || sample.watched_seconds >= sample.total_seconds
            || sample.watched_seconds.saturating_sub(last) >= MIN_DELTA_SECONDS
    }

    /// Adopts an authoritative response after a successful send, advancing
    /// `last_sent` and arming the one-shot completion flag.
    ///
    /// Returns `true` exactly once per unit, on the transition where the
    /// server first reports the unit complete. This is the single trigger
    /// for any downstream "unit complete" notification; the flag resets
    /// only when the owning view is torn down and recreated.
    pub fn adopt(&mut self, unit_id: UnitId, response: &ProgressUpdate) -> bool {
        let entry = self.last_sent.entry(unit_id).or_insert(0);
        *entry = (*entry).max(response.watched_seconds);

        if response.is_completed && !self.completion_fired.contains(&unit_id) {
            self.completion_fired.insert(unit_id);
            return true;
        }
        false
    }

    /// Resets a unit's tracker after an explicit re-cue from the start.
    /// The completion flag is deliberately left armed.
    pub fn reset_unit(&mut self, unit_id: UnitId) {
        self.last_sent.remove(&unit_id);
    }

    #[must_use]
    pub fn last_sent(&self, unit_id: UnitId) -> Option<u32> {
        self.last_sent.get(&unit_id).copied()
    }

    #[must_use]
    pub fn completion_fired(&self, unit_id: UnitId) -> bool {
        self.completion_fired.contains(&unit_id)
    }
}
