use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use academy_core::model::{MediaRef, StudentId, UnitId, UnitStatus};

use super::player::{MediaPlayer, PlayerEvent, PlayerState};
use super::reporter::ProgressReporter;
use super::telemetry::{PlaybackTelemetrySource, ProgressSample, SamplerCommand};
use crate::sync::{ProgressUpdate, ProgressUpdateRequest, SyncGateway};

/// What happened to the sample a tick or event produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackSignal {
    /// Nothing sendable: no sample, suppressed duplicate, or throttled.
    Idle,
    /// The server acknowledged; `completion_fired` is true exactly once
    /// per view, on the authoritative incomplete-to-complete transition.
    Sent {
        update: ProgressUpdate,
        completion_fired: bool,
    },
    /// The send failed; nothing moved, the next tick retries naturally.
    SendFailed,
    /// A response landed after teardown and was discarded.
    Stale,
}

/// Combined outcome of feeding a player event through the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionUpdate {
    /// What the owning view should do with its 5-second timer.
    pub sampler: SamplerCommand,
    pub signal: PlaybackSignal,
}

/// One open unit view: a single active player wired through telemetry and
/// reporting to the sync gateway.
///
/// The session owns every per-view tracker, so leaving the view and
/// dropping the session releases them deterministically. The embedding
/// binds its page-hide notification to [`UnitPlaybackSession::notify_hidden`]
/// for the lifetime of the view and unbinds it at teardown.
pub struct UnitPlaybackSession<P: MediaPlayer> {
    student_id: StudentId,
    unit_id: UnitId,
    telemetry: PlaybackTelemetrySource<P>,
    reporter: ProgressReporter,
    gateway: Arc<dyn SyncGateway>,
    /// Bumped on teardown; a response carrying an older epoch is stale and
    /// must not resurrect torn-down state.
    view_epoch: Arc<AtomicU64>,
    torn_down: bool,
}

impl<P: MediaPlayer> UnitPlaybackSession<P> {
    /// Opens a session over a freshly created player.
    ///
    /// `resume_from` is the unit's last known authoritative status, used to
    /// prime the reporter so resuming mid-video does not replay the prefix.
    pub fn new(
        student_id: StudentId,
        unit_id: UnitId,
        player: P,
        media: MediaRef,
        gateway: Arc<dyn SyncGateway>,
        resume_from: Option<&UnitStatus>,
    ) -> Self {
        let mut reporter = ProgressReporter::new();
        if let Some(status) = resume_from {
            reporter.activate_unit(unit_id, status.watched_seconds());
        }
        Self {
            student_id,
            unit_id,
            telemetry: PlaybackTelemetrySource::new(player, media),
            reporter,
            gateway,
            view_epoch: Arc::new(AtomicU64::new(0)),
            torn_down: false,
        }
    }

    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    #[must_use]
    pub fn player_state(&self) -> PlayerState {
        self.telemetry.state()
    }

    #[must_use]
    pub fn completion_fired(&self) -> bool {
        self.reporter.completion_fired(self.unit_id)
    }

    /// Feeds a state-change or error event from the player callbacks.
    pub async fn handle_event(&mut self, event: PlayerEvent) -> SessionUpdate {
        if self.torn_down {
            return SessionUpdate {
                sampler: SamplerCommand::Stop,
                signal: PlaybackSignal::Idle,
            };
        }
        let directive = self.telemetry.handle_event(event);
        let signal = match directive.sample {
            Some(sample) => self.offer(sample).await,
            None => PlaybackSignal::Idle,
        };
        SessionUpdate {
            sampler: directive.sampler,
            signal,
        }
    }

    /// One cooperative sampler tick; the owning view calls this every
    /// [`crate::playback::SAMPLE_INTERVAL`] while playback runs.
    pub async fn tick(&mut self) -> PlaybackSignal {
        if self.torn_down {
            return PlaybackSignal::Idle;
        }
        match self.telemetry.sample() {
            Some(sample) => self.offer(sample).await,
            None => PlaybackSignal::Idle,
        }
    }

    /// Applies the send policy and, when due, pushes the sample through
    /// the gateway, adopting the authoritative response.
    async fn offer(&mut self, sample: ProgressSample) -> PlaybackSignal {
        if !self.reporter.should_send(self.unit_id, sample) {
            return PlaybackSignal::Idle;
        }

        let epoch = self.view_epoch.load(Ordering::Acquire);
        let request = ProgressUpdateRequest {
            unit_id: self.unit_id,
            watched_seconds: sample.watched_seconds,
            total_seconds: sample.total_seconds,
        };

        match self.gateway.update_progress(self.student_id, request).await {
            Ok(update) => {
                if self.view_epoch.load(Ordering::Acquire) != epoch {
                    debug!(unit = %self.unit_id, "discarding progress response for torn-down view");
                    return PlaybackSignal::Stale;
                }
                let completion_fired = self.reporter.adopt(self.unit_id, &update);
                if completion_fired {
                    info!(unit = %self.unit_id, "unit completion fired");
                }
                PlaybackSignal::Sent {
                    update,
                    completion_fired,
                }
            }
            Err(err) => {
                // No backoff loop: the sampling cadence re-drives delivery
                // with an equal-or-larger delta.
                warn!(unit = %self.unit_id, error = %err, "progress update failed");
                PlaybackSignal::SendFailed
            }
        }
    }

    /// Retries after a media error: re-cues the same reference and resets
    /// the per-unit tracker, since playback restarts from zero.
    pub fn retry(&mut self) {
        if self.torn_down {
            return;
        }
        self.telemetry.retry();
        self.reporter.reset_unit(self.unit_id);
    }

    /// Page/tab hidden: issue one best-effort send without waiting.
    pub fn notify_hidden(&mut self) {
        if self.torn_down {
            return;
        }
        self.telemetry.sample();
        self.spawn_final_flush();
    }

    /// Tears the view down: stops sampling, invalidates in-flight
    /// responses and issues one fire-and-forget final send. Idempotent;
    /// only the first call does anything.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.view_epoch.fetch_add(1, Ordering::AcqRel);
        self.spawn_final_flush();
    }

    /// Best-effort final send from the last readable position. Its outcome
    /// is never awaited; a failure only costs the tail of one sampling
    /// interval.
    fn spawn_final_flush(&self) {
        let Some(sample) = self.telemetry.last_reading() else {
            return;
        };
        if !self.reporter.should_send(self.unit_id, sample) {
            return;
        }

        let gateway = Arc::clone(&self.gateway);
        let student_id = self.student_id;
        let request = ProgressUpdateRequest {
            unit_id: self.unit_id,
            watched_seconds: sample.watched_seconds,
            total_seconds: sample.total_seconds,
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = gateway.update_progress(student_id, request).await {
                        debug!(error = %err, "best-effort final progress send failed");
                    }
                });
            }
            Err(_) => debug!("no async runtime for final progress send"),
        }
    }
}
