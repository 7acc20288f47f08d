use std::time::Duration;

use academy_core::model::MediaRef;

use super::player::{MediaPlayer, PlaybackState, PlayerEvent, PlayerState};

/// Fixed cadence of the position sampler while playback is running.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// One whole-second position reading forwarded to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub watched_seconds: u32,
    pub total_seconds: u32,
}

/// What the owning view should do with its sampling timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerCommand {
    Start,
    Stop,
    Keep,
}

/// Result of feeding one player event into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryDirective {
    pub sampler: SamplerCommand,
    /// A sample forced through on the transition, if one was readable.
    pub sample: Option<ProgressSample>,
}

/// Wraps one player instance and turns its callback-driven lifecycle into
/// an explicit state machine emitting `(watched, total)` pairs.
///
/// Nothing is persisted here; samples flow onward to the reporter.
pub struct PlaybackTelemetrySource<P: MediaPlayer> {
    player: P,
    media: MediaRef,
    state: PlayerState,
    last_emitted: Option<u32>,
    last_reading: Option<ProgressSample>,
}

impl<P: MediaPlayer> PlaybackTelemetrySource<P> {
    #[must_use]
    pub fn new(player: P, media: MediaRef) -> Self {
        Self {
            player,
            media,
            state: PlayerState::Ready,
            last_emitted: None,
            last_reading: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> PlayerState {
        self.state
    }

    #[must_use]
    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    /// The most recent readable position, kept for the teardown flush.
    #[must_use]
    pub fn last_reading(&self) -> Option<ProgressSample> {
        self.last_reading
    }

    /// Feeds one state-change or error event through the machine.
    ///
    /// Entering `Playing` starts the 5-second sampler; `Paused`, `Buffering`
    /// and `Ended` stop it and force one final sample through. Errors stop
    /// the sampler and park the machine until `retry`.
    pub fn handle_event(&mut self, event: PlayerEvent) -> TelemetryDirective {
        match event {
            PlayerEvent::StateChange(next) => {
                self.state = next.into();
                match next {
                    PlaybackState::Playing => TelemetryDirective {
                        sampler: SamplerCommand::Start,
                        sample: self.sample(),
                    },
                    PlaybackState::Paused | PlaybackState::Buffering | PlaybackState::Ended => {
                        TelemetryDirective {
                            sampler: SamplerCommand::Stop,
                            sample: self.sample(),
                        }
                    }
                    PlaybackState::Ready => TelemetryDirective {
                        sampler: SamplerCommand::Keep,
                        sample: None,
                    },
                }
            }
            PlayerEvent::Error(kind) => {
                self.state = PlayerState::Errored(kind);
                TelemetryDirective {
                    sampler: SamplerCommand::Stop,
                    sample: None,
                }
            }
        }
    }

    /// Reads the player position, floors it to whole seconds and applies
    /// the duplicate filter. A reading with an unavailable, NaN or
    /// non-positive duration is discarded, never forwarded.
    pub fn sample(&mut self) -> Option<ProgressSample> {
        let duration = self.player.duration()?;
        let position = self.player.current_time();
        if !duration.is_finite() || duration <= 0.0 || !position.is_finite() {
            return None;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = (duration.floor() as u32).max(1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let watched = (position.max(0.0).floor() as u32).min(total);

        let sample = ProgressSample {
            watched_seconds: watched,
            total_seconds: total,
        };
        self.last_reading = Some(sample);

        // Identical consecutive readings are noise, except at the boundary
        // which must always go through.
        if self.last_emitted == Some(watched) && watched != total {
            return None;
        }
        self.last_emitted = Some(watched);
        Some(sample)
    }

    /// Re-cues the same media reference after an error and returns the
    /// machine to `Ready`. The next session starts counting from zero.
    pub fn retry(&mut self) {
        self.player.cue(&self.media);
        self.player.play();
        self.state = PlayerState::Ready;
        self.last_emitted = None;
        self.last_reading = None;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Scripted stand-in for the embedded player.
    pub(crate) struct FakePlayer {
        pub duration: Option<f64>,
        pub position: f64,
        pub cued: u32,
        pub playing: bool,
    }

    impl FakePlayer {
        pub(crate) fn new(duration: Option<f64>) -> Self {
            Self {
                duration,
                position: 0.0,
                cued: 0,
                playing: false,
            }
        }
    }

    impl MediaPlayer for FakePlayer {
        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn current_time(&self) -> f64 {
            self.position
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn cue(&mut self, _media: &MediaRef) {
            self.cued += 1;
            self.position = 0.0;
            self.playing = false;
        }
    }
}
