mod player;
mod reporter;
mod session;
mod telemetry;

// Public API of the playback subsystem.
pub use player::{MediaErrorKind, MediaPlayer, PlaybackState, PlayerEvent, PlayerState};
pub use reporter::{MIN_DELTA_SECONDS, ProgressReporter};
pub use session::{PlaybackSignal, SessionUpdate, UnitPlaybackSession};
pub use telemetry::{
    PlaybackTelemetrySource, ProgressSample, SAMPLE_INTERVAL, SamplerCommand, TelemetryDirective,
};
