use std::fmt;

use academy_core::model::MediaRef;

/// Capability surface of the embedded third-party media player.
///
/// Anything that can report a position, be played and be re-cued is
/// substitutable here; tests drive the engine with a scripted fake and no
/// real embed present.
pub trait MediaPlayer: Send {
    /// Duration in seconds, `None` (or NaN) while metadata is unavailable.
    fn duration(&self) -> Option<f64>;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Start or resume playback.
    fn play(&mut self);

    /// Load the given media reference, resetting the position to zero.
    fn cue(&mut self, media: &MediaRef);
}

/// Lifecycle states reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// Error taxonomy of the embed provider. Every kind is non-fatal; the
/// containing view offers a retry that re-cues the same media reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    InvalidMedia,
    EmbedRestricted,
    PlaybackUnsupported,
    Unknown,
}

impl MediaErrorKind {
    /// Maps the embed provider's numeric error codes onto the taxonomy.
    #[must_use]
    pub fn from_embed_code(code: i32) -> Self {
        match code {
            2 => MediaErrorKind::InvalidMedia,
            5 => MediaErrorKind::PlaybackUnsupported,
            100 | 101 | 150 => MediaErrorKind::EmbedRestricted,
            _ => MediaErrorKind::Unknown,
        }
    }
}

impl fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MediaErrorKind::InvalidMedia => "invalid media reference",
            MediaErrorKind::EmbedRestricted => "embedding restricted for this media",
            MediaErrorKind::PlaybackUnsupported => "playback not supported",
            MediaErrorKind::Unknown => "unknown playback error",
        };
        write!(f, "{text}")
    }
}

/// Events delivered by the player's state-change and error callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    StateChange(PlaybackState),
    Error(MediaErrorKind),
}

/// The telemetry source's own view of the player lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
    Errored(MediaErrorKind),
}

impl From<PlaybackState> for PlayerState {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Ready => PlayerState::Ready,
            PlaybackState::Playing => PlayerState::Playing,
            PlaybackState::Paused => PlayerState::Paused,
            PlaybackState::Buffering => PlayerState::Buffering,
            PlaybackState::Ended => PlayerState::Ended,
        }
    }
}
