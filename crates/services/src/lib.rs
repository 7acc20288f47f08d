#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempt_scorer;
pub mod course_service;
pub mod error;
pub mod playback;
pub mod sync;

pub use academy_core::Clock;

pub use app_services::AppServices;
pub use attempt_scorer::AttemptScorer;
pub use course_service::{CourseService, CourseView, SubmissionSummary, UnitView};
pub use error::{AppServicesError, CourseServiceError, ScorerError, SyncError};

pub use playback::{
    MediaErrorKind, MediaPlayer, PlaybackSignal, PlaybackState, PlaybackTelemetrySource,
    PlayerEvent, PlayerState, ProgressReporter, ProgressSample, SAMPLE_INTERVAL, SamplerCommand,
    SessionUpdate, UnitPlaybackSession,
};

pub use sync::{
    AttemptView, HttpSyncGateway, ProgressUpdate, ProgressUpdateRequest, StoreSyncGateway,
    StudentProgress, SubmissionResult, SyncConfig, SyncGateway,
};
