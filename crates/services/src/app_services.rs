use std::sync::Arc;

use academy_core::Clock;
use academy_core::model::{MediaRef, StudentId, UnitId, UnitStatus};
use storage::repository::Storage;

use crate::attempt_scorer::AttemptScorer;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::playback::{MediaPlayer, UnitPlaybackSession};
use crate::sync::{StoreSyncGateway, SyncGateway};

/// Assembles the engine's services over a storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    course_service: Arc<CourseService>,
    scorer: Arc<AttemptScorer>,
    gateway: Arc<dyn SyncGateway>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock))
    }

    /// Build services over the in-memory backend, for tests and demos.
    #[must_use]
    pub fn new_in_memory(clock: Clock) -> Self {
        Self::new(Storage::in_memory(), clock)
    }

    /// Build services over an already-assembled storage bundle.
    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        let scorer = Arc::new(AttemptScorer::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.attempts),
        ));
        let course_service = Arc::new(CourseService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.attempts),
        ));
        let gateway: Arc<dyn SyncGateway> = Arc::new(StoreSyncGateway::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
            scorer.as_ref().clone(),
        ));
        Self {
            clock,
            course_service,
            scorer,
            gateway,
        }
    }

    /// Swap the sync boundary, e.g. for a remote `HttpSyncGateway`.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn SyncGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn course_service(&self) -> Arc<CourseService> {
        Arc::clone(&self.course_service)
    }

    #[must_use]
    pub fn scorer(&self) -> Arc<AttemptScorer> {
        Arc::clone(&self.scorer)
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<dyn SyncGateway> {
        Arc::clone(&self.gateway)
    }

    /// Opens a playback session for one unit view over the configured
    /// gateway.
    pub fn open_unit<P: MediaPlayer>(
        &self,
        student_id: StudentId,
        unit_id: UnitId,
        player: P,
        media: MediaRef,
        resume_from: Option<&UnitStatus>,
    ) -> UnitPlaybackSession<P> {
        UnitPlaybackSession::new(
            student_id,
            unit_id,
            player,
            media,
            Arc::clone(&self.gateway),
            resume_from,
        )
    }
}
