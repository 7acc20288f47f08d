mod gateway;
mod http;
mod store;

// Public API of the sync boundary.
pub use gateway::{
    AttemptView, ProgressUpdate, ProgressUpdateRequest, StudentProgress, SubmissionResult,
    SyncGateway,
};
pub use http::{HttpSyncGateway, SyncConfig};
pub use store::StoreSyncGateway;
