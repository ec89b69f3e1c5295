use docsync::Readiness;

use crate::resource::Resource;

/// Notifications broadcast to UI subscribers. Delivered after the state change they describe is visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    ReadinessChanged(Readiness),
    /// Cached data is in place; the UI can stop showing a splash screen.
    ReadyForInteraction,
    ResourceDidUpdate(Resource),
    /// Every warm-start fetch has settled, successfully or not.
    SessionDataDidPrepare,
    SessionDidReset,
}
