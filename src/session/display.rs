use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Exclusive (full-screen) presentation for a session.
///
/// Both operations are best-effort: the engine logs failures and never lets
/// them gate session progress.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayMode: Send + Sync {
    async fn request_exclusive(&self, session_id: Uuid) -> Result<()>;
    async fn release_exclusive(&self, session_id: Uuid) -> Result<()>;
}

/// The browser owns full screen; the server only records the intent and tells
/// the client through the session view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientDisplayMode;

#[async_trait]
impl DisplayMode for ClientDisplayMode {
    async fn request_exclusive(&self, session_id: Uuid) -> Result<()> {
        tracing::debug!(%session_id, "Exclusive display requested");
        Ok(())
    }

    async fn release_exclusive(&self, session_id: Uuid) -> Result<()> {
        tracing::debug!(%session_id, "Exclusive display released");
        Ok(())
    }
}
