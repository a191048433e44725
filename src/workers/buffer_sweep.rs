use std::sync::Arc;

use crate::generation::BufferController;

/// Periodic safety net: re-run the buffer check in case an event-driven
/// trigger was lost (process restart, build task that died without its
/// finalizer re-checking).
pub async fn run(buffer: &Arc<BufferController>) {
    tracing::debug!("Buffer sweep");
    buffer.check().await;
}
