//! Release of job-bound storage.

use std::sync::Arc;

use scopeguard::ScopeGuard;
use tokio::runtime::Handle;
use tracing::warn;

use vproc_storage::ObjectStore;

/// Guard that deletes the staging object if the job scope unwinds.
///
/// The normal path defuses it with [`release_staging`], which awaits the
/// delete instead.
pub fn staging_guard(
    store: Arc<dyn ObjectStore>,
    key: String,
) -> ScopeGuard<String, impl FnOnce(String)> {
    scopeguard::guard(key, move |key| match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if let Err(e) = store.delete_object(&key).await {
                    warn!("Failed to release staging object {}: {}", key, e);
                }
            });
        }
        Err(_) => warn!("No runtime left to release staging object {}", key),
    })
}

/// Delete the staging object now. Failures are logged, not returned.
pub async fn release_staging<F: FnOnce(String)>(
    store: &dyn ObjectStore,
    guard: ScopeGuard<String, F>,
) {
    let key = ScopeGuard::into_inner(guard);
    if let Err(e) = store.delete_object(&key).await {
        warn!("Failed to release staging object {}: {}", key, e);
    }
}
