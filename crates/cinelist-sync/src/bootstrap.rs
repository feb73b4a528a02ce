//! Startup sequence.

use cinelist_api::backend::BackendApi;

use crate::context::SyncContext;
use crate::session::Session;

/// Restores the persisted session and, if logged in, starts a background
/// fetch of both lists.
///
/// Returns without waiting for the fetch; use [`SyncContext::settle`] to
/// wait for it.
pub fn bootstrap<B: BackendApi + Send + Sync + 'static>(ctx: &SyncContext<B>) -> Session {
    let session = ctx.auth().restore();
    if session.is_authenticated {
        tracing::debug!("session restored, reconciling lists");
        ctx.reconcile_in_background();
    }
    session
}
