//! Audit logging.
//!
//! Writes are best-effort: a failure is logged and dropped so it can never
//! fail the operation being audited.

use tracing::instrument;

use super::{ServiceError, require_admin};
use crate::models::activity::ACTIVITY_FEED_LIMIT;
use crate::models::{Activity, Caller, NewActivity};
use crate::store::ActivityStore;

/// Record `activity`, logging and swallowing any store error.
#[instrument(skip(store, activity), fields(kind = %activity.kind))]
pub async fn record<S: ActivityStore>(store: &S, activity: NewActivity) {
    if let Err(e) = store.record(activity).await {
        tracing::warn!(error = %e, "Failed to record activity");
    }
}

/// The latest entries for the admin dashboard.
///
/// # Errors
///
/// Returns `ServiceError::Unauthorized` unless the caller is an admin.
pub async fn latest<S: ActivityStore>(
    store: &S,
    caller: &Caller,
) -> Result<Vec<Activity>, ServiceError> {
    require_admin(caller, "view the activity log")?;
    Ok(store.latest(ACTIVITY_FEED_LIMIT).await?)
}
