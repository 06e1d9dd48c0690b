//! Rollback on the error path.

use tracing::{error, warn};

use crate::error::CatalogError;
use crate::store::Transactional;

/// Roll `tx` back after `cause` and log both. A failed rollback is logged and
/// the caller still reports `cause`; dropping the handle discards the
/// transaction on every backend.
pub(crate) async fn abort<S>(store: &S, tx: S::Tx, operation: &'static str, cause: &CatalogError)
where
    S: Transactional,
{
    warn!(operation, error = %cause, "rolling back");
    if let Err(err) = store.rollback(tx).await {
        error!(operation, error = %err, "rollback failed");
    }
}
