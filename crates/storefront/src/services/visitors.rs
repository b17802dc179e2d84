//! Site visit counter.

use super::ServiceError;
use crate::store::CounterStore;

/// Counter holding the number of recorded visits.
pub const VISITOR_COUNTER: &str = "visitors";

/// Record one visit and return the new total.
///
/// # Errors
///
/// Returns `ServiceError::Persistence` if the counter can't be incremented.
pub async fn record_visit<S: CounterStore>(store: &S) -> Result<i64, ServiceError> {
    Ok(store.increment_and_get(VISITOR_COUNTER, 0).await?)
}

/// Visits recorded so far.
///
/// # Errors
///
/// Returns `ServiceError::Persistence` if the counter can't be read.
pub async fn visitor_count<S: CounterStore>(store: &S) -> Result<i64, ServiceError> {
    Ok(store.current(VISITOR_COUNTER).await?.unwrap_or(0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::{ORDER_NUMBER_COUNTER, ORDER_NUMBER_START};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_visits_count_from_one() {
        let store = MemoryStore::new();
        assert_eq!(visitor_count(&store).await.unwrap(), 0);

        assert_eq!(record_visit(&store).await.unwrap(), 1);
        assert_eq!(record_visit(&store).await.unwrap(), 2);
        assert_eq!(visitor_count(&store).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_visits_do_not_touch_order_numbers() {
        let store = MemoryStore::new();
        record_visit(&store).await.unwrap();

        let next = store
            .increment_and_get(ORDER_NUMBER_COUNTER, ORDER_NUMBER_START)
            .await
            .unwrap();
        assert_eq!(next, 1001);
    }
}
