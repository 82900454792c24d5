use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;

pub mod broker_trades;

pub use broker_trades::{BrokerTradesFetcher, Metric, SymbolSummary, TradeDayRecord};

/// Default concurrency guard applied when issuing broker-trades requests.
pub const FETCH_CONCURRENCY_LIMIT: usize = 3;

#[inline]
pub fn ensure_concurrency_limit(limit: usize) -> usize {
    limit.max(1)
}

/// Runs `op` over every item with at most `limit` calls in flight at once.
/// Output is index-aligned with the input no matter in which order the
/// individual calls finish, and the future resolves only after the last
/// call has completed.
pub async fn bounded_map<I, T, F, Fut>(items: Vec<I>, limit: usize, op: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let limit = ensure_concurrency_limit(limit);
    let semaphore = Arc::new(Semaphore::new(limit));

    // Fan out while honouring the concurrency guard to stay friendly to the API.
    stream::iter(items)
        .map(|item| {
            let semaphore = Arc::clone(&semaphore);
            let op = &op;
            async move {
                let _permit = semaphore.acquire().await.unwrap();
                op(item).await
            }
        })
        .buffered(limit)
        .collect()
        .await
}
