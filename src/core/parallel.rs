//! Order-Preserving Parallel Map
//!
//! Fan a batch out over tokio tasks with a bounded number in flight and
//! collect the results in input order, whatever order the tasks finish in.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio::task::JoinError;

/// Default pool size: twice the available processing units.
pub fn default_workers() -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4);
    cpu_count * 2
}

/// Spawn `f(item)` for every item, at most `workers` at a time.
///
/// The i-th output belongs to the i-th input. A task that panics yields a
/// `JoinError` in its own slot and does not disturb the others.
pub async fn ordered_map<T, R, F, Fut>(
    items: Vec<T>,
    workers: usize,
    f: F,
) -> Vec<Result<R, JoinError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    stream::iter(items)
        .map(|item| tokio::spawn(f(item)))
        .buffered(workers.max(1))
        .collect()
        .await
}
