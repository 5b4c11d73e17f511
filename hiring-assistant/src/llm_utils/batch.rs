//! Batch execution utilities for parallel task processing

use anyhow::{anyhow, Result};
use futures::{stream::FuturesUnordered, Future, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Context provided to each task in a batch
#[derive(Debug, Clone, Copy)]
pub struct TaskContext {
    /// Task number (1-indexed for display)
    pub task_number: usize,
    /// Total number of tasks in this batch
    pub total_tasks: usize,
}

/// Execute items in parallel batches with concurrency control
///
/// # Arguments
/// - `items`: Items to process
/// - `batch_size`: Maximum concurrent tasks
/// - `task_executor`: Function that processes each item, receives (item, context)
///
/// # Returns
/// Vector of results in order of completion (not input order)
///
/// # Error Handling
/// The executor is infallible from the batch's point of view: per-item
/// failures must be encoded in `R` so that one bad item never aborts its
/// siblings. Only runtime plumbing errors (closed semaphore) surface as `Err`.
pub async fn execute_batch<T, F, Fut, R>(
    items: Vec<T>,
    batch_size: usize,
    task_executor: F,
) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(batch_size.max(1)));
    let executor = Arc::new(task_executor);
    let mut tasks = FuturesUnordered::new();

    // Push all tasks to FuturesUnordered with semaphore control
    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let executor = executor.clone();

        let ctx = TaskContext {
            task_number: idx + 1,
            total_tasks: total,
        };

        tasks.push(async move {
            // Acquire permit (blocks while batch_size tasks are running)
            let _permit = sem
                .acquire()
                .await
                .map_err(|_| anyhow!("Semaphore closed"))?;

            Ok::<R, anyhow::Error>(executor(item, ctx).await)
        });
    }

    // Collect results as they complete
    let mut results = Vec::with_capacity(total);
    while let Some(result) = tasks.next().await {
        results.push(result?);
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_execute_batch() {
        let items = vec![1, 2, 3, 4, 5];

        let results = execute_batch(items, 2, |item, ctx| async move {
            assert!(ctx.task_number >= 1 && ctx.task_number <= 5);
            assert_eq!(ctx.total_tasks, 5);
            item * 2
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 5);
        // Results may not be in input order
        assert!(results.contains(&2));
        assert!(results.contains(&10));
    }

    #[tokio::test]
    async fn test_execute_batch_collects_per_item_failures() {
        let items = vec![1, 2, 3, 4, 5];

        let results = execute_batch(items, 2, |item, _ctx| async move {
            if item == 3 {
                Err(format!("failed at {}", item))
            } else {
                Ok(item * 2)
            }
        })
        .await
        .unwrap();

        // One failure, four successes - nothing aborted
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
    }

    #[tokio::test]
    async fn test_execute_batch_bounds_concurrency() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..12).collect();
        let (current_c, peak_c) = (current.clone(), peak.clone());

        execute_batch(items, 3, move |_item, _ctx| {
            let current = current_c.clone();
            let peak = peak_c.clone();
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_execute_batch_empty_input() {
        let results: Vec<u32> = execute_batch(Vec::<u32>::new(), 4, |item, _ctx| async move {
            item
        })
        .await
        .unwrap();

        assert!(results.is_empty());
    }
}
