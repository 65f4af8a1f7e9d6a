use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs `task` for every item with at most `limit` tasks in flight and waits
/// for all of them. Results arrive in completion order, not input order.
pub async fn fan_out<I, T, R, F, Fut>(items: I, limit: usize, task: F) -> Vec<R>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items)
        .map(task)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_items_complete() {
        let mut results = fan_out(0..20, 4, |i| async move { i * 2 }).await;
        results.sort_unstable();
        assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_in_flight_tasks_never_exceed_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        fan_out(0..32, 3, |_| {
            let in_flight = &in_flight;
            let peak = &peak;
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_zero_limit_still_makes_progress() {
        let results = fan_out(vec!["a"], 0, |s| async move { s.len() }).await;
        assert_eq!(results, vec![1]);
    }
}
