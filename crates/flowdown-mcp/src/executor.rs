//! Single-slot execution context for the connection table.
//!
//! Every lifecycle operation (reconcile, ensure, test, prepare, shutdown)
//! takes the slot before touching connections, so two of them never
//! interleave. The slot is a fair `tokio::sync::Mutex`: waiters are served in
//! the order they started waiting.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes access to a piece of state `T`.
#[derive(Debug)]
pub struct SerialExecutor<T> {
    state: Arc<Mutex<T>>,
}

impl<T> Clone for SerialExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Send + 'static> SerialExecutor<T> {
    pub fn new(state: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Wait for the slot and hold it until the guard is dropped.
    pub async fn acquire(&self) -> OwnedMutexGuard<T> {
        Arc::clone(&self.state).lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(executor: &SerialExecutor<Vec<String>>, name: &'static str) -> tokio::task::JoinHandle<()> {
        let executor = executor.clone();
        tokio::spawn(async move {
            let mut log = executor.acquire().await;
            log.push(format!("{name}:start"));
            tokio::time::sleep(Duration::from_millis(10)).await;
            log.push(format!("{name}:end"));
        })
    }

    #[tokio::test]
    async fn test_tasks_never_interleave() {
        let executor = SerialExecutor::new(Vec::new());

        let first = record(&executor, "first");
        // Let the first task take the slot
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = record(&executor, "second");

        first.await.unwrap();
        second.await.unwrap();

        let log = executor.acquire().await;
        assert_eq!(
            *log,
            ["first:start", "first:end", "second:start", "second:end"]
        );
    }

    #[tokio::test]
    async fn test_waiters_served_in_arrival_order() {
        let executor = SerialExecutor::new(Vec::new());
        let held = executor.acquire().await;

        let mut tasks = Vec::new();
        for name in ["a", "b", "c"] {
            tasks.push(record(&executor, name));
            // Each task reaches the lock before the next is spawned
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        drop(held);
        for task in tasks {
            task.await.unwrap();
        }

        let log = executor.acquire().await;
        let starts: Vec<_> = log.iter().filter(|e| e.ends_with(":start")).collect();
        assert_eq!(starts, ["a:start", "b:start", "c:start"]);
    }
}
