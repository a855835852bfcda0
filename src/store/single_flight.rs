//! Keyed request de-duplication.
//!
//! At most one future runs per key. Callers arriving while it is in flight
//! await the same future and receive a clone of its output.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

pub struct SingleFlight<K, V>
where
    V: Clone,
{
    calls: Mutex<HashMap<K, Shared<BoxFuture<'static, V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.calls.lock().contains_key(key)
    }

    /// Run `make()` under `key`, or join the call already in flight.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let call = {
            let mut calls = self.calls.lock();
            match calls.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let call = make().boxed().shared();
                    calls.insert(key.clone(), call.clone());
                    call
                }
            }
        };

        let output = call.clone().await;

        // Whoever finishes first clears the slot, but only if it still holds this call
        let mut calls = self.calls.lock();
        if calls.get(&key).is_some_and(|current| current.ptr_eq(&call)) {
            calls.remove(&key);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_execution() {
        let flights: Arc<SingleFlight<&'static str, usize>> = Arc::new(SingleFlight::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let flights = flights.clone();
            let executions = executions.clone();
            handles.push(tokio::spawn(async move {
                flights
                    .run("projects", move || async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        executions.fetch_add(1, Ordering::SeqCst) + 1
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 1);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert!(!flights.is_in_flight(&"projects"));
    }

    #[tokio::test]
    async fn sequential_calls_run_again() {
        let flights: SingleFlight<u8, u8> = SingleFlight::new();
        assert_eq!(flights.run(1, || async { 10 }).await, 10);
        assert_eq!(flights.run(1, || async { 20 }).await, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_do_not_block_each_other() {
        let flights: Arc<SingleFlight<u8, u8>> = Arc::new(SingleFlight::new());

        let slow = {
            let flights = flights.clone();
            tokio::spawn(async move {
                flights
                    .run(1, || async {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        1
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(flights.is_in_flight(&1));

        assert_eq!(flights.run(2, || async { 2 }).await, 2);
        assert!(flights.is_in_flight(&1));
        assert_eq!(slow.await.unwrap(), 1);
    }
}
