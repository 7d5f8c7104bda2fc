//! Computation Orchestrator
//!
//! Cache-aside pipeline: check cache, compute on miss, populate cache,
//! record, return. Cache failures read as misses; only the request log
//! write can fail a computation.

use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigInt;
use tracing::{debug, warn};

use super::{OrchestratorStats, RequestRecorder, StatsSnapshot};
use crate::cache::Cache;
use crate::connection::ConnectionStatus;
use crate::error::PersistenceError;
use crate::math::{Calculator, Computation};
use crate::metrics;

/// Runs computations through the cache and request log.
pub struct ComputationOrchestrator {
    cache: Arc<dyn Cache>,
    calculator: Arc<dyn Calculator>,
    recorder: RequestRecorder,
    /// Expiry applied to cache writes, None = keep forever
    cache_ttl: Option<Duration>,
    stats: OrchestratorStats,
}

impl ComputationOrchestrator {
    pub fn new(
        cache: Arc<dyn Cache>,
        calculator: Arc<dyn Calculator>,
        recorder: RequestRecorder,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            cache,
            calculator,
            recorder,
            cache_ttl,
            stats: OrchestratorStats::new(),
        }
    }

    /// Returns the result of `computation`.
    ///
    /// A cache hit returns immediately: no computation, no request log row
    /// and no stream event. A miss computes, caches, then records. If the
    /// record cannot be persisted the cached value stays in place.
    pub async fn compute(&self, computation: &Computation) -> Result<BigInt, PersistenceError> {
        let key = computation.cache_key();
        let endpoint = computation.endpoint();

        if let Some(cached) = self.cache.get(&key).await {
            match cached.parse::<BigInt>() {
                Ok(value) => {
                    debug!(%key, "cache hit");
                    self.stats.record_hit();
                    metrics::record_cache_hit(endpoint);
                    return Ok(value);
                }
                Err(e) => warn!(%key, error = %e, "ignoring unparseable cached value"),
            }
        }

        self.stats.record_miss();
        metrics::record_cache_miss(endpoint);
        let result = self.evaluate(*computation).await;
        let rendered = result.to_string();
        debug!(%key, "computed on cache miss");

        self.cache.set(&key, &rendered, self.cache_ttl).await;

        match self
            .recorder
            .record(endpoint, &computation.input(), &rendered)
            .await
        {
            Ok(_) => {
                self.stats.record_persisted();
                metrics::record_persisted(endpoint);
            }
            Err(e) => {
                self.stats.record_persistence_failure();
                metrics::record_persistence_failure(endpoint);
                return Err(e);
            }
        }

        Ok(result)
    }

    /// Runs the big-integer work on the blocking pool so large inputs do
    /// not stall the async workers.
    async fn evaluate(&self, computation: Computation) -> BigInt {
        let calculator = self.calculator.clone();
        match tokio::task::spawn_blocking(move || computation.evaluate(calculator.as_ref())).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            // Cancelled during runtime shutdown: finish inline.
            Err(_) => computation.evaluate(self.calculator.as_ref()),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn cache_status(&self) -> ConnectionStatus {
        self.cache.status().await
    }

    pub fn recorder(&self) -> &RequestRecorder {
        &self.recorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheClient, MemoryCache};
    use crate::math::PureMath;
    use crate::storage::{NewRequestLog, RequestLogRecord, RequestStore, SqliteStore};
    use crate::stream::{EventSink, EventStreamClient, MemorySink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // == Test Doubles ==
    /// Counts how often each pure function is invoked.
    #[derive(Default)]
    struct CountingCalculator {
        calls: AtomicUsize,
    }

    impl CountingCalculator {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Calculator for CountingCalculator {
        fn power(&self, base: i64, exp: u32) -> BigInt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PureMath.power(base, exp)
        }

        fn fibonacci(&self, n: u64) -> BigInt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PureMath.fibonacci(n)
        }

        fn factorial(&self, n: u64) -> BigInt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PureMath.factorial(n)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RequestStore for FailingStore {
        async fn insert(&self, _log: NewRequestLog) -> Result<RequestLogRecord, PersistenceError> {
            Err(PersistenceError::Poisoned)
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<RequestLogRecord>, PersistenceError> {
            Err(PersistenceError::Poisoned)
        }
    }

    struct Fixture {
        orchestrator: ComputationOrchestrator,
        calculator: Arc<CountingCalculator>,
        store: Arc<SqliteStore>,
        sink: Arc<MemorySink>,
    }

    fn fixture_with(cache: Arc<dyn Cache>, events: Option<Arc<dyn EventSink>>) -> Fixture {
        let calculator = Arc::new(CountingCalculator::default());
        let store = Arc::new(SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap());
        let sink = Arc::new(MemorySink::new());
        let events: Arc<dyn EventSink> = match events {
            Some(events) => events,
            None => sink.clone(),
        };
        let recorder = RequestRecorder::new(store.clone(), events, "request_logs");
        let orchestrator =
            ComputationOrchestrator::new(cache, calculator.clone(), recorder, None);
        Fixture {
            orchestrator,
            calculator,
            store,
            sink,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryCache::new(100)), None)
    }

    fn unreachable_cache() -> Arc<CacheClient> {
        Arc::new(CacheClient::new(
            "redis://127.0.0.1:1/0",
            Duration::from_millis(200),
            Duration::from_millis(100),
            Duration::from_secs(30),
        ))
    }

    // == Literal Scenarios ==
    #[tokio::test]
    async fn test_literal_results() {
        let f = fixture();
        let cases = [
            (Computation::Power { base: 2, exp: 8 }, 256),
            (Computation::Fibonacci { n: 7 }, 13),
            (Computation::Factorial { n: 6 }, 720),
            (Computation::Fibonacci { n: 0 }, 0),
        ];

        for (computation, expected) in cases {
            let result = f.orchestrator.compute(&computation).await.unwrap();
            assert_eq!(result, BigInt::from(expected), "{}", computation);
        }
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let f = fixture();
        let pow = Computation::Power { base: 2, exp: 8 };

        let first = f.orchestrator.compute(&pow).await.unwrap();
        let second = f.orchestrator.compute(&pow).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.calculator.calls(), 1);
    }

    #[tokio::test]
    async fn test_hit_does_not_record_or_publish() {
        let f = fixture();
        let fib = Computation::Fibonacci { n: 7 };

        f.orchestrator.compute(&fib).await.unwrap();
        f.orchestrator.compute(&fib).await.unwrap();
        f.orchestrator.compute(&fib).await.unwrap();

        let records = f.store.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "fib");
        assert_eq!(records[0].input, "7");
        assert_eq!(records[0].result, "13");
        assert_eq!(f.sink.events().len(), 1);

        let stats = f.orchestrator.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.records, 1);
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        let cache = Arc::new(MemoryCache::new(100));
        let f = fixture_with(cache.clone(), None);

        f.orchestrator
            .compute(&Computation::Factorial { n: 6 })
            .await
            .unwrap();

        assert_eq!(cache.get("fact:6").await, Some("720".to_string()));
    }

    #[tokio::test]
    async fn test_prepopulated_cache_is_trusted() {
        let cache = Arc::new(MemoryCache::new(100));
        cache.set("fib:10", "55", None).await;
        let f = fixture_with(cache, None);

        let result = f
            .orchestrator
            .compute(&Computation::Fibonacci { n: 10 })
            .await
            .unwrap();

        assert_eq!(result, BigInt::from(55));
        assert_eq!(f.calculator.calls(), 0);
        assert!(f.store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_cache_value_is_recomputed() {
        let cache = Arc::new(MemoryCache::new(100));
        cache.set("fact:5", "not-a-number", None).await;
        let f = fixture_with(cache.clone(), None);

        let result = f
            .orchestrator
            .compute(&Computation::Factorial { n: 5 })
            .await
            .unwrap();

        assert_eq!(result, BigInt::from(120));
        assert_eq!(f.calculator.calls(), 1);
        assert_eq!(cache.get("fact:5").await, Some("120".to_string()));
    }

    // == Degradation ==
    #[tokio::test]
    async fn test_unavailable_cache_still_computes_correctly() {
        let f = fixture_with(unreachable_cache(), None);
        let pow = Computation::Power { base: 3, exp: 4 };

        for _ in 0..3 {
            assert_eq!(f.orchestrator.compute(&pow).await.unwrap(), BigInt::from(81));
        }

        // Every call is a miss, so every call computes and records.
        assert_eq!(f.calculator.calls(), 3);
        assert_eq!(f.store.recent(10).await.unwrap().len(), 3);
        assert_eq!(
            f.orchestrator.cache_status().await,
            ConnectionStatus::Unavailable
        );
    }

    #[tokio::test]
    async fn test_unavailable_stream_still_records() {
        let stream: Arc<dyn EventSink> = Arc::new(EventStreamClient::new(
            "redis://127.0.0.1:1/0",
            1000,
            Duration::from_millis(200),
            Duration::from_millis(100),
            Duration::from_secs(30),
        ));
        let f = fixture_with(Arc::new(MemoryCache::new(100)), Some(stream.clone()));

        let result = f
            .orchestrator
            .compute(&Computation::Factorial { n: 6 })
            .await
            .unwrap();

        assert_eq!(result, BigInt::from(720));
        let records = f.store.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "720");
        assert_eq!(stream.status().await, ConnectionStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_large_result_is_exact() {
        let f = fixture();

        let result = f
            .orchestrator
            .compute(&Computation::Power { base: 2, exp: 100 })
            .await
            .unwrap();

        assert_eq!(result.to_string(), "1267650600228229401496703205376");
    }

    // == Cache Expiry ==
    /// Remembers the TTL passed with every write.
    #[derive(Default)]
    struct RecordingCache {
        writes: Mutex<Vec<(String, Option<Duration>)>>,
    }

    #[async_trait]
    impl Cache for RecordingCache {
        async fn get(&self, _key: &str) -> Option<String> {
            None
        }

        async fn set(&self, key: &str, _value: &str, ttl: Option<Duration>) {
            self.writes.lock().unwrap().push((key.to_string(), ttl));
        }
    }

    fn orchestrator_with_ttl(
        cache: Arc<dyn Cache>,
        ttl: Option<Duration>,
    ) -> ComputationOrchestrator {
        let store = SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap();
        let recorder =
            RequestRecorder::new(Arc::new(store), Arc::new(MemorySink::new()), "request_logs");
        ComputationOrchestrator::new(cache, Arc::new(PureMath), recorder, ttl)
    }

    #[tokio::test]
    async fn test_configured_ttl_reaches_cache() {
        let cache = Arc::new(RecordingCache::default());
        let orchestrator = orchestrator_with_ttl(cache.clone(), Some(Duration::from_secs(300)));

        orchestrator
            .compute(&Computation::Fibonacci { n: 7 })
            .await
            .unwrap();

        let writes = cache.writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![("fib:7".to_string(), Some(Duration::from_secs(300)))]
        );
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_fail_computation() {
        let cache = Arc::new(MemoryCache::new(100));
        let orchestrator =
            orchestrator_with_ttl(cache.clone(), Some(Duration::from_secs(u64::MAX)));
        let fib = Computation::Fibonacci { n: 7 };

        assert_eq!(orchestrator.compute(&fib).await.unwrap(), BigInt::from(13));
        assert_eq!(orchestrator.compute(&fib).await.unwrap(), BigInt::from(13));
        assert_eq!(orchestrator.stats().hits, 1);
    }

    // == Fatal Path ==
    #[tokio::test]
    async fn test_persistence_failure_is_surfaced() {
        let cache = Arc::new(MemoryCache::new(100));
        let sink = Arc::new(MemorySink::new());
        let recorder = RequestRecorder::new(Arc::new(FailingStore), sink.clone(), "request_logs");
        let orchestrator = ComputationOrchestrator::new(
            cache.clone(),
            Arc::new(PureMath),
            recorder,
            None,
        );

        let result = orchestrator.compute(&Computation::Power { base: 2, exp: 8 }).await;

        assert!(matches!(result, Err(PersistenceError::Poisoned)));
        assert!(sink.events().is_empty());
        // The cache write is not rolled back.
        assert_eq!(cache.get("pow:2:8").await, Some("256".to_string()));
        assert_eq!(orchestrator.stats().persistence_failures, 1);
    }
}
