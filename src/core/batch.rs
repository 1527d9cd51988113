//! Runs the assembler over a list of symbols.
//!
//! A failure while processing one symbol never aborts the batch: it becomes an
//! [`AssetFailure`] in that symbol's [`AssetOutcome`] and the remaining symbols carry
//! on. Outcomes come back in input order regardless of concurrency.

use crate::core::asset::AssetRecord;
use crate::core::assembler::{AssemblyOptions, assemble};
use crate::core::snapshot::{ProviderSnapshot, SnapshotProvider};
use futures::{FutureExt, StreamExt, stream};
use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use governor::{Quota, RateLimiter};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssetFailure {
    #[error("provider {provider} could not supply {symbol}: {reason}")]
    ProviderUnavailable {
        symbol: String,
        provider: String,
        reason: String,
    },
    #[error("provider {provider} timed out after {timeout:?} for {symbol}")]
    Timeout {
        symbol: String,
        provider: String,
        timeout: Duration,
    },
    #[error("processing {symbol} aborted: {reason}")]
    Internal { symbol: String, reason: String },
}

#[derive(Debug)]
pub struct AssetOutcome {
    pub symbol: String,
    pub result: Result<AssetRecord, AssetFailure>,
}

impl AssetOutcome {
    pub fn record(&self) -> Option<&AssetRecord> {
        self.result.as_ref().ok()
    }
}

/// Splits outcomes into the records to persist and the failures to report.
pub fn partition(outcomes: Vec<AssetOutcome>) -> (Vec<AssetRecord>, Vec<AssetFailure>) {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(record) => records.push(record),
            Err(failure) => failures.push(failure),
        }
    }
    (records, failures)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Symbols processed at the same time.
    pub concurrency: usize,
    /// Minimum spacing between provider requests; zero disables throttling.
    pub request_delay: Duration,
    /// Upper bound for a single provider call.
    pub request_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            concurrency: 1,
            request_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Collector<'a> {
    primary: &'a dyn SnapshotProvider,
    secondary: Option<&'a dyn SnapshotProvider>,
    options: BatchOptions,
    assembly: AssemblyOptions,
    limiter: Option<DirectRateLimiter>,
}

impl<'a> Collector<'a> {
    pub fn new(
        primary: &'a dyn SnapshotProvider,
        secondary: Option<&'a dyn SnapshotProvider>,
        options: BatchOptions,
        assembly: AssemblyOptions,
    ) -> Self {
        let limiter = Quota::with_period(options.request_delay).map(RateLimiter::direct);
        Collector {
            primary,
            secondary,
            options,
            assembly,
            limiter,
        }
    }

    /// Processes every symbol and returns one outcome per symbol, in input order.
    /// `on_outcome` is invoked as each symbol finishes.
    pub async fn collect(
        &self,
        symbols: &[String],
        on_outcome: &(dyn Fn(&AssetOutcome) + Sync),
    ) -> Vec<AssetOutcome> {
        stream::iter(symbols)
            .map(|symbol| async move {
                let outcome = self.collect_one(symbol).await;
                on_outcome(&outcome);
                outcome
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    #[instrument(name = "CollectAsset", skip(self), fields(symbol = %symbol))]
    pub async fn collect_one(&self, symbol: &str) -> AssetOutcome {
        let result = AssertUnwindSafe(self.process(symbol))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(AssetFailure::Internal {
                    symbol: symbol.to_string(),
                    reason: panic_message(panic.as_ref()),
                })
            });

        match &result {
            Ok(_) => debug!("Asset assembled"),
            Err(e) => warn!(error = %e, "Skipping asset"),
        }

        AssetOutcome {
            symbol: symbol.to_string(),
            result,
        }
    }

    async fn process(&self, symbol: &str) -> Result<AssetRecord, AssetFailure> {
        let primary = self.fetch(self.primary, symbol).await?;

        let secondary = match self.secondary {
            Some(provider) => match self.fetch(provider, symbol).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    debug!(error = %e, "Secondary provider failed, using primary only");
                    None
                }
            },
            None => None,
        };

        Ok(assemble(symbol, &primary, secondary.as_ref(), &self.assembly))
    }

    async fn fetch(
        &self,
        provider: &dyn SnapshotProvider,
        symbol: &str,
    ) -> Result<ProviderSnapshot, AssetFailure> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        match tokio::time::timeout(self.options.request_timeout, provider.fetch_snapshot(symbol))
            .await
        {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => Err(AssetFailure::ProviderUnavailable {
                symbol: symbol.to_string(),
                provider: provider.name().to_string(),
                reason: format!("{e:#}"),
            }),
            Err(_) => Err(AssetFailure::Timeout {
                symbol: symbol.to_string(),
                provider: provider.name().to_string(),
                timeout: self.options.request_timeout,
            }),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    enum Behaviour {
        Ok { price: f64, delay_ms: u64 },
        Fail(&'static str),
        Hang,
        Panic,
    }

    struct MockProvider {
        name: &'static str,
        behaviours: HashMap<&'static str, Behaviour>,
        call_count: AtomicUsize,
    }

    impl MockProvider {
        fn new(name: &'static str, behaviours: Vec<(&'static str, Behaviour)>) -> Self {
            MockProvider {
                name,
                behaviours: behaviours.into_iter().collect(),
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SnapshotProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.behaviours.get(symbol) {
                Some(Behaviour::Ok { price, delay_ms }) => {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                    Ok(ProviderSnapshot::default()
                        .with_field("currentPrice", *price)
                        .with_field("longName", symbol))
                }
                Some(Behaviour::Fail(msg)) => Err(anyhow!(*msg)),
                Some(Behaviour::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(anyhow!("unreachable"))
                }
                Some(Behaviour::Panic) => panic!("provider blew up on {symbol}"),
                None => Err(anyhow!("Unknown symbol {symbol}")),
            }
        }
    }

    fn fast_options(concurrency: usize) -> BatchOptions {
        BatchOptions {
            concurrency,
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_millis(200),
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_asset_does_not_abort_batch() {
        let provider = MockProvider::new(
            "mock",
            vec![
                ("AAAA3.SA", Behaviour::Ok { price: 10.0, delay_ms: 0 }),
                ("BBBB3.SA", Behaviour::Fail("HTTP 404")),
                ("CCCC3.SA", Behaviour::Ok { price: 30.0, delay_ms: 0 }),
            ],
        );
        let collector =
            Collector::new(&provider, None, fast_options(1), AssemblyOptions::default());

        let outcomes = collector
            .collect(&symbols(&["AAAA3.SA", "BBBB3.SA", "CCCC3.SA"]), &|_| ())
            .await;
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(
            &outcomes[1].result,
            Err(AssetFailure::ProviderUnavailable { symbol, provider, reason })
                if symbol == "BBBB3.SA" && provider == "mock" && reason == "HTTP 404"
        ));

        let (records, failures) = partition(outcomes);
        let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAAA3", "CCCC3"]);
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_output_keeps_input_order_under_concurrency() {
        let provider = MockProvider::new(
            "mock",
            vec![
                ("SLOW3.SA", Behaviour::Ok { price: 1.0, delay_ms: 80 }),
                ("MIDL3.SA", Behaviour::Ok { price: 2.0, delay_ms: 40 }),
                ("FAST3.SA", Behaviour::Ok { price: 3.0, delay_ms: 0 }),
            ],
        );
        let collector =
            Collector::new(&provider, None, fast_options(3), AssemblyOptions::default());
        let finished = std::sync::Mutex::new(Vec::new());

        let outcomes = collector
            .collect(&symbols(&["SLOW3.SA", "MIDL3.SA", "FAST3.SA"]), &|outcome| {
                finished.lock().unwrap().push(outcome.symbol.clone());
            })
            .await;

        let order: Vec<&str> = outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(order, vec!["SLOW3.SA", "MIDL3.SA", "FAST3.SA"]);
        let prices: Vec<f64> = outcomes.iter().map(|o| o.record().unwrap().price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
        assert_eq!(finished.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let provider = MockProvider::new(
            "mock",
            vec![
                ("HANG3.SA", Behaviour::Hang),
                ("GOOD3.SA", Behaviour::Ok { price: 5.0, delay_ms: 0 }),
            ],
        );
        let collector =
            Collector::new(&provider, None, fast_options(1), AssemblyOptions::default());

        let outcomes = collector
            .collect(&symbols(&["HANG3.SA", "GOOD3.SA"]), &|_| ())
            .await;
        assert!(matches!(
            &outcomes[0].result,
            Err(AssetFailure::Timeout { timeout, .. }) if *timeout == Duration::from_millis(200)
        ));
        assert!(outcomes[1].result.is_ok());
    }

    #[tokio::test]
    async fn test_panic_is_contained_to_one_asset() {
        let provider = MockProvider::new(
            "mock",
            vec![
                ("AAAA3.SA", Behaviour::Ok { price: 1.0, delay_ms: 0 }),
                ("BOOM3.SA", Behaviour::Panic),
                ("CCCC3.SA", Behaviour::Ok { price: 3.0, delay_ms: 0 }),
            ],
        );
        let collector =
            Collector::new(&provider, None, fast_options(2), AssemblyOptions::default());

        let outcomes = collector
            .collect(&symbols(&["AAAA3.SA", "BOOM3.SA", "CCCC3.SA"]), &|_| ())
            .await;
        match &outcomes[1].result {
            Err(AssetFailure::Internal { symbol, reason }) => {
                assert_eq!(symbol, "BOOM3.SA");
                assert!(reason.contains("provider blew up"));
            }
            other => panic!("Expected internal failure, got {other:?}"),
        }
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_secondary_failure_is_not_fatal() {
        let primary = MockProvider::new(
            "primary",
            vec![("AAAA3.SA", Behaviour::Ok { price: 10.0, delay_ms: 0 })],
        );
        let secondary = MockProvider::new("secondary", vec![("AAAA3.SA", Behaviour::Fail("down"))]);
        let collector = Collector::new(
            &primary,
            Some(&secondary),
            fast_options(1),
            AssemblyOptions::default(),
        );

        let outcomes = collector.collect(&symbols(&["AAAA3.SA"]), &|_| ()).await;
        assert_eq!(outcomes[0].record().unwrap().price, 10.0);
        assert_eq!(secondary.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_secondary_is_skipped_when_primary_fails() {
        let primary = MockProvider::new("primary", vec![("AAAA3.SA", Behaviour::Fail("down"))]);
        let secondary = MockProvider::new(
            "secondary",
            vec![("AAAA3.SA", Behaviour::Ok { price: 10.0, delay_ms: 0 })],
        );
        let collector = Collector::new(
            &primary,
            Some(&secondary),
            fast_options(1),
            AssemblyOptions::default(),
        );

        let outcomes = collector.collect(&symbols(&["AAAA3.SA"]), &|_| ()).await;
        assert!(outcomes[0].result.is_err());
        assert_eq!(secondary.call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_delay_spaces_provider_calls() {
        let provider = MockProvider::new(
            "mock",
            vec![
                ("AAAA3.SA", Behaviour::Ok { price: 1.0, delay_ms: 0 }),
                ("BBBB3.SA", Behaviour::Ok { price: 2.0, delay_ms: 0 }),
                ("CCCC3.SA", Behaviour::Ok { price: 3.0, delay_ms: 0 }),
            ],
        );
        let options = BatchOptions {
            concurrency: 3,
            request_delay: Duration::from_millis(50),
            request_timeout: Duration::from_secs(1),
        };
        let collector = Collector::new(&provider, None, options, AssemblyOptions::default());

        let started = Instant::now();
        let outcomes = collector
            .collect(&symbols(&["AAAA3.SA", "BBBB3.SA", "CCCC3.SA"]), &|_| ())
            .await;
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        // First call is immediate, the other two wait one period each.
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_empty_symbol_list() {
        let provider = MockProvider::new("mock", Vec::new());
        let collector =
            Collector::new(&provider, None, fast_options(1), AssemblyOptions::default());
        assert!(collector.collect(&[], &|_| ()).await.is_empty());
        assert_eq!(provider.call_count.load(Ordering::SeqCst), 0);
    }
}
