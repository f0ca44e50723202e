//! Generic ordered-fallback execution.
//!
//! A [`StrategyChain`] holds named candidate operations for one logical
//! request and runs them strictly in the order they were pushed. The first
//! success short-circuits the rest; every failure is recorded in an ordered
//! ledger before the chain advances. When the list runs out, the chain fails
//! with [`PdfMillError::AllStrategiesExhausted`] carrying that ledger —
//! never a default or partial result.
//!
//! Strategies are constructed lazily: the closure building a strategy's
//! future is not called unless every earlier strategy has already failed, so
//! a chain whose first entry wins pays nothing for the entries behind it.
//!
//! This module knows nothing about PDFs, processes, or files; the pipelines
//! give it meaning.

use crate::error::{AttemptRecord, PdfMillError, StrategyError};
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::{debug, warn};

/// A lazily built strategy future.
pub type StrategyFuture<'a, T> = BoxFuture<'a, Result<T, StrategyError>>;

struct Strategy<'a, T> {
    name: &'static str,
    make: Box<dyn FnOnce() -> StrategyFuture<'a, T> + Send + 'a>,
}

/// The result of a chain that found a winner: the value, which strategy
/// produced it, and the failures that came before it.
#[derive(Debug)]
pub struct ChainWin<T> {
    pub value: T,
    pub strategy: &'static str,
    pub attempts: Vec<AttemptRecord>,
}

/// An ordered list of candidate implementations for one logical operation.
pub struct StrategyChain<'a, T> {
    operation: &'static str,
    strategies: Vec<Strategy<'a, T>>,
}

impl<'a, T> StrategyChain<'a, T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            strategies: Vec::new(),
        }
    }

    /// Append a candidate. `make` is only invoked if every strategy pushed
    /// before it has failed.
    pub fn push<F>(&mut self, name: &'static str, make: F)
    where
        F: FnOnce() -> StrategyFuture<'a, T> + Send + 'a,
    {
        self.strategies.push(Strategy {
            name,
            make: Box::new(make),
        });
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run the candidates in order and return the first success.
    pub async fn run(self) -> Result<ChainWin<T>, PdfMillError> {
        let total = self.strategies.len();
        let mut attempts = Vec::new();

        for (i, strategy) in self.strategies.into_iter().enumerate() {
            debug!(
                operation = self.operation,
                strategy = strategy.name,
                "trying strategy {}/{}",
                i + 1,
                total
            );
            let started = Instant::now();

            match (strategy.make)().await {
                Ok(value) => {
                    debug!(
                        operation = self.operation,
                        strategy = strategy.name,
                        skipped = total - i - 1,
                        "strategy succeeded"
                    );
                    return Ok(ChainWin {
                        value,
                        strategy: strategy.name,
                        attempts,
                    });
                }
                Err(error) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    warn!(
                        operation = self.operation,
                        strategy = strategy.name,
                        %error,
                        "strategy failed, advancing to the next one"
                    );
                    attempts.push(AttemptRecord {
                        strategy: strategy.name.to_string(),
                        error,
                        duration_ms,
                    });
                }
            }
        }

        Err(PdfMillError::AllStrategiesExhausted {
            operation: self.operation,
            attempts,
        })
    }
}
