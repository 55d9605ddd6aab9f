//! Notification listener
//!
//! Reconciles peer signals into the [`UnitCache`]. A `NewUnit` signal is
//! merged only when its unit is not cached yet; the merge never re-pulls and
//! never duplicates, so replaying a signal is harmless.

use crate::cache::UnitCache;
use branchy_types::{BranchySignal, Message};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a signal did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Merged,
    AlreadyPresent,
}

#[derive(Clone)]
pub struct SignalListener {
    units: Arc<UnitCache>,
}

impl SignalListener {
    pub fn new(units: Arc<UnitCache>) -> Self {
        Self { units }
    }

    pub fn handle(&self, signal: &BranchySignal) -> SignalOutcome {
        match &signal.message {
            Message::NewUnit(output) => {
                if output.info.hash != signal.unit_hash {
                    warn!(
                        signal_hash = %signal.unit_hash,
                        record_hash = %output.info.hash,
                        "NewUnit signal hash differs from its record, using the record"
                    );
                }
                if self.units.merge_if_absent(output) {
                    debug!(hash = %output.info.hash, "Merged unit from signal");
                    SignalOutcome::Merged
                } else {
                    SignalOutcome::AlreadyPresent
                }
            }
        }
    }

    /// Consume `signals` until the stream ends. Returns how many units were
    /// merged.
    pub async fn run<S>(self, signals: S) -> usize
    where
        S: Stream<Item = BranchySignal> + Send,
    {
        futures::pin_mut!(signals);
        let mut merged = 0;
        while let Some(signal) = signals.next().await {
            if self.handle(&signal) == SignalOutcome::Merged {
                merged += 1;
            }
        }
        info!(merged = merged, "Signal stream closed");
        merged
    }
}
