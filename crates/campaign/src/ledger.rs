//! Signal ledger
//!
//! Tracks, for every signal the campaign mentions, the first event that
//! produces it and every event that listens for it.

use coc_foundation::Signal;
use indexmap::IndexMap;

/// Producers and consumers of one signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalUse {
    /// Event that first emitted an intervention raising this signal.
    pub first_producer: Option<String>,
    /// Number of events producing this signal.
    pub producers: usize,
    /// Events triggered by this signal, in emission order.
    pub consumers: Vec<String>,
}

impl SignalUse {
    pub fn is_produced(&self) -> bool {
        self.producers > 0
    }

    pub fn is_consumed(&self) -> bool {
        !self.consumers.is_empty()
    }
}

/// Every signal in first-mention order.
#[derive(Debug, Clone, Default)]
pub struct SignalLedger {
    entries: IndexMap<Signal, SignalUse>,
}

impl SignalLedger {
    pub fn record_producer(&mut self, signal: Signal, event: &str) {
        let entry = self.entries.entry(signal).or_default();
        if entry.first_producer.is_none() {
            entry.first_producer = Some(event.to_string());
        }
        entry.producers += 1;
    }

    pub fn record_consumer(&mut self, signal: Signal, event: &str) {
        self.entries
            .entry(signal)
            .or_default()
            .consumers
            .push(event.to_string());
    }

    pub fn get(&self, signal: Signal) -> Option<&SignalUse> {
        self.entries.get(&signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Signal, &SignalUse)> {
        self.entries.iter().map(|(s, u)| (*s, u))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Custom signals, in first-mention order.
    pub fn custom_signals(&self) -> Vec<Signal> {
        self.entries
            .keys()
            .copied()
            .filter(|s| s.is_custom())
            .collect()
    }

    /// Signals listened for that nothing raises and the engine does not
    /// raise either.
    pub fn unproduced(&self) -> Vec<(Signal, &SignalUse)> {
        self.iter()
            .filter(|(s, u)| s.is_custom() && u.is_consumed() && !u.is_produced())
            .collect()
    }

    /// Custom signals raised that no event listens for.
    pub fn unconsumed(&self) -> Vec<(Signal, &SignalUse)> {
        self.iter()
            .filter(|(s, u)| s.is_custom() && u.is_produced() && !u.is_consumed())
            .collect()
    }
}
