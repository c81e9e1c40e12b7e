// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event fan-out: a single internal event stream broadcast to every
//! subscribed client. Slow subscribers are dropped rather than allowed to
//! apply backpressure to the registry (`spec.md` §4.5).

use foreman_core::Event;
use tokio::sync::broadcast;

/// Per-subscriber mailbox depth. A subscriber more than this far behind is
/// disconnected instead of stalling the broadcaster.
pub const HIGH_WATER_MARK: usize = 1024;

pub struct Fanout {
    tx: broadcast::Sender<Event>,
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

impl Fanout {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(HIGH_WATER_MARK);
        Self { tx }
    }

    pub fn publish(&self, event: Event) {
        // No receivers is routine (no subscribers yet); any other send
        // failure is a broadcast-channel invariant we don't expect here.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription { rx: self.tx.subscribe() }
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Next event, or `None` once this subscriber has fallen more than
    /// [`HIGH_WATER_MARK`] events behind and been disconnected.
    pub async fn recv(&mut self) -> Option<Event> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => None,
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
