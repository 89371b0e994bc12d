//! Database driver timing bridge.
//!
//! The driver layer calls [`DbTimings::query_started`] and
//! [`DbTimings::query_finished`] around each round trip. Start instants
//! are stacked per connection so nested calls pair up LIFO; each completed
//! pair appends its elapsed duration to the active unit of work's context.
//! The orchestrator reduces the sequence to `database_total` and
//! `database_count` at teardown.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::context;

/// Per-connection in-flight query state, keyed by an opaque connection
/// handle supplied by the driver hooks.
#[derive(Debug, Default)]
pub struct DbTimings {
    in_flight: DashMap<u64, Vec<Instant>>,
}

impl DbTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_started(&self, conn: u64) {
        self.in_flight.entry(conn).or_default().push(Instant::now());
    }

    /// Pop the matching start for `conn` and record the elapsed time.
    /// A finish without a start is ignored.
    pub fn query_finished(&self, conn: u64) {
        let started = match self.in_flight.get_mut(&conn) {
            Some(mut stack) => stack.pop(),
            None => None,
        };

        if let Some(started) = started {
            record_database_timing(started.elapsed());
        }
    }
}

/// Append one database round-trip duration to the active context. Used by
/// driver integrations that measure elapsed time themselves. No-op outside
/// a unit of work.
pub fn record_database_timing(elapsed: Duration) {
    context::with_current(|ctx| ctx.db_timings.push(elapsed));
}
