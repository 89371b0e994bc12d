//! Polymorphic sinks for finalized event snapshots.

use crate::error::OutletError;
use crate::fields::Snapshot;

mod logfmt;
mod telemetry;

pub use logfmt::LogfmtOutlet;
pub use telemetry::{TelemetryClient, TelemetryOutlet};

/// A sink that renders or ships one finalized snapshot per unit of work.
/// Implementations must not mutate shared state visible to other outlets;
/// each renders its own copy of the snapshot.
pub trait Outlet: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, snapshot: &Snapshot) -> Result<(), OutletError>;
}

/// Best-effort dispatch in registration order. A failing outlet is logged
/// and skipped; the unit of work never fails because telemetry failed.
pub(crate) fn dispatch(outlets: &[Box<dyn Outlet>], snapshot: &Snapshot) {
    for outlet in outlets {
        if let Err(err) = outlet.handle(snapshot) {
            tracing::warn!("{} outlet failed to handle event: {}", outlet.name(), err);
        }
    }
}
