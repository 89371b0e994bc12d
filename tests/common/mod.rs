#![allow(dead_code)] // not every test binary uses every helper

use std::sync::{Arc, Mutex};

use canonical_events::error::OutletError;
use canonical_events::events::ResponseStatus;
use canonical_events::fields::Snapshot;
use canonical_events::outlets::Outlet;

/// Outlet that keeps every snapshot it receives for later assertions.
#[derive(Clone, Default)]
pub struct CapturingOutlet {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl CapturingOutlet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    /// The one snapshot this outlet should have received.
    pub fn single(&self) -> Snapshot {
        let snapshots = self.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 1, "expected exactly one event");
        snapshots[0].clone()
    }
}

impl Outlet for CapturingOutlet {
    fn name(&self) -> &'static str {
        "capturing"
    }

    fn handle(&self, snapshot: &Snapshot) -> Result<(), OutletError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}

/// Outlet whose handle always fails.
pub struct FailingOutlet;

impl Outlet for FailingOutlet {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn handle(&self, _snapshot: &Snapshot) -> Result<(), OutletError> {
        Err(OutletError::SendFailed("wire unplugged".into()))
    }
}

pub struct TestResponse(pub u16);

impl ResponseStatus for TestResponse {
    fn status_code(&self) -> u16 {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("boom: {0}")]
    Boom(String),
}
