//! The event accumulator and its lifecycle orchestration.
//!
//! One [`Events`] instance lives for the process and is shared by every
//! unit of work. Per-request state goes through the task-local context;
//! the only cross-request mutable state here is the `add_all` defaults
//! map, serialized behind a lock.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use crate::anonymizer::Anonymizer;
use crate::config::EventsConfig;
use crate::context;
use crate::db::DbTimings;
use crate::error::Result;
use crate::fields::{FieldMap, FieldValue};
use crate::outlets::{LogfmtOutlet, Outlet, TelemetryClient, TelemetryOutlet};
use crate::routing::RouteTable;
use crate::units::{Measurement, Unit};

mod lifecycle;
mod signature;

pub use lifecycle::{ErrorInfo, ResponseStatus};
pub use signature::FnSignature;

use signature::DEFAULT_CATCHALL;

pub struct Events {
    outlets: Vec<Box<dyn Outlet>>,
    defaults: RwLock<FieldMap>,
    anonymizer: Option<Anonymizer>,
    route_table: Option<Arc<dyn RouteTable>>,
    db: DbTimings,
    capture_task_args: bool,
}

impl Default for Events {
    fn default() -> Self {
        Self {
            outlets: vec![Box::new(LogfmtOutlet::new("canonical"))],
            defaults: RwLock::new(FieldMap::new()),
            anonymizer: None,
            route_table: None,
            db: DbTimings::new(),
            capture_task_args: true,
        }
    }
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EventsConfig) -> Result<Self> {
        Ok(Self {
            outlets: vec![Box::new(LogfmtOutlet::new(config.emitter.as_str()))],
            defaults: RwLock::new(FieldMap::new()),
            anonymizer: config.anonymizer()?,
            route_table: None,
            db: DbTimings::new(),
            capture_task_args: config.capture_task_args,
        })
    }

    pub fn with_outlet(mut self, outlet: Box<dyn Outlet>) -> Self {
        self.outlets.push(outlet);
        self
    }

    /// Attach the external telemetry outlet backed by the given client.
    pub fn with_telemetry_client(self, client: Arc<dyn TelemetryClient>) -> Self {
        self.with_outlet(Box::new(TelemetryOutlet::new(client)))
    }

    /// Attach the routing collaborator used to resolve the `handler`
    /// field at teardown.
    pub fn with_route_table(mut self, table: Arc<dyn RouteTable>) -> Self {
        self.route_table = Some(table);
        self
    }

    /// Replace the outlet list wholesale. Mostly useful in tests.
    pub fn with_outlets(mut self, outlets: Vec<Box<dyn Outlet>>) -> Self {
        self.outlets = outlets;
        self
    }

    /// Timing hooks for the database driver integration.
    pub fn db(&self) -> &DbTimings {
        &self.db
    }

    /// Record a field on the active unit of work. A repeated key
    /// overwrites the earlier value. Dropped when no unit of work is
    /// active.
    pub fn add(&self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        context::with_current(|ctx| ctx.fields.insert(key, value));
    }

    /// Record a measurement field with an explicit unit.
    pub fn add_unit(&self, key: impl Into<String>, value: f64, unit: Unit) {
        self.add(key, Measurement::new(value, unit));
    }

    /// Record a field merged into every subsequent snapshot for the rest
    /// of the process lifetime. For static facts computed once at startup,
    /// like build or release identifiers.
    pub fn add_all(&self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let mut defaults = self
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        defaults.insert(key, value);
    }

    /// Record a call's arguments as fields, matching positional arguments
    /// against the signature's declared names. Surplus positional
    /// arguments land under `<catchall>_<index>`; keyword arguments under
    /// their own names.
    pub fn add_function_arguments(
        &self,
        signature: &FnSignature,
        args: &[FieldValue],
        kwargs: &[(&str, FieldValue)],
    ) {
        let mut positional = args.iter();

        for (name, value) in signature.params().iter().zip(positional.by_ref()) {
            self.add(name.as_str(), value.clone());
        }

        let catchall = signature.vararg().unwrap_or(DEFAULT_CATCHALL);
        for (index, value) in positional.enumerate() {
            self.add(format!("{}_{}", catchall, index), value.clone());
        }

        for (name, value) in kwargs {
            self.add(*name, value.clone());
        }
    }

    /// Run `call` as its own instrumented unit of work: records the
    /// function name and arguments, captures error details on failure,
    /// always records the elapsed `duration`, and flushes to every outlet
    /// exactly once. The call's own result passes through untouched.
    pub fn instrumented<T, E, F>(
        &self,
        signature: &FnSignature,
        args: &[FieldValue],
        kwargs: &[(&str, FieldValue)],
        call: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: std::fmt::Display,
    {
        context::sync_scope(|| {
            self.start_call(signature, args, kwargs);
            let result = call();
            self.flush_teardown(result.as_ref().err().map(ErrorInfo::from_error));
            result
        })
    }

    /// Async counterpart of [`Events::instrumented`].
    pub async fn instrumented_async<T, E, F, Fut>(
        &self,
        signature: &FnSignature,
        args: &[FieldValue],
        kwargs: &[(&str, FieldValue)],
        call: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        context::scope(async move {
            self.start_call(signature, args, kwargs);
            let result = call().await;
            self.flush_teardown(result.as_ref().err().map(ErrorInfo::from_error));
            result
        })
        .await
    }

    fn start_call(&self, signature: &FnSignature, args: &[FieldValue], kwargs: &[(&str, FieldValue)]) {
        context::with_current(|ctx| ctx.started_at = Some(Instant::now()));
        self.add("function", signature.name());
        self.add_function_arguments(signature, args, kwargs);
    }

    pub(crate) fn anonymizer(&self) -> Option<&Anonymizer> {
        self.anonymizer.as_ref()
    }

    pub(crate) fn route_table(&self) -> Option<&dyn RouteTable> {
        self.route_table.as_deref()
    }

    pub(crate) fn outlets(&self) -> &[Box<dyn Outlet>] {
        &self.outlets
    }

    pub(crate) fn defaults_snapshot(&self) -> FieldMap {
        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn capture_task_args(&self) -> bool {
        self.capture_task_args
    }
}
