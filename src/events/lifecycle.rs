//! Request and task lifecycle hooks, snapshot assembly, and dispatch.
//!
//! The host integration wires these to its framework: `request_started`
//! from the before-request hook, `response_finished` from the
//! after-response hook, `request_teardown` from the teardown hook (with
//! the error that ended the request, if any). Background workers use the
//! `task_started`/`task_finished` pair. All hooks expect an active
//! context scope and are no-ops without one; a teardown without a
//! recorded start emits nothing.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::context::{self, EventContext, RequestHead};
use crate::events::{Events, FnSignature};
use crate::fields::{FieldValue, Snapshot};
use crate::outlets;
use crate::routing;
use crate::units::Measurement;

/// Error details captured into the `error`/`error_msg` fields. The
/// original error is never swallowed; this is a record of it, not a
/// replacement for it.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Capture an error's type name and display rendering.
    pub fn from_error<E: std::fmt::Display>(error: &E) -> Self {
        Self::new(short_type_name::<E>(), error.to_string())
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Capability the request wrappers use to read the final status code off
/// the handler's response type.
pub trait ResponseStatus {
    fn status_code(&self) -> u16;
}

impl Events {
    /// Before-request hook: opens the timer and stores the request head.
    pub fn request_started(&self, head: RequestHead) {
        context::with_current(|ctx| {
            ctx.started_at = Some(Instant::now());
            ctx.head = Some(head);
        });
    }

    /// After-response hook: records the final status code.
    pub fn response_finished(&self, status: u16) {
        context::with_current(|ctx| ctx.status = Some(status));
    }

    /// Teardown hook: assembles the snapshot and dispatches it to every
    /// outlet, exactly once per unit of work. `error` carries the error
    /// that ended the request, if any; the caller keeps propagating it.
    pub fn request_teardown(&self, error: Option<ErrorInfo>) {
        self.flush_teardown(error);
    }

    /// Pre-run hook for background tasks. Records the task name and,
    /// when configured, the call arguments.
    pub fn task_started(
        &self,
        signature: &FnSignature,
        args: &[FieldValue],
        kwargs: &[(&str, FieldValue)],
    ) {
        context::with_current(|ctx| {
            ctx.started_at = Some(Instant::now());
            ctx.task = Some(signature.name().to_string());
        });

        if self.capture_task_args() {
            self.add_function_arguments(signature, args, kwargs);
        }
    }

    /// Post-run hook for background tasks: records the final state string
    /// when given, then flushes like a request teardown.
    pub fn task_finished(&self, state: Option<&str>, error: Option<ErrorInfo>) {
        if let Some(state) = state {
            self.add("state", state);
        }
        self.flush_teardown(error);
    }

    /// Run a request handler inside a fresh context scope, driving the
    /// lifecycle hooks around it. The handler's error, if any, is
    /// recorded and then returned unchanged.
    pub async fn observe_request<F, R, E>(
        &self,
        head: RequestHead,
        handler: F,
    ) -> std::result::Result<R, E>
    where
        F: Future<Output = std::result::Result<R, E>>,
        R: ResponseStatus,
        E: std::fmt::Display,
    {
        context::scope(async {
            self.request_started(head);
            let result = handler.await;
            match &result {
                Ok(response) => {
                    self.response_finished(response.status_code());
                    self.flush_teardown(None);
                }
                Err(error) => self.flush_teardown(Some(ErrorInfo::from_error(error))),
            }
            result
        })
        .await
    }

    /// Run a background task inside a fresh context scope, driving the
    /// task hooks around it with SUCCESS/FAILURE final states.
    pub async fn observe_task<F, T, E>(
        &self,
        signature: &FnSignature,
        args: &[FieldValue],
        kwargs: &[(&str, FieldValue)],
        task: F,
    ) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        context::scope(async {
            self.task_started(signature, args, kwargs);
            let result = task.await;
            match &result {
                Ok(_) => self.task_finished(Some("SUCCESS"), None),
                Err(error) => {
                    self.task_finished(Some("FAILURE"), Some(ErrorInfo::from_error(error)))
                }
            }
            result
        })
        .await
    }

    pub(crate) fn flush_teardown(&self, error: Option<ErrorInfo>) {
        let snapshot = context::with_current(|ctx| self.finalize(ctx, error)).flatten();

        if let Some(snapshot) = snapshot {
            outlets::dispatch(self.outlets(), &snapshot);
        }
    }

    // Snapshot assembly. Ordering is a contract: derived fields, then
    // process-wide defaults, then per-request fields in call order, then
    // database aggregates, then the total timer, then error details.
    fn finalize(&self, ctx: &mut EventContext, error: Option<ErrorInfo>) -> Option<Snapshot> {
        // No recorded start means the unit of work never began; emit
        // nothing.
        let started_at = ctx.started_at?;

        let mut snapshot = Snapshot::new();

        if let Some(head) = &ctx.head {
            snapshot.insert("fwd", self.format_forwarded(&head.forwarded_for));
            snapshot.insert("method", head.method.as_str());
            snapshot.insert("path", head.full_path());
            snapshot.insert("status", ctx.status.unwrap_or(500));
            snapshot.insert("request_user_agent", head.user_agent.clone());
            if let Some(table) = self.route_table() {
                if let Some(handler) = routing::resolve_handler(table, &head.path, &head.method) {
                    snapshot.insert("handler", handler);
                }
            }
            if let Some(request_id) = &head.request_id {
                snapshot.insert("request_id", request_id.as_str());
            }
        } else if let Some(task) = &ctx.task {
            snapshot.insert("task", task.as_str());
        }

        snapshot.merge(&self.defaults_snapshot());
        snapshot.merge(&ctx.fields);

        if !ctx.db_timings.is_empty() {
            let total: f64 = ctx.db_timings.iter().map(Duration::as_secs_f64).sum();
            snapshot.insert("database_total", Measurement::seconds(total));
            snapshot.insert("database_count", ctx.db_timings.len());
        }

        let elapsed = started_at.elapsed().as_secs_f64();
        if ctx.head.is_some() {
            snapshot.insert("request_total", Measurement::seconds(elapsed));
        } else {
            snapshot.insert("duration", Measurement::seconds(elapsed));
        }

        if let Some(error) = error {
            snapshot.insert("error", error.kind);
            snapshot.insert("error_msg", error.message);
        }

        Some(snapshot)
    }

    fn format_forwarded(&self, chain: &[String]) -> String {
        chain
            .iter()
            .map(|entry| self.mask_entry(entry))
            .collect::<Vec<_>>()
            .join(",")
    }

    // An entry the anonymizer cannot parse passes through unmasked;
    // telemetry must not fail the request over a malformed header.
    fn mask_entry(&self, entry: &str) -> String {
        match self.anonymizer() {
            Some(anonymizer) => anonymizer
                .anonymize(entry)
                .unwrap_or_else(|_| entry.to_string()),
            None => entry.to_string(),
        }
    }
}
