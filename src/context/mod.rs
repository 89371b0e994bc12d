//! Per-unit-of-work storage.
//!
//! One [`EventContext`] exists per HTTP request or background task, bound
//! to the current tokio task via task-local storage. Concurrent units of
//! work never observe each other's context, and a context never outlives
//! the scope that created it. Accumulator calls made outside any scope are
//! dropped.

use std::cell::RefCell;
use std::future::Future;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::fields::FieldMap;

/// Request metadata the host integration captures at request start. The
/// derived snapshot fields are computed from this at teardown.
#[derive(Debug, Clone, Default)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    /// Raw query bytes as received on the wire; decoded lossily at
    /// teardown so invalid UTF-8 cannot fail the request.
    pub query: Option<Bytes>,
    /// Client address chain, nearest proxy last.
    pub forwarded_for: Vec<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

impl RequestHead {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<Bytes>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_forwarded_for(mut self, chain: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.forwarded_for = chain.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Path plus query string, with invalid UTF-8 bytes hex-escaped.
    pub fn full_path(&self) -> String {
        match &self.query {
            Some(query) if !query.is_empty() => {
                format!("{}?{}", self.path, lossy_decode(query))
            }
            _ => self.path.clone(),
        }
    }
}

// Decode bytes as UTF-8, replacing each invalid byte with its \xNN form.
fn lossy_decode(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                decoded.push_str(valid);
                break;
            }
            Err(err) => {
                let (valid, invalid) = rest.split_at(err.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    decoded.push_str(valid);
                }
                let skip = err.error_len().unwrap_or(invalid.len());
                for byte in &invalid[..skip] {
                    decoded.push_str(&format!("\\x{:02x}", byte));
                }
                rest = &invalid[skip..];
            }
        }
    }
    decoded
}

#[derive(Debug, Default)]
pub(crate) struct EventContext {
    pub started_at: Option<Instant>,
    pub head: Option<RequestHead>,
    pub status: Option<u16>,
    pub task: Option<String>,
    pub fields: FieldMap,
    pub db_timings: Vec<Duration>,
}

tokio::task_local! {
    static ACTIVE_CONTEXT: RefCell<EventContext>;
}

/// Run a future with a fresh context active for its whole duration. The
/// context is destroyed when the future completes, even if it panics or
/// resolves to an error.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    ACTIVE_CONTEXT
        .scope(RefCell::new(EventContext::default()), fut)
        .await
}

/// Synchronous counterpart of [`scope`] for code outside the async call
/// chain, such as instrumented function calls.
pub fn sync_scope<T>(f: impl FnOnce() -> T) -> T {
    ACTIVE_CONTEXT.sync_scope(RefCell::new(EventContext::default()), f)
}

/// Run `f` against the active context, or return `None` when no unit of
/// work is in progress.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut EventContext) -> R) -> Option<R> {
    ACTIVE_CONTEXT.try_with(|ctx| f(&mut ctx.borrow_mut())).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_outside_scope_are_dropped() {
        assert_eq!(with_current(|ctx| ctx.fields.insert("key", 1)), None);
    }

    #[test]
    fn test_sync_scope_isolation() {
        sync_scope(|| {
            with_current(|ctx| ctx.fields.insert("key", 1));
            let len = with_current(|ctx| ctx.fields.len());
            assert_eq!(len, Some(1));
        });

        // A later scope starts empty.
        sync_scope(|| {
            let len = with_current(|ctx| ctx.fields.len());
            assert_eq!(len, Some(0));
        });
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_outer() {
        scope(async {
            with_current(|ctx| ctx.fields.insert("outer", 1));

            scope(async {
                assert_eq!(with_current(|ctx| ctx.fields.len()), Some(0));
                with_current(|ctx| ctx.fields.insert("inner", 2));
            })
            .await;

            let keys = with_current(|ctx| ctx.fields.keys().map(String::from).collect::<Vec<_>>());
            assert_eq!(keys, Some(vec!["outer".to_string()]));
        })
        .await;
    }

    #[test]
    fn test_full_path_with_query() {
        let head = RequestHead::new("GET", "/items").with_query(&b"page=2"[..]);
        assert_eq!(head.full_path(), "/items?page=2");

        let head = RequestHead::new("GET", "/items");
        assert_eq!(head.full_path(), "/items");
    }

    #[test]
    fn test_lossy_decode_hex_escapes_invalid_bytes() {
        assert_eq!(lossy_decode(b"param=\xEA"), "param=\\xea");
        assert_eq!(lossy_decode(b"plain"), "plain");
        assert_eq!(lossy_decode(b"a\xC3\x28b"), "a\\xc3(b");
    }
}
