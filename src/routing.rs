//! Read-only handler resolution against the host's routing table.

/// Terminal routing outcomes a [`RouteTable`] may report instead of a
/// handler match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The route moved; resolution continues at the new location.
    Redirect { location: String },
    MethodNotAllowed,
    NotFound,
}

/// Routing collaborator contract. Given a path and method, either yields
/// the module-qualified name of the handler that would serve it, or one of
/// the closed set of [`RouteOutcome`]s.
pub trait RouteTable: Send + Sync {
    fn resolve(&self, path: &str, method: &str) -> Result<String, RouteOutcome>;
}

const MAX_REDIRECT_HOPS: usize = 8;

/// Resolve the handler name for a path/method pair, following redirects
/// until a terminal match or miss. Redirect cycles terminate as a miss
/// once the hop bound is reached.
pub fn resolve_handler(table: &dyn RouteTable, path: &str, method: &str) -> Option<String> {
    let mut location = path.to_string();
    for _ in 0..MAX_REDIRECT_HOPS {
        match table.resolve(&location, method) {
            Ok(handler) => return Some(handler),
            Err(RouteOutcome::Redirect { location: next }) => location = next,
            Err(RouteOutcome::MethodNotAllowed) | Err(RouteOutcome::NotFound) => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRoutes;

    impl RouteTable for FixedRoutes {
        fn resolve(&self, path: &str, method: &str) -> Result<String, RouteOutcome> {
            match (path, method) {
                ("/", "GET") => Ok("app.main".to_string()),
                ("/old", _) => Err(RouteOutcome::Redirect {
                    location: "/".to_string(),
                }),
                ("/loop", _) => Err(RouteOutcome::Redirect {
                    location: "/loop".to_string(),
                }),
                ("/", _) => Err(RouteOutcome::MethodNotAllowed),
                _ => Err(RouteOutcome::NotFound),
            }
        }
    }

    #[test]
    fn test_direct_match() {
        assert_eq!(
            resolve_handler(&FixedRoutes, "/", "GET"),
            Some("app.main".to_string())
        );
    }

    #[test]
    fn test_redirect_is_followed() {
        assert_eq!(
            resolve_handler(&FixedRoutes, "/old", "GET"),
            Some("app.main".to_string())
        );
    }

    #[test]
    fn test_misses_yield_none() {
        assert_eq!(resolve_handler(&FixedRoutes, "/missing", "GET"), None);
        assert_eq!(resolve_handler(&FixedRoutes, "/", "POST"), None);
    }

    #[test]
    fn test_redirect_cycle_terminates() {
        assert_eq!(resolve_handler(&FixedRoutes, "/loop", "GET"), None);
    }
}
