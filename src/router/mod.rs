//! Route registration and dispatch.
//!
//! Routes are grouped per HTTP method and kept sorted by specificity at
//! registration time; dispatch is a linear scan that performs no sorting and
//! no allocation on the match path.

mod route;

use std::collections::HashMap;

pub use route::{Handler, HandlerResult, Route};

use crate::http::{Attributes, Method, Request};

/// Why dispatch produced no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No route is registered for the request's method.
    UnsupportedMethod,
    /// Routes exist for the method but none matched the target.
    NotFound,
}

/// Per-method, priority-ordered route collection.
///
/// Read-only during dispatch; registration re-sorts the affected method's
/// list, which is acceptable because registration happens at startup, not
/// per-request.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `pattern`.
    pub fn add(
        &mut self,
        method: Method,
        pattern: impl Into<String>,
        handler: impl Fn(&Request, &mut crate::http::Response) -> HandlerResult
        + Send
        + Sync
        + 'static,
    ) {
        self.add_route(method, Route::new(pattern, std::sync::Arc::new(handler)));
    }

    /// Register an already-built route.
    ///
    /// The method's list is re-sorted: ascending segment count first, then
    /// ascending specificity cost, ties keeping insertion order. Among
    /// equal-length routes the more literal pattern is therefore tried first.
    pub fn add_route(&mut self, method: Method, route: Route) {
        let routes = self.routes.entry(method).or_default();
        routes.push(route);
        routes.sort_by_key(|r| (r.segment_count(), r.specificity_cost()));
    }

    /// Routes registered for `method`, in dispatch order.
    pub fn routes(&self, method: Method) -> impl Iterator<Item = &Route> {
        self.routes.get(&method).into_iter().flatten()
    }

    /// Find the first matching route for the request and inject attributes.
    ///
    /// On success the request's attribute map receives the query-string
    /// pairs, then the path captures; captures win when a capture name
    /// collides with a query key. A failed candidate match writes nothing.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnsupportedMethod`] when no route exists for the
    /// method, [`DispatchError::NotFound`] when no pattern matches.
    pub fn dispatch(&self, request: &mut Request) -> Result<&Route, DispatchError> {
        let routes = self
            .routes
            .get(&request.method)
            .ok_or(DispatchError::UnsupportedMethod)?;

        for route in routes {
            if let Some(captures) = route.matches(request.path()) {
                let mut attributes = Attributes::from_pairs(request.query(), '&');
                for (name, value) in captures {
                    attributes.insert(name, value);
                }
                request.attributes_mut().merge(attributes);
                return Ok(route);
            }
        }

        Err(DispatchError::NotFound)
    }
}
