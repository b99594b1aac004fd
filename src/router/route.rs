//! A single registered route: pattern, precomputed segments, handler.

use std::sync::Arc;

use crate::error::HandlerError;
use crate::http::{Request, Response};

/// Result type route handlers return.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// A route handler.
///
/// Receives the matched request and a mutable response initialized to
/// `200 OK`. Returning an [`HttpError`](crate::HttpError) maps to exactly
/// that status; any other error maps to a 500.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> HandlerResult + Send + Sync>;

/// One path segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Must match verbatim.
    Literal(String),
    /// Matches any single segment; the value is captured under this name.
    Param(String),
}

/// An immutable (pattern, handler) pair with precomputed segments.
///
/// Patterns are `/`-separated; a segment starting with `:` is a named
/// capture, anything else is a literal. Matching is segment-count exact:
/// `/a` never matches `/a/b`.
#[derive(Clone)]
pub struct Route {
    pattern: String,
    segments: Vec<Segment>,
    handler: Handler,
}

impl Route {
    /// Build a route from a pattern and handler.
    pub fn new(pattern: impl Into<String>, handler: Handler) -> Self {
        let pattern = pattern.into();
        let segments = split_path(&pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();
        Self {
            pattern,
            segments,
            handler,
        }
    }

    /// The pattern this route was registered with.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a request path (no query string) against this route.
    ///
    /// On success returns the staged path captures; on failure returns `None`
    /// without having produced any observable side effect, so a failed
    /// candidate never leaks partial captures into the request.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut captures = Vec::new();
        let mut request_segments = split_path(path);

        for segment in &self.segments {
            let request_segment = request_segments.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != request_segment {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    captures.push((name.clone(), request_segment.to_owned()));
                }
            }
        }

        // Segment counts must be exactly equal.
        if request_segments.next().is_some() {
            return None;
        }
        Some(captures)
    }

    /// Run the handler.
    pub fn execute(&self, request: &Request, response: &mut Response) -> HandlerResult {
        (self.handler)(request, response)
    }

    /// Number of pattern segments.
    pub(crate) fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Specificity cost: walk segments last to first with a doubling weight
    /// starting at 1, adding the weight for each parameter segment. Lower
    /// cost means more literal, especially in earlier (higher-weight)
    /// positions, and sorts first among routes of equal length.
    pub(crate) fn specificity_cost(&self) -> u64 {
        let mut cost = 0u64;
        let mut weight = 1u64;
        for segment in self.segments.iter().rev() {
            if matches!(segment, Segment::Param(_)) {
                cost = cost.saturating_add(weight);
            }
            weight = weight.saturating_mul(2);
        }
        cost
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("segments", &self.segments)
            .finish_non_exhaustive()
    }
}

/// Non-empty segments of a `/`-separated path.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
