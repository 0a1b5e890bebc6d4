//! Path pattern compilation and positional matching.
//!
//! | Pattern       | Path         | Result        |
//! |---------------|--------------|---------------|
//! | `/`           | `/`          | `{}`          |
//! | `/todos`      | `/todos`     | `{}`          |
//! | `/todos/:id`  | `/todos/abc` | `{id: "abc"}` |
//! | `/todos/:id`  | `/todos`     | no match      |
//! | `/todos`      | `/todos/`    | no match      |
//!
//! Matching is by segment position only. Literal segments compare
//! case-sensitively and trailing slashes are not normalized.

use std::collections::HashSet;

use super::RouteError;
use crate::context::PathParams;

/// Something that can test a concrete path and extract parameters from it.
pub trait Matcher: Send + Sync + 'static {
    /// Returns the extracted parameters when `path` matches, `None` otherwise.
    fn matches(&self, path: &str) -> Option<PathParams>;
}

// One `/`-separated piece of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled `/segment/:param` route pattern.
///
/// # Examples
///
/// ```
/// use todos_service::router::{Matcher, PathMatcher};
///
/// let matcher = PathMatcher::compile("/todos/:id").unwrap();
/// let params = matcher.matches("/todos/abc").unwrap();
/// assert_eq!(params.get("id"), Some("abc"));
/// assert!(matcher.matches("/todos").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathMatcher {
    /// Compile `pattern` into a matcher.
    ///
    /// # Errors
    ///
    /// - [`RouteError::NotAbsolute`] if the pattern does not start with `/`.
    /// - [`RouteError::EmptyParam`] for a bare `:` segment.
    /// - [`RouteError::DuplicateParam`] if a parameter name repeats.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(RouteError::NotAbsolute {
                pattern: pattern.to_owned(),
            });
        };

        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for raw in rest.split('/') {
            match raw.strip_prefix(':') {
                Some("") => {
                    return Err(RouteError::EmptyParam {
                        pattern: pattern.to_owned(),
                    });
                }
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(RouteError::DuplicateParam {
                            pattern: pattern.to_owned(),
                            name: name.to_owned(),
                        });
                    }
                    segments.push(Segment::Param(name.to_owned()));
                }
                None => segments.push(Segment::Literal(raw.to_owned())),
            }
        }

        Ok(Self {
            pattern: pattern.to_owned(),
            segments,
        })
    }

    /// The source pattern this matcher was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                // A parameter captures exactly one non-empty segment.
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.insert(name.as_str(), part),
            }
        }
        Some(params)
    }
}
