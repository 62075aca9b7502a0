//! Header predicates.
//!
//! # Responsibilities
//! - Read headers through a host-independent view
//! - Check header presence (non-empty value)
//! - Combine predicates with AND semantics
//!
//! # Design Decisions
//! - Header names are case-insensitive (per HTTP spec)
//! - An empty header name never matches
//! - An empty predicate list always matches (vacuous AND)

use axum::http::HeaderMap;

/// Read-only access to the current request's headers.
pub trait HeaderView {
    /// Returns the header value, or `None` if absent or unreadable.
    fn header(&self, name: &str) -> Option<String>;
}

impl HeaderView for HeaderMap {
    fn header(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Trait for matching request headers against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the headers satisfy this condition.
    fn matches(&self, headers: &dyn HeaderView) -> bool;
}

/// Matches when a header is present with a non-empty value.
#[derive(Debug, Clone)]
pub struct HeaderPresentMatcher {
    name: String,
}

impl HeaderPresentMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Matcher for HeaderPresentMatcher {
    fn matches(&self, headers: &dyn HeaderView) -> bool {
        if self.name.is_empty() {
            return false;
        }
        headers
            .header(&self.name)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}

/// A group of predicates that must all hold.
#[derive(Debug, Default)]
pub struct MatchRule {
    matchers: Vec<Box<dyn Matcher>>,
}

impl MatchRule {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for MatchRule {
    fn matches(&self, headers: &dyn HeaderView) -> bool {
        self.matchers.iter().all(|m| m.matches(headers))
    }
}
