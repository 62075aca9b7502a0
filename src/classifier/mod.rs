//! Gray cohort classification.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → correlation key (configured trace header)
//!     → rules.rs (OR across groups)
//!     → matcher.rs (AND within a group)
//!     → marker header fallback (an upstream hop already tagged the request)
//!     → CohortDecision
//! ```
//!
//! # Design Decisions
//! - Pure function of headers and configuration; no side effects
//! - Bad rule configuration degrades to an empty rule set (fail open)
//! - A missing correlation key never stops classification

pub mod matcher;
pub mod rules;

pub use matcher::{HeaderPresentMatcher, HeaderView, MatchRule, Matcher};
pub use rules::RuleSet;

use crate::cohort::CohortDecision;
use crate::config::FilterConfig;

/// Decides cohort membership from request headers.
#[derive(Debug)]
pub struct Classifier {
    rules: RuleSet,
    trace_header: String,
    marker_header: String,
}

impl Classifier {
    pub fn new(
        rules: RuleSet,
        trace_header: impl Into<String>,
        marker_header: impl Into<String>,
    ) -> Self {
        Self {
            rules,
            trace_header: trace_header.into(),
            marker_header: marker_header.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            RuleSet::from_json_or_empty(Some(config.gray_header.as_str())),
            config.trace_header.clone(),
            config.marker_header.clone(),
        )
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extract the correlation key, if present and non-empty.
    pub fn correlation_key(&self, headers: &dyn HeaderView) -> Option<String> {
        headers
            .header(&self.trace_header)
            .filter(|key| !key.is_empty())
    }

    /// Classify the request from its own headers.
    pub fn classify(&self, headers: &dyn HeaderView) -> CohortDecision {
        if self.rules.matches(headers) {
            return CohortDecision::Gray;
        }
        self.has_marker(headers).into()
    }

    /// Marker header to add to a Gray request that does not carry it yet.
    pub fn missing_marker(
        &self,
        decision: CohortDecision,
        headers: &dyn HeaderView,
    ) -> Option<&str> {
        let untagged = decision.is_gray()
            && !self.marker_header.is_empty()
            && !self.has_marker(headers);
        untagged.then_some(self.marker_header.as_str())
    }

    fn has_marker(&self, headers: &dyn HeaderView) -> bool {
        !self.marker_header.is_empty()
            && headers
                .header(&self.marker_header)
                .map(|v| !v.is_empty())
                .unwrap_or(false)
    }
}
