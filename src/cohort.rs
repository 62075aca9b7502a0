//! Cohort decisions and their stored representation.

use std::fmt;

/// Marker stored for a Gray correlation key.
pub const GRAY_MARKER: &str = "true";
/// Marker stored for a NotGray correlation key.
pub const NOT_GRAY_MARKER: &str = "false";

/// Whether a request belongs to the gray (canary) cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CohortDecision {
    Gray,
    NotGray,
    #[default]
    Unknown,
}

impl CohortDecision {
    pub fn is_gray(self) -> bool {
        self == CohortDecision::Gray
    }

    /// Bytes written to a correlation store. `Unknown` has no marker.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            CohortDecision::Gray => Some(GRAY_MARKER),
            CohortDecision::NotGray => Some(NOT_GRAY_MARKER),
            CohortDecision::Unknown => None,
        }
    }

    /// Decode a stored marker. Unrecognized values decode as `Unknown`.
    pub fn from_marker(raw: &[u8]) -> Self {
        match raw {
            b"true" => CohortDecision::Gray,
            b"false" => CohortDecision::NotGray,
            _ => CohortDecision::Unknown,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            CohortDecision::Gray => "gray",
            CohortDecision::NotGray => "not_gray",
            CohortDecision::Unknown => "unknown",
        }
    }
}

impl From<bool> for CohortDecision {
    fn from(gray: bool) -> Self {
        if gray {
            CohortDecision::Gray
        } else {
            CohortDecision::NotGray
        }
    }
}

impl fmt::Display for CohortDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_encoding() {
        assert_eq!(CohortDecision::Gray.marker(), Some("true"));
        assert_eq!(CohortDecision::NotGray.marker(), Some("false"));
        assert_eq!(CohortDecision::Unknown.marker(), None);

        assert_eq!(CohortDecision::from_marker(b"true"), CohortDecision::Gray);
        assert_eq!(CohortDecision::from_marker(b"false"), CohortDecision::NotGray);
        assert_eq!(CohortDecision::from_marker(b"yes"), CohortDecision::Unknown);
    }
}
