//! Rule set parsing.
//!
//! Rules arrive as JSON: an ordered list of groups, each an ordered list of
//! `{"header_key": "<name>"}` maps. Groups are OR'd, entries within a group
//! are AND'd.

use serde::Deserialize;

use super::matcher::{HeaderPresentMatcher, HeaderView, MatchRule, Matcher};

#[derive(Debug, Deserialize)]
struct HeaderPredicate {
    #[serde(default)]
    header_key: String,
}

/// Ordered collection of match rules.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<MatchRule>,
}

impl RuleSet {
    /// Parse rules from their JSON form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let groups: Vec<Vec<HeaderPredicate>> = serde_json::from_str(raw)?;
        let rules = groups
            .into_iter()
            .map(|group| {
                MatchRule::new(
                    group
                        .into_iter()
                        .map(|p| {
                            Box::new(HeaderPresentMatcher::new(p.header_key)) as Box<dyn Matcher>
                        })
                        .collect(),
                )
            })
            .collect();
        Ok(Self { rules })
    }

    /// Parse rules, falling back to an empty set when the input is absent or malformed.
    pub fn from_json_or_empty(raw: Option<&str>) -> Self {
        let raw = match raw.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                tracing::debug!("No gray header rules configured");
                return Self::default();
            }
        };

        match Self::from_json(raw) {
            Ok(rules) => {
                tracing::info!(rules = rules.len(), "Gray header rules loaded");
                rules
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to parse gray header rules; no request will match"
                );
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if any rule fully matches.
    pub fn matches(&self, headers: &dyn HeaderView) -> bool {
        self.rules.iter().any(|rule| rule.matches(headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_parse_groups() {
        let rules = RuleSet::from_json(
            r#"[[{"header_key":"x-user"},{"header_key":"x-region"}],[{"header_key":"x-canary"}]]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);

        assert!(rules.matches(&headers(&[("x-user", "a"), ("x-region", "eu")])));
        assert!(rules.matches(&headers(&[("x-canary", "1")])));
        assert!(!rules.matches(&headers(&[("x-user", "a")])));
    }

    #[test]
    fn test_missing_header_key_never_matches() {
        let rules = RuleSet::from_json(r#"[[{"other":"x-user"}]]"#).unwrap();
        assert!(!rules.matches(&headers(&[("x-user", "a")])));
    }

    #[test]
    fn test_malformed_json_is_empty() {
        let rules = RuleSet::from_json_or_empty(Some("[[{header_key:"));
        assert!(rules.is_empty());
        assert!(!rules.matches(&headers(&[("x-user", "a")])));
    }

    #[test]
    fn test_absent_config_is_empty() {
        assert!(RuleSet::from_json_or_empty(None).is_empty());
        assert!(RuleSet::from_json_or_empty(Some("  ")).is_empty());
    }

    #[test]
    fn test_matches_iff_some_rule_fully_present() {
        let rules = RuleSet::from_json(
            r#"[[{"header_key":"a"},{"header_key":"b"}],[{"header_key":"c"}]]"#,
        )
        .unwrap();

        let cases = vec![
            (vec![], false),
            (vec![("a", "1")], false),
            (vec![("b", "1")], false),
            (vec![("a", "1"), ("b", "1")], true),
            (vec![("c", "1")], true),
            (vec![("a", "1"), ("c", "")], false),
            (vec![("a", "1"), ("b", ""), ("c", "1")], true),
        ];
        for (pairs, expected) in &cases {
            assert_eq!(rules.matches(&headers(pairs)), *expected, "headers: {:?}", pairs);
        }
    }
}
