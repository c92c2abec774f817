//! core::vars
//!
//! Content variable substitution.
//!
//! Environment pairs of the form `GIT_JSON_API_VAR_BASE_URL=https://x` define
//! a `${baseUrl}` placeholder. File content read from the repository has
//! placeholders substituted with their values before parsing; content about
//! to be persisted has values substituted back to placeholders. Both
//! directions are pure string transforms, independent of JSON structure.

use std::collections::BTreeMap;

/// Environment prefix for content variables.
pub const VAR_PREFIX: &str = "GIT_JSON_API_VAR_";

/// A set of content variables.
///
/// Variables are held sorted by placeholder name so substitution order is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentVars {
    /// placeholder name (camelCase, without `${}`) -> value
    vars: BTreeMap<String, String>,
}

impl ContentVars {
    /// Build from explicit (name, value) pairs. Names are used verbatim.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: pairs.into_iter().collect(),
        }
    }

    /// Collect variables from the process environment.
    ///
    /// `GIT_JSON_API_VAR_BASE_URL=v` becomes the `baseUrl` variable.
    pub fn from_env() -> Self {
        Self::new(std::env::vars().filter_map(|(key, value)| {
            key.strip_prefix(VAR_PREFIX)
                .map(|suffix| (camel_case(suffix), value))
        }))
    }

    /// Whether no variables are defined.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace `${name}` placeholders with their values (read side).
    pub fn replace_variables_with_values(&self, content: &str) -> String {
        self.vars.iter().fold(content.to_string(), |acc, (name, value)| {
            acc.replace(&format!("${{{name}}}"), value)
        })
    }

    /// Replace literal value occurrences with `${name}` placeholders
    /// (write side).
    pub fn replace_values_with_variables(&self, content: &str) -> String {
        self.vars.iter().fold(content.to_string(), |acc, (name, value)| {
            if value.is_empty() {
                acc
            } else {
                acc.replace(value, &format!("${{{name}}}"))
            }
        })
    }
}

/// Convert a `SHOUTY_SNAKE` environment suffix to `camelCase`.
fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, segment) in s.split('_').filter(|seg| !seg.is_empty()).enumerate() {
        let lower = segment.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> ContentVars {
        ContentVars::new([
            ("baseUrl".to_string(), "https://example.com".to_string()),
            ("token".to_string(), "s3cret".to_string()),
        ])
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("BASE_URL"), "baseUrl");
        assert_eq!(camel_case("TOKEN"), "token");
        assert_eq!(camel_case("A_B_C"), "aBC");
    }

    #[test]
    fn variables_to_values() {
        let content = r#"{"url": "${baseUrl}/api", "auth": "${token}"}"#;
        assert_eq!(
            vars().replace_variables_with_values(content),
            r#"{"url": "https://example.com/api", "auth": "s3cret"}"#
        );
    }

    #[test]
    fn values_to_variables() {
        let content = r#"{"url": "https://example.com/api"}"#;
        assert_eq!(
            vars().replace_values_with_variables(content),
            r#"{"url": "${baseUrl}/api"}"#
        );
    }

    #[test]
    fn round_trip() {
        let original = r#"{"url": "${baseUrl}/api", "auth": "${token}"}"#;
        let expanded = vars().replace_variables_with_values(original);
        assert_eq!(vars().replace_values_with_variables(&expanded), original);
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let content = r#"{"x": "${notDefined}"}"#;
        assert_eq!(vars().replace_variables_with_values(content), content);
    }

    #[test]
    fn empty_set_is_identity() {
        let none = ContentVars::default();
        assert!(none.is_empty());
        let content = r#"{"url": "${baseUrl}"}"#;
        assert_eq!(none.replace_variables_with_values(content), content);
        assert_eq!(none.replace_values_with_variables(content), content);
    }
}
