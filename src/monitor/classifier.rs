//! Warning classification
//!
//! Decides whether a server-emitted warning message is a deprecation-class
//! warning. The vocabulary is data, not logic: callers construct a matcher
//! from whatever keyword set fits the target engine version.

/// Semantic class of a server warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningClass {
    Generic,
    Deprecation,
}

/// Keywords that mark a MySQL 8 upgrade deprecation warning.
/// `authentication_string` shows up in warnings about the pre-8.0
/// mysql.user password column rather than in "deprecated" phrasing.
const MYSQL8_DEPRECATION_KEYWORDS: &[&str] = &[
    "deprecated",
    "will be removed",
    "is obsolete",
    "no longer supported",
    "authentication_string",
];

/// Default vocabulary as owned configuration data
pub fn default_deprecation_keywords() -> Vec<String> {
    MYSQL8_DEPRECATION_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

/// Case-insensitive substring matcher over a configured keyword set
#[derive(Debug, Clone)]
pub struct DeprecationMatcher {
    /// Lowercased at construction so classification is a plain contains scan
    keywords: Vec<String>,
}

impl DeprecationMatcher {
    /// Build a matcher from a caller-supplied vocabulary
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Classify a single warning message
    pub fn classify(&self, message: &str) -> WarningClass {
        let message = message.to_lowercase();
        if self.keywords.iter().any(|k| message.contains(k)) {
            WarningClass::Deprecation
        } else {
            WarningClass::Generic
        }
    }

    /// Convenience predicate for the common call site
    pub fn is_deprecation(&self, message: &str) -> bool {
        self.classify(message) == WarningClass::Deprecation
    }
}

impl Default for DeprecationMatcher {
    fn default() -> Self {
        Self::new(&default_deprecation_keywords())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_each_default_keyword() {
        let matcher = DeprecationMatcher::default();
        for keyword in MYSQL8_DEPRECATION_KEYWORDS {
            let message = format!("something something {} end", keyword);
            assert_eq!(
                matcher.classify(&message),
                WarningClass::Deprecation,
                "keyword {:?} not matched",
                keyword
            );
        }
    }

    #[test]
    fn test_authentication_string_fixture() {
        let matcher = DeprecationMatcher::default();
        assert!(matcher.is_deprecation("The 'authentication_string' column is deprecated"));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let matcher = DeprecationMatcher::default();
        assert!(matcher.is_deprecation("Feature X is DEPRECATED and WILL BE REMOVED"));
        assert!(matcher.is_deprecation("Syntax Is Obsolete, please migrate"));
    }

    #[test]
    fn test_unrelated_messages_are_generic() {
        let matcher = DeprecationMatcher::default();
        assert_eq!(
            matcher.classify("Data truncated for column 'name' at row 1"),
            WarningClass::Generic
        );
        assert_eq!(matcher.classify(""), WarningClass::Generic);
    }

    #[test]
    fn test_custom_vocabulary_replaces_defaults() {
        let matcher = DeprecationMatcher::new(&["sunset".to_string()]);
        assert!(matcher.is_deprecation("this API will Sunset in 9.0"));
        // default keywords no longer match
        assert!(!matcher.is_deprecation("column is deprecated"));
    }
}
