use crate::config::ConsoleCaptureConfig;
use crate::snapshot::ConsoleEntry;
use regex::Regex;

/// Decides which captured console entries make it into a snapshot.
///
/// Used mainly to keep the tool's own in-page logging out of reports.
#[derive(Debug)]
pub struct ConsoleFilter {
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for ConsoleFilter {
    fn default() -> Self {
        Self::from_config(&ConsoleCaptureConfig::default())
            .expect("Default regex patterns should be valid")
    }
}

impl ConsoleFilter {
    /// Create a filter from include and exclude patterns
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self, regex::Error> {
        let mut include_regexes = Vec::with_capacity(include_patterns.len());
        for pattern in include_patterns {
            include_regexes.push(Regex::new(pattern)?);
        }

        let mut exclude_regexes = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            include_regexes,
            exclude_regexes,
        })
    }

    pub fn from_config(config: &ConsoleCaptureConfig) -> Result<Self, regex::Error> {
        Self::new(&config.include_patterns, &config.exclude_patterns)
    }

    /// Determine if an entry should be kept
    pub fn should_keep(&self, entry: &ConsoleEntry) -> bool {
        let message = entry.message();

        // Exclusions take precedence
        if self.exclude_regexes.iter().any(|r| r.is_match(&message)) {
            return false;
        }

        // If include patterns are specified, at least one must match
        if !self.include_regexes.is_empty() {
            return self.include_regexes.iter().any(|r| r.is_match(&message));
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ConsoleLevel;

    fn entry(text: &str) -> ConsoleEntry {
        ConsoleEntry::new(ConsoleLevel::Log, vec![text.to_string()], "t")
    }

    #[test]
    fn test_default_filter_drops_self_logs() {
        let filter = ConsoleFilter::default();
        assert!(!filter.should_keep(&entry("[page-report] console hook installed")));
        assert!(filter.should_keep(&entry("app started")));
        // Prefix only counts at the start of the message
        assert!(filter.should_keep(&entry("see [page-report] docs")));
    }

    #[test]
    fn test_include_patterns() {
        let filter = ConsoleFilter::new(&["(?i)error".to_string()], &[]).unwrap();
        assert!(filter.should_keep(&entry("Error: x is undefined")));
        assert!(!filter.should_keep(&entry("render complete")));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter =
            ConsoleFilter::new(&["error".to_string()], &["^ignored".to_string()]).unwrap();
        assert!(!filter.should_keep(&entry("ignored error")));
        assert!(filter.should_keep(&entry("real error")));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(ConsoleFilter::new(&[], &["(".to_string()]).is_err());
    }
}
