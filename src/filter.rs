use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for deciding which intercepted responses belong to the data API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFilterConfig {
    /// HTTP methods to accept (case-insensitive; empty accepts any method)
    #[serde(default)]
    pub methods: Vec<String>,

    /// Regex patterns for URLs to include (if empty, all URLs are included unless excluded)
    #[serde(default = "default_include_patterns")]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Only keep 2xx responses
    #[serde(default = "default_require_success")]
    pub require_success: bool,
}

fn default_include_patterns() -> Vec<String> {
    vec![r"graphql/itemPage".to_string()]
}

fn default_require_success() -> bool {
    true
}

impl Default for ResponseFilterConfig {
    fn default() -> Self {
        Self {
            methods: Vec::new(),
            include_patterns: default_include_patterns(),
            exclude_patterns: Vec::new(),
            require_success: true,
        }
    }
}

/// Response filter that uses regex patterns, method and status to recognise data-API traffic
#[derive(Debug)]
pub struct ResponseFilter {
    config: ResponseFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self::new(ResponseFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl ResponseFilter {
    /// Create a new response filter from configuration
    pub fn new(config: ResponseFilterConfig) -> Result<Self, regex::Error> {
        // Compile regex patterns
        let mut include_regexes = Vec::with_capacity(config.include_patterns.len());
        for pattern in &config.include_patterns {
            include_regexes.push(Regex::new(pattern)?);
        }

        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a response belongs to the data API
    pub fn matches(&self, method: &str, url: &str, status: u16) -> bool {
        if !self.is_accepted_method(method) {
            return false;
        }

        if self.config.require_success && !(200..300).contains(&status) {
            return false;
        }

        let url_str = normalize_url(url);

        // Check regex exclusions (these take precedence)
        for regex in &self.exclude_regexes {
            if regex.is_match(&url_str) {
                return false;
            }
        }

        // If include patterns are specified, at least one must match
        if !self.include_regexes.is_empty() {
            return self.include_regexes.iter().any(|r| r.is_match(&url_str));
        }

        true
    }

    fn is_accepted_method(&self, method: &str) -> bool {
        self.config.methods.is_empty()
            || self
                .config
                .methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method))
    }
}

/// Drop the fragment; relative URLs reported by the page are matched as-is
fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_URL: &str = "https://www.doordash.com/graphql/itemPage?operation=itemPage";

    #[test]
    fn test_default_filter() {
        let filter = ResponseFilter::default();

        // The item detail endpoint is accepted
        assert!(filter.matches("POST", ITEM_URL, 200));

        // Other GraphQL operations are not
        let other = "https://www.doordash.com/graphql/storepageFeed?operation=storepageFeed";
        assert!(!filter.matches("POST", other, 200));

        // Failed responses are dropped by default
        assert!(!filter.matches("POST", ITEM_URL, 500));
        assert!(!filter.matches("POST", ITEM_URL, 304));
    }

    #[test]
    fn test_method_restriction() {
        let config = ResponseFilterConfig {
            methods: vec!["post".to_string()],
            ..ResponseFilterConfig::default()
        };
        let filter = ResponseFilter::new(config).unwrap();

        assert!(filter.matches("POST", ITEM_URL, 200));
        assert!(!filter.matches("GET", ITEM_URL, 200));
    }

    #[test]
    fn test_regex_patterns() {
        let config = ResponseFilterConfig {
            methods: vec![],
            include_patterns: vec![r"/api/menu/item/\d+$".to_string()],
            exclude_patterns: vec![r"/api/menu/item/0$".to_string()],
            require_success: false,
        };
        let filter = ResponseFilter::new(config).unwrap();

        // Matching include pattern should be allowed, whatever the status
        assert!(filter.matches("GET", "https://shop.test/api/menu/item/42", 404));

        // Non-matching include pattern should be excluded
        assert!(!filter.matches("GET", "https://shop.test/api/menu/42", 200));

        // Matching exclude pattern should be excluded even if it matches include
        assert!(!filter.matches("GET", "https://shop.test/api/menu/item/0", 200));
    }

    #[test]
    fn test_fragment_is_ignored() {
        let config = ResponseFilterConfig {
            include_patterns: vec![r"itemPage$".to_string()],
            ..ResponseFilterConfig::default()
        };
        let filter = ResponseFilter::new(config).unwrap();

        assert!(filter.matches("POST", "https://x.test/graphql/itemPage#frag", 200));
        // relative URLs cannot be parsed but still go through the patterns
        assert!(filter.matches("POST", "/graphql/itemPage", 200));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let config = ResponseFilterConfig {
            include_patterns: vec!["(".to_string()],
            ..ResponseFilterConfig::default()
        };
        assert!(ResponseFilter::new(config).is_err());
    }
}
