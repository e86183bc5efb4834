//! Service name -> port policy category.
//!
//! Classification is a table of rules evaluated in order; the first rule
//! whose matcher accepts the service name wins. Matching is case-insensitive.

use regex::{Regex, RegexBuilder};

use crate::config::{ConfigError, RuleEntry};

#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// Any keyword appears as a substring of the name. Stored lowercase.
    Keywords(Vec<String>),
    Pattern(Regex),
}

impl NameMatcher {
    pub fn matches(&self, service_name: &str) -> bool {
        match self {
            NameMatcher::Keywords(keywords) => {
                let lowered = service_name.to_lowercase();
                keywords.iter().any(|k| lowered.contains(k.as_str()))
            }
            NameMatcher::Pattern(re) => re.is_match(service_name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub category: String,
    pub matcher: NameMatcher,
}

impl ClassificationRule {
    pub fn keywords(category: &str, keywords: &[&str]) -> Self {
        ClassificationRule {
            category: category.to_string(),
            matcher: NameMatcher::Keywords(keywords.iter().map(|k| k.to_lowercase()).collect()),
        }
    }

    pub fn pattern(category: &str, pattern: &str) -> Result<Self, regex::Error> {
        let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(ClassificationRule {
            category: category.to_string(),
            matcher: NameMatcher::Pattern(re),
        })
    }
}

impl TryFrom<&RuleEntry> for ClassificationRule {
    type Error = ConfigError;

    fn try_from(entry: &RuleEntry) -> Result<Self, Self::Error> {
        match &entry.pattern {
            Some(pattern) => ClassificationRule::pattern(&entry.category, pattern).map_err(|e| {
                ConfigError::InvalidRule {
                    category: entry.category.clone(),
                    reason: e.to_string(),
                }
            }),
            None => {
                let keywords: Vec<&str> = entry.keywords.iter().map(String::as_str).collect();
                Ok(ClassificationRule::keywords(&entry.category, &keywords))
            }
        }
    }
}

/// Ordered rule table
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    rules: Vec<ClassificationRule>,
}

impl ClassificationRules {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        ClassificationRules { rules }
    }

    pub fn from_entries(entries: &[RuleEntry]) -> Result<Self, ConfigError> {
        let rules = entries
            .iter()
            .map(ClassificationRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClassificationRules { rules })
    }

    /// Category of the first matching rule
    pub fn classify(&self, service_name: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(service_name))
            .map(|rule| rule.category.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        ClassificationRules::new(vec![
            ClassificationRule::keywords("mcp_servers", &["mcp", "coordinator"]),
            ClassificationRule::keywords("monitoring", &["monitoring", "prometheus"]),
            ClassificationRule::keywords("web_interfaces", &["api", "gateway"]),
        ])
    }
}
