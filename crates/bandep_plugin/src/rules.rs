use anyhow::{Context, Result};
use log::trace;
use regex::Regex;

/// A dependency that should be kept out of the bundle.
#[derive(Debug, Clone)]
pub struct BannedDependency {
    /// Matched anywhere in the raw import specifier, not against a resolved
    /// file path. Inline flags like `(?i)` are honored.
    pub pattern: Regex,
    /// Optional explanation, included in the diagnostic text.
    pub reason: Option<String>,
}

/// The configured ban rules, in order. When several rules match the same
/// specifier, the first one wins.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    rules: Vec<BannedDependency>,
    filter: SpecifierFilter,
}

impl RuleIndex {
    pub fn new(rules: Vec<BannedDependency>) -> Result<Self> {
        let filter = SpecifierFilter::combine(&rules)?;
        Ok(Self { rules, filter })
    }

    /// First rule whose pattern matches the specifier, if any.
    pub fn find(&self, request: &str) -> Option<&BannedDependency> {
        self.rules.iter().find(|rule| rule.pattern.is_match(request))
    }

    /// The combined pre-filter built from all rule patterns.
    pub fn filter(&self) -> SpecifierFilter {
        self.filter.clone()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Combined matcher over all rule patterns, used to scope hook registration.
/// Accepts a specifier iff at least one rule would accept it; matching
/// correctness always comes from [`RuleIndex::find`], never from here.
#[derive(Debug, Clone)]
pub struct SpecifierFilter(Option<Regex>);

impl SpecifierFilter {
    fn combine(rules: &[BannedDependency]) -> Result<Self> {
        // An empty alternation is not a valid regex; with no rules the
        // filter simply matches nothing.
        if rules.is_empty() {
            return Ok(Self(None));
        }
        let sources: Vec<&str> = rules.iter().map(|rule| rule.pattern.as_str()).collect();
        let combined = format!("({})", sources.join(")|("));
        trace!("Combined specifier filter: {}", combined);
        let regex = Regex::new(&combined)
            .with_context(|| format!("Failed to combine ban patterns into '{}'", combined))?;
        Ok(Self(Some(regex)))
    }

    /// Filter from a single pattern, for hooks that are not rule-driven.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid filter pattern '{}'", pattern))?;
        Ok(Self(Some(regex)))
    }

    /// Matcher that accepts nothing. What `combine` degenerates to for an
    /// empty rule list.
    pub fn match_nothing() -> Self {
        Self(None)
    }

    pub fn is_match(&self, request: &str) -> bool {
        self.0.as_ref().is_some_and(|regex| regex.is_match(request))
    }
}
