//! Case-insensitive wildcard patterns over IDF object types

use glob::{MatchOptions, Pattern};

use crate::error::RegistryError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled `*`-wildcard pattern such as `ZoneHVAC:*` or `Material*`
#[derive(Debug, Clone)]
pub struct ObjectPattern {
    source: String,
    pattern: Pattern,
}

impl ObjectPattern {
    pub fn new(source: &str) -> Result<Self, RegistryError> {
        let pattern = Pattern::new(source.trim()).map_err(|e| RegistryError::InvalidPattern {
            pattern: source.to_string(),
            message: e.msg.to_string(),
        })?;
        Ok(Self {
            source: source.trim().to_string(),
            pattern,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.matches_with(text.trim(), MATCH_OPTIONS)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Compile a list of pattern strings
pub fn compile_all<S: AsRef<str>>(sources: &[S]) -> Result<Vec<ObjectPattern>, RegistryError> {
    sources.iter().map(|s| ObjectPattern::new(s.as_ref())).collect()
}
