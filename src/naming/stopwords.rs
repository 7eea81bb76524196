//! Reserved-name (stop word) validation
//!
//! Physical storage owns the leading-underscore namespace: canonical ids
//! (`_m...`, `_f...`) and the base sub-record members are all minted there.
//! User-supplied field names and aliases must stay out of it, otherwise a
//! rename could collide with a physical slot name.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Default reserved patterns: the whole underscore-prefixed namespace plus
/// the physical base-field member names.
static DEFAULT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^_",
        r"^(?i)(timestamp|writetime|aliasname|unknownfields)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("default stop-word pattern must compile"))
    .collect()
});

/// Validates names against reserved physical-storage naming conventions.
#[derive(Debug, Clone)]
pub struct StopWordValidator {
    patterns: Vec<Regex>,
}

impl Default for StopWordValidator {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
        }
    }
}

impl StopWordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a validator from custom patterns (replacing the defaults).
    pub fn with_patterns(patterns: &[&str]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| Error::Config(format!("invalid stop-word pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns: compiled })
    }

    /// Whether a single name collides with a reserved pattern.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Validate one name, failing with a single-entry ReservedName error.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.is_reserved(name) {
            return Err(Error::ReservedName(vec![name.to_string()]));
        }
        Ok(())
    }

    /// Validate a batch of names, collecting every offender.
    ///
    /// All violations are reported together rather than failing on the
    /// first, so a caller fixing a record sees the full damage at once.
    pub fn validate_all<'a, I>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let offenders: Vec<String> = names
            .into_iter()
            .filter(|n| self.is_reserved(n))
            .map(|n| n.to_string())
            .collect();
        if offenders.is_empty() {
            Ok(())
        } else {
            Err(Error::ReservedName(offenders))
        }
    }
}
