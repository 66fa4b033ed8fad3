//! Configuration surface consumed by the inventory core
//!
//! A configuration is an explicit immutable value assembled once at startup
//! and passed by reference. Property lookups fall back to the process
//! environment, so deployments can override without a config file.

use std::collections::BTreeMap;

/// A named configuration property with environment-variable fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: &'static str,
    pub env: &'static [&'static str],
}

/// Bound on how many times a mutation transaction is re-run after a
/// backend conflict
pub const TRANSACTION_RETRIES: PropertyDef = PropertyDef {
    name: "trellis.transaction.retries",
    env: &["TRELLIS_TRANSACTION_RETRIES"],
};

const DEFAULT_TRANSACTION_RETRIES: usize = 3;

/// Immutable configuration for an inventory instance
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    properties: BTreeMap<String, String>,
}

impl Configuration {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_properties(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Look up a property, falling back to its environment variables
    pub fn lookup(&self, def: &PropertyDef) -> Option<String> {
        if let Some(value) = self.properties.get(def.name) {
            return Some(value.clone());
        }
        def.env.iter().find_map(|var| std::env::var(var).ok())
    }

    /// The configured transaction retry bound
    ///
    /// Unparseable or absent values fall back to the default.
    pub fn transaction_retries(&self) -> usize {
        self.lookup(&TRANSACTION_RETRIES)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TRANSACTION_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_bound() {
        let config = Configuration::empty();
        assert_eq!(config.transaction_retries(), DEFAULT_TRANSACTION_RETRIES);
    }

    #[test]
    fn test_explicit_retry_bound() {
        let config = Configuration::empty().with_property("trellis.transaction.retries", "7");
        assert_eq!(config.transaction_retries(), 7);
    }

    #[test]
    fn test_unparseable_value_falls_back() {
        let config =
            Configuration::empty().with_property("trellis.transaction.retries", "many");
        assert_eq!(config.transaction_retries(), DEFAULT_TRANSACTION_RETRIES);
    }
}
