//! Bundler configuration directives applied before `bundle install`

use crate::cache::SlotRole;
use std::collections::BTreeMap;
use std::path::Path;

/// Gem groups left out of the launch slot
pub const LAUNCH_WITHOUT_GROUPS: &str = "development:test";

/// `bundle config --global` key/value pairs.
///
/// Iteration is always sorted by key: bundler's behaviour can depend on the
/// order settings are applied in, and builds must be reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallDirectives(BTreeMap<String, String>);

impl InstallDirectives {
    /// Empty directive set
    pub fn new() -> Self {
        Self::default()
    }

    /// Directives for installing into a slot of the given role
    pub fn for_role(role: SlotRole, slot_path: &Path) -> Self {
        let mut directives = Self::new()
            .with("path", slot_path.display().to_string())
            .with("clean", "true");

        if role == SlotRole::Launch {
            directives = directives.with("without", LAUNCH_WITHOUT_GROUPS);
        }

        directives
    }

    /// Add or replace a directive
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a directive
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Directives in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InstallDirectives {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
