//! Exact class map and longest-prefix package map used to replace a
//! rewritable identifier once §filter has cleared it.

use std::collections::HashMap;

use crate::error::{Result, RewriteError};
use crate::filter::matches_prefix_boundary;

/// Exact `old_fqcn -> new_fqcn` map. Re-inserting the same pair is a no-op;
/// inserting a different target for an existing key is a conflict.
#[derive(Default, Clone)]
pub struct ClassMap {
    entries: HashMap<String, String>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        let from = from.into();
        let to = to.into();
        match self.entries.get(&from) {
            Some(existing) if *existing == to => Ok(()),
            Some(existing) => Err(RewriteError::MappingConflict {
                key: from,
                existing: existing.clone(),
                incoming: to,
            }),
            None => {
                self.entries.insert(from, to);
                Ok(())
            }
        }
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.entries.get(from).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Longest-prefix `old_prefix -> new_prefix` map with `.`-boundary matching.
#[derive(Default, Clone)]
pub struct PackageMap {
    entries: HashMap<String, String>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) -> Result<()> {
        let from = from.into();
        let to = to.into();
        match self.entries.get(&from) {
            Some(existing) if *existing == to => Ok(()),
            Some(existing) => Err(RewriteError::MappingConflict {
                key: from,
                existing: existing.clone(),
                incoming: to,
            }),
            None => {
                self.entries.insert(from, to);
                Ok(())
            }
        }
    }

    /// Replaces `s` by the longest matching prefix, or returns it unchanged.
    pub fn replace(&self, s: &str) -> String {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, target) in &self.entries {
            if matches_prefix_boundary(prefix, s) {
                match best {
                    Some((best_prefix, _)) if best_prefix.len() >= prefix.len() => {}
                    _ => best = Some((prefix.as_str(), target.as_str())),
                }
            }
        }
        match best {
            Some((prefix, target)) => format!("{target}{}", &s[prefix.len()..]),
            None => s.to_string(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_map_allows_repeated_identical_insert() {
        let mut m = ClassMap::new();
        m.insert("com.a.B", "z.q.B").unwrap();
        m.insert("com.a.B", "z.q.B").unwrap();
        assert_eq!(m.get("com.a.B"), Some("z.q.B"));
    }

    #[test]
    fn class_map_rejects_conflicting_insert() {
        let mut m = ClassMap::new();
        m.insert("com.a.B", "z.q.B").unwrap();
        assert!(m.insert("com.a.B", "z.q.C").is_err());
    }

    #[test]
    fn package_map_longest_prefix_wins() {
        let mut m = PackageMap::new();
        m.insert("com.a", "X").unwrap();
        m.insert("com.a.b", "Y").unwrap();
        assert_eq!(m.replace("com.a.b.C"), "Y.C");
        assert_eq!(m.replace("com.a.cC"), "com.a.cC");
    }

    #[test]
    fn package_map_returns_input_unchanged_when_no_prefix_matches() {
        let m = PackageMap::new();
        assert_eq!(m.replace("com.other.Thing"), "com.other.Thing");
    }
}
