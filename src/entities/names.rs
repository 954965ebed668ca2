//! International-to-US medicine name normalization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::MedLookupError;

const NAME_MAP_ENV: &str = "MEDLOOKUP_NAME_MAP";

const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("paracetamol", "acetaminophen"),
    ("panadol", "acetaminophen"),
    ("calpol", "acetaminophen"),
    ("crocin", "acetaminophen"),
    ("metacin", "acetaminophen"),
    ("ibugesic", "ibuprofen"),
    ("brufen", "ibuprofen"),
];

/// A name substitution that was applied to user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameSubstitution {
    pub original: String,
    pub mapped: String,
}

/// Immutable mapping from lowercase international names to US generic names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    entries: BTreeMap<String, String>,
}

impl NameMap {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_NAMES
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, MedLookupError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map = Self::empty();
        map.extend(entries)?;
        Ok(map)
    }

    fn extend<I, K, V>(&mut self, entries: I) -> Result<(), MedLookupError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in entries {
            let key = key.as_ref().trim().to_lowercase();
            let value = value.as_ref().trim();
            if key.is_empty() || value.is_empty() {
                return Err(MedLookupError::InvalidArgument(format!(
                    "Name map entries need a non-empty name and US equivalent (got \"{key}\" -> \"{value}\")"
                )));
            }
            self.entries.insert(key, value.to_string());
        }
        Ok(())
    }

    /// Parses a JSON object of `"international name": "US name"` pairs.
    pub fn parse_json(raw: &str) -> Result<Self, MedLookupError> {
        let entries: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Self::from_entries(entries)
    }

    /// Loads a name-map file and layers it over `base`.
    pub fn load_over(base: Self, path: &Path) -> Result<Self, MedLookupError> {
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|err| MedLookupError::NameMap {
            path: shown.clone(),
            reason: err.to_string(),
        })?;
        let overlay = Self::parse_json(&raw).map_err(|err| MedLookupError::NameMap {
            path: shown.clone(),
            reason: err.to_string(),
        })?;

        let mut merged = base;
        merged.entries.extend(overlay.entries);
        debug!(path = %shown, entries = merged.len(), "Loaded name map");
        Ok(merged)
    }

    /// Resolves the active map: explicit path, then `MEDLOOKUP_NAME_MAP`, then
    /// the user config file if it exists.
    pub fn resolve(explicit: Option<&Path>, include_builtin: bool) -> Result<Self, MedLookupError> {
        let base = if include_builtin {
            Self::builtin()
        } else {
            Self::empty()
        };

        let path: Option<PathBuf> = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var(NAME_MAP_ENV)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    let default = crate::utils::paths::default_name_map_path();
                    default.is_file().then_some(default)
                }),
        };

        match path {
            Some(path) => Self::load_over(base, &path),
            None => Ok(base),
        }
    }

    /// Returns the US name for `raw`, or `raw` unchanged when it is not mapped.
    pub fn normalize(&self, raw: &str) -> String {
        match self.lookup(raw) {
            Some(mapped) => mapped.to_string(),
            None => raw.to_string(),
        }
    }

    pub fn substitute(&self, raw: &str) -> Option<NameSubstitution> {
        let mapped = self.lookup(raw)?;
        Some(NameSubstitution {
            original: raw.trim().to_string(),
            mapped: mapped.to_string(),
        })
    }

    fn lookup(&self, raw: &str) -> Option<&str> {
        let key = raw.trim().to_lowercase();
        self.entries.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
