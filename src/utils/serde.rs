use serde::{Deserialize, Serialize};

/// openFDA label fields are documented as arrays, but a few older SPL
/// records carry a bare string instead.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrVec {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Single(value) => Some(value.as_str()),
            Self::Multiple(values) => values.first().map(|value| value.as_str()),
        }
    }

    /// First entry that is not blank, trimmed.
    pub fn first_nonempty(&self) -> Option<&str> {
        self.first().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::None => &[],
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values.as_slice(),
        };
        values.iter().map(String::as_str)
    }
}
