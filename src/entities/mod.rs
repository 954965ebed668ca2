//! Lookup workflows: name normalization, label fallback queries, and search sessions.

pub(crate) mod lookup;
pub(crate) mod names;
pub(crate) mod session;
