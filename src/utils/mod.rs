//! Internal utility helpers for label dates, config paths, query escaping, and serde helpers.

pub(crate) mod date;
pub(crate) mod paths;
pub(crate) mod query;
pub(crate) mod serde;
