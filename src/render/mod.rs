//! Output renderers: Markdown cards, JSON, and section toggles.

pub(crate) mod json;
pub(crate) mod markdown;
pub(crate) mod toggle;
