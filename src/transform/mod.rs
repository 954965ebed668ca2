//! Transform adapters from openFDA label records into display cards.

pub(crate) mod label;
