//! Flutter bridge for the Auri core.

pub mod api;
