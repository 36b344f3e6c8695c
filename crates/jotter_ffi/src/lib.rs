//! Flutter-facing bindings for `jotter_core`.

pub mod api;
