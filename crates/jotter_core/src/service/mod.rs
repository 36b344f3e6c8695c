//! Use-case services over repository contracts.

pub mod entry_service;
