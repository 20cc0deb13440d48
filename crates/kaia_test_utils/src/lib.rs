//! Shared helpers for tests.

pub mod secret_key;
