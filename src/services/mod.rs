// src/services/mod.rs

//! Network-facing services.

pub mod outline;

pub use outline::{Fetched, OutlineClient, OutlineSource};
