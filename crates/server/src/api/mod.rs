//! HTTP API modules

pub mod research;
