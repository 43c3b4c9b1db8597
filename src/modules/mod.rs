//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the object storage client and the report classifier clients.

pub mod classifier;
pub mod storage;
