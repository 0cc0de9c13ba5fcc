//! Model library for the macrodyn engine.
//!
//! Each model is a [`macrodyn_core::catalog::ModelDefinition`] builder:
//! field declarations with explicit dependencies, plus named presets.
//! [`catalog`] returns a catalog with every shipped model registered.

pub mod models;

pub use models::catalog;
