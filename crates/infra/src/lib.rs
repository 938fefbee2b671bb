//! Infrastructure layer: configuration, catalog storage and application services.

pub mod config;
pub mod services;
pub mod store;
