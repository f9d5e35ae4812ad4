//! Advertising packet content filter
//!
//! Filter types and the manager that programs a filter slot in the
//! controller.

pub mod manager;
pub mod types;

#[cfg(test)]
mod tests;

pub use manager::FilterConfigManager;
pub use types::*;
