//! Core types for the sales assistant.
//!
//! This module provides type-safe wrappers for the entities of the sales
//! schema and the records the analytics tools return.

pub mod id;
pub mod report;

pub use id::*;
pub use report::{CustomerOrder, NO_CATEGORY, ShopPerformance, TopProduct};
