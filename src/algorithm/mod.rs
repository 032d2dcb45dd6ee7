//! Algorithm implementations for population matching
//!
//! This module contains balance assessment, propensity models and the
//! matching search that combines them.

pub mod balance;
pub mod matching;
pub mod propensity;
