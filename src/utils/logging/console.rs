//! Console output utilities
//!
//! This module provides utilities for formatted console output.

use crate::data::MatchingData;
use crate::error::Result;

/// Print record counts per population
pub fn print_population_counts(data: &MatchingData) {
    println!("Populations ({} records):", data.num_rows());
    for (population, count) in data.counts() {
        println!("  - {population}: {count}");
    }
}

/// Print per-population summaries of every feature
pub fn print_feature_summaries(data: &MatchingData) -> Result<()> {
    println!("Numeric features:");
    for summary in data.describe_numeric()? {
        println!("  {summary}");
    }
    println!("Categoric features:");
    for summary in data.describe_categoric()? {
        println!("  {summary}");
    }
    Ok(())
}

/// Print a per-feature loss comparison table
pub fn print_loss_table(rows: &[(String, f64, f64)]) {
    println!("{:<20} | {:>10} | {:>10}", "Feature", "Pre-match", "Post-match");
    println!("{:-<20}-|-{:->10}-|-{:->10}", "", "", "");
    for (feature, before, after) in rows {
        println!("{feature:<20} | {before:>10.4} | {after:>10.4}");
    }
}
