//! Standard log lines for file operations and search outcomes

use std::path::Path;
use std::time::Duration;

/// Log the start of a file operation, e.g. "Loading table from <path>"
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{operation} {}", path.display());
}

/// Log a completed load or write of `records` rows
pub fn log_operation_complete(operation: &str, path: &Path, records: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!(
            "Successfully {operation} {records} records from {} in {duration:.2?}",
            path.display()
        ),
        None => log::info!("Successfully {operation} {records} records from {}", path.display()),
    }
}

/// Log the end of a hyperparameter search
///
/// # Arguments
/// * `iterations` - Iterations attempted
/// * `failed` - Iterations that failed and were skipped
/// * `loss` - Best loss, if any iteration succeeded
/// * `elapsed` - Total search time
pub fn log_search_outcome(iterations: usize, failed: usize, loss: Option<f64>, elapsed: Duration) {
    match loss {
        Some(loss) => log::info!(
            "Search finished after {iterations} iterations ({failed} failed) in {elapsed:.2?}, best loss {loss:.4}"
        ),
        None => log::warn!(
            "Search finished after {iterations} iterations in {elapsed:.2?} without a successful fit"
        ),
    }
}
