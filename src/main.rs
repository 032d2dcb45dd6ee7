use anyhow::{Context, Result};
use log::info;
use popmatch::utils::logging::console::{
    print_feature_summaries, print_loss_table, print_population_counts,
};
use popmatch::utils::logging::create_spinner;
use popmatch::{MatcherConfig, MatchingSession, objectives};
use std::path::Path;
use std::time::Instant;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

const DEFAULT_N_POOL: usize = 10_000;
const DEFAULT_N_TARGET: usize = 1_000;
const DATASET_SEED: u64 = 45;

fn size_from_env(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer, got {value:?}")),
        Err(_) => Ok(default),
    }
}

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => MatcherConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        None => MatcherConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    info!("Available objectives: {}", objectives().join(", "));
    println!("{config}");

    let n_pool = size_from_env("POPMATCH_N_POOL", DEFAULT_N_POOL)?;
    let n_target = size_from_env("POPMATCH_N_TARGET", DEFAULT_N_TARGET)?;

    let spinner = create_spinner(Some("Generating toy dataset"));
    let mut session = MatchingSession::with_toy_dataset(n_pool, n_target, DATASET_SEED)
        .context("Failed to generate toy dataset")?;
    spinner.finish_and_clear();
    print_population_counts(session.dataset());
    print_feature_summaries(session.dataset())?;

    let (before, _) = session.balance_reports()?;
    println!("\nBefore matching\n{before}");

    let start = Instant::now();
    let comparison = session.run_match(&config).context("Matching failed")?;
    info!("Matching finished in {:?}", start.elapsed());

    if let Some(result) = session.last_result() {
        println!("{result}");
    }
    let (_, after) = session.balance_reports()?;
    if let Some(after) = after {
        println!("After matching\n{after}");
    }

    let rows: Vec<(String, f64, f64)> = comparison
        .features
        .iter()
        .map(|f| (f.feature.clone(), f.before, f.after))
        .collect();
    print_loss_table(&rows);
    info!(
        "{} of {} features did not get worse",
        comparison.improved_features().len(),
        comparison.features.len()
    );
    println!();
    print_population_counts(session.dataset());

    Ok(())
}
