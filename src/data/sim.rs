//! Synthetic pool/target data for demos and tests

use crate::data::{DEFAULT_POPULATION_COL, FeatureSchema, MatchingData, POOL, TARGET};
use crate::error::Result;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rand::prelude::*;
use std::f64::consts::PI;
use std::sync::Arc;

const HAIRCOLORS: [&str; 4] = ["blond", "brown", "black", "red"];
const COUNTRIES: [&str; 5] = ["DE", "FR", "IT", "ES", "UK"];

/// Distribution parameters of one simulated population
struct PopulationProfile {
    age: (f64, f64),
    height: (f64, f64),
    weight_per_cm: f64,
    p_female: f64,
    haircolor_weights: [f64; 4],
    country_weights: [f64; 5],
    p_binary: [f64; 2],
}

const POOL_PROFILE: PopulationProfile = PopulationProfile {
    age: (50.0, 12.0),
    height: (172.0, 9.0),
    weight_per_cm: 0.43,
    p_female: 0.5,
    haircolor_weights: [0.25, 0.4, 0.3, 0.05],
    country_weights: [0.3, 0.25, 0.2, 0.15, 0.1],
    p_binary: [0.3, 0.5],
};

const TARGET_PROFILE: PopulationProfile = PopulationProfile {
    age: (58.0, 10.0),
    height: (167.0, 8.0),
    weight_per_cm: 0.47,
    p_female: 0.65,
    haircolor_weights: [0.15, 0.35, 0.4, 0.1],
    country_weights: [0.15, 0.2, 0.25, 0.25, 0.15],
    p_binary: [0.45, 0.4],
};

/// Schema of the generated dataset
#[must_use]
pub fn toy_schema() -> FeatureSchema {
    FeatureSchema::from_lists(
        &["age", "height", "weight"],
        &["gender", "haircolor", "country", "binary_0", "binary_1"],
    )
}

/// Generate a pool and a target population with shifted covariates
///
/// Deterministic for a given seed. Columns: `patient_id`, `age`,
/// `height`, `weight`, `gender`, `haircolor`, `country`, `binary_0`,
/// `binary_1` and `population`.
pub fn generate_toy_dataset(n_pool: usize, n_target: usize, seed: u64) -> Result<MatchingData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let total = n_pool + n_target;

    let mut patient_id = Vec::with_capacity(total);
    let mut age = Vec::with_capacity(total);
    let mut height = Vec::with_capacity(total);
    let mut weight = Vec::with_capacity(total);
    let mut gender = Vec::with_capacity(total);
    let mut haircolor = Vec::with_capacity(total);
    let mut country = Vec::with_capacity(total);
    let mut binary_0 = Vec::with_capacity(total);
    let mut binary_1 = Vec::with_capacity(total);
    let mut population = Vec::with_capacity(total);

    let groups = [(POOL, n_pool, &POOL_PROFILE), (TARGET, n_target, &TARGET_PROFILE)];
    for (label, n, profile) in groups {
        for _ in 0..n {
            patient_id.push(patient_id.len() as i64);

            let a = sample_normal(&mut rng, profile.age.0, profile.age.1).clamp(18.0, 95.0);
            let h = sample_normal(&mut rng, profile.height.0, profile.height.1);
            let w = sample_normal(&mut rng, h * profile.weight_per_cm, 8.0).max(35.0);
            age.push(a.round());
            height.push(h);
            weight.push(w);

            gender.push(if rng.random_bool(profile.p_female) { "F" } else { "M" });
            haircolor.push(HAIRCOLORS[sample_weighted(&mut rng, &profile.haircolor_weights)]);
            country.push(COUNTRIES[sample_weighted(&mut rng, &profile.country_weights)]);
            binary_0.push(if rng.random_bool(profile.p_binary[0]) { "1" } else { "0" });
            binary_1.push(if rng.random_bool(profile.p_binary[1]) { "1" } else { "0" });
            population.push(label);
        }
    }

    let arrow_schema = Arc::new(Schema::new(vec![
        Field::new("patient_id", DataType::Int64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("height", DataType::Float64, false),
        Field::new("weight", DataType::Float64, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("haircolor", DataType::Utf8, false),
        Field::new("country", DataType::Utf8, false),
        Field::new("binary_0", DataType::Utf8, false),
        Field::new("binary_1", DataType::Utf8, false),
        Field::new(DEFAULT_POPULATION_COL, DataType::Utf8, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(patient_id)),
        Arc::new(Float64Array::from(age)),
        Arc::new(Float64Array::from(height)),
        Arc::new(Float64Array::from(weight)),
        Arc::new(StringArray::from(gender)),
        Arc::new(StringArray::from(haircolor)),
        Arc::new(StringArray::from(country)),
        Arc::new(StringArray::from(binary_0)),
        Arc::new(StringArray::from(binary_1)),
        Arc::new(StringArray::from(population)),
    ];

    let batch = RecordBatch::try_new(arrow_schema, columns)?;
    MatchingData::new(batch, DEFAULT_POPULATION_COL, toy_schema())
}

/// Box-Muller normal draw
fn sample_normal<R: Rng>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    std.mul_add(z, mean)
}

fn sample_weighted<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut draw = rng.random::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if draw < *w {
            return i;
        }
        draw -= w;
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_dataset_sizes() {
        let data = generate_toy_dataset(200, 50, 7).unwrap();
        let counts = data.counts();
        assert_eq!(counts["pool"], 200);
        assert_eq!(counts["target"], 50);
        assert_eq!(data.schema().numeric().len(), 3);
        assert_eq!(data.schema().categoric().len(), 5);
    }

    #[test]
    fn test_toy_dataset_is_deterministic() {
        let a = generate_toy_dataset(30, 10, 45).unwrap();
        let b = generate_toy_dataset(30, 10, 45).unwrap();
        let c = generate_toy_dataset(30, 10, 46).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
