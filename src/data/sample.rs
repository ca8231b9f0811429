//! Synthetic compensation population.
//!
//! Compensation is linear in experience plus a per-location offset, with
//! Gaussian noise on top:
//!
//! `comp = base + per_year * xp + offset_step * location_index + N(0, noise_sd)`

use async_trait::async_trait;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::PopulationSource;
use crate::domain::CompensationRecord;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub count: usize,
    pub locations: Vec<String>,
    pub xp_max: f64,
    pub base: f64,
    pub per_year: f64,
    pub offset_step: f64,
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 100,
            locations: ["Paris", "Lyon", "Marseille", "Toulouse", "Nantes"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            xp_max: 20.0,
            base: 35_000.0,
            per_year: 2_500.0,
            offset_step: 4_000.0,
            noise_sd: 1_500.0,
            seed: 7,
        }
    }
}

impl SampleConfig {
    /// The noise-free compensation for `(location_index, xp)`.
    pub fn expected(&self, location_index: usize, xp: f64) -> f64 {
        self.base + self.per_year * xp + self.offset_step * location_index as f64
    }
}

/// Records cycle through the locations; experience is uniform on `[0, xp_max]`.
pub fn generate_population(config: &SampleConfig) -> Result<Vec<CompensationRecord>> {
    if config.locations.is_empty() {
        return Err(Error::Config("Sample generation needs at least one location.".to_string()));
    }
    if !(config.xp_max.is_finite() && config.xp_max >= 0.0) {
        return Err(Error::Config("Invalid experience range for sample generation.".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd.max(0.0))
        .map_err(|e| Error::Config(format!("Noise distribution error: {e}")))?;

    let mut out = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let loc_idx = i % config.locations.len();
        let xp = (rng.gen_range(0.0..=config.xp_max) * 10.0).round() / 10.0;
        let comp = (config.expected(loc_idx, xp) + noise.sample(&mut rng)).max(0.0).round();
        out.push(CompensationRecord::new(config.locations[loc_idx].clone(), Some(xp), comp));
    }
    Ok(out)
}

/// A fixed synthetic population behind the `PopulationSource` trait.
#[derive(Debug, Clone)]
pub struct SampleSource {
    records: Vec<CompensationRecord>,
}

impl SampleSource {
    pub fn new(config: &SampleConfig) -> Result<Self> {
        Ok(Self {
            records: generate_population(config)?,
        })
    }
}

#[async_trait]
impl PopulationSource for SampleSource {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("synthetic population ({} records)", self.records.len())
    }
}
