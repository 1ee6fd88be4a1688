//! Gradient-boosted ensemble of shallow regression trees.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::tree::RegressionTree;

const BOOSTER_MAX_DEPTH: usize = 5;
const BOOSTER_MIN_LEAF: usize = 3;

// Fixed seed so repeated training on the same data yields the same model.
const SUBSAMPLE_SEED: u64 = 0x5eed_c0de;

/// Additive boosting over shallow trees. The large-data tier.
#[derive(Debug, Clone)]
pub struct GradientBoost {
    learning_rate: f64,
    subsample_ratio: f64,
    rounds: usize,
    base: f64,
    boosters: Vec<RegressionTree>,
}

impl GradientBoost {
    pub fn new(learning_rate: f64, subsample_ratio: f64, rounds: usize) -> Self {
        Self {
            learning_rate,
            subsample_ratio,
            rounds,
            base: 0.0,
            boosters: Vec::new(),
        }
    }

    /// Fit `rounds` trees on residuals, each on a random row subsample.
    pub fn fit(&mut self, samples: &[Vec<f64>], labels: &[f64]) {
        self.boosters.clear();
        if samples.is_empty() {
            self.base = 0.0;
            return;
        }

        self.base = labels.iter().sum::<f64>() / labels.len() as f64;
        let mut predictions = vec![self.base; labels.len()];
        let mut rng = StdRng::seed_from_u64(SUBSAMPLE_SEED);
        let subsample = ((samples.len() as f64 * self.subsample_ratio) as usize).max(1);

        let mut indices: Vec<usize> = (0..samples.len()).collect();
        for _ in 0..self.rounds {
            indices.shuffle(&mut rng);
            let chosen = &indices[..subsample];

            let batch: Vec<Vec<f64>> = chosen.iter().map(|&i| samples[i].clone()).collect();
            let residuals: Vec<f64> = chosen.iter().map(|&i| labels[i] - predictions[i]).collect();

            let mut booster = RegressionTree::new(BOOSTER_MAX_DEPTH, BOOSTER_MIN_LEAF);
            booster.fit(&batch, &residuals);

            for (i, pred) in predictions.iter_mut().enumerate() {
                *pred += self.learning_rate * booster.predict(&samples[i]);
            }
            self.boosters.push(booster);
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        self.base
            + self
                .boosters
                .iter()
                .map(|b| self.learning_rate * b.predict(features))
                .sum::<f64>()
    }
}
