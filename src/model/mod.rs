//! Cost regression models.
//!
//! The model family is chosen purely from the training sample count. The
//! 50/200 thresholds are a contract: downstream reliability expectations
//! assume them.

mod boost;
mod ridge;
mod tree;

pub use boost::GradientBoost;
pub use ridge::Ridge;
pub use tree::RegressionTree;

use std::collections::HashMap;

use uuid::Uuid;

/// Which model family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Regularized linear model, stable under scarce data.
    Ridge,
    /// Single regression tree, captures nonlinearity at medium scale.
    Tree,
    /// Additive boosted ensemble of shallow trees.
    Boost,
}

impl ModelKind {
    /// Tier selection by sample count: < 50 linear, < 200 tree, else boost.
    pub fn for_sample_count(n: usize) -> Self {
        if n < 50 {
            Self::Ridge
        } else if n < 200 {
            Self::Tree
        } else {
            Self::Boost
        }
    }
}

/// A fitted (or fittable) cost model.
#[derive(Debug, Clone)]
pub enum CostModel {
    Ridge(Ridge),
    Tree(RegressionTree),
    Boost(GradientBoost),
}

impl CostModel {
    pub fn new(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Ridge => Self::Ridge(Ridge::new(0.1)),
            ModelKind::Tree => Self::Tree(RegressionTree::new(8, 5)),
            ModelKind::Boost => Self::Boost(GradientBoost::new(0.1, 0.8, 100)),
        }
    }

    /// Fit on the full labeled set. No held-out split; validation metrics
    /// computed afterwards are in-sample and therefore optimistic.
    pub fn fit(&mut self, samples: &[Vec<f64>], labels: &[f64]) {
        match self {
            Self::Ridge(m) => m.fit(samples, labels),
            Self::Tree(m) => m.fit(samples, labels),
            Self::Boost(m) => m.fit(samples, labels),
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Self::Ridge(m) => m.predict(features),
            Self::Tree(m) => m.predict(features),
            Self::Boost(m) => m.predict(features),
        }
    }

    /// Stable string tag persisted with each prediction.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ridge(_) => "ridge",
            Self::Tree(_) => "regression_tree",
            Self::Boost(_) => "gradient_boost",
        }
    }
}

/// Trained models keyed by category id.
///
/// An explicit registry rather than ambient service state, so trainer and
/// predictor can be handed a fresh one per test.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<Uuid, CostModel>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category_id: Uuid, model: CostModel) {
        self.models.insert(category_id, model);
    }

    pub fn get(&self, category_id: &Uuid) -> Option<&CostModel> {
        self.models.get(category_id)
    }

    pub fn contains(&self, category_id: &Uuid) -> bool {
        self.models.contains_key(category_id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
