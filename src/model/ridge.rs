//! L2-regularized linear regression, fitted by normal equations.

/// Ridge regressor. The small-data tier: with few samples a linear fit is
/// far more stable than anything tree-shaped.
#[derive(Debug, Clone)]
pub struct Ridge {
    alpha: f64,
    /// Learned weights, bias last. Empty until fitted.
    weights: Vec<f64>,
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            weights: Vec::new(),
        }
    }

    /// Solve (XᵀX + αI) w = Xᵀy with a bias column appended to X.
    pub fn fit(&mut self, samples: &[Vec<f64>], labels: &[f64]) {
        if samples.is_empty() {
            self.weights.clear();
            return;
        }
        let dims = samples[0].len() + 1; // + bias

        // Gram matrix and moment vector.
        let mut gram = vec![vec![0.0; dims]; dims];
        let mut moment = vec![0.0; dims];
        for (row, &y) in samples.iter().zip(labels) {
            for i in 0..dims {
                let xi = if i < row.len() { row[i] } else { 1.0 };
                moment[i] += xi * y;
                for j in 0..dims {
                    let xj = if j < row.len() { row[j] } else { 1.0 };
                    gram[i][j] += xi * xj;
                }
            }
        }
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += self.alpha;
        }

        self.weights = solve(gram, moment);
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.weights.is_empty() {
            return 0.0;
        }
        let bias = *self.weights.last().unwrap_or(&0.0);
        features
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + bias
    }
}

/// Gaussian elimination with partial pivoting. The regularized system is
/// positive definite, so a pivot is always available.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        a.swap(col, pivot);
        b.swap(col, pivot);

        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in (col + 1)..n {
            let factor = a[row][col] / diag;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = if a[row][row].abs() < 1e-12 {
            0.0
        } else {
            sum / a[row][row]
        };
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_linear_relationship() {
        // y = 3x + 2
        let samples: Vec<Vec<f64>> = (1..=20).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = samples.iter().map(|s| 3.0 * s[0] + 2.0).collect();

        let mut model = Ridge::new(0.1);
        model.fit(&samples, &labels);

        let pred = model.predict(&[10.0]);
        assert!((pred - 32.0).abs() < 0.5, "got {pred}");
    }

    #[test]
    fn handles_multivariate_input() {
        // y = 2a + 5b
        let samples: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![i as f64, (i % 7) as f64])
            .collect();
        let labels: Vec<f64> = samples.iter().map(|s| 2.0 * s[0] + 5.0 * s[1]).collect();

        let mut model = Ridge::new(0.1);
        model.fit(&samples, &labels);

        let pred = model.predict(&[4.0, 3.0]);
        assert!((pred - 23.0).abs() < 1.0, "got {pred}");
    }

    #[test]
    fn unfitted_predicts_zero() {
        let model = Ridge::new(0.1);
        assert_eq!(model.predict(&[1.0, 2.0]), 0.0);
    }

    #[test]
    fn constant_labels() {
        let samples: Vec<Vec<f64>> = (0..15).map(|i| vec![i as f64]).collect();
        let labels = vec![700.0; 15];

        let mut model = Ridge::new(0.1);
        model.fit(&samples, &labels);

        let pred = model.predict(&[7.0]);
        assert!((pred - 700.0).abs() < 10.0, "got {pred}");
    }
}
