use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::pipeline::FeatureRow;

/// Trained logistic-regression weights, produced by an external fitting
/// step and consumed here as an opaque feature-vector -> probability map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModelArtifact {
    pub version: u32,
    #[serde(default)]
    pub generated_at: Option<String>,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default)]
    pub feature_stds: Vec<f64>,
    pub coeffs: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub train_log_loss: f64,
    #[serde(default)]
    pub train_samples: usize,
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    artifact: LogisticModelArtifact,
}

/// Implied win probability for each side of a match-up; always sums to 1.
#[derive(Debug, Clone, Copy)]
pub struct WinProb {
    pub p1: f64,
    pub p2: f64,
}

impl LogisticModel {
    pub fn from_artifact(artifact: LogisticModelArtifact) -> Result<Self> {
        if artifact.feature_names.is_empty() {
            bail!("model artifact lists no features");
        }
        if artifact.coeffs.len() != artifact.feature_names.len() {
            bail!(
                "model artifact has {} coefficients for {} features",
                artifact.coeffs.len(),
                artifact.feature_names.len()
            );
        }
        Ok(Self { artifact })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("model artifact not found at {}", path.display());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read model artifact {}", path.display()))?;
        let artifact: LogisticModelArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("model artifact {} is corrupt", path.display()))?;
        Self::from_artifact(artifact)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    /// Scores one example. `resolve` maps a feature name to its value; a
    /// missing or NaN value standardizes to 0, i.e. the feature's mean.
    pub fn predict(&self, resolve: impl Fn(&str) -> Option<f64>) -> WinProb {
        let mut z = self.artifact.intercept;
        for (idx, name) in self.artifact.feature_names.iter().enumerate() {
            let raw = resolve(name).unwrap_or(f64::NAN);
            z += self.artifact.coeffs[idx] * self.standardized(raw, idx);
        }
        let p1 = sigmoid(z);
        WinProb { p1, p2: 1.0 - p1 }
    }

    pub fn predict_row(&self, row: &FeatureRow) -> WinProb {
        self.predict(|name| row_feature(row, name))
    }

    fn standardized(&self, raw: f64, idx: usize) -> f64 {
        if raw.is_nan() {
            return 0.0;
        }
        let mean = self.artifact.feature_means.get(idx).copied().unwrap_or(0.0);
        let std = self
            .artifact
            .feature_stds
            .get(idx)
            .copied()
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        (raw - mean) / std
    }
}

/// Feature lookup for a scored pipeline row: the match-level points
/// differential plus everything the feature vector exposes by name.
pub fn row_feature(row: &FeatureRow, name: &str) -> Option<f64> {
    match name {
        "DIFF_Pts" => Some(row.diff_pts),
        _ => row.features.value(name),
    }
}

/// Decimal odds implied by a probability. A zero probability has no finite
/// odds; callers report that explicitly instead of dividing by zero.
pub fn decimal_odds(prob: f64) -> Option<f64> {
    if prob > 0.0 { Some(1.0 / prob) } else { None }
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryMetrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

/// Scores predictions against true winner labels (1 = first player).
pub fn evaluate(predictions: &[WinProb], winners: &[u8]) -> BinaryMetrics {
    if predictions.is_empty() || predictions.len() != winners.len() {
        return BinaryMetrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, winner) in predictions.iter().zip(winners) {
        let y1 = if *winner == 1 { 1.0 } else { 0.0 };
        brier_sum += (p.p1 - y1).powi(2) + (p.p2 - (1.0 - y1)).powi(2);

        let actual_prob = if *winner == 1 { p.p1 } else { p.p2 }.clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();

        if (p.p1 >= p.p2) == (*winner == 1) {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    BinaryMetrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
